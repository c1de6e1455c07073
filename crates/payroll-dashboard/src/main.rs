mod bootstrap;
mod report;

use anyhow::{Context, Result};
use dashboard_core::settings::Settings;
use dashboard_runtime::loader::DashboardLoader;
use dashboard_runtime::source::FileRowSource;
use dashboard_runtime::state::DashboardState;

use crate::report::Report;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("Payroll dashboard v{} starting", env!("CARGO_PKG_VERSION"));

    let data_dir = settings.resolve_data_dir();
    tracing::info!(
        data_dir = %data_dir.display(),
        range = %settings.range,
        allocation = %settings.allocation,
        filters = settings.filters.len(),
        "loading dashboard"
    );

    let loader = DashboardLoader::new(FileRowSource::new(&data_dir))
        .with_collections(&settings.expenditures, &settings.earnings)
        .with_filter(settings.fetch_filter())
        .with_attempts(settings.retries);

    let state = DashboardState::new();
    let context = loader
        .refresh(&state)
        .await
        .with_context(|| format!("could not load dashboard data from {}", data_dir.display()))?;

    if context.stats.rows_without_month + context.stats.earnings_without_month > 0 {
        tracing::warn!(
            expenditure = context.stats.rows_without_month,
            earnings = context.stats.earnings_without_month,
            "some rows had an unrecognised month and were left out"
        );
    }

    let report = Report::build(&context, settings.range, settings.allocation_mode());
    match settings.format.as_str() {
        "json" => println!("{}", report.to_json()?),
        _ => print!("{}", report.to_table()),
    }

    Ok(())
}
