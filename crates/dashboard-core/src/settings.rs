use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::calculations::{AllocationMode, MonthRange};
use crate::models::{FetchFilter, FilterClause};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Monthly payroll, earnings and department breakdown reports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "payroll-dashboard",
    about = "Monthly payroll, earnings and department breakdown reports",
    version
)]
pub struct Settings {
    /// Directory holding the record collections
    #[arg(long, env = "PAYROLL_DASHBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Collection with payroll/expenditure rows
    #[arg(long, default_value = "expenditures")]
    pub expenditures: String,

    /// Collection with monthly earnings rows
    #[arg(long, default_value = "earnings")]
    pub earnings: String,

    /// Equality filter FIELD=VALUE applied to both collections (repeatable)
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    pub filters: Vec<FilterClause>,

    /// Trailing months to report on ("all" or a positive number)
    #[arg(long, default_value = "12")]
    pub range: MonthRange,

    /// Weight used to split earnings across departments
    #[arg(long, default_value = "headcount", value_parser = ["headcount", "spend"])]
    pub allocation: String,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Fetch attempts per collection (1-5)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=5))]
    pub retries: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved view preferences
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// View preferences persisted to `~/.payroll-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Default location, rooted at the home directory.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Location rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".payroll-dashboard").join("last_used.json")
    }

    /// Load from `path`; absent or unreadable files give the default.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the file at `path` if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments, merge saved view preferences and persist
    /// the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`load_with_last_used`](Self::load_with_last_used) with explicit
    /// arguments and config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear saved preferences");
            }
            return settings.finish();
        }

        let last = LastUsedParams::load_from(config_path);

        // Command-line values always win over saved ones.
        if !is_arg_explicitly_set(&matches, "range") {
            if let Some(range) = last.range.as_deref().and_then(|r| r.parse().ok()) {
                settings.range = range;
            }
        }
        if !is_arg_explicitly_set(&matches, "allocation") {
            if let Some(v) = last.allocation.filter(|v| v.parse::<AllocationMode>().is_ok()) {
                settings.allocation = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format.filter(|v| v == "table" || v == "json") {
                settings.format = v;
            }
        }

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "could not save preferences");
        }

        settings.finish()
    }

    fn finish(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// Parsed allocation mode; the CLI only admits valid names.
    pub fn allocation_mode(&self) -> AllocationMode {
        self.allocation.parse().unwrap_or(AllocationMode::Headcount)
    }

    /// Store filter assembled from every `--filter` clause.
    pub fn fetch_filter(&self) -> FetchFilter {
        FetchFilter::new(self.filters.clone())
    }

    /// Explicit `--data-dir`, else `~/.payroll-dashboard/data` when it
    /// exists, else `./data`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(".payroll-dashboard").join("data"))
            .filter(|p| p.is_dir())
            .unwrap_or_else(|| PathBuf::from("data"))
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            range: Some(s.range.to_string()),
            allocation: Some(s.allocation.clone()),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
