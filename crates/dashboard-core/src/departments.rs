//! Department label canonicalization.
//!
//! Spreadsheet exports and manually maintained sheets spell the same
//! department in many ways. A single alias table keyed by the normalized
//! (trimmed, whitespace-collapsed, lowercased) label maps them onto the
//! canonical set. Unknown labels pass through as their own canonical name.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Normalized label of the source's own subtotal row.
pub const SUBTOTAL_LABEL: &str = "total geral";

/// The fixed canonical department names.
pub const CANONICAL_DEPARTMENTS: &[&str] = &[
    "Administrativo",
    "Apoio",
    "Comercial",
    "Diretoria",
    "Jurídico",
    "Marketing",
    "NEC",
    "Operação",
    "RH",
    "Planejamento Estratégico",
];

/// `(alias, canonical)` pairs. Aliases are matched after [`normalize_label`].
const ALIASES: &[(&str, &str)] = &[
    // Export labels → short display names.
    ("administrativo geral", "Administrativo"),
    ("administrativo financeiro", "Administrativo"),
    ("apoio operacional", "Apoio"),
    ("apoio geral", "Apoio"),
    ("comercial geral", "Comercial"),
    ("vendas", "Comercial"),
    ("diretoria geral", "Diretoria"),
    ("diretoria executiva", "Diretoria"),
    ("jurídico geral", "Jurídico"),
    ("departamento jurídico", "Jurídico"),
    ("marketing geral", "Marketing"),
    ("nec geral", "NEC"),
    ("núcleo de estudos e cálculos", "NEC"),
    ("operação geral", "Operação"),
    ("operacao geral", "Operação"),
    ("operações", "Operação"),
    ("recursos humanos", "RH"),
    ("rh geral", "RH"),
    ("planejamento", "Planejamento Estratégico"),
    ("planejamento estratégico geral", "Planejamento Estratégico"),
    // Full labels, any capitalization.
    ("administrativo", "Administrativo"),
    ("adm", "Administrativo"),
    ("apoio", "Apoio"),
    ("comercial", "Comercial"),
    ("diretoria", "Diretoria"),
    ("jurídico", "Jurídico"),
    ("juridico", "Jurídico"),
    ("marketing", "Marketing"),
    ("mkt", "Marketing"),
    ("nec", "NEC"),
    ("operação", "Operação"),
    ("operacao", "Operação"),
    ("rh", "RH"),
    ("planejamento estratégico", "Planejamento Estratégico"),
    ("planejamento estrategico", "Planejamento Estratégico"),
];

static ALIAS_TABLE: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    ALIASES
        .iter()
        .map(|(alias, canonical)| (normalize_label(alias), *canonical))
        .collect()
});

/// Trim, collapse inner whitespace and lowercase a raw label.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// What a raw department label resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartmentLabel {
    /// A department, canonical or passed through.
    Department(String),
    /// The source's "Total Geral" subtotal row.
    Subtotal,
}

/// Maps raw department labels onto canonical names.
pub struct DepartmentCanonicalizer;

impl DepartmentCanonicalizer {
    /// Canonical name for `raw`.
    ///
    /// Exact lookup on the normalized label; when no alias matches, the
    /// trimmed raw label is returned.
    pub fn canonicalize(raw: &str) -> String {
        match ALIAS_TABLE.get(&normalize_label(raw)) {
            Some(canonical) => (*canonical).to_string(),
            None => raw.trim().to_string(),
        }
    }

    /// Resolve `raw`, distinguishing the subtotal row.
    ///
    /// Returns `None` for blank labels.
    pub fn classify(raw: &str) -> Option<DepartmentLabel> {
        if raw.trim().is_empty() {
            return None;
        }
        let canonical = Self::canonicalize(raw);
        if Self::is_subtotal(&canonical) {
            Some(DepartmentLabel::Subtotal)
        } else {
            Some(DepartmentLabel::Department(canonical))
        }
    }

    /// `true` when `label` is the "Total Geral" sentinel, in any casing.
    pub fn is_subtotal(label: &str) -> bool {
        normalize_label(label) == SUBTOTAL_LABEL
    }

    /// `true` when `name` belongs to the fixed canonical set.
    pub fn is_canonical(name: &str) -> bool {
        CANONICAL_DEPARTMENTS.contains(&name)
    }
}
