//! Classification of extracted payslip line items.
//!
//! The extraction service hands over, per person, the raw line items read
//! from a scanned payslip. Each item is classified by an ordered rule table
//! evaluated once per item: the first rule whose keyword occurs in the
//! normalized description decides the category, so an item is never counted
//! twice.

use std::collections::BTreeMap;

use dashboard_core::data_processors::NumericCoercer;
use dashboard_core::departments::normalize_label;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a payslip line item is accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayCategory {
    BaseSalary,
    Bonus,
    MealVoucher,
    Overtime,
    Benefit,
    Deduction,
    Other,
}

/// One line of an extracted payslip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayslipLineItem {
    pub description: String,
    /// Raw amount as extracted, number or formatted string.
    #[serde(default)]
    pub amount: Value,
}

impl PayslipLineItem {
    pub fn new(description: impl Into<String>, amount: impl Into<Value>) -> Self {
        Self {
            description: description.into(),
            amount: amount.into(),
        }
    }

    /// Amount coerced to a number (0 when unreadable).
    pub fn value(&self) -> f64 {
        NumericCoercer::coerce(Some(&self.amount))
    }
}

/// A keyword list and the category it assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRule {
    pub keywords: Vec<String>,
    pub category: PayCategory,
}

impl ClassificationRule {
    pub fn new(keywords: &[&str], category: PayCategory) -> Self {
        Self {
            keywords: keywords.iter().map(|k| normalize_label(k)).collect(),
            category,
        }
    }

    /// `true` when any keyword occurs in the already normalized description.
    fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }
}

/// Per-category sums for one person.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayslipSummary {
    pub base_salary: f64,
    pub bonus: f64,
    pub meal_voucher: f64,
    pub overtime: f64,
    pub benefits: f64,
    /// Always non-negative; subtracted to obtain `net`.
    pub deductions: f64,
    pub other: f64,
}

impl PayslipSummary {
    fn add(&mut self, category: PayCategory, amount: f64) {
        match category {
            PayCategory::BaseSalary => self.base_salary += amount,
            PayCategory::Bonus => self.bonus += amount,
            PayCategory::MealVoucher => self.meal_voucher += amount,
            PayCategory::Overtime => self.overtime += amount,
            PayCategory::Benefit => self.benefits += amount,
            PayCategory::Deduction => self.deductions += amount.abs(),
            PayCategory::Other => self.other += amount,
        }
    }

    /// Everything earned before deductions.
    pub fn gross(&self) -> f64 {
        self.base_salary + self.bonus + self.meal_voucher + self.overtime + self.benefits + self.other
    }

    pub fn net(&self) -> f64 {
        self.gross() - self.deductions
    }
}

/// Ordered rule table mapping line-item descriptions to categories.
#[derive(Debug, Clone)]
pub struct PayslipClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for PayslipClassifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl PayslipClassifier {
    /// Rules for the payslip layouts seen so far. Deductions come first so
    /// that e.g. "Desconto Vale Alimentação" is not read as an allowance.
    pub fn standard() -> Self {
        Self::with_rules(vec![
            ClassificationRule::new(
                &["desconto", "inss", "irrf", "faltas", "adiantamento", "contribuição sindical"],
                PayCategory::Deduction,
            ),
            ClassificationRule::new(
                &["hora extra", "horas extras", "he 50", "he 100", "adicional noturno"],
                PayCategory::Overtime,
            ),
            ClassificationRule::new(
                &[
                    "bonificação",
                    "bonificacao",
                    "gratificação",
                    "gratificacao",
                    "prêmio",
                    "premio",
                    "comissão",
                    "comissao",
                ],
                PayCategory::Bonus,
            ),
            ClassificationRule::new(
                &["vale alimentação", "vale alimentacao", "vale refeição", "vale refeicao"],
                PayCategory::MealVoucher,
            ),
            ClassificationRule::new(
                &["salário", "salario", "pró-labore", "pro labore"],
                PayCategory::BaseSalary,
            ),
            ClassificationRule::new(
                &["auxílio", "auxilio", "vale transporte", "plano de saúde", "plano de saude"],
                PayCategory::Benefit,
            ),
        ])
    }

    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Category of the first matching rule, [`PayCategory::Other`] otherwise.
    pub fn classify(&self, description: &str) -> PayCategory {
        let normalized = normalize_label(description);
        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(|rule| rule.category)
            .unwrap_or(PayCategory::Other)
    }

    pub fn summarize(&self, items: &[PayslipLineItem]) -> PayslipSummary {
        let mut summary = PayslipSummary::default();
        for item in items {
            summary.add(self.classify(&item.description), item.value());
        }
        summary
    }

    /// Summaries keyed by person name.
    pub fn summarize_all(
        &self,
        payslips: &BTreeMap<String, Vec<PayslipLineItem>>,
    ) -> BTreeMap<String, PayslipSummary> {
        payslips
            .iter()
            .map(|(person, items)| (person.clone(), self.summarize(items)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_standard_items() {
        let c = PayslipClassifier::standard();
        assert_eq!(c.classify("Salário Base"), PayCategory::BaseSalary);
        assert_eq!(c.classify("BONIFICAÇÃO 20%"), PayCategory::Bonus);
        assert_eq!(c.classify("Vale Alimentação"), PayCategory::MealVoucher);
        assert_eq!(c.classify("Horas Extras 50%"), PayCategory::Overtime);
        assert_eq!(c.classify("Auxílio Creche"), PayCategory::Benefit);
        assert_eq!(c.classify("INSS"), PayCategory::Deduction);
        assert_eq!(c.classify("Reembolso diverso"), PayCategory::Other);
    }

    #[test]
    fn test_first_match_wins() {
        let c = PayslipClassifier::standard();
        // Mentions both a deduction and a meal voucher; counted once.
        assert_eq!(c.classify("Desconto Vale Alimentação"), PayCategory::Deduction);
        // Mentions both overtime and salary.
        assert_eq!(c.classify("Hora extra sobre salário"), PayCategory::Overtime);
    }

    #[test]
    fn test_summarize_sums_and_net() {
        let c = PayslipClassifier::standard();
        let items = vec![
            PayslipLineItem::new("Salário", "R$ 3.000,00"),
            PayslipLineItem::new("Bonificação", 300.0),
            PayslipLineItem::new("Vale Alimentação", "450,00"),
            PayslipLineItem::new("INSS", "-330,00"),
            PayslipLineItem::new("Desconto Vale Alimentação", "45"),
            PayslipLineItem::new("Ajuste", "ilegível"),
        ];
        let s = c.summarize(&items);
        assert_eq!(s.base_salary, 3000.0);
        assert_eq!(s.bonus, 300.0);
        assert_eq!(s.meal_voucher, 450.0);
        assert_eq!(s.deductions, 375.0);
        assert_eq!(s.other, 0.0);
        assert_eq!(s.gross(), 3750.0);
        assert_eq!(s.net(), 3375.0);
    }

    #[test]
    fn test_custom_rules() {
        let c = PayslipClassifier::with_rules(vec![ClassificationRule::new(
            &["PLR"],
            PayCategory::Bonus,
        )]);
        assert_eq!(c.classify("Participação PLR"), PayCategory::Bonus);
        assert_eq!(c.classify("Salário"), PayCategory::Other);
    }

    #[test]
    fn test_summarize_all_by_person() {
        let mut payslips = BTreeMap::new();
        payslips.insert("Ana".to_string(), vec![PayslipLineItem::new("Salário", 2000)]);
        payslips.insert("Bruno".to_string(), vec![]);
        let summaries = PayslipClassifier::default().summarize_all(&payslips);
        assert_eq!(summaries["Ana"].base_salary, 2000.0);
        assert_eq!(summaries["Bruno"], PayslipSummary::default());
    }

    #[test]
    fn test_line_item_deserializes_from_extraction_json() {
        let item: PayslipLineItem =
            serde_json::from_str(r#"{"description": "Salário", "amount": "1.500,00"}"#).unwrap();
        assert_eq!(item.value(), 1500.0);
        let missing: PayslipLineItem = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(missing.value(), 0.0);
    }
}
