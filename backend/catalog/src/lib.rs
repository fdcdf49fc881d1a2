//! # Catalog
//!
//! Shared reference-content model for Rastreando: which neoplasias can be
//! selected for each sex, the records administrators register, and the
//! document keys those records are stored under.
//!
//! ## Keys
//!
//! Documents are addressed by string conventions only, nothing enforces
//! referential integrity:
//! - `sinaisSintomas/{adminId}/combinacoes/{sex}_{neoplasia}`
//! - `sinaisAlarmeFatoresRisco/{adminId}/combinacoes/{sex}_{neoplasia}`
//! - `condutaManejoResultado/{adminId}/combinacoes/{sex}_{neoplasia}`
//! - `indicacoesRastreio/{adminId}_{sex}_{neoplasia}`
//! - `marqueConsulta/{adminId}_{sex}`
//!
//! Neoplasia keys keep their accents and spaces (`mulher_colo de útero`) so
//! they line up with data written by earlier clients.

use thiserror::Error;

pub mod combination;
pub mod documents;
pub mod records;

pub use combination::{Combination, Neoplasia, Sex};
pub use documents::{
    ADMINISTRATORS, CANCER_TYPES, ContentKind, DocumentRef, ListKind, Locations, Outcomes,
    RiskFactors, Symptoms,
};
pub use records::{
    Administrator, CancerType, ConsultationLocation, OutcomeItem, RiskFactor, ScreeningIndication,
    Symptom, Validate,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown sex: {0}")]
    InvalidSex(String),

    #[error("Unknown neoplasia: {0}")]
    InvalidNeoplasia(String),

    #[error("Neoplasia {neoplasia} is not available for {sex}")]
    InvalidCombination { sex: Sex, neoplasia: Neoplasia },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),
}

/// Drops repeated items, keeping the first occurrence of each.
///
/// Fan-out saves write the same list into every administrator's document,
/// so an aggregated read would otherwise return one copy per administrator.
pub fn dedupe_preserving_order<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::dedupe_preserving_order;

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let items = vec!["tosse", "dispneia", "tosse", "hemoptise", "dispneia"];

        assert_eq!(
            dedupe_preserving_order(items),
            vec!["tosse", "dispneia", "hemoptise"]
        );
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe_preserving_order(Vec::<String>::new()).is_empty());
    }
}
