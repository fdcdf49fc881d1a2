use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

use crate::{ConsultationLocation, OutcomeItem, RiskFactor, Symptom, Validate};

pub const ADMINISTRATORS: &str = "administradores";
pub const CANCER_TYPES: &str = "tiposCancer";

const COMBINATIONS: &str = "combinacoes";

/// Address of one document: a collection path plus a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn administrator(uid: &str) -> Self {
        Self::new(ADMINISTRATORS, uid)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Symptoms,
    RiskFactors,
    ScreeningIndication,
    ConsultationLocations,
    OutcomeManagement,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Symptoms,
        ContentKind::RiskFactors,
        ContentKind::ScreeningIndication,
        ContentKind::ConsultationLocations,
        ContentKind::OutcomeManagement,
    ];

    pub fn collection(self) -> &'static str {
        match self {
            ContentKind::Symptoms => "sinaisSintomas",
            ContentKind::RiskFactors => "sinaisAlarmeFatoresRisco",
            ContentKind::ScreeningIndication => "indicacoesRastreio",
            ContentKind::ConsultationLocations => "marqueConsulta",
            ContentKind::OutcomeManagement => "condutaManejoResultado",
        }
    }

    /// Path segment used by the HTTP API.
    pub fn slug(self) -> &'static str {
        match self {
            ContentKind::Symptoms => "sinais-sintomas",
            ContentKind::RiskFactors => "sinais-alarme-fatores-risco",
            ContentKind::ScreeningIndication => "indicacoes-rastreio",
            ContentKind::ConsultationLocations => "marque-consulta",
            ContentKind::OutcomeManagement => "conduta-manejo-resultado",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Locations are keyed by sex alone, everything else by sex and neoplasia.
    pub fn needs_neoplasia(self) -> bool {
        !matches!(self, ContentKind::ConsultationLocations)
    }

    /// Locations and outcomes are saved with a field merge instead of an overwrite.
    pub fn merges_on_save(self) -> bool {
        matches!(
            self,
            ContentKind::ConsultationLocations | ContentKind::OutcomeManagement
        )
    }

    /// Document holding `admin_id`'s content for `scope_key`, which is a
    /// combination key or, for locations, a sex.
    pub fn document(self, admin_id: &str, scope_key: &str) -> DocumentRef {
        match self {
            ContentKind::Symptoms | ContentKind::RiskFactors | ContentKind::OutcomeManagement => {
                DocumentRef::new(
                    format!("{}/{admin_id}/{COMBINATIONS}", self.collection()),
                    scope_key,
                )
            }
            ContentKind::ScreeningIndication | ContentKind::ConsultationLocations => {
                DocumentRef::new(self.collection(), format!("{admin_id}_{scope_key}"))
            }
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// Content stored as a single list field inside each document.
pub trait ListKind: Send + Sync + 'static {
    type Item: Serialize + DeserializeOwned + Validate + Clone + PartialEq + Send + Sync;

    const KIND: ContentKind;
    const FIELD: &'static str;
}

pub struct Symptoms;
pub struct RiskFactors;
pub struct Locations;
pub struct Outcomes;

impl ListKind for Symptoms {
    type Item = Symptom;

    const KIND: ContentKind = ContentKind::Symptoms;
    const FIELD: &'static str = "sintomas";
}

impl ListKind for RiskFactors {
    type Item = RiskFactor;

    const KIND: ContentKind = ContentKind::RiskFactors;
    const FIELD: &'static str = "sintomas";
}

impl ListKind for Locations {
    type Item = ConsultationLocation;

    const KIND: ContentKind = ContentKind::ConsultationLocations;
    const FIELD: &'static str = "locais";
}

impl ListKind for Outcomes {
    type Item = OutcomeItem;

    const KIND: ContentKind = ContentKind::OutcomeManagement;
    const FIELD: &'static str = "itens";
}
