//! Records administrators register. Field names match the stored documents.

use serde::{Deserialize, Serialize};

use crate::{CatalogError, Combination, Neoplasia, Sex};

/// Checks a record before it is written. Reads never re-validate.
pub trait Validate {
    fn validate(&self) -> Result<(), CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symptom(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiskFactor {
    pub descricao: String,
    /// Public URL of the illustrating image.
    pub imagem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsultationLocation {
    pub nome: String,
    pub link: String,
    pub telefone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeItem {
    pub resultado: String,
    pub descricao: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningIndication {
    pub sexo: Sex,
    pub neoplasia: Neoplasia,
    #[serde(default)]
    pub texto: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
    pub uid: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancerType {
    pub tipo_cancer: String,
    #[serde(default)]
    pub calculo_de_risco: Vec<String>,
}

fn require(value: &str, field: &'static str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::MissingField(field));
    }

    Ok(())
}

impl Validate for Symptom {
    fn validate(&self) -> Result<(), CatalogError> {
        require(&self.0, "sintoma")
    }
}

impl Validate for RiskFactor {
    fn validate(&self) -> Result<(), CatalogError> {
        require(&self.descricao, "descricao")?;
        require(&self.imagem, "imagem")?;

        let url = self.imagem.trim();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));

        match rest {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(CatalogError::InvalidUrl(self.imagem.clone())),
        }
    }
}

impl Validate for ConsultationLocation {
    fn validate(&self) -> Result<(), CatalogError> {
        require(&self.nome, "nome")?;
        require(&self.link, "link")?;
        require(&self.telefone, "telefone")
    }
}

impl Validate for OutcomeItem {
    fn validate(&self) -> Result<(), CatalogError> {
        require(&self.resultado, "resultado")?;
        require(&self.descricao, "descricao")
    }
}

impl Validate for Administrator {
    fn validate(&self) -> Result<(), CatalogError> {
        require(&self.uid, "uid")?;
        require(&self.email, "email")?;
        require(&self.name, "name")
    }
}

/// `texto` may be empty, it clears the indication.
impl Validate for ScreeningIndication {
    fn validate(&self) -> Result<(), CatalogError> {
        Combination::new(self.sexo, self.neoplasia).map(|_| ())
    }
}

impl Validate for CancerType {
    fn validate(&self) -> Result<(), CatalogError> {
        require(&self.tipo_cancer, "tipoCancer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_symptom_rejected() {
        assert_eq!(
            Symptom("   ".to_string()).validate(),
            Err(CatalogError::MissingField("sintoma"))
        );
        assert!(Symptom("tosse persistente".to_string()).validate().is_ok());
    }

    #[test]
    fn test_risk_factor_needs_http_image() {
        let mut factor = RiskFactor {
            descricao: "Tabagismo".to_string(),
            imagem: "https://cdn.example.com/images/tabagismo.png".to_string(),
        };
        assert!(factor.validate().is_ok());

        factor.imagem = "ftp://example.com/a.png".to_string();
        assert!(matches!(factor.validate(), Err(CatalogError::InvalidUrl(_))));

        factor.imagem = "https://".to_string();
        assert!(matches!(factor.validate(), Err(CatalogError::InvalidUrl(_))));

        factor.imagem = String::new();
        assert_eq!(factor.validate(), Err(CatalogError::MissingField("imagem")));
    }

    #[test]
    fn test_location_requires_every_field() {
        let location = ConsultationLocation {
            nome: "UBS Centro".to_string(),
            link: "https://maps.example.com/ubs".to_string(),
            telefone: String::new(),
        };

        assert_eq!(
            location.validate(),
            Err(CatalogError::MissingField("telefone"))
        );
    }

    #[test]
    fn test_outcome_requires_both_fields() {
        let item = OutcomeItem {
            resultado: String::new(),
            descricao: "Repetir em 3 anos".to_string(),
        };

        assert_eq!(item.validate(), Err(CatalogError::MissingField("resultado")));
    }

    #[test]
    fn test_indication_allows_empty_text_but_not_foreign_neoplasia() {
        let cleared = ScreeningIndication {
            sexo: Sex::Mulher,
            neoplasia: Neoplasia::Mama,
            texto: String::new(),
        };
        assert_eq!(cleared.validate(), Ok(()));

        let mismatched = ScreeningIndication {
            sexo: Sex::Homem,
            neoplasia: Neoplasia::ColoDeUtero,
            texto: "Papanicolau".to_string(),
        };
        assert_eq!(
            mismatched.validate(),
            Err(CatalogError::InvalidCombination {
                sex: Sex::Homem,
                neoplasia: Neoplasia::ColoDeUtero,
            })
        );
    }

    #[test]
    fn test_cancer_type_wire_names() {
        let parsed: CancerType = serde_json::from_str(
            r#"{"tipoCancer":"pulmão","calculoDeRisco":["carga tabágica"]}"#,
        )
        .unwrap();

        assert_eq!(parsed.tipo_cancer, "pulmão");
        assert_eq!(parsed.calculo_de_risco, vec!["carga tabágica".to_string()]);
    }

    #[test]
    fn test_symptom_is_plain_string_on_the_wire() {
        let symptoms: Vec<Symptom> = serde_json::from_str(r#"["tosse","dispneia"]"#).unwrap();
        assert_eq!(symptoms[1], Symptom("dispneia".to_string()));
    }
}
