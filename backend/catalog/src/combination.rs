use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sex {
    Homem,
    Mulher,
}

/// Stored with the accented spelling, parsed from either that or an ASCII slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Neoplasia {
    Pulmao,
    Colorretal,
    Prostata,
    Mama,
    ColoDeUtero,
}

const MALE_NEOPLASIAS: &[Neoplasia] = &[
    Neoplasia::Pulmao,
    Neoplasia::Colorretal,
    Neoplasia::Prostata,
];

const FEMALE_NEOPLASIAS: &[Neoplasia] = &[
    Neoplasia::Pulmao,
    Neoplasia::Colorretal,
    Neoplasia::Mama,
    Neoplasia::ColoDeUtero,
];

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Homem => "homem",
            Sex::Mulher => "mulher",
        }
    }

    /// Neoplasias offered for this sex, in display order.
    pub fn neoplasias(self) -> &'static [Neoplasia] {
        match self {
            Sex::Homem => MALE_NEOPLASIAS,
            Sex::Mulher => FEMALE_NEOPLASIAS,
        }
    }

    pub fn allows(self, neoplasia: Neoplasia) -> bool {
        self.neoplasias().contains(&neoplasia)
    }
}

impl Neoplasia {
    pub fn as_str(self) -> &'static str {
        match self {
            Neoplasia::Pulmao => "pulmão",
            Neoplasia::Colorretal => "colorretal",
            Neoplasia::Prostata => "próstata",
            Neoplasia::Mama => "mama",
            Neoplasia::ColoDeUtero => "colo de útero",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Neoplasia::Pulmao => "Pulmão",
            Neoplasia::Colorretal => "Colorretal",
            Neoplasia::Prostata => "Próstata",
            Neoplasia::Mama => "Mama",
            Neoplasia::ColoDeUtero => "Colo de Útero",
        }
    }
}

impl FromStr for Sex {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "homem" => Ok(Sex::Homem),
            "mulher" => Ok(Sex::Mulher),
            _ => Err(CatalogError::InvalidSex(s.to_string())),
        }
    }
}

impl FromStr for Neoplasia {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "pulmao" => Ok(Neoplasia::Pulmao),
            "colorretal" => Ok(Neoplasia::Colorretal),
            "prostata" => Ok(Neoplasia::Prostata),
            "mama" => Ok(Neoplasia::Mama),
            "colo de utero" => Ok(Neoplasia::ColoDeUtero),
            _ => Err(CatalogError::InvalidNeoplasia(s.to_string())),
        }
    }
}

impl TryFrom<String> for Sex {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for Neoplasia {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sex> for String {
    fn from(value: Sex) -> Self {
        value.as_str().to_string()
    }
}

impl From<Neoplasia> for String {
    fn from(value: Neoplasia) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Neoplasia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sex/neoplasia pair that the selection forms actually offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combination {
    sex: Sex,
    neoplasia: Neoplasia,
}

impl Combination {
    pub fn new(sex: Sex, neoplasia: Neoplasia) -> Result<Self, CatalogError> {
        if !sex.allows(neoplasia) {
            return Err(CatalogError::InvalidCombination { sex, neoplasia });
        }

        Ok(Self { sex, neoplasia })
    }

    pub fn parse(sex: &str, neoplasia: &str) -> Result<Self, CatalogError> {
        Self::new(sex.parse()?, neoplasia.parse()?)
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn neoplasia(&self) -> Neoplasia {
        self.neoplasia
    }

    /// `{sex}_{neoplasia}`, e.g. `mulher_colo de útero`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.sex, self.neoplasia)
    }
}

// lowercase, strip Portuguese diacritics, treat `-`/`_` as spaces, collapse runs
fn fold(input: &str) -> String {
    let mapped: String = input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            '-' | '_' => ' ',
            other => other,
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accented_and_slug_forms() {
        assert_eq!("pulmão".parse::<Neoplasia>(), Ok(Neoplasia::Pulmao));
        assert_eq!("pulmao".parse::<Neoplasia>(), Ok(Neoplasia::Pulmao));
        assert_eq!("Colo de Útero".parse::<Neoplasia>(), Ok(Neoplasia::ColoDeUtero));
        assert_eq!("colo-de-utero".parse::<Neoplasia>(), Ok(Neoplasia::ColoDeUtero));
        assert_eq!("colo_de_utero".parse::<Neoplasia>(), Ok(Neoplasia::ColoDeUtero));
        assert_eq!(" PRÓSTATA ".parse::<Neoplasia>(), Ok(Neoplasia::Prostata));
        assert_eq!("Mulher".parse::<Sex>(), Ok(Sex::Mulher));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            "pancreas".parse::<Neoplasia>(),
            Err(CatalogError::InvalidNeoplasia("pancreas".to_string()))
        );
        assert!("outro".parse::<Sex>().is_err());
    }

    #[test]
    fn test_neoplasias_per_sex() {
        assert_eq!(
            Sex::Homem.neoplasias(),
            &[Neoplasia::Pulmao, Neoplasia::Colorretal, Neoplasia::Prostata]
        );
        assert_eq!(
            Sex::Mulher.neoplasias(),
            &[
                Neoplasia::Pulmao,
                Neoplasia::Colorretal,
                Neoplasia::Mama,
                Neoplasia::ColoDeUtero
            ]
        );
    }

    #[test]
    fn test_combination_rejects_unavailable_pairs() {
        assert!(Combination::new(Sex::Homem, Neoplasia::Mama).is_err());
        assert!(Combination::new(Sex::Homem, Neoplasia::ColoDeUtero).is_err());
        assert!(Combination::new(Sex::Mulher, Neoplasia::Prostata).is_err());
        assert!(Combination::new(Sex::Mulher, Neoplasia::Mama).is_ok());
    }

    #[test]
    fn test_combination_key_keeps_accents() {
        let combination = Combination::parse("mulher", "colo-de-utero").unwrap();
        assert_eq!(combination.key(), "mulher_colo de útero");

        let combination = Combination::parse("homem", "prostata").unwrap();
        assert_eq!(combination.key(), "homem_próstata");
    }

    #[test]
    fn test_serde_uses_stored_spelling() {
        let json = serde_json::to_string(&Neoplasia::Pulmao).unwrap();
        assert_eq!(json, "\"pulmão\"");

        let parsed: Neoplasia = serde_json::from_str("\"colorretal\"").unwrap();
        assert_eq!(parsed, Neoplasia::Colorretal);

        assert!(serde_json::from_str::<Sex>("\"x\"").is_err());
    }
}
