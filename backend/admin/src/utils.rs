use anyhow::{Result, anyhow, bail};
use catalog::{Combination, ContentKind, Sex};
use serde_json::{Value, json};

use crate::models::Entry;

/// Accepts either the API slug (`sinais-sintomas`) or the collection name
/// (`sinaisSintomas`).
pub fn resolve_kind(name: &str) -> Result<ContentKind> {
    let name = name.trim();

    ContentKind::from_slug(name)
        .or_else(|| {
            ContentKind::ALL
                .into_iter()
                .find(|kind| kind.collection() == name)
        })
        .ok_or_else(|| anyhow!("Unknown content kind: {name}"))
}

/// API path for one piece of content, with the sex and neoplasia in their
/// canonical form.
pub fn content_path(kind: ContentKind, sexo: &str, neoplasia: Option<&str>) -> Result<String> {
    if !kind.needs_neoplasia() {
        let sex: Sex = sexo.parse()?;
        return Ok(format!("/{}/{}", kind.slug(), sex.as_str()));
    }

    let Some(neoplasia) = neoplasia else {
        bail!("{} needs a neoplasia", kind.slug());
    };
    let combination = Combination::parse(sexo, neoplasia)?;

    Ok(format!(
        "/{}/{}/{}",
        kind.slug(),
        combination.sex().as_str(),
        combination.neoplasia().as_str()
    ))
}

/// Request body the server expects for `entry`.
pub fn entry_payload(kind: ContentKind, entry: &Entry) -> Result<Value> {
    match kind {
        ContentKind::ScreeningIndication => {
            let texto = entry
                .texto
                .as_deref()
                .ok_or_else(|| anyhow!("{} entry is missing `texto`", kind.slug()))?;

            Ok(json!({ "texto": texto }))
        }
        _ => {
            let items = entry
                .items
                .as_ref()
                .ok_or_else(|| anyhow!("{} entry is missing `items`", kind.slug()))?;

            Ok(json!({ "items": items }))
        }
    }
}

pub fn parse_bundle(text: &str) -> Result<Vec<Entry>> {
    Ok(serde_json::from_str(text)?)
}
