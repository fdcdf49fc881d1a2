//! # Reference content
//!
//! Every administrator owns one document per content kind and key. Visitors
//! see the union of all administrators' documents, administrators edit
//! either every copy at once or only their own.
//!
//! ## Reads
//! - list kinds: concatenate every administrator's list, drop duplicates
//! - screening indication: first administrator with a document wins
//!
//! ## Writes
//! - `scope=all`: the submitted list replaces the list in every
//!   administrator's document
//! - `scope=own`: only the caller's document is written
//! - one failing administrator does not stop the others, the save still
//!   reports failure afterwards
use catalog::{
    ADMINISTRATORS, CANCER_TYPES, CancerType, Combination, ContentKind, DocumentRef, ListKind,
    ScreeningIndication, Validate, dedupe_preserving_order,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::{
    database::{DocumentStore, StoreError},
    error::AppError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    Own,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub documents_written: usize,
}

pub async fn administrator_ids(store: &dyn DocumentStore) -> Result<Vec<String>, StoreError> {
    store.list_ids(ADMINISTRATORS).await
}

fn decode_list<K: ListKind>(doc: &DocumentRef, value: Value) -> Result<Vec<K::Item>, StoreError> {
    match value.get(K::FIELD) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(field) => {
            serde_json::from_value(field.clone()).map_err(|source| StoreError::Corrupt {
                document: doc.to_string(),
                source,
            })
        }
    }
}

async fn load_list<K: ListKind>(
    store: &dyn DocumentStore,
    doc: &DocumentRef,
) -> Result<Vec<K::Item>, StoreError> {
    match store.get(doc).await? {
        Some(value) => decode_list::<K>(doc, value),
        None => Ok(Vec::new()),
    }
}

/// Items of kind `K` for `scope_key` across all administrators.
pub async fn read_list<K: ListKind>(
    store: &dyn DocumentStore,
    scope_key: &str,
) -> Result<Vec<K::Item>, AppError> {
    let mut items = Vec::new();

    for admin_id in administrator_ids(store).await? {
        let doc = K::KIND.document(&admin_id, scope_key);
        items.extend(load_list::<K>(store, &doc).await?);
    }

    Ok(dedupe_preserving_order(items))
}

pub async fn read_own_list<K: ListKind>(
    store: &dyn DocumentStore,
    admin_id: &str,
    scope_key: &str,
) -> Result<Vec<K::Item>, AppError> {
    let doc = K::KIND.document(admin_id, scope_key);

    Ok(load_list::<K>(store, &doc).await?)
}

pub async fn save_list<K: ListKind>(
    store: &dyn DocumentStore,
    author_id: &str,
    scope: Scope,
    scope_key: &str,
    items: Vec<K::Item>,
) -> Result<SaveReport, AppError> {
    for item in &items {
        item.validate()?;
    }

    let mut fields = Map::new();
    fields.insert(
        K::FIELD.to_string(),
        serde_json::to_value(&items).map_err(StoreError::from)?,
    );

    write_all(store, K::KIND, author_id, scope, scope_key, Value::Object(fields)).await
}

async fn targets(
    store: &dyn DocumentStore,
    author_id: &str,
    scope: Scope,
) -> Result<Vec<String>, StoreError> {
    match scope {
        Scope::All => administrator_ids(store).await,
        Scope::Own => Ok(vec![author_id.to_string()]),
    }
}

async fn write_all(
    store: &dyn DocumentStore,
    kind: ContentKind,
    author_id: &str,
    scope: Scope,
    scope_key: &str,
    value: Value,
) -> Result<SaveReport, AppError> {
    let mut written = 0;
    let mut failed = Vec::new();

    for admin_id in targets(store, author_id, scope).await? {
        let doc = kind.document(&admin_id, scope_key);

        let result = if kind.merges_on_save() {
            store.merge(&doc, value.clone()).await
        } else {
            store.set(&doc, value.clone()).await
        };

        match result {
            Ok(()) => written += 1,
            Err(e) => {
                error!("Failed to save {doc}: {e}");
                failed.push(admin_id);
            }
        }
    }

    if !failed.is_empty() {
        return Err(AppError::PartialSave { failed });
    }

    info!("{author_id} saved {kind} {scope_key} into {written} documents");

    Ok(SaveReport {
        documents_written: written,
    })
}

fn decode_indication(doc: &DocumentRef, value: Value) -> Result<ScreeningIndication, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
        document: doc.to_string(),
        source,
    })
}

fn empty_indication(combination: Combination) -> ScreeningIndication {
    ScreeningIndication {
        sexo: combination.sex(),
        neoplasia: combination.neoplasia(),
        texto: String::new(),
    }
}

/// Text from the first administrator that has one, or an empty text.
pub async fn read_indication(
    store: &dyn DocumentStore,
    combination: Combination,
) -> Result<ScreeningIndication, AppError> {
    for admin_id in administrator_ids(store).await? {
        let doc = ContentKind::ScreeningIndication.document(&admin_id, &combination.key());

        if let Some(value) = store.get(&doc).await? {
            return Ok(decode_indication(&doc, value)?);
        }
    }

    Ok(empty_indication(combination))
}

pub async fn read_own_indication(
    store: &dyn DocumentStore,
    admin_id: &str,
    combination: Combination,
) -> Result<ScreeningIndication, AppError> {
    let doc = ContentKind::ScreeningIndication.document(admin_id, &combination.key());

    match store.get(&doc).await? {
        Some(value) => Ok(decode_indication(&doc, value)?),
        None => Ok(empty_indication(combination)),
    }
}

pub async fn save_indication(
    store: &dyn DocumentStore,
    author_id: &str,
    scope: Scope,
    combination: Combination,
    texto: String,
) -> Result<SaveReport, AppError> {
    let indication = ScreeningIndication {
        sexo: combination.sex(),
        neoplasia: combination.neoplasia(),
        texto,
    };
    indication.validate()?;
    let value = serde_json::to_value(&indication).map_err(StoreError::from)?;

    write_all(
        store,
        ContentKind::ScreeningIndication,
        author_id,
        scope,
        &combination.key(),
        value,
    )
    .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCancerType {
    pub id: String,
    #[serde(flatten)]
    pub cancer_type: CancerType,
}

pub async fn list_cancer_types(
    store: &dyn DocumentStore,
) -> Result<Vec<StoredCancerType>, AppError> {
    store
        .list(CANCER_TYPES)
        .await?
        .into_iter()
        .map(|(id, value)| -> Result<StoredCancerType, AppError> {
            let cancer_type = serde_json::from_value(value).map_err(|source| {
                StoreError::Corrupt {
                    document: format!("{CANCER_TYPES}/{id}"),
                    source,
                }
            })?;

            Ok(StoredCancerType { id, cancer_type })
        })
        .collect()
}

pub async fn add_cancer_type(
    store: &dyn DocumentStore,
    cancer_type: CancerType,
) -> Result<StoredCancerType, AppError> {
    cancer_type.validate()?;

    let value = serde_json::to_value(&cancer_type).map_err(StoreError::from)?;
    let id = store.add(CANCER_TYPES, value).await?;

    info!("Registered cancer type {} as {id}", cancer_type.tipo_cancer);

    Ok(StoredCancerType { id, cancer_type })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use catalog::{Locations, Neoplasia, OutcomeItem, Outcomes, Sex, Symptom, Symptoms};
    use serde_json::json;

    use super::*;
    use crate::database::{MemoryStore, StoreResult};

    async fn seed_admins(store: &MemoryStore, ids: &[&str]) {
        for id in ids {
            store
                .set(
                    &DocumentRef::administrator(id),
                    json!({ "uid": id, "email": format!("{id}@example.com"), "name": id }),
                )
                .await
                .unwrap();
        }
    }

    fn symptoms(items: &[&str]) -> Vec<Symptom> {
        items.iter().map(|s| Symptom(s.to_string())).collect()
    }

    #[tokio::test]
    async fn test_fan_out_then_aggregate_has_no_duplicates() {
        let store = MemoryStore::default();
        seed_admins(&store, &["a1", "a2", "a3"]).await;
        let key = Combination::new(Sex::Homem, Neoplasia::Pulmao).unwrap().key();

        let report = save_list::<Symptoms>(
            &store,
            "a1",
            Scope::All,
            &key,
            symptoms(&["tosse", "hemoptise"]),
        )
        .await
        .unwrap();

        assert_eq!(report.documents_written, 3);
        assert_eq!(
            read_list::<Symptoms>(&store, &key).await.unwrap(),
            symptoms(&["tosse", "hemoptise"])
        );

        let stored = store
            .get(&DocumentRef::new("sinaisSintomas/a2/combinacoes", "homem_pulmão"))
            .await
            .unwrap();
        assert_eq!(stored, Some(json!({ "sintomas": ["tosse", "hemoptise"] })));
    }

    #[tokio::test]
    async fn test_own_scope_touches_only_author() {
        let store = MemoryStore::default();
        seed_admins(&store, &["a1", "a2"]).await;
        let key = "mulher_mama";

        save_list::<Symptoms>(&store, "a2", Scope::Own, key, symptoms(&["nódulo"]))
            .await
            .unwrap();

        assert!(read_own_list::<Symptoms>(&store, "a1", key).await.unwrap().is_empty());
        assert_eq!(
            read_own_list::<Symptoms>(&store, "a2", key).await.unwrap(),
            symptoms(&["nódulo"])
        );
    }

    #[tokio::test]
    async fn test_aggregate_concatenates_in_admin_order() {
        let store = MemoryStore::default();
        seed_admins(&store, &["b", "a"]).await;
        let key = "homem_colorretal";

        save_list::<Symptoms>(&store, "b", Scope::Own, key, symptoms(&["sangramento"]))
            .await
            .unwrap();
        save_list::<Symptoms>(&store, "a", Scope::Own, key, symptoms(&["anemia", "sangramento"]))
            .await
            .unwrap();

        assert_eq!(
            read_list::<Symptoms>(&store, key).await.unwrap(),
            symptoms(&["anemia", "sangramento"])
        );
    }

    #[tokio::test]
    async fn test_invalid_item_rejects_whole_save() {
        let store = MemoryStore::default();
        seed_admins(&store, &["a1"]).await;

        let result = save_list::<Symptoms>(
            &store,
            "a1",
            Scope::All,
            "homem_pulmão",
            symptoms(&["tosse", "  "]),
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(read_list::<Symptoms>(&store, "homem_pulmão").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_locations_merge_into_existing_document() {
        let store = MemoryStore::default();
        seed_admins(&store, &["a1"]).await;
        let doc = DocumentRef::new("marqueConsulta", "a1_mulher");
        store
            .set(&doc, json!({ "locais": [], "observacao": "manter" }))
            .await
            .unwrap();

        let local = catalog::ConsultationLocation {
            nome: "UBS Centro".into(),
            link: "https://maps.example.com/ubs".into(),
            telefone: "(11) 4000-0000".into(),
        };
        save_list::<Locations>(&store, "a1", Scope::All, "mulher", vec![local.clone()])
            .await
            .unwrap();

        let stored = store.get(&doc).await.unwrap().unwrap();
        assert_eq!(stored["observacao"], "manter");
        assert_eq!(
            read_list::<Locations>(&store, "mulher").await.unwrap(),
            vec![local]
        );
    }

    #[tokio::test]
    async fn test_missing_field_reads_as_empty() {
        let store = MemoryStore::default();
        seed_admins(&store, &["a1"]).await;
        store
            .set(
                &DocumentRef::new("condutaManejoResultado/a1/combinacoes", "homem_próstata"),
                json!({ "outro": 1 }),
            )
            .await
            .unwrap();

        let items: Vec<OutcomeItem> = read_list::<Outcomes>(&store, "homem_próstata")
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_list_is_reported() {
        let store = MemoryStore::default();
        seed_admins(&store, &["a1"]).await;
        store
            .set(
                &DocumentRef::new("sinaisSintomas/a1/combinacoes", "homem_pulmão"),
                json!({ "sintomas": "tosse" }),
            )
            .await
            .unwrap();

        let result = read_list::<Symptoms>(&store, "homem_pulmão").await;
        assert!(matches!(
            result,
            Err(AppError::Store(StoreError::Corrupt { .. }))
        ));
    }

    #[tokio::test]
    async fn test_indication_first_admin_wins() {
        let store = MemoryStore::default();
        seed_admins(&store, &["a1", "a2"]).await;
        let combination = Combination::new(Sex::Mulher, Neoplasia::ColoDeUtero).unwrap();

        assert_eq!(
            read_indication(&store, combination).await.unwrap().texto,
            ""
        );

        save_indication(&store, "a2", Scope::Own, combination, "a2 text".into())
            .await
            .unwrap();
        assert_eq!(
            read_indication(&store, combination).await.unwrap().texto,
            "a2 text"
        );

        save_indication(&store, "a1", Scope::Own, combination, "a1 text".into())
            .await
            .unwrap();
        assert_eq!(
            read_indication(&store, combination).await.unwrap().texto,
            "a1 text"
        );

        let stored = store
            .get(&DocumentRef::new("indicacoesRastreio", "a1_mulher_colo de útero"))
            .await
            .unwrap();
        assert_eq!(
            stored,
            Some(json!({ "sexo": "mulher", "neoplasia": "colo de útero", "texto": "a1 text" }))
        );
    }

    #[tokio::test]
    async fn test_cancer_types() {
        let store = MemoryStore::default();

        let blank = CancerType {
            tipo_cancer: " ".into(),
            calculo_de_risco: vec![],
        };
        assert!(add_cancer_type(&store, blank).await.is_err());

        let stored = add_cancer_type(
            &store,
            CancerType {
                tipo_cancer: "pulmão".into(),
                calculo_de_risco: vec!["maços-ano".into()],
            },
        )
        .await
        .unwrap();

        assert_eq!(list_cancer_types(&store).await.unwrap(), vec![stored]);
    }

    /// Fails every write to one administrator's documents.
    struct FlakyStore {
        inner: MemoryStore,
        failing_admin: &'static str,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
            self.inner.get(doc).await
        }

        async fn set(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);

            if doc.collection.contains(self.failing_admin) && doc.collection != ADMINISTRATORS {
                return Err(StoreError::NotAnObject(doc.to_string()));
            }

            self.inner.set(doc, value).await
        }

        async fn list_ids(&self, collection: &str) -> StoreResult<Vec<String>> {
            self.inner.list_ids(collection).await
        }

        async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
            self.inner.list(collection).await
        }
    }

    #[tokio::test]
    async fn test_partial_failure_continues_and_reports() {
        let inner = MemoryStore::default();
        seed_admins(&inner, &["a1", "a2", "a3"]).await;
        let store = FlakyStore {
            inner,
            failing_admin: "/a2/",
            writes: AtomicUsize::new(0),
        };

        let result = save_list::<Symptoms>(
            &store,
            "a1",
            Scope::All,
            "homem_pulmão",
            symptoms(&["tosse"]),
        )
        .await;

        match result {
            Err(AppError::PartialSave { failed }) => assert_eq!(failed, vec!["a2".to_string()]),
            other => panic!("expected partial save, got {other:?}"),
        }
        assert_eq!(store.writes.load(Ordering::SeqCst), 3);
        assert_eq!(
            read_own_list::<Symptoms>(&store, "a3", "homem_pulmão").await.unwrap(),
            symptoms(&["tosse"])
        );
    }
}
