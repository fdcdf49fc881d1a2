use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SERVER: &str = "http://localhost:5000";

/// One entry of an import bundle.
///
/// `items` is sent for list content, `texto` for screening indications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entry {
    pub kind: String,
    pub sexo: String,
    #[serde(default)]
    pub neoplasia: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<Value>>,
    #[serde(default)]
    pub texto: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignUp<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignIn<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PasswordReset<'a> {
    pub email: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id_token: String,
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub documents_written: usize,
}

#[derive(Debug, Deserialize)]
pub struct NeoplasiaOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
