//! # Rastreando Admin
//!
//! Command line client for the Rastreando HTTP API. Everything goes through
//! the server, so validation and fan-out behave exactly as they do for the SPA.
//!
//! ## Import bundles
//!
//! `import` takes a JSON array of entries:
//! ```json
//! [
//!   { "kind": "sinais-sintomas", "sexo": "homem", "neoplasia": "pulmao", "items": ["tosse"] },
//!   { "kind": "indicacoes-rastreio", "sexo": "mulher", "neoplasia": "mama", "texto": "..." },
//!   { "kind": "marque-consulta", "sexo": "mulher", "items": [{ "nome": "...", "link": "...", "telefone": "..." }] }
//! ]
//! ```
//! Every entry is checked locally before the first request goes out.
use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub mod models;
pub mod utils;

use models::{ErrorBody, NeoplasiaOption, PasswordReset, SaveReport, Session, SignIn, SignUp};
use utils::{content_path, entry_payload, parse_bundle, resolve_kind};

pub struct AdminClient {
    http: Client,
    server: Url,
}

impl AdminClient {
    /// `server` may carry a base path (`http://host/api`), API paths are
    /// resolved below it.
    pub fn new(server: &str) -> Result<Self> {
        let mut server =
            Url::parse(server).with_context(|| format!("Invalid server URL {server}"))?;

        if !server.path().ends_with('/') {
            let path = format!("{}/", server.path());
            server.set_path(&path);
        }

        Ok(Self {
            http: Client::new(),
            server,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.server.join(path.trim_start_matches('/'))?)
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            bail!("{status}: {message}");
        }

        if text.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        self.send(self.http.post(self.url(path)?).json(body)).await
    }

    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Value> {
        self.post(
            "/auth/sign-up",
            &SignUp {
                name,
                email,
                password,
            },
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.post("/auth/sign-in", &SignIn { email, password }).await
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        let _: Value = self
            .post("/auth/password-reset", &PasswordReset { email })
            .await?;

        Ok(())
    }

    pub async fn neoplasias(&self, sexo: &str) -> Result<Vec<NeoplasiaOption>> {
        let url = self.url("/neoplasias")?;

        self.send(self.http.get(url).query(&[("sexo", sexo)])).await
    }

    pub async fn show(&self, kind: &str, sexo: &str, neoplasia: Option<&str>) -> Result<Value> {
        let path = content_path(resolve_kind(kind)?, sexo, neoplasia)?;

        self.send(self.http.get(self.url(&path)?)).await
    }

    pub async fn save(&self, token: &str, path: &str, body: &Value) -> Result<SaveReport> {
        let request = self
            .http
            .put(self.url(path)?)
            .bearer_auth(token)
            .json(body);

        self.send(request).await
    }
}

/// Saves every entry of `bundle`, returning the number of documents written.
pub async fn import(client: &AdminClient, token: &str, bundle: &str) -> Result<usize> {
    let entries = parse_bundle(bundle)?;

    let mut requests = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let prepared = resolve_kind(&entry.kind).and_then(|kind| {
            let path = content_path(kind, &entry.sexo, entry.neoplasia.as_deref())?;
            Ok((path, entry_payload(kind, entry)?))
        });

        requests.push(prepared.with_context(|| format!("Entry {index}"))?);
    }

    println!("Loaded Entries: {}\n", requests.len());

    let pb = ProgressBar::new(requests.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut written = 0;

    for (path, body) in &requests {
        pb.set_message(path.clone());

        let report = client
            .save(token, path, body)
            .await
            .with_context(|| format!("Saving {path}"))?;
        written += report.documents_written;

        pb.inc(1);
    }

    pb.finish_with_message("Done");

    Ok(written)
}
