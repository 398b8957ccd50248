use std::time::Duration;

use cutroom_config::settings::ApiSettings;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

/// Builder for the platform's `column=op.value` query predicates.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.clauses
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// `order=column.asc` / `order=column.desc`
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.clauses
            .push(("order".to_string(), format!("{column}.{dir}")));
        self
    }

    pub fn page(mut self, page: &Page) -> Self {
        let offset = (page.page.saturating_sub(1)) * page.per_page;
        self.clauses
            .push(("limit".to_string(), page.per_page.to_string()));
        self.clauses
            .push(("offset".to_string(), offset.to_string()));
        self
    }

    pub fn query_string(&self) -> String {
        self.clauses
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Thin client for the hosted platform's table CRUD and remote procedures.
/// All schemas are externally owned; row-level security on the platform side
/// is the real authority — this client only shapes requests.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    bearer: Option<String>,
}

impl StoreClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            bearer: None,
        })
    }

    /// Returns a client that authenticates as a signed-in account instead of
    /// the anonymous key.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        let token = self.bearer.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    fn table_url(&self, table: &str, filter: &Filter) -> String {
        let query = filter.query_string();
        if query.is_empty() {
            format!("{}/{}", self.base_url, table)
        } else {
            format!("{}/{}?{}", self.base_url, table, query)
        }
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, filter);
        debug!(%table, %url, "select");
        let resp = self.request(Method::GET, url).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<T, StoreError> {
        let mut rows = self.select::<T>(table, filter).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(rows.remove(0))
    }

    pub async fn insert<T, R>(&self, table: &str, row: &T) -> Result<R, StoreError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.table_url(table, &Filter::new());
        debug!(%table, "insert");
        let resp = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let mut rows: Vec<R> = check(resp).await?.json().await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(rows.remove(0))
    }

    pub async fn update<P, R>(
        &self,
        table: &str,
        filter: &Filter,
        patch: &P,
    ) -> Result<Vec<R>, StoreError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.table_url(table, filter);
        debug!(%table, "update");
        let resp = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let url = self.table_url(table, filter);
        debug!(%table, "delete");
        let resp = self.request(Method::DELETE, url).send().await?;
        check(resp).await?;
        Ok(())
    }

    /// Invokes a named server-side function with a JSON body. Used for the
    /// privileged operations that must bypass client-side access checks.
    pub async fn rpc<B, R>(&self, name: &str, body: &B) -> Result<R, StoreError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/rpc/{}", self.base_url, name);
        debug!(%name, "rpc");
        let resp = self.request(Method::POST, url).json(body).send().await?;
        Ok(check(resp).await?.json().await?)
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Denied(body),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Validation(body),
        _ => StoreError::Unexpected {
            status: status.as_u16(),
            body,
        },
    })
}
