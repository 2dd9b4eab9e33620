use std::sync::RwLock;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::api::{BranchApi, NetBoxApi};
use crate::branch::{BRANCH_HEADER, BRANCHES_ENDPOINT, BranchScope, MergeRequest, NewBranch};
use crate::error::ClientError;

const API_PATH: &str = "api";

/// Connection settings for one NetBox instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// e.g. `https://netbox.example.com`; a trailing slash is ignored.
    pub base_url: String,
    pub token: String,
    pub verify_ssl: bool,
    /// Branch schema id to scope requests to from the start.
    pub branch: Option<String>,
}

/// REST implementation of [`NetBoxApi`] and [`BranchApi`].
#[derive(Debug)]
pub struct NetBoxRestClient {
    base_url: String,
    api_url: String,
    http: reqwest::Client,
    branch: RwLock<Option<String>>,
}

impl NetBoxRestClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let mut auth = HeaderValue::from_str(&format!("Token {}", config.token))
            .map_err(|_| ClientError::InvalidToken)?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(ClientError::Build)?;

        let api_url = format!("{base_url}/{API_PATH}");
        Ok(Self {
            base_url,
            api_url,
            http,
            branch: RwLock::new(config.branch.filter(|b| !b.is_empty())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn build_url(&self, endpoint: &str, id: Option<u64>) -> String {
        let endpoint = endpoint.trim_matches('/');
        match id {
            Some(id) => format!("{}/{endpoint}/{id}/", self.api_url),
            None => format!("{}/{endpoint}/", self.api_url),
        }
    }

    fn resolve_branch(&self, scope: BranchScope) -> Option<String> {
        match scope {
            BranchScope::Session => self.active_branch(),
            BranchScope::Main => None,
        }
    }

    /// Issues one request and turns any non-2xx answer into
    /// [`ClientError::RequestFailure`].
    async fn send<B>(
        &self,
        method: Method,
        url: &str,
        scope: BranchScope,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let branch = self.resolve_branch(scope);
        tracing::debug!(
            method = %method,
            url = %url,
            branch = branch.as_deref().unwrap_or("main"),
            "netbox request"
        );

        let mut request = self.http.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(branch) = &branch {
            request = request.header(BRANCH_HEADER, branch);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), url = %url, "netbox request failed");
            return Err(ClientError::RequestFailure {
                status: status.as_u16(),
                method: method.to_string(),
                url: url.to_string(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<B>(
        &self,
        method: Method,
        url: &str,
        scope: BranchScope,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<Value, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = self.send(method, url, scope, query, body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch(
        &self,
        scope: BranchScope,
        endpoint: &str,
        id: Option<u64>,
        params: &[(String, String)],
    ) -> Result<Value, ClientError> {
        let url = self.build_url(endpoint, id);
        let data = self
            .send_json(Method::GET, &url, scope, params, None::<&Value>)
            .await?;
        Ok(unwrap_page(data, id))
    }

    async fn remove(
        &self,
        scope: BranchScope,
        endpoint: &str,
        id: u64,
    ) -> Result<bool, ClientError> {
        let url = self.build_url(endpoint, Some(id));
        let response = self
            .send(Method::DELETE, &url, scope, &[], None::<&Value>)
            .await?;
        Ok(response.status() == StatusCode::NO_CONTENT)
    }
}

/// Collection reads may come back as `{count, next, previous, results}`;
/// only the first page's `results` is returned.
fn unwrap_page(data: Value, id: Option<u64>) -> Value {
    match data {
        Value::Object(mut page) if id.is_none() && page.contains_key("results") => {
            page.remove("results").unwrap_or(Value::Null)
        }
        other => other,
    }
}

impl NetBoxApi for NetBoxRestClient {
    async fn get(
        &self,
        endpoint: &str,
        id: Option<u64>,
        params: &[(String, String)],
    ) -> Result<Value, ClientError> {
        self.fetch(BranchScope::Session, endpoint, id, params).await
    }

    async fn create(&self, endpoint: &str, data: &Value) -> Result<Value, ClientError> {
        let url = self.build_url(endpoint, None);
        self.send_json(Method::POST, &url, BranchScope::Session, &[], Some(data))
            .await
    }

    async fn update(&self, endpoint: &str, id: u64, data: &Value) -> Result<Value, ClientError> {
        let url = self.build_url(endpoint, Some(id));
        self.send_json(Method::PATCH, &url, BranchScope::Session, &[], Some(data))
            .await
    }

    async fn delete(&self, endpoint: &str, id: u64) -> Result<bool, ClientError> {
        self.remove(BranchScope::Session, endpoint, id).await
    }

    async fn bulk_create(&self, endpoint: &str, records: &[Value]) -> Result<Value, ClientError> {
        let url = format!("{}bulk/", self.build_url(endpoint, None));
        self.send_json(Method::POST, &url, BranchScope::Session, &[], Some(records))
            .await
    }

    async fn bulk_update(&self, endpoint: &str, records: &[Value]) -> Result<Value, ClientError> {
        let url = format!("{}bulk/", self.build_url(endpoint, None));
        self.send_json(Method::PATCH, &url, BranchScope::Session, &[], Some(records))
            .await
    }

    async fn bulk_delete(&self, endpoint: &str, ids: &[u64]) -> Result<bool, ClientError> {
        let url = format!("{}bulk/delete/", self.build_url(endpoint, None));
        let body = json!({ "id": ids });
        self.send(Method::POST, &url, BranchScope::Session, &[], Some(&body))
            .await?;
        Ok(true)
    }
}

impl BranchApi for NetBoxRestClient {
    fn active_branch(&self) -> Option<String> {
        self.branch
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_branch(&self, branch: Option<&str>) {
        let next = branch.filter(|b| !b.is_empty()).map(str::to_string);
        tracing::info!(branch = next.as_deref().unwrap_or("main"), "active branch changed");
        *self.branch.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    async fn list_branches(&self) -> Result<Value, ClientError> {
        self.fetch(BranchScope::Main, BRANCHES_ENDPOINT, None, &[])
            .await
    }

    async fn get_branch(&self, id: u64) -> Result<Value, ClientError> {
        self.fetch(BranchScope::Main, BRANCHES_ENDPOINT, Some(id), &[])
            .await
    }

    async fn create_branch(&self, branch: &NewBranch) -> Result<Value, ClientError> {
        let url = self.build_url(BRANCHES_ENDPOINT, None);
        self.send_json(Method::POST, &url, BranchScope::Main, &[], Some(branch))
            .await
    }

    async fn update_branch(&self, id: u64, data: &Value) -> Result<Value, ClientError> {
        let url = self.build_url(BRANCHES_ENDPOINT, Some(id));
        self.send_json(Method::PATCH, &url, BranchScope::Main, &[], Some(data))
            .await
    }

    async fn delete_branch(&self, id: u64) -> Result<bool, ClientError> {
        self.remove(BranchScope::Main, BRANCHES_ENDPOINT, id).await
    }

    async fn merge_branch(
        &self,
        id: u64,
        target_branch: Option<&str>,
    ) -> Result<Value, ClientError> {
        let url = self.build_url(&format!("{BRANCHES_ENDPOINT}/{id}/merge"), None);
        let body = MergeRequest::new(target_branch);
        self.send_json(Method::POST, &url, BranchScope::Main, &[], Some(&body))
            .await
    }
}
