// ABOUTME: Hetzner Cloud gateway over the REST v1 API using reqwest.
// ABOUTME: Machines are servers labelled `vs-machine=<name>`; power actions are async.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{
    ConsoleAccess, InstanceRecord, InstanceSpec, NAME_TAG, ProviderError, ProviderGateway,
};
use crate::types::{InstanceId, MachineName};

pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

const PAGE_SIZE: u32 = 50;

/// Client for the subset of the Hetzner Cloud API that manages servers.
#[derive(Clone)]
pub struct HetznerGateway {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    location: Option<String>,
}

impl HetznerGateway {
    pub fn new(endpoint: &str, token: impl Into<String>, location: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.into(),
            location,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    /// Send a request and map transport failures and non-success statuses.
    async fn send(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        subject: Option<&InstanceId>,
    ) -> Result<Response, ProviderError> {
        let resp = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{operation}: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(classify(status, operation, body, subject))
    }

    async fn decode<T: DeserializeOwned>(
        resp: Response,
        operation: &'static str,
    ) -> Result<T, ProviderError> {
        resp.json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("{operation}: {e}")))
    }

    fn server_path(id: &InstanceId) -> String {
        format!("/servers/{id}")
    }

    async fn action(
        &self,
        id: &InstanceId,
        action: &str,
        operation: &'static str,
    ) -> Result<Response, ProviderError> {
        let request = self
            .http
            .post(self.url(&format!("/servers/{id}/actions/{action}")));
        self.send(request, operation, Some(id)).await
    }
}

/// Map a non-success HTTP status to a provider error.
fn classify(
    status: StatusCode,
    operation: &'static str,
    body: String,
    subject: Option<&InstanceId>,
) -> ProviderError {
    match (status, subject) {
        (StatusCode::NOT_FOUND, Some(id)) => ProviderError::NotFound(id.clone()),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            ProviderError::Unavailable(format!("{operation}: authentication failed ({status})"))
        }
        (StatusCode::TOO_MANY_REQUESTS, _) => {
            ProviderError::Unavailable(format!("{operation}: rate limited"))
        }
        (s, _) if s.is_server_error() => {
            ProviderError::Unavailable(format!("{operation}: {status}: {body}"))
        }
        _ => ProviderError::Rejected {
            operation,
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl ProviderGateway for HetznerGateway {
    async fn list_instances(
        &self,
        name_tag: Option<&MachineName>,
    ) -> Result<Vec<InstanceRecord>, ProviderError> {
        let selector = name_tag.map(|name| format!("{NAME_TAG}={name}"));
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let mut query = vec![
                ("page", page.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
            ];
            if let Some(selector) = &selector {
                query.push(("label_selector", selector.clone()));
            }

            let request = self.http.get(self.url("/servers")).query(&query);
            let resp = self.send(request, "list servers", None).await?;
            let list: ServerList = Self::decode(resp, "list servers").await?;

            let (servers, next_page) = list.into_page();
            records.extend(servers);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        debug!(count = records.len(), selector = ?selector, "hetzner: listed servers");
        Ok(records)
    }

    async fn create_instance(&self, spec: &InstanceSpec) -> Result<InstanceId, ProviderError> {
        let labels = spec.provider_labels();
        let location = spec.location.as_deref().or(self.location.as_deref());
        let body = CreateServerRequest {
            name: spec.name.as_str(),
            server_type: &spec.instance_type,
            image: &spec.image,
            location,
            labels: &labels,
            ssh_keys: &spec.ssh_keys,
            user_data: spec.user_data.as_deref(),
            start_after_create: true,
        };

        let request = self.http.post(self.url("/servers")).json(&body);
        let resp = self.send(request, "create server", None).await?;
        let created: CreateServerResponse = Self::decode(resp, "create server").await?;

        let id = InstanceId::new(created.server.id.to_string());
        info!(server_id = %id, machine = %spec.name, "hetzner: server created");
        Ok(id)
    }

    async fn start_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        self.action(id, "poweron", "power on server").await?;
        info!(server_id = %id, "hetzner: power on requested");
        Ok(())
    }

    async fn stop_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        self.action(id, "shutdown", "shutdown server").await?;
        info!(server_id = %id, "hetzner: shutdown requested");
        Ok(())
    }

    async fn terminate_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        let request = self.http.delete(self.url(&Self::server_path(id)));
        self.send(request, "delete server", Some(id)).await?;
        info!(server_id = %id, "hetzner: delete requested");
        Ok(())
    }

    async fn request_console(&self, id: &InstanceId) -> Result<ConsoleAccess, ProviderError> {
        let resp = self
            .action(id, "request_console", "request console")
            .await?;
        let console: ConsoleResponse = Self::decode(resp, "request console").await?;
        Ok(ConsoleAccess {
            url: console.wss_url,
            password: console.password,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ServerList {
    servers: Vec<Server>,
    #[serde(default)]
    meta: Option<Meta>,
}

impl ServerList {
    fn next_page(&self) -> Option<u32> {
        self.meta
            .as_ref()
            .and_then(|m| m.pagination.as_ref())
            .and_then(|p| p.next_page)
    }

    /// This page's records and the number of the page after it.
    fn into_page(self) -> (Vec<InstanceRecord>, Option<u32>) {
        let next_page = self.next_page();
        let records = self.servers.into_iter().map(Server::into_record).collect();
        (records, next_page)
    }
}

#[derive(Debug, Deserialize)]
struct Meta {
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Server {
    id: i64,
    name: String,
    status: String,
    #[serde(default)]
    server_type: Option<ServerType>,
    #[serde(default)]
    public_net: Option<PublicNet>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl Server {
    fn into_record(self) -> InstanceRecord {
        let public_address = self
            .public_net
            .and_then(|net| net.ipv4)
            .map(|ipv4| ipv4.ip);

        InstanceRecord {
            id: InstanceId::new(self.id.to_string()),
            name: self.name,
            state: self.status,
            instance_type: self.server_type.map(|t| t.name),
            public_address,
            tags: self.labels,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServerType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PublicNet {
    ipv4: Option<Ipv4>,
}

#[derive(Debug, Deserialize)]
struct Ipv4 {
    ip: String,
}

#[derive(Debug, Serialize)]
struct CreateServerRequest<'a> {
    name: &'a str,
    server_type: &'a str,
    image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    labels: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "no_keys")]
    ssh_keys: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<&'a str>,
    start_after_create: bool,
}

fn no_keys(keys: &&[String]) -> bool {
    keys.is_empty()
}

#[derive(Debug, Deserialize)]
struct CreateServerResponse {
    server: Server,
}

#[derive(Debug, Deserialize)]
struct ConsoleResponse {
    wss_url: String,
    password: String,
}
