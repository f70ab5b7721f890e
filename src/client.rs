//! `reqwest` implementation of [`RepositoryApi`] against the Islandora REST
//! module (`/islandora/rest/v1`).
//!
//! Every request carries `Accept: application/json` and the
//! `X-Authorization-User: {user}:{token}` header. Non-2xx answers become
//! [`ApiError::Status`] with the response body attached, so the core can log
//! the full request/response detail.

use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use rest_ingester_core::config::IngestConfig;
use rest_ingester_core::contract::{
    CreatedObject, DatastreamUpload, NewObject, ObjectState, Presence, RepositoryApi, UploadMode,
    UploadedDatastream,
};
use rest_ingester_core::relationship::Relationship;
use rest_ingester_core::ApiError;

/// `X-Authorization-User`; header names are case-insensitive.
pub const AUTH_HEADER: &str = "x-authorization-user";

/// Characters left alone when a PID or DSID is used as a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b':')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Form-style encoding (`urlencode`): only unreserved characters survive.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub struct RestClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RestClient {
    pub fn new(endpoint: &str, user: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&auth_header_value(user, token))
            .context("REST credentials contain characters not allowed in an HTTP header")?;
        auth.set_sensitive(true);
        headers.insert(HeaderName::from_static(AUTH_HEADER), auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        tracing::info!(endpoint = %endpoint, user = %user, "Initialized RestClient");
        Ok(RestClient {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::new(&config.endpoint, &config.user, &config.token)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn object_url(&self, pid: &str) -> String {
        format!("{}/object/{}", self.endpoint, path_segment(pid))
    }

    fn datastream_url(&self, pid: &str, dsid: &str) -> String {
        format!("{}/datastream/{}", self.object_url(pid), path_segment(dsid))
    }

    async fn send(&self, method: &Method, url: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        debug!(method = %method, url = %url, "Sending request");
        request.send().await.map_err(|e| ApiError::Transport {
            method: method.to_string(),
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Send and insist on a 2xx answer.
    async fn expect_success(
        &self,
        method: Method,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let response = self.send(&method, url, request).await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(&method, url, response).await)
    }

    async fn probe(&self, url: String) -> Result<Presence, ApiError> {
        let method = Method::GET;
        let response = self.send(&method, &url, self.http.get(&url)).await?;
        match response.status() {
            StatusCode::OK => Ok(Presence::Exists),
            StatusCode::NOT_FOUND => Ok(Presence::NotFound),
            _ => Err(status_error(&method, &url, response).await),
        }
    }
}

async fn status_error(method: &Method, url: &str, response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::Status {
        method: method.to_string(),
        url: url.to_string(),
        status,
        body,
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(url: &str, response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(|e| ApiError::MalformedResponse {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::MalformedResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

pub fn auth_header_value(user: &str, token: &str) -> String {
    format!("{user}:{token}")
}

pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Search-index query counting the issues already sequenced under `parent`.
pub fn issue_count_url(endpoint: &str, parent: &str) -> String {
    format!(
        "{}/solr/RELS_EXT_isMemberOf_uri_s:info%3Afedora/{}+AND+RELS_EXT_isSequenceNumber_literal_s%3A*?wt=json&fl=PID&rows=0",
        endpoint.trim_end_matches('/'),
        utf8_percent_encode(parent, QUERY_VALUE)
    )
}

#[derive(Debug, Deserialize)]
struct CreatedObjectBody {
    pid: String,
}

#[derive(Debug, Deserialize)]
struct DatastreamBody {
    #[serde(default)]
    dsid: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SolrBody {
    response: SolrResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolrResponse {
    num_found: u64,
}

#[async_trait]
impl RepositoryApi for RestClient {
    async fn probe_object(&self, pid: &str) -> Result<Presence, ApiError> {
        self.probe(self.object_url(pid)).await
    }

    async fn probe_datastream(&self, pid: &str, dsid: &str) -> Result<Presence, ApiError> {
        self.probe(format!("{}?content=false", self.datastream_url(pid, dsid)))
            .await
    }

    async fn create_object(&self, req: NewObject) -> Result<CreatedObject, ApiError> {
        let url = format!("{}/object", self.endpoint);
        let form = [
            ("namespace", req.namespace.as_str()),
            ("owner", req.owner.as_str()),
            ("label", req.label.as_str()),
        ];
        let response = self
            .expect_success(Method::POST, &url, self.http.post(&url).form(&form))
            .await?;
        let body: CreatedObjectBody = read_json(&url, response).await?;
        Ok(CreatedObject { pid: body.pid })
    }

    async fn update_object_state(&self, pid: &str, state: ObjectState) -> Result<(), ApiError> {
        let url = self.object_url(pid);
        let body = serde_json::json!({ "state": state.code() });
        self.expect_success(Method::PUT, &url, self.http.put(&url).json(&body))
            .await?;
        Ok(())
    }

    async fn add_relationship(&self, pid: &str, rel: &Relationship) -> Result<(), ApiError> {
        let url = format!("{}/relationship", self.object_url(pid));
        let form = [
            ("uri", rel.uri.as_str()),
            ("predicate", rel.predicate.as_str()),
            ("object", rel.object.as_str()),
            ("type", rel.kind.as_param()),
        ];
        self.expect_success(Method::POST, &url, self.http.post(&url).form(&form))
            .await?;
        Ok(())
    }

    async fn upload_datastream(&self, req: DatastreamUpload) -> Result<UploadedDatastream, ApiError> {
        let url = match req.mode {
            UploadMode::Create => format!("{}/datastream", self.object_url(&req.pid)),
            UploadMode::Replace => self.datastream_url(&req.pid, &req.dsid),
        };
        let mut form = Form::new()
            .part("file", Part::bytes(req.content).file_name(req.file_name))
            .text("dsid", req.dsid.clone())
            .text("checksumType", req.checksum_type.fedora_name());
        if req.mode == UploadMode::Replace {
            form = form.text("method", "PUT");
        }

        let response = self
            .expect_success(Method::POST, &url, self.http.post(&url).multipart(form))
            .await?;
        let body: DatastreamBody = read_json(&url, response).await?;
        Ok(UploadedDatastream {
            dsid: body.dsid.unwrap_or(req.dsid),
            checksum: body.checksum.filter(|c| !c.is_empty() && c != "none"),
        })
    }

    async fn fetch_datastream(&self, pid: &str, dsid: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.datastream_url(pid, dsid);
        let response = self
            .expect_success(Method::GET, &url, self.http.get(&url))
            .await?;
        let bytes = response.bytes().await.map_err(|e| ApiError::Transport {
            method: Method::GET.to_string(),
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn count_issues(&self, parent: &str) -> Result<u64, ApiError> {
        let url = issue_count_url(&self.endpoint, parent);
        let response = self
            .expect_success(Method::GET, &url, self.http.get(&url))
            .await?;
        let body: SolrBody = read_json(&url, response).await?;
        Ok(body.response.num_found)
    }
}
