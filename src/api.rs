// API client module: a small blocking HTTP client for the Yatai registry,
// and a second one for the object storage behind presigned upload URLs.
//
// The push workflow only sees the `Registry` and `ObjectStorage` traits so
// it can be driven against in-memory fakes.

use crate::error::{CliError, Result};
use crate::schemas::{
    Bento, BentoVersion, CreateBento, CreateBentoVersion, FinishUploadBentoVersion,
    OrganizationList, User,
};
use reqwest::blocking::{Body, Client, ClientBuilder, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Header carrying the user's API token on every registry call.
pub const API_TOKEN_HEADER: &str = "x-yatai-api-token";

/// Registry calls the push workflow depends on.
pub trait Registry {
    /// `Ok(None)` when the registry reports the bento does not exist.
    fn get_bento(&self, org: &str, bento: &str) -> Result<Option<Bento>>;

    fn create_bento(&self, org: &str, req: &CreateBento) -> Result<Bento>;

    /// `Ok(None)` when the registry reports the version does not exist.
    fn get_bento_version(&self, org: &str, bento: &str, version: &str)
        -> Result<Option<BentoVersion>>;

    fn create_bento_version(
        &self,
        org: &str,
        bento: &str,
        req: &CreateBentoVersion,
    ) -> Result<BentoVersion>;

    /// Returns the version with `presigned_s3_url` populated.
    fn presign_bento_version_upload_url(
        &self,
        org: &str,
        bento: &str,
        version: &str,
    ) -> Result<BentoVersion>;

    fn start_upload_bento_version(&self, org: &str, bento: &str, version: &str)
        -> Result<BentoVersion>;

    fn finish_upload_bento_version(
        &self,
        org: &str,
        bento: &str,
        version: &str,
        req: &FinishUploadBentoVersion,
    ) -> Result<BentoVersion>;
}

/// Status and body of a storage response, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageResponse {
    pub status: u16,
    pub body: String,
}

impl StorageResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Direct-to-storage upload through a presigned URL.
pub trait ObjectStorage {
    /// PUTs `len` bytes read from `body`. `Err` only for transport failures;
    /// any HTTP response, including non-2xx, comes back as `Ok`.
    fn put(&self, url: &str, body: Box<dyn Read + Send>, len: u64) -> Result<StorageResponse>;
}

/// The registry answers a missing record either with 404 or with a 400
/// carrying the ORM's "record not found" message.
pub fn is_not_found(status: u16, body: &str) -> bool {
    status == 404 || (status == 400 && body.contains("record not found"))
}

/// Blocking registry client bound to one endpoint and API token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client for `endpoint` (e.g. `https://yatai.example.com`).
    /// The token goes into the default headers of every request.
    pub fn new(endpoint: &str, api_token: &str) -> Result<Self> {
        Self::with_builder(Client::builder(), endpoint, api_token)
    }

    fn with_builder(builder: ClientBuilder, endpoint: &str, api_token: &str) -> Result<Self> {
        let base_url = Url::parse(endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                CliError::Input(format!("invalid yatai endpoint {endpoint}, like https://yatai.io"))
            })?;

        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(api_token)
            .map_err(|_| CliError::Input("api token contains invalid characters".into()))?;
        headers.insert(HeaderName::from_static(API_TOKEN_HEADER), token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = builder.default_headers(headers).build()?;
        Ok(ApiClient { client, base_url })
    }

    /// `{endpoint}/api/v1/{segments..}`, each segment percent-encoded so a
    /// name or version can never leak into another path component.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CliError::Input(format!("invalid yatai endpoint {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn bento_url(&self, org: &str, bento: &str, tail: &[&str]) -> Result<Url> {
        let mut segments = vec!["orgs", org, "bentos", bento];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    fn execute(req: RequestBuilder) -> Result<(u16, String)> {
        let res = req.send()?;
        let status = res.status().as_u16();
        let body = res.text()?;
        debug!(status, "registry response");
        Ok((status, body))
    }

    /// Send and decode a 2xx JSON response; any other status is a
    /// `CliError::Request` carrying the body verbatim.
    fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let (status, body) = Self::execute(req)?;
        if !(200..300).contains(&status) {
            return Err(CliError::Request { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Like `send`, but a not-found answer becomes `Ok(None)`.
    fn lookup<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>> {
        let (status, body) = Self::execute(req)?;
        if is_not_found(status, &body) {
            return Ok(None);
        }
        if !(200..300).contains(&status) {
            return Err(CliError::Request { status, body });
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Returns `None` when the token does not map to a user.
    pub fn get_current_user(&self) -> Result<Option<User>> {
        let url = self.url(&["auth", "current"])?;
        debug!(%url, "fetching current user");
        self.lookup(self.client.get(url))
    }

    pub fn list_organizations(&self, start: u64, count: u64) -> Result<OrganizationList> {
        let url = self.url(&["orgs"])?;
        debug!(%url, start, count, "listing organizations");
        self.send(self.client.get(url).query(&[("start", start), ("count", count)]))
    }
}

impl Registry for ApiClient {
    fn get_bento(&self, org: &str, bento: &str) -> Result<Option<Bento>> {
        let url = self.bento_url(org, bento, &[])?;
        debug!(%url, "fetching bento");
        self.lookup(self.client.get(url))
    }

    fn create_bento(&self, org: &str, req: &CreateBento) -> Result<Bento> {
        let url = self.url(&["orgs", org, "bentos"])?;
        debug!(%url, bento = %req.name, "creating bento");
        self.send(self.client.post(url).json(req))
    }

    fn get_bento_version(
        &self,
        org: &str,
        bento: &str,
        version: &str,
    ) -> Result<Option<BentoVersion>> {
        let url = self.bento_url(org, bento, &["versions", version])?;
        debug!(%url, "fetching bento version");
        self.lookup(self.client.get(url))
    }

    fn create_bento_version(
        &self,
        org: &str,
        bento: &str,
        req: &CreateBentoVersion,
    ) -> Result<BentoVersion> {
        let url = self.bento_url(org, bento, &["versions"])?;
        debug!(%url, version = %req.version, "creating bento version");
        self.send(self.client.post(url).json(req))
    }

    fn presign_bento_version_upload_url(
        &self,
        org: &str,
        bento: &str,
        version: &str,
    ) -> Result<BentoVersion> {
        let url = self.bento_url(org, bento, &["versions", version, "presign_s3_upload_url"])?;
        debug!(%url, "presigning upload url");
        self.send(self.client.patch(url))
    }

    fn start_upload_bento_version(
        &self,
        org: &str,
        bento: &str,
        version: &str,
    ) -> Result<BentoVersion> {
        let url = self.bento_url(org, bento, &["versions", version, "start_upload"])?;
        debug!(%url, "starting upload");
        self.send(self.client.patch(url))
    }

    fn finish_upload_bento_version(
        &self,
        org: &str,
        bento: &str,
        version: &str,
        req: &FinishUploadBentoVersion,
    ) -> Result<BentoVersion> {
        let url = self.bento_url(org, bento, &["versions", version, "finish_upload"])?;
        debug!(%url, status = ?req.status, "finishing upload");
        self.send(self.client.patch(url).json(req))
    }
}

/// Object storage client for presigned URLs. It sends no registry headers
/// and sets no total timeout, so large archives are not cut off mid-upload.
#[derive(Clone)]
pub struct HttpStorage {
    client: Client,
}

impl HttpStorage {
    pub fn new() -> Result<Self> {
        Self::with_builder(Client::builder())
    }

    fn with_builder(builder: ClientBuilder) -> Result<Self> {
        let client = builder.timeout(None::<Duration>).build()?;
        Ok(HttpStorage { client })
    }
}

impl ObjectStorage for HttpStorage {
    fn put(&self, url: &str, body: Box<dyn Read + Send>, len: u64) -> Result<StorageResponse> {
        let res = self.client.put(url).body(Body::sized(body, len)).send()?;
        let status = res.status().as_u16();
        let body = res.text()?;
        debug!(status, "storage response");
        Ok(StorageResponse { status, body })
    }
}
