// nft-ui REST client
//
// Wraps `reqwest::Client` with `/api/v1` URL construction, optional basic
// auth, and failure normalization. Every failing response becomes an
// `Error` whose message is the service's `error` field when present.

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{
    AddForwardingRequest, AddPortRequest, AddQuotaRequest, ApiResponse, BatchResetRequest,
    EditForwardingRequest, ForwardingResponse, ModifyQuotaRequest, QuotasResponse,
};
use crate::transport::TransportConfig;

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// HTTP basic-auth credentials sent with every request.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

/// Raw HTTP client for the nft-ui service.
///
/// Methods map one-to-one onto service routes. Write methods discard the
/// `{success, message}` acknowledgement; reads return the decoded body.
pub struct NftClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<BasicAuth>,
}

impl NftClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the service root (e.g. `http://10.0.0.1:8080`); the
    /// `/api/v1` prefix is appended per request.
    pub fn new(
        base_url: Url,
        credentials: Option<BasicAuth>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, credentials)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Option<BasicAuth>,
    ) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Quotas ───────────────────────────────────────────────────────

    /// `GET /quotas`: quotas, allowed ports, and the service's UI settings.
    pub async fn list_quotas(&self) -> Result<QuotasResponse, Error> {
        let url = self.api_url(&["quotas"])?;
        self.fetch(Method::GET, url).await
    }

    /// `POST /quotas/{id}/reset`: zero the usage counter of one quota.
    pub async fn reset_quota(&self, id: &str) -> Result<(), Error> {
        let url = self.api_url(&["quotas", id, "reset"])?;
        self.write(Method::POST, url, None::<&()>).await
    }

    /// `POST /quotas/batch-reset`: zero several quotas in one call.
    pub async fn batch_reset_quotas(&self, ids: &[String]) -> Result<(), Error> {
        let url = self.api_url(&["quotas", "batch-reset"])?;
        self.write(Method::POST, url, Some(&BatchResetRequest { ids }))
            .await
    }

    /// `PUT /quotas/{id}`: change the quota ceiling.
    pub async fn modify_quota(&self, id: &str, bytes: u64) -> Result<(), Error> {
        let url = self.api_url(&["quotas", id])?;
        self.write(Method::PUT, url, Some(&ModifyQuotaRequest { bytes }))
            .await
    }

    /// `POST /quotas`: create a quota for a port.
    pub async fn add_quota(&self, port: u16, bytes: u64, comment: &str) -> Result<(), Error> {
        let url = self.api_url(&["quotas"])?;
        let body = AddQuotaRequest {
            port,
            bytes,
            comment,
        };
        self.write(Method::POST, url, Some(&body)).await
    }

    /// `DELETE /quotas/{id}`.
    pub async fn delete_quota(&self, id: &str) -> Result<(), Error> {
        let url = self.api_url(&["quotas", id])?;
        self.write(Method::DELETE, url, None::<&()>).await
    }

    // ── Allowed ports ────────────────────────────────────────────────

    /// `POST /ports`: allow an inbound port.
    pub async fn add_port(&self, port: u16) -> Result<(), Error> {
        let url = self.api_url(&["ports"])?;
        self.write(Method::POST, url, Some(&AddPortRequest { port }))
            .await
    }

    /// `DELETE /ports/{handle}`.
    pub async fn delete_port(&self, handle: i64) -> Result<(), Error> {
        let handle = handle.to_string();
        let url = self.api_url(&["ports", &handle])?;
        self.write(Method::DELETE, url, None::<&()>).await
    }

    // ── Forwarding ───────────────────────────────────────────────────

    /// `GET /forwarding`: enabled and disabled forwarding rules.
    pub async fn list_forwarding(&self) -> Result<ForwardingResponse, Error> {
        let url = self.api_url(&["forwarding"])?;
        self.fetch(Method::GET, url).await
    }

    /// `POST /forwarding`.
    pub async fn add_forwarding(&self, req: &AddForwardingRequest) -> Result<(), Error> {
        let url = self.api_url(&["forwarding"])?;
        self.write(Method::POST, url, Some(req)).await
    }

    /// `PUT /forwarding/{id}`.
    pub async fn edit_forwarding(&self, id: &str, req: &EditForwardingRequest) -> Result<(), Error> {
        let url = self.api_url(&["forwarding", id])?;
        self.write(Method::PUT, url, Some(req)).await
    }

    /// `DELETE /forwarding/{id}`.
    pub async fn delete_forwarding(&self, id: &str) -> Result<(), Error> {
        let url = self.api_url(&["forwarding", id])?;
        self.write(Method::DELETE, url, None::<&()>).await
    }

    /// `POST /forwarding/{id}/enable`.
    pub async fn enable_forwarding(&self, id: &str) -> Result<(), Error> {
        let url = self.api_url(&["forwarding", id, "enable"])?;
        self.write(Method::POST, url, None::<&()>).await
    }

    /// `POST /forwarding/{id}/disable`.
    pub async fn disable_forwarding(&self, id: &str) -> Result<(), Error> {
        let url = self.api_url(&["forwarding", id, "disable"])?;
        self.write(Method::POST, url, None::<&()>).await
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build `{base}/api/v1/{segments...}`, percent-encoding each segment.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and decode the JSON body as `T`.
    async fn fetch<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T, Error> {
        let body = self.execute(method, url, None::<&()>).await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    /// Send a write request; the acknowledgement body is only checked for errors.
    async fn write<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<(), Error> {
        self.execute(method, url, body).await.map(drop)
    }

    async fn execute<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String, Error> {
        debug!("{method} {url}");

        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = self.authorize(builder).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        trace!(%status, len = body.len(), "response received");

        normalize(status, body)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(auth) => builder.basic_auth(&auth.username, Some(auth.password.expose_secret())),
            None => builder,
        }
    }
}

/// Turn a raw response into the body on success or a normalized `Error`.
///
/// Failure is either a non-2xx status or a 2xx body carrying an `error`
/// field without `success: true`.
fn normalize(status: StatusCode, body: String) -> Result<String, Error> {
    let envelope = serde_json::from_str::<ApiResponse>(&body).unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: envelope
                .error
                .unwrap_or_else(|| "invalid credentials".into()),
        });
    }

    if !status.is_success() {
        return Err(Error::Api {
            message: envelope
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            status: status.as_u16(),
        });
    }

    if let Some(message) = envelope.error {
        if envelope.success != Some(true) {
            return Err(Error::Api {
                message,
                status: status.as_u16(),
            });
        }
    }

    Ok(body)
}
