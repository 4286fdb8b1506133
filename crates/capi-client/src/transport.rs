//! JSON-over-HTTP POST transport.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

const USER_AGENT_VALUE: &str = concat!("capi-tools/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with a per-request timeout.
#[derive(Clone)]
pub struct JsonTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl JsonTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `body` as JSON to `url` and decode a JSON response.
    ///
    /// Any non-2xx status is an error carrying the response body.
    pub async fn post_json<Req, Resp>(&self, url: &str, body: &Req) -> ClientResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| ClientError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| ClientError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let exchange = async {
            let response = self.client.request(request).await.map_err(|e| ClientError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ClientError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
                .to_bytes();
            Ok::<_, ClientError>((status, bytes))
        };

        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            })??;

        debug!(%url, status = status.as_u16(), bytes = bytes.len(), "control plane response");

        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Join a base url and an endpoint path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
