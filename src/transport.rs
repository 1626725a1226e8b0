//! Signed HTTP transport
//!
//! Owns the `reqwest` client and the [`Signer`]. Every outgoing request is
//! signed, sent, and its response normalized: success bodies come back parsed
//! (JSON) or raw, failures of any kind surface through the crate error type.

use crate::error::{Error, Result};
use crate::signer::{Credentials, RequestDescriptor, Signer};
use futures::StreamExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Connection establishment timeout; downloads themselves are unbounded
/// because export archives can be large
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// A successful response body
#[derive(Debug)]
pub enum ResponseBody {
    /// Body parsed as JSON (content-type indicated JSON)
    Json(serde_json::Value),
    /// Raw body bytes for everything else
    Raw(Vec<u8>),
}

impl ResponseBody {
    /// Deserialize the body into a typed value
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            ResponseBody::Json(value) => Ok(serde_json::from_value(value)?),
            ResponseBody::Raw(bytes) => Ok(serde_json::from_slice(&bytes)?),
        }
    }
}

/// Issues signed requests against a single service endpoint
#[derive(Debug)]
pub struct Transport {
    client: reqwest::Client,
    signer: Signer,
    base_url: String,
    host: String,
}

impl Transport {
    /// Create a transport for `base_url` (scheme included), signing with
    /// `credentials`
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| Error::config_key(format!("invalid endpoint '{base_url}': {e}"), "domain"))?;
        let host_str = parsed
            .host_str()
            .ok_or_else(|| Error::config_key(format!("endpoint '{base_url}' has no host"), "domain"))?;
        let host = match parsed.port() {
            Some(port) => format!("{host_str}:{port}"),
            None => host_str.to_string(),
        };

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            signer: Signer::new(credentials),
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
        })
    }

    /// Send a signed request and normalize the response
    ///
    /// Status < 300 resolves to [`ResponseBody::Json`] when the content type
    /// indicates JSON, otherwise [`ResponseBody::Raw`]. Status >= 300 fails
    /// with [`Error::Api`], carrying `status`/`title`/`detail` when the
    /// service returned a structured body.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ResponseBody> {
        let response = self.dispatch(method, path, body).await?;
        let response = Self::check_status(response).await?;

        let is_json = content_type_is_json(&response);
        let bytes = response.bytes().await?;
        if is_json {
            Ok(ResponseBody::Json(serde_json::from_slice(&bytes)?))
        } else {
            Ok(ResponseBody::Raw(bytes.to_vec()))
        }
    }

    /// Send a signed GET and stream the response body to `dest`
    ///
    /// The destination file is created or overwritten. Bytes are written as
    /// they arrive rather than buffered; on a mid-stream error the partial
    /// file is flushed before the error is returned. Resolves to the number
    /// of bytes written.
    pub async fn send_to_file(&self, path: &str, dest: &Path) -> Result<u64> {
        let response = self.dispatch(Method::GET, path, None).await?;
        let response = Self::check_status(response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    file.flush().await.ok();
                    return Err(Error::Network(e));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                file.flush().await.ok();
                return Err(Error::Io(e));
            }
            written += chunk.len() as u64;
        }

        file.flush().await?;
        tracing::debug!(dest = %dest.display(), bytes = written, "download complete");
        Ok(written)
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response> {
        let mut descriptor = RequestDescriptor::new(method, self.host.clone(), path);
        if let Some(body) = body {
            descriptor = descriptor.with_body(body);
        }
        self.signer.sign(&mut descriptor)?;

        let url = format!("{}{}", self.base_url, descriptor.path());
        tracing::debug!(method = %descriptor.method(), %url, "sending request");

        let mut builder = self.client.request(descriptor.method().clone(), &url);
        for (name, value) in descriptor.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = descriptor.body() {
            builder = builder.body(body.to_vec());
        }
        Ok(builder.send().await?)
    }

    /// Map any status >= 300 to [`Error::Api`]
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.as_u16() < 300 {
            return Ok(response);
        }

        let canonical = status
            .canonical_reason()
            .unwrap_or("unrecognized status")
            .to_string();

        if content_type_is_json(&response) {
            if let Ok(body) = response.json::<serde_json::Value>().await {
                let title = body
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&canonical)
                    .to_string();
                let detail = body
                    .get("detail")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                return Err(Error::Api {
                    status: status.as_u16(),
                    title,
                    detail,
                });
            }
        }

        Err(Error::Api {
            status: status.as_u16(),
            title: canonical,
            detail: None,
        })
    }
}

fn content_type_is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"))
}
