use std::future::Future;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::bulk::CONTENT_TYPE;
use crate::config::{self, ConfigError, Credentials, EmitterOptions};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One bulk POST.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub url: Url,
    pub body: Bytes,
    pub credentials: Option<Credentials>,
}

/// Sends bulk requests to the log store.
///
/// `Ok` carries whatever status the server answered with, success or not.
/// `Err` means no response was obtained (connect failure, timeout, protocol
/// error).
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: BulkRequest,
    ) -> impl Future<Output = Result<StatusCode, TransportError>> + Send + '_;
}

pub struct HttpTransport {
    client: Client,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(options: &EmitterOptions) -> Result<Self, TransportError> {
        let headers = config::header_map(&options.export_headers)?;
        install_crypto_provider();

        let mut builder = Client::builder();
        if let Some(timeout) = options.export_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            headers,
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: BulkRequest) -> Result<StatusCode, TransportError> {
        let mut req = self
            .client
            .post(request.url)
            .header("content-type", CONTENT_TYPE);

        if let Some(creds) = &request.credentials {
            req = req.basic_auth(&creds.username, creds.password.as_ref());
        }

        if !self.headers.is_empty() {
            req = req.headers(self.headers.clone());
        }

        let resp = req.body(request.body).send().await?;
        Ok(resp.status())
    }
}

/// Install the ring provider for rustls unless the process already has one.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
