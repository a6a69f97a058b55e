use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};

use crate::error::{AppError, AppResult, HttpError};

use super::source::{HttpMethod, RequestDescription};

const USER_AGENT: &str = concat!("loadpace/", env!("CARGO_PKG_VERSION"));

/// Issues one request and reports the response status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescription) -> Result<u16, HttpError>;
}

/// Builds the transport for a run once its request timeout is known.
pub trait TransportFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the transport cannot be set up.
    fn build(&self, timeout: Option<Duration>) -> AppResult<Arc<dyn Transport>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransportFactory;

impl TransportFactory for ReqwestTransportFactory {
    fn build(&self, timeout: Option<Duration>) -> AppResult<Arc<dyn Transport>> {
        Ok(Arc::new(ReqwestTransport::new(timeout)?))
    }
}

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds the client. `timeout` bounds every request when set.
    ///
    /// # Errors
    ///
    /// Returns an error when the client cannot be constructed.
    pub fn new(timeout: Option<Duration>) -> AppResult<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))?;
        Ok(Self { client })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn map_request_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout
    } else {
        HttpError::RequestFailed { source: err }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescription) -> Result<u16, HttpError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.as_str());
        if let Some(body) = request.body.as_ref() {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await.map_err(map_request_error)?;
        let status = response.status().as_u16();
        response.bytes().await.map_err(map_request_error)?;
        Ok(status)
    }
}
