// src/exchange/transport.rs
use crate::domain::errors::{ExchangeError, ExchangeResult};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use hyper_tls::HttpsConnector;
use std::time::Duration;

/// A fully prepared outbound request. The body is the exact text sent on the
/// wire, so anything signed over it matches what the server receives.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON, whatever the status
    pub fn json(&self) -> ExchangeResult<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            ExchangeError::InvalidResponse(format!("Body is not JSON ({}): {}", e, self.body))
        })
    }

    /// Parse a successful JSON body, surfacing remote failures as errors.
    /// A `message` field in place of the expected payload counts as a failure.
    pub fn into_json(self) -> ExchangeResult<serde_json::Value> {
        if !self.is_success() {
            return Err(ExchangeError::Api {
                status: self.status,
                body: self.body,
            });
        }

        let value = self.json()?;
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return Err(ExchangeError::Remote(message.to_string()));
        }
        Ok(value)
    }
}

/// Sends HTTP requests on behalf of the API clients
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ExchangeResult<HttpResponse>;
}

/// Transport backed by a pooled hyper client with TLS
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>>,
    timeout: Duration,
}

impl HyperTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().build::<_, Body>(HttpsConnector::new());
        Self { client, timeout }
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: HttpRequest) -> ExchangeResult<HttpResponse> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(&request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = match request.body {
            Some(text) => Body::from(text),
            None => Body::empty(),
        };

        let req = builder
            .body(body)
            .map_err(|e| ExchangeError::Request(format!("Failed to build request: {}", e)))?;

        log::debug!("{} {}", request.method, request.url);

        let exchange = async {
            let response = self
                .client
                .request(req)
                .await
                .map_err(|e| ExchangeError::Connection(e.to_string()))?;

            let status = response.status().as_u16();
            let bytes = hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|e| ExchangeError::Connection(format!("Failed to read body: {}", e)))?;

            Ok::<_, ExchangeError>(HttpResponse {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ExchangeError::Timeout(request.url.clone()))?
    }
}
