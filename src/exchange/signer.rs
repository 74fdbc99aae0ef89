// src/exchange/signer.rs
use crate::config::Credentials;
use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::exchange::transport::HttpRequest;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use hyper::{Method, Uri};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-ACCESS-SIGNATURE";
pub const TIMESTAMP_HEADER: &str = "X-ACCESS-TIMESTAMP";
pub const KEY_HEADER: &str = "X-ACCESS-KEY";
pub const PASSPHRASE_HEADER: &str = "X-ACCESS-PASSPHRASE";

/// Authentication material attached to one private-API request
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    pub timestamp: i64,
    pub signature: String,
}

/// Signs private-API requests with the account's HMAC secret
pub struct RequestSigner {
    api_key: String,
    secret_key: String,
    passphrase: String,
}

impl RequestSigner {
    /// Fails if any of the key, secret or passphrase is not configured
    pub fn new(credentials: &Credentials) -> ExchangeResult<Self> {
        Ok(Self {
            api_key: credentials.api_key()?.to_string(),
            secret_key: credentials.secret_key()?.to_string(),
            passphrase: credentials.passphrase()?.to_string(),
        })
    }

    /// base64(HMAC-SHA256(secret, timestamp + method + path + body))
    pub fn signature(
        secret: &str,
        timestamp: i64,
        method: &Method,
        path: &str,
        body: Option<&str>,
    ) -> ExchangeResult<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ExchangeError::Authentication(format!("Failed to create HMAC: {}", e)))?;

        mac.update(timestamp.to_string().as_bytes());
        mac.update(method.as_str().as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.unwrap_or_default().as_bytes());

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    pub fn sign_at(
        &self,
        timestamp: i64,
        method: &Method,
        path: &str,
        body: Option<&str>,
    ) -> ExchangeResult<SignedEnvelope> {
        Ok(SignedEnvelope {
            timestamp,
            signature: Self::signature(&self.secret_key, timestamp, method, path, body)?,
        })
    }

    /// Sign with the current Unix time in whole seconds
    pub fn sign(&self, method: &Method, path: &str, body: Option<&str>) -> ExchangeResult<SignedEnvelope> {
        self.sign_at(chrono::Utc::now().timestamp(), method, path, body)
    }

    /// Sign a prepared request over its URL path and exact body text, and
    /// attach the identity headers.
    pub fn authorize(&self, request: HttpRequest) -> ExchangeResult<HttpRequest> {
        let path = url_path(&request.url)?;
        let envelope = self.sign(&request.method, &path, request.body.as_deref())?;
        Ok(self.attach(request, &envelope))
    }

    fn attach(&self, request: HttpRequest, envelope: &SignedEnvelope) -> HttpRequest {
        request
            .header(SIGNATURE_HEADER, envelope.signature.clone())
            .header(TIMESTAMP_HEADER, envelope.timestamp.to_string())
            .header(KEY_HEADER, self.api_key.clone())
            .header(PASSPHRASE_HEADER, self.passphrase.clone())
    }
}

/// Path component of a URL; the query string is not part of the signed message.
pub fn url_path(url: &str) -> ExchangeResult<String> {
    let uri: Uri = url
        .parse()
        .map_err(|e| ExchangeError::Request(format!("Invalid URL {}: {}", url, e)))?;
    Ok(uri.path().to_string())
}
