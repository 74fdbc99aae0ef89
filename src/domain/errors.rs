// src/domain/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Trading error: {0}")]
    Trading(#[from] TradingError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<hyper::Error> for AppError {
    fn from(e: hyper::Error) -> Self {
        AppError::Server(e.to_string())
    }
}

/// Failures talking to either remote API.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Missing credential: {0} is not configured")]
    MissingCredential(&'static str),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request error: {0}")]
    Request(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum MarketDataError {
    #[error("Unknown trading pair: {0}")]
    UnknownPair(String),

    #[error("Trading pair not enabled: {0}")]
    PairNotEnabled(String),

    #[error("Unsupported granularity: {0}")]
    UnknownGranularity(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum TradingError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Unknown order side: {0}")]
    UnknownSide(String),

    #[error("An order is already being submitted")]
    OrderInFlight,
}

#[derive(Error, Debug, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid indicator period: {0}")]
    InvalidPeriod(String),
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type ExchangeResult<T> = Result<T, ExchangeError>;
pub type MarketDataResult<T> = Result<T, MarketDataError>;
pub type TradingResult<T> = Result<T, TradingError>;
pub type AnalysisResult<T> = Result<T, AnalysisError>;
