// src/exchange/mod.rs
pub mod market;
pub mod prime;
pub mod signer;
pub mod transport;

pub use market::MarketDataClient;
pub use prime::PortfolioClient;
pub use signer::{RequestSigner, SignedEnvelope};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, HyperTransport};
