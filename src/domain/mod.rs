// src/domain/mod.rs
pub mod errors;
pub mod models;

// Re-export common types for convenience
pub use errors::{
    AnalysisError, AnalysisResult, AppError, AppResult, ExchangeError, ExchangeResult,
    MarketDataError, MarketDataResult, TradingError, TradingResult,
};
pub use models::{
    Balance, BalanceReport, Candle, Granularity, Order, OrderDetail, OrderResult, OrderSide,
    OrderType, Ticker, TradingPair,
};
