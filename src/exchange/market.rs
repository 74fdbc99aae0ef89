// src/exchange/market.rs
use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::{Candle, Granularity, Ticker, TradingPair};
use crate::exchange::transport::{HttpRequest, HttpTransport};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// Raw candle row: [time, low, high, open, close, volume]
type CandleRow = (i64, f64, f64, f64, f64, f64);

/// Client for the exchange's public (unauthenticated) REST API
pub struct MarketDataClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch candles for a pair, returned oldest first
    pub async fn fetch_candles(
        &self,
        pair: TradingPair,
        granularity: Granularity,
    ) -> ExchangeResult<Vec<Candle>> {
        let url = format!(
            "{}/products/{}/candles?granularity={}",
            self.base_url,
            pair,
            granularity.seconds()
        );

        let body = self.transport.send(HttpRequest::get(url)).await?.into_json()?;
        let mut candles = Self::parse_candles(body)?;

        // Remote returns newest first
        candles.sort_by_key(|c| c.timestamp);

        log::debug!("Fetched {} candles for {}/{}", candles.len(), pair, granularity.label());
        Ok(candles)
    }

    /// Fetch the latest traded price for a pair
    pub async fn fetch_ticker(&self, pair: TradingPair) -> ExchangeResult<Ticker> {
        let url = format!("{}/products/{}/ticker", self.base_url, pair);

        let body = self.transport.send(HttpRequest::get(url)).await?.into_json()?;

        let price = body["price"]
            .as_str()
            .ok_or_else(|| ExchangeError::InvalidResponse("Missing price in ticker".to_string()))?;

        let price = Decimal::from_str(price)
            .map_err(|e| ExchangeError::InvalidResponse(format!("Failed to parse price: {}", e)))?;

        Ok(Ticker {
            product_id: pair,
            price,
        })
    }

    fn parse_candles(body: Value) -> ExchangeResult<Vec<Candle>> {
        let rows: Vec<CandleRow> = serde_json::from_value(body).map_err(|e| {
            ExchangeError::InvalidResponse(format!("Invalid candle format: {}", e))
        })?;

        rows.into_iter()
            .map(|(time, low, high, open, close, volume)| {
                let timestamp = Utc.timestamp_opt(time, 0).single().ok_or_else(|| {
                    ExchangeError::InvalidResponse(format!("Invalid candle time: {}", time))
                })?;

                Ok(Candle {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            })
            .collect()
    }
}
