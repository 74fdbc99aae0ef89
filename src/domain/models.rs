// src/domain/models.rs
use crate::domain::errors::{MarketDataError, TradingError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product identifiers the dashboard can trade and chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingPair {
    #[serde(rename = "ETH-USD")]
    EthUsd,
    #[serde(rename = "BTC-USD")]
    BtcUsd,
    #[serde(rename = "CRV-USD")]
    CrvUsd,
    #[serde(rename = "SOL-USD")]
    SolUsd,
    #[serde(rename = "CBETH-USD")]
    CbethUsd,
    #[serde(rename = "CBETH-ETH")]
    CbethEth,
}

impl TradingPair {
    pub const ALL: [TradingPair; 6] = [
        TradingPair::EthUsd,
        TradingPair::BtcUsd,
        TradingPair::CrvUsd,
        TradingPair::SolUsd,
        TradingPair::CbethUsd,
        TradingPair::CbethEth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradingPair::EthUsd => "ETH-USD",
            TradingPair::BtcUsd => "BTC-USD",
            TradingPair::CrvUsd => "CRV-USD",
            TradingPair::SolUsd => "SOL-USD",
            TradingPair::CbethUsd => "CBETH-USD",
            TradingPair::CbethEth => "CBETH-ETH",
        }
    }

    /// Asset being bought or sold
    pub fn base(&self) -> &'static str {
        self.split().0
    }

    /// Asset the price is denominated in
    pub fn quote(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let id = self.as_str();
        id.split_once('-').unwrap_or((id, ""))
    }
}

impl Default for TradingPair {
    fn default() -> Self {
        TradingPair::EthUsd
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradingPair {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TradingPair::ALL
            .iter()
            .copied()
            .find(|pair| pair.as_str() == s.trim())
            .ok_or_else(|| MarketDataError::UnknownPair(s.to_string()))
    }
}

/// Candle bucket width, in seconds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    SixHours,
    OneDay,
}

impl Granularity {
    pub const ALL: [Granularity; 6] = [
        Granularity::OneMinute,
        Granularity::FiveMinutes,
        Granularity::FifteenMinutes,
        Granularity::OneHour,
        Granularity::SixHours,
        Granularity::OneDay,
    ];

    pub fn seconds(&self) -> u32 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FiveMinutes => 300,
            Granularity::FifteenMinutes => 900,
            Granularity::OneHour => 3600,
            Granularity::SixHours => 21600,
            Granularity::OneDay => 86400,
        }
    }

    /// Short label shown in the interval selector
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::FifteenMinutes => "15m",
            Granularity::OneHour => "1h",
            Granularity::SixHours => "6h",
            Granularity::OneDay => "1d",
        }
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::OneHour
    }
}

impl TryFrom<u32> for Granularity {
    type Error = MarketDataError;

    fn try_from(seconds: u32) -> Result<Self, Self::Error> {
        Granularity::ALL
            .iter()
            .copied()
            .find(|g| g.seconds() == seconds)
            .ok_or_else(|| MarketDataError::UnknownGranularity(seconds.to_string()))
    }
}

impl FromStr for Granularity {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seconds = s
            .trim()
            .parse::<u32>()
            .map_err(|_| MarketDataError::UnknownGranularity(s.to_string()))?;
        Granularity::try_from(seconds)
    }
}

/// One OHLCV bucket in chronological order
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub product_id: TradingPair,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub asset: String,
    pub amount: Decimal,
}

impl Balance {
    pub fn new(asset: &str, amount: Decimal) -> Self {
        Self {
            asset: asset.to_string(),
            amount,
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.asset.eq_ignore_ascii_case("USD") {
            write!(f, "${:.2}", self.amount.round_dp(2))
        } else {
            write!(f, "{}", self.amount)
        }
    }
}

/// Both legs of a trading pair, rendered as the dashboard's balance line.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReport {
    pub base: Balance,
    pub quote: Balance,
}

impl BalanceReport {
    pub const SEPARATOR: &'static str = ". Your";

    /// Portion of a rendered balance line that describes the base asset.
    pub fn first_asset_portion(text: &str) -> &str {
        text.split(Self::SEPARATOR).next().unwrap_or(text)
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Your {} balance is {}{} {} balance is {}.",
            self.base.asset,
            self.base,
            Self::SEPARATOR,
            self.quote.asset,
            self.quote
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl Default for OrderSide {
    fn default() -> Self {
        OrderSide::Buy
    }
}

impl FromStr for OrderSide {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            _ => Err(TradingError::UnknownSide(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
}

/// Request body for a new order. Field order is the wire order and the
/// signed bytes depend on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub portfolio_id: String,
    pub product_id: TradingPair,
    pub client_order_id: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub base_quantity: String,
}

impl Order {
    pub fn market(
        portfolio_id: &str,
        product_id: TradingPair,
        side: OrderSide,
        base_quantity: Decimal,
    ) -> Self {
        Self {
            portfolio_id: portfolio_id.to_string(),
            product_id,
            client_order_id: uuid::Uuid::new_v4().to_string(),
            side,
            order_type: OrderType::Market,
            base_quantity: base_quantity.to_string(),
        }
    }
}

/// Confirmed order as reported back by the brokerage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderDetail {
    pub id: String,
    pub product_id: String,
    pub side: String,
    pub base_quantity: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderResult {
    Placed(OrderDetail),
    /// Accepted under `order_id`, but reading the order back failed
    Accepted { order_id: String, readback_error: String },
    /// The brokerage answered with an error payload instead of an order id
    Rejected(serde_json::Value),
}

impl fmt::Display for OrderResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderResult::Placed(detail) => write!(
                f,
                "Order details: {} {} {}. Order ID: {}",
                detail.product_id, detail.side, detail.base_quantity, detail.id
            ),
            OrderResult::Accepted { order_id, readback_error } => write!(
                f,
                "Order accepted. Order ID: {} (details unavailable: {})",
                order_id, readback_error
            ),
            OrderResult::Rejected(payload) => write!(f, "error: {}", payload),
        }
    }
}
