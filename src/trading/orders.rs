// src/trading/orders.rs
use crate::domain::errors::{TradingError, TradingResult};
use crate::domain::models::{OrderSide, TradingPair};
use rust_decimal::Decimal;
use std::str::FromStr;

/// A validated buy/sell form submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTicket {
    pub pair: TradingPair,
    pub side: OrderSide,
    pub quantity: Decimal,
}

impl OrderTicket {
    pub fn new(pair: TradingPair, side: &str, quantity: Option<&str>) -> TradingResult<Self> {
        Ok(Self {
            pair,
            side: side.parse()?,
            quantity: parse_quantity(quantity)?,
        })
    }
}

/// Accept only a present, numeric, strictly positive base quantity
pub fn parse_quantity(input: Option<&str>) -> TradingResult<Decimal> {
    let raw = input.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(TradingError::InvalidQuantity("quantity is required".to_string()));
    }

    let quantity = Decimal::from_str(raw)
        .map_err(|_| TradingError::InvalidQuantity(format!("{} is not a number", raw)))?;

    if quantity <= Decimal::ZERO {
        return Err(TradingError::InvalidQuantity(format!("{} must be greater than zero", raw)));
    }

    Ok(quantity.normalize())
}
