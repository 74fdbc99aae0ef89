// src/dashboard/state.rs
use crate::chart::figure::ChartFigure;
use crate::domain::models::{Granularity, OrderSide, TradingPair};
use serde::{Deserialize, Serialize};

/// Named UI state changes the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardEvent {
    ProductChanged,
    GranularityChanged,
    BalanceChanged,
    SubmitClicked,
    /// Raised by the order binding once the brokerage has answered
    OrderAcknowledged,
}

impl DashboardEvent {
    /// Events only the controller itself may raise
    pub fn is_internal(&self) -> bool {
        matches!(self, DashboardEvent::OrderAcknowledged)
    }
}

/// Current values of the page's inputs, sent along with every event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardState {
    pub product_id: String,
    pub granularity: String,
    pub quantity: Option<String>,
    pub side: String,
    /// Balance line currently on screen
    pub balance: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            product_id: TradingPair::default().to_string(),
            granularity: Granularity::default().seconds().to_string(),
            quantity: None,
            side: OrderSide::default().as_str().to_string(),
            balance: None,
        }
    }
}

/// Page elements the controller writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKey {
    Chart,
    Price,
    Balance,
    OrderResponse,
    Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OutputValue {
    Figure(ChartFigure),
    Text(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateUpdate {
    pub key: OutputKey,
    pub value: OutputValue,
}

impl StateUpdate {
    pub fn text(key: OutputKey, text: impl Into<String>) -> Self {
        Self {
            key,
            value: OutputValue::Text(text.into()),
        }
    }

    pub fn error(key: OutputKey, message: impl Into<String>) -> Self {
        Self {
            key,
            value: OutputValue::Error(message.into()),
        }
    }

    pub fn figure(figure: ChartFigure) -> Self {
        Self {
            key: OutputKey::Chart,
            value: OutputValue::Figure(figure),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            OutputValue::Text(text) | OutputValue::Error(text) => Some(text),
            OutputValue::Figure(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Selector contents for the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayout {
    pub title: String,
    pub products: Vec<String>,
    pub default_product: String,
    pub granularities: Vec<SelectOption>,
    pub default_granularity: String,
    pub sides: Vec<String>,
    pub default_side: String,
}

impl PageLayout {
    pub fn new(pairs: &[TradingPair]) -> Self {
        let default_product = if pairs.contains(&TradingPair::default()) {
            TradingPair::default()
        } else {
            pairs.first().copied().unwrap_or_default()
        };

        Self {
            title: "Prime trading dashboard".to_string(),
            products: pairs.iter().map(|p| p.to_string()).collect(),
            default_product: default_product.to_string(),
            granularities: Granularity::ALL
                .iter()
                .map(|g| SelectOption {
                    value: g.seconds().to_string(),
                    label: g.label().to_string(),
                })
                .collect(),
            default_granularity: Granularity::default().seconds().to_string(),
            sides: vec![OrderSide::Buy.as_str().to_string(), OrderSide::Sell.as_str().to_string()],
            default_side: OrderSide::default().as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_fills_missing_fields_with_defaults() {
        let state: DashboardState = serde_json::from_value(json!({"product_id": "BTC-USD"})).unwrap();
        assert_eq!(state.product_id, "BTC-USD");
        assert_eq!(state.granularity, "3600");
        assert_eq!(state.side, "BUY");
        assert_eq!(state.balance, None);
    }

    #[test]
    fn events_use_snake_case_names() {
        let event: DashboardEvent = serde_json::from_value(json!("submit_clicked")).unwrap();
        assert_eq!(event, DashboardEvent::SubmitClicked);
        assert!(!event.is_internal());
        assert!(DashboardEvent::OrderAcknowledged.is_internal());
    }

    #[test]
    fn updates_serialize_with_kind_tags() {
        let update = StateUpdate::text(OutputKey::OrderResponse, "done");
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"key": "order_response", "value": {"kind": "text", "value": "done"}})
        );
    }

    #[test]
    fn layout_lists_selectors() {
        let layout = PageLayout::new(&[TradingPair::BtcUsd, TradingPair::SolUsd]);
        assert_eq!(layout.products, vec!["BTC-USD", "SOL-USD"]);
        assert_eq!(layout.default_product, "BTC-USD");
        assert_eq!(layout.granularities.len(), 6);
        assert_eq!(layout.granularities[0], SelectOption { value: "60".into(), label: "1m".into() });
        assert_eq!(layout.default_granularity, "3600");
        assert_eq!(layout.sides, vec!["BUY", "SELL"]);

        let full = PageLayout::new(&TradingPair::ALL);
        assert_eq!(full.default_product, "ETH-USD");
    }
}
