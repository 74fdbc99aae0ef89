// src/exchange/prime.rs
use crate::config::Credentials;
use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::{
    Balance, BalanceReport, Order, OrderDetail, OrderResult, OrderSide, TradingPair,
};
use crate::exchange::signer::RequestSigner;
use crate::exchange::transport::{HttpRequest, HttpResponse, HttpTransport};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

/// Client for the private brokerage API. Every call is signed; calls fail with
/// `ExchangeError::MissingCredential` before anything is sent when the
/// credentials are incomplete.
pub struct PortfolioClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    credentials: Credentials,
}

impl PortfolioClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str, credentials: Credentials) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn portfolio_url(&self) -> ExchangeResult<String> {
        Ok(format!(
            "{}/portfolios/{}",
            self.base_url,
            self.credentials.portfolio_id()?
        ))
    }

    /// Sign and send a request, returning the raw response
    async fn send_signed(&self, request: HttpRequest) -> ExchangeResult<HttpResponse> {
        let signer = RequestSigner::new(&self.credentials)?;
        let request = signer.authorize(request)?;
        self.transport.send(request).await
    }

    /// Trading balance for one asset; the first entry returned wins
    pub async fn fetch_balance(&self, asset: &str) -> ExchangeResult<Balance> {
        let url = format!(
            "{}/balances?balance_type=TRADING_BALANCES&symbols={}",
            self.portfolio_url()?,
            asset
        );

        let body = self.send_signed(HttpRequest::get(url)).await?.into_json()?;

        let amount = body["balances"]
            .get(0)
            .and_then(|entry| entry["amount"].as_str())
            .ok_or_else(|| {
                ExchangeError::InvalidResponse(format!("No balance returned for {}", asset))
            })?;

        let amount = Decimal::from_str(amount).map_err(|e| {
            ExchangeError::InvalidResponse(format!("Failed to parse balance amount: {}", e))
        })?;

        Ok(Balance::new(asset, amount))
    }

    /// Balances for both legs of a pair, fetched concurrently
    pub async fn fetch_balance_report(&self, pair: TradingPair) -> ExchangeResult<BalanceReport> {
        let (base, quote) = futures_util::future::try_join(
            self.fetch_balance(pair.base()),
            self.fetch_balance(pair.quote()),
        )
        .await?;

        Ok(BalanceReport { base, quote })
    }

    /// Place a market order and read it back for confirmation.
    ///
    /// A response carrying a `message` instead of an `order_id` is returned as
    /// `OrderResult::Rejected` with the raw payload. Once an `order_id` is
    /// returned the order counts as placed even if the read-back fails
    /// (`OrderResult::Accepted`). Nothing is retried.
    pub async fn submit_order(
        &self,
        pair: TradingPair,
        side: OrderSide,
        quantity: Decimal,
    ) -> ExchangeResult<OrderResult> {
        let url = format!("{}/order", self.portfolio_url()?);
        let order = Order::market(self.credentials.portfolio_id()?, pair, side, quantity);

        // The signed text and the sent text must be the same bytes
        let body = serde_json::to_string(&order)
            .map_err(|e| ExchangeError::Request(format!("Failed to serialize order: {}", e)))?;

        log::info!(
            "Submitting {} {} {} (client order id {})",
            order.side.as_str(),
            order.base_quantity,
            pair,
            order.client_order_id
        );

        let response = self.send_signed(HttpRequest::post(url, body)).await?;
        let payload = response.json().or_else(|_| {
            if response.is_success() {
                Err(ExchangeError::InvalidResponse(response.body.clone()))
            } else {
                Err(ExchangeError::Api {
                    status: response.status,
                    body: response.body.clone(),
                })
            }
        })?;

        if payload.get("message").is_some() {
            log::warn!("Order rejected: {}", payload);
            return Ok(OrderResult::Rejected(payload));
        }

        if !response.is_success() {
            return Err(ExchangeError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let order_id = payload["order_id"].as_str().ok_or_else(|| {
            ExchangeError::InvalidResponse(format!("Missing order_id in {}", payload))
        })?;

        // The order exists from here on; a failed read-back must not hide that
        match self.fetch_order(order_id).await {
            Ok(detail) => Ok(OrderResult::Placed(detail)),
            Err(e) => {
                log::warn!("Order {} accepted but could not be read back: {}", order_id, e);
                Ok(OrderResult::Accepted {
                    order_id: order_id.to_string(),
                    readback_error: e.to_string(),
                })
            }
        }
    }

    /// Look up an order by its brokerage-assigned id
    pub async fn fetch_order(&self, order_id: &str) -> ExchangeResult<OrderDetail> {
        let url = format!("{}/orders/{}", self.portfolio_url()?, order_id);

        let mut body = self.send_signed(HttpRequest::get(url)).await?.into_json()?;
        let order = body
            .get_mut("order")
            .map(serde_json::Value::take)
            .unwrap_or_default();

        serde_json::from_value(order)
            .map_err(|e| ExchangeError::InvalidResponse(format!("Invalid order detail: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::signer::{RequestSigner, SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use crate::exchange::transport::mock::MockTransport;
    use hyper::Method;
    use rust_decimal_macros::dec;

    fn credentials() -> Credentials {
        Credentials {
            api_key: Some("key".into()),
            secret_key: Some("secret".into()),
            passphrase: Some("pass".into()),
            portfolio_id: Some("pf-1".into()),
        }
    }

    fn client(transport: Arc<MockTransport>, credentials: Credentials) -> PortfolioClient {
        PortfolioClient::new(transport, "https://prime.test/v1", credentials)
    }

    fn balance_body(amount: &str) -> String {
        format!(r#"{{"balances":[{{"symbol":"x","amount":"{}","holds":"0"}}]}}"#, amount)
    }

    fn order_desk(request: &HttpRequest) -> ExchangeResult<HttpResponse> {
        match (request.method.as_str(), request.url.as_str()) {
            ("POST", "https://prime.test/v1/portfolios/pf-1/order") => {
                Ok(HttpResponse::new(200, r#"{"order_id":"ord-77"}"#))
            }
            ("GET", "https://prime.test/v1/portfolios/pf-1/orders/ord-77") => Ok(HttpResponse::new(
                200,
                r#"{"order":{"id":"ord-77","product_id":"BTC-USD","side":"BUY","base_quantity":"0.5","status":"FILLED"}}"#,
            )),
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn balance_uses_first_entry_and_signed_get() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::new(200, balance_body("12.5")))));
        let balance = client(transport.clone(), credentials())
            .fetch_balance("BTC")
            .await
            .unwrap();
        assert_eq!(balance, Balance::new("BTC", dec!(12.5)));

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(
            request.url,
            "https://prime.test/v1/portfolios/pf-1/balances?balance_type=TRADING_BALANCES&symbols=BTC"
        );
        assert!(request.header_value(SIGNATURE_HEADER).is_some());
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let transport = Arc::new(MockTransport::new(|_| panic!("nothing should be sent")));
        let mut creds = credentials();
        creds.passphrase = None;
        let portfolio = client(transport.clone(), creds);

        assert!(matches!(
            portfolio.fetch_balance("BTC").await,
            Err(ExchangeError::MissingCredential("PASSPHRASE"))
        ));
        assert!(matches!(
            portfolio.submit_order(TradingPair::BtcUsd, OrderSide::Buy, dec!(1)).await,
            Err(ExchangeError::MissingCredential("PASSPHRASE"))
        ));

        let mut creds = credentials();
        creds.portfolio_id = None;
        assert!(matches!(
            client(transport.clone(), creds).fetch_order("ord-1").await,
            Err(ExchangeError::MissingCredential("PORTFOLIO_ID"))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn empty_balance_list_is_a_malformed_response() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::new(200, r#"{"balances":[]}"#))));
        let err = client(transport, credentials()).fetch_balance("SOL").await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn balance_report_covers_both_assets() {
        let transport = Arc::new(MockTransport::new(|req| {
            if req.url.ends_with("symbols=BTC") {
                Ok(HttpResponse::new(200, balance_body("0.75")))
            } else {
                Ok(HttpResponse::new(200, balance_body("1000.129")))
            }
        }));
        let report = client(transport, credentials())
            .fetch_balance_report(TradingPair::BtcUsd)
            .await
            .unwrap();
        assert_eq!(
            report.to_string(),
            "Your BTC balance is 0.75. Your USD balance is $1000.13."
        );
    }

    #[tokio::test]
    async fn submitted_order_is_read_back_by_id() {
        let transport = Arc::new(MockTransport::new(order_desk));
        let result = client(transport.clone(), credentials())
            .submit_order(TradingPair::BtcUsd, OrderSide::Buy, dec!(0.5))
            .await
            .unwrap();
        assert_eq!(result.to_string(), "Order details: BTC-USD BUY 0.5. Order ID: ord-77");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);

        let post = &requests[0];
        let body = post.body.as_deref().unwrap();
        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent["portfolio_id"], "pf-1");
        assert_eq!(sent["product_id"], "BTC-USD");
        assert_eq!(sent["side"], "BUY");
        assert_eq!(sent["type"], "MARKET");
        assert_eq!(sent["base_quantity"], "0.5");

        // Signature covers exactly the bytes that were sent
        let timestamp: i64 = post.header_value(TIMESTAMP_HEADER).unwrap().parse().unwrap();
        let expected = RequestSigner::signature(
            "secret",
            timestamp,
            &Method::POST,
            "/v1/portfolios/pf-1/order",
            Some(body),
        )
        .unwrap();
        assert_eq!(post.header_value(SIGNATURE_HEADER), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn separate_submissions_use_distinct_client_order_ids() {
        let transport = Arc::new(MockTransport::new(order_desk));
        let portfolio = client(transport.clone(), credentials());
        portfolio.submit_order(TradingPair::BtcUsd, OrderSide::Buy, dec!(0.5)).await.unwrap();
        portfolio.submit_order(TradingPair::BtcUsd, OrderSide::Buy, dec!(0.5)).await.unwrap();

        let ids: Vec<String> = transport
            .requests()
            .iter()
            .filter(|r| r.method == Method::POST)
            .map(|r| {
                let body: serde_json::Value = serde_json::from_str(r.body.as_deref().unwrap()).unwrap();
                body["client_order_id"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn remote_rejection_returns_raw_payload_without_retry() {
        let transport = Arc::new(MockTransport::new(|_| {
            Ok(HttpResponse::new(400, r#"{"message":"insufficient balance"}"#))
        }));
        let result = client(transport.clone(), credentials())
            .submit_order(TradingPair::EthUsd, OrderSide::Sell, dec!(3))
            .await
            .unwrap();
        assert_eq!(result.to_string(), r#"error: {"message":"insufficient balance"}"#);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn failed_read_back_still_reports_the_accepted_order() {
        let transport = Arc::new(MockTransport::new(|req| {
            if req.url.ends_with("/order") {
                Ok(HttpResponse::new(200, r#"{"order_id":"ord-5"}"#))
            } else {
                Ok(HttpResponse::new(500, "read-back unavailable"))
            }
        }));
        let result = client(transport.clone(), credentials())
            .submit_order(TradingPair::BtcUsd, OrderSide::Buy, dec!(1))
            .await
            .unwrap();

        match &result {
            OrderResult::Accepted { order_id, readback_error } => {
                assert_eq!(order_id, "ord-5");
                assert!(readback_error.contains("500"));
            }
            other => panic!("expected an accepted order, got {:?}", other),
        }
        assert!(result.to_string().starts_with("Order accepted. Order ID: ord-5"));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn non_json_failure_is_an_api_error() {
        let transport = Arc::new(MockTransport::new(|_| Ok(HttpResponse::new(502, "Bad Gateway"))));
        let err = client(transport, credentials())
            .submit_order(TradingPair::EthUsd, OrderSide::Sell, dec!(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Api { status: 502, .. }));
    }
}
