// src/trading/settlement.rs
use crate::domain::errors::ExchangeResult;
use crate::domain::models::{BalanceReport, TradingPair};
use crate::exchange::prime::PortfolioClient;
use async_trait::async_trait;
use std::time::Duration;

/// Anything that can render the current balance line for a pair
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance_text(&self, pair: TradingPair) -> ExchangeResult<String>;
}

#[async_trait]
impl BalanceSource for PortfolioClient {
    async fn balance_text(&self, pair: TradingPair) -> ExchangeResult<String> {
        Ok(self.fetch_balance_report(pair).await?.to_string())
    }
}

/// Re-reads balances after an order until the displayed value moves.
///
/// Best effort only: a fixed number of extra reads at a fixed interval, no
/// backoff. Only content that has not changed is retried; fetch errors are
/// returned immediately.
#[derive(Debug, Clone)]
pub struct BalanceSettlementPoller {
    retries: u32,
    delay: Duration,
}

impl Default for BalanceSettlementPoller {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

impl BalanceSettlementPoller {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Fetch the balance line; if it matches `previous` on the first asset,
    /// wait and fetch again, up to `retries` more times.
    pub async fn poll<S>(
        &self,
        source: &S,
        pair: TradingPair,
        previous: Option<&str>,
    ) -> ExchangeResult<String>
    where
        S: BalanceSource + ?Sized,
    {
        let mut current = source.balance_text(pair).await?;

        let reference = match previous {
            Some(previous) => BalanceReport::first_asset_portion(previous),
            None => return Ok(current),
        };

        for attempt in 1..=self.retries {
            if BalanceReport::first_asset_portion(&current) != reference {
                break;
            }

            log::debug!(
                "Balance for {} unchanged, re-reading ({}/{})",
                pair,
                attempt,
                self.retries
            );
            tokio::time::sleep(self.delay).await;
            current = source.balance_text(pair).await?;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ExchangeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves scripted balance lines, repeating the last one
    struct ScriptedBalances {
        lines: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl ScriptedBalances {
        fn new(lines: Vec<&'static str>) -> Self {
            Self {
                lines,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BalanceSource for ScriptedBalances {
        async fn balance_text(&self, _pair: TradingPair) -> ExchangeResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let line = self.lines.get(n).or(self.lines.last()).copied();
            match line {
                Some("fail") => Err(ExchangeError::Connection("reset".to_string())),
                Some(line) => Ok(line.to_string()),
                None => Err(ExchangeError::InvalidResponse("empty script".to_string())),
            }
        }
    }

    const OLD: &str = "Your BTC balance is 1. Your USD balance is $100.00.";
    const NEW: &str = "Your BTC balance is 2. Your USD balance is $50.00.";

    fn poller() -> BalanceSettlementPoller {
        BalanceSettlementPoller::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn stops_at_first_changed_reading() {
        let source = ScriptedBalances::new(vec![OLD, OLD, NEW]);
        let line = poller().poll(&source, TradingPair::BtcUsd, Some(OLD)).await.unwrap();
        assert_eq!(line, NEW);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_retries() {
        let source = ScriptedBalances::new(vec![OLD]);
        let line = poller().poll(&source, TradingPair::BtcUsd, Some(OLD)).await.unwrap();
        assert_eq!(line, OLD);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn no_previous_reading_means_single_fetch() {
        let source = ScriptedBalances::new(vec![OLD]);
        let line = poller().poll(&source, TradingPair::BtcUsd, None).await.unwrap();
        assert_eq!(line, OLD);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn only_the_first_asset_is_compared() {
        let quote_moved = "Your BTC balance is 1. Your USD balance is $99.00.";
        let source = ScriptedBalances::new(vec![quote_moved]);
        let line = poller().poll(&source, TradingPair::BtcUsd, Some(OLD)).await.unwrap();
        assert_eq!(line, quote_moved);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn fetch_errors_are_not_retried() {
        let source = ScriptedBalances::new(vec![OLD, "fail", NEW]);
        let err = poller().poll(&source, TradingPair::BtcUsd, Some(OLD)).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Connection(_)));
        assert_eq!(source.calls(), 2);
    }
}
