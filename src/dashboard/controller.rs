// src/dashboard/controller.rs
use crate::chart::render_figure;
use crate::config::Config;
use crate::dashboard::state::{
    DashboardEvent, DashboardState, PageLayout, OutputKey, StateUpdate,
};
use crate::domain::errors::{AppError, AppResult, MarketDataError, MarketDataResult, TradingError};
use crate::domain::models::{Granularity, TradingPair};
use crate::exchange::market::MarketDataClient;
use crate::exchange::prime::PortfolioClient;
use crate::market_data::frame::CandleFrame;
use crate::market_data::greeting::price_line;
use crate::trading::orders::OrderTicket;
use crate::trading::settlement::BalanceSettlementPoller;
use chrono::{Local, NaiveTime};
use futures_util::future::join_all;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Source of the wall-clock time used for the greeting
pub type Clock = fn() -> NaiveTime;

fn local_time() -> NaiveTime {
    Local::now().time()
}

/// A handler subscribed to one or more events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Chart,
    Price,
    Balance,
    Order,
}

impl Binding {
    pub const ALL: [Binding; 4] = [Binding::Chart, Binding::Price, Binding::Balance, Binding::Order];

    pub fn triggers(&self) -> &'static [DashboardEvent] {
        use DashboardEvent::*;
        match self {
            Binding::Chart => &[ProductChanged, GranularityChanged],
            Binding::Price => &[ProductChanged],
            Binding::Balance => &[ProductChanged, BalanceChanged, OrderAcknowledged],
            Binding::Order => &[SubmitClicked],
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Per-binding invocation counters. Only the newest invocation may publish.
#[derive(Debug, Default)]
struct Generations([AtomicU64; 4]);

impl Generations {
    fn begin(&self, binding: Binding) -> u64 {
        self.0[binding.index()].fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, binding: Binding, generation: u64) -> bool {
        self.0[binding.index()].load(Ordering::SeqCst) == generation
    }
}

/// What a binding produced: its output values and any events its result raises
#[derive(Debug, Default)]
struct Reaction {
    updates: Vec<StateUpdate>,
    raised: Vec<DashboardEvent>,
}

impl From<StateUpdate> for Reaction {
    fn from(update: StateUpdate) -> Self {
        Self {
            updates: vec![update],
            raised: Vec::new(),
        }
    }
}

pub struct DashboardController {
    config: Arc<Config>,
    market: Arc<MarketDataClient>,
    portfolio: Arc<PortfolioClient>,
    poller: BalanceSettlementPoller,
    clock: Clock,
    generations: Generations,
    order_gate: Mutex<()>,
}

impl DashboardController {
    pub fn new(
        config: Arc<Config>,
        market: Arc<MarketDataClient>,
        portfolio: Arc<PortfolioClient>,
    ) -> Self {
        let poller = BalanceSettlementPoller::new(
            config.dashboard.settlement_retries,
            config.dashboard.settlement_delay(),
        );

        Self {
            config,
            market,
            portfolio,
            poller,
            clock: local_time,
            generations: Generations::default(),
            order_gate: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn layout(&self) -> PageLayout {
        PageLayout::new(&self.config.dashboard.trading_pairs)
    }

    /// Run every binding subscribed to `event` and collect their output
    /// values. Events raised by a result (order acknowledgement) are handled
    /// after the bindings that raised them have finished.
    pub async fn dispatch(&self, event: DashboardEvent, state: &DashboardState) -> Vec<StateUpdate> {
        let mut updates = Vec::new();
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let bindings: Vec<Binding> = Binding::ALL
                .into_iter()
                .filter(|b| b.triggers().contains(&event))
                .collect();

            log::debug!("{:?} triggers {:?}", event, bindings);

            let reactions = join_all(bindings.iter().map(|b| self.run(*b, state))).await;
            for reaction in reactions.into_iter().flatten() {
                updates.extend(reaction.updates);
                queue.extend(reaction.raised);
            }
        }

        updates
    }

    async fn run(&self, binding: Binding, state: &DashboardState) -> Option<Reaction> {
        let generation = self.generations.begin(binding);

        let reaction = match binding {
            Binding::Chart => self.chart(state).await,
            Binding::Price => self.price(state).await,
            Binding::Balance => self.balance(state).await,
            Binding::Order => self.order(state).await,
        };

        // An order result is never discarded: the write already happened
        if binding != Binding::Order && !self.generations.is_current(binding, generation) {
            log::debug!("Dropping superseded {:?} result (generation {})", binding, generation);
            return None;
        }

        Some(reaction)
    }

    fn enabled_pair(&self, product_id: &str) -> MarketDataResult<TradingPair> {
        let pair: TradingPair = product_id.parse()?;
        if !self.config.dashboard.trading_pairs.contains(&pair) {
            return Err(MarketDataError::PairNotEnabled(product_id.to_string()));
        }
        Ok(pair)
    }

    async fn chart(&self, state: &DashboardState) -> Reaction {
        match self.render_chart(state).await {
            Ok(update) => update.into(),
            Err(e) => {
                log::error!("Chart refresh for {} failed: {}", state.product_id, e);
                StateUpdate::error(OutputKey::Chart, e.to_string()).into()
            }
        }
    }

    async fn render_chart(&self, state: &DashboardState) -> AppResult<StateUpdate> {
        let pair = self.enabled_pair(&state.product_id)?;
        let granularity: Granularity = state.granularity.parse()?;

        let candles = self.market.fetch_candles(pair, granularity).await?;
        let frame = CandleFrame::from_candles(candles)?;

        Ok(StateUpdate::figure(render_figure(&frame)))
    }

    async fn price(&self, state: &DashboardState) -> Reaction {
        let line = async {
            let pair = self.enabled_pair(&state.product_id)?;
            let ticker = self.market.fetch_ticker(pair).await?;
            AppResult::Ok(price_line((self.clock)(), &ticker))
        };

        match line.await {
            Ok(line) => StateUpdate::text(OutputKey::Price, line).into(),
            Err(e) => {
                log::error!("Price refresh for {} failed: {}", state.product_id, e);
                StateUpdate::error(OutputKey::Price, e.to_string()).into()
            }
        }
    }

    async fn balance(&self, state: &DashboardState) -> Reaction {
        let line = async {
            let pair = self.enabled_pair(&state.product_id)?;
            let line = self
                .poller
                .poll(self.portfolio.as_ref(), pair, state.balance.as_deref())
                .await?;
            AppResult::Ok(line)
        };

        match line.await {
            Ok(line) => StateUpdate::text(OutputKey::Balance, line).into(),
            Err(e) => {
                log::warn!("Balance refresh for {} failed: {}", state.product_id, e);
                StateUpdate::error(OutputKey::Balance, e.to_string()).into()
            }
        }
    }

    async fn order(&self, state: &DashboardState) -> Reaction {
        let _guard = match self.order_gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("Submit ignored: another order is still in flight");
                return order_error(TradingError::OrderInFlight).into();
            }
        };

        let ticket = self
            .enabled_pair(&state.product_id)
            .map_err(AppError::from)
            .and_then(|pair| {
                OrderTicket::new(pair, &state.side, state.quantity.as_deref()).map_err(AppError::from)
            });
        let ticket = match ticket {
            Ok(ticket) => ticket,
            Err(e) => {
                log::warn!("Order form rejected: {}", e);
                return order_error(e).into();
            }
        };

        match self
            .portfolio
            .submit_order(ticket.pair, ticket.side, ticket.quantity)
            .await
        {
            Ok(result) => Reaction {
                updates: vec![
                    StateUpdate::text(OutputKey::OrderResponse, result.to_string()),
                    StateUpdate::text(OutputKey::Quantity, ""),
                ],
                raised: vec![DashboardEvent::OrderAcknowledged],
            },
            Err(e) => {
                log::error!("Order submission for {} failed: {}", ticket.pair, e);
                order_error(e).into()
            }
        }
    }
}

fn order_error<E: std::fmt::Display>(error: E) -> StateUpdate {
    StateUpdate::text(OutputKey::OrderResponse, format!("error: {}", error))
}
