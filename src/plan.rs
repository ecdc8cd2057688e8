use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info};

use crate::action::ActionCollection;
use crate::api::PlanningApi;
use crate::config::{MARKET_SUCCEEDED, REALTIME_MARKET};
use crate::error::{PlanError, PlanResult};
use crate::models::{ActionFilter, ApplyOptions, MarketResponse, PagingOptions, ScenarioResponse};
use crate::poll::PollPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    /// Nothing sent yet.
    Created,
    /// Scenario created but not yet applied to the live market.
    Submitted,
    /// Plan market exists and has not reported success yet.
    Running,
    Succeeded,
}

/// One execution of a scenario against the live market.
///
/// All transitions take `&mut self`, so a plan cannot be submitted twice
/// concurrently.
pub struct Plan {
    api: Arc<dyn PlanningApi>,
    scenario_request: Value,
    market_name: String,
    create_response: Option<ScenarioResponse>,
    run_response: Option<MarketResponse>,
    poll: PollPolicy,
}

impl Plan {
    pub fn new(api: Arc<dyn PlanningApi>, scenario_request: Value, market_name: impl Into<String>) -> Self {
        Self {
            api,
            scenario_request,
            market_name: market_name.into(),
            create_response: None,
            run_response: None,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn api(&self) -> &Arc<dyn PlanningApi> {
        &self.api
    }

    pub fn scenario_request(&self) -> &Value {
        &self.scenario_request
    }

    pub fn market_name(&self) -> &str {
        &self.market_name
    }

    pub fn create_response(&self) -> Option<&ScenarioResponse> {
        self.create_response.as_ref()
    }

    pub fn run_response(&self) -> Option<&MarketResponse> {
        self.run_response.as_ref()
    }

    pub fn state(&self) -> PlanState {
        match (&self.create_response, &self.run_response) {
            (None, _) => PlanState::Created,
            (Some(_), None) => PlanState::Submitted,
            (Some(_), Some(m)) if m.state == MARKET_SUCCEEDED => PlanState::Succeeded,
            (Some(_), Some(_)) => PlanState::Running,
        }
    }

    /// Uuid of the plan (consumption) market.
    pub fn market_id(&self) -> PlanResult<&str> {
        self.run_response.as_ref().map(|m| m.uuid.as_str()).ok_or(PlanError::NotRun)
    }

    /// Uuid of the related allocation (no-resize) market.
    pub fn allocation_market_id(&self) -> PlanResult<&str> {
        let market = self.run_response.as_ref().ok_or(PlanError::NotRun)?;
        market
            .related_plan_markets
            .first()
            .map(|m| m.uuid.as_str())
            .ok_or_else(|| PlanError::MissingAllocationMarket(market.uuid.clone()))
    }

    /// Creates the scenario and applies it to the live market.
    ///
    /// If an earlier call created the scenario but failed to apply it, the
    /// existing scenario is applied instead of creating a new one.
    pub async fn run(&mut self) -> PlanResult<()> {
        if self.run_response.is_some() {
            return Err(PlanError::AlreadySubmitted);
        }

        let scenario_id = match &self.create_response {
            Some(created) => created.uuid.clone(),
            None => {
                info!(market = %self.market_name, "creating scenario");
                let created = self.api.create_scenario(&self.scenario_request).await?;
                let id = created.uuid.clone();
                self.create_response = Some(created);
                id
            }
        };

        let options = ApplyOptions {
            disable_hateoas: true,
            ignore_constraints: false,
            plan_market_name: self.market_name.clone(),
        };
        info!(scenario = %scenario_id, market = %self.market_name, "running scenario against {REALTIME_MARKET}");
        let market = self
            .api
            .apply_and_run_scenario(REALTIME_MARKET, &scenario_id, &options)
            .await?;
        debug!(uuid = %market.uuid, state = %market.state, "plan market started");
        self.run_response = Some(market);
        Ok(())
    }

    /// Polls the plan market until it reports success, within the poll policy.
    pub async fn wait(&mut self) -> PlanResult<()> {
        self.wait_until(std::future::pending()).await
    }

    /// Like [`Plan::wait`], giving up with [`PlanError::Cancelled`] as soon as
    /// `cancel` completes.
    pub async fn wait_until<F>(&mut self, cancel: F) -> PlanResult<()>
    where
        F: Future<Output = ()>,
    {
        let market_id = self.market_id()?.to_string();
        if self.state() == PlanState::Succeeded {
            return Ok(());
        }

        tokio::pin!(cancel);
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            let market = tokio::select! {
                biased;
                _ = &mut cancel => return Err(PlanError::Cancelled(market_id)),
                res = self.api.get_market_by_uuid(&market_id) => res?,
            };
            attempts += 1;
            debug!(market = %market_id, state = %market.state, attempts, "polled plan market");

            let done = market.state == MARKET_SUCCEEDED;
            self.record_market(market);
            if done {
                info!(market = %market_id, attempts, elapsed = ?started.elapsed(), "plan market succeeded");
                return Ok(());
            }

            let elapsed = started.elapsed();
            if attempts >= self.poll.max_attempts || elapsed >= self.poll.timeout {
                return Err(PlanError::Timeout { market: market_id, attempts, elapsed });
            }

            let delay = self.poll.delay(attempts - 1).min(self.poll.timeout - elapsed);
            tokio::select! {
                biased;
                _ = &mut cancel => return Err(PlanError::Cancelled(market_id)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    // Market fetches do not always repeat the related markets; keep the ones
    // from the run response.
    fn record_market(&mut self, mut market: MarketResponse) {
        if let Some(prev) = self.run_response.take() {
            if market.related_plan_markets.is_empty() {
                market.related_plan_markets = prev.related_plan_markets;
            }
        }
        self.run_response = Some(market);
    }

    /// All actions of the plan market, unfiltered.
    pub async fn get_actions(&self) -> PlanResult<ActionCollection> {
        let raw = self
            .api
            .get_actions_by_market_uuid(self.market_id()?, &PagingOptions::default(), &ActionFilter::default())
            .await?;
        Ok(ActionCollection::from_raw(raw))
    }
}
