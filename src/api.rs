use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::debug;

use crate::config::{API_BASE_PATH, USER_AGENT};
use crate::models::{
    ActionFilter, ApplyOptions, GroupRequest, MarketResponse, PagingOptions, ScenarioResponse, SupplyChain,
    SupplyChainOptions,
};

const NEXT_CURSOR: &str = "x-next-cursor";

/// Remote planning service. Everything a plan needs from the instance goes
/// through this trait so tests can swap in an in-memory fake.
#[async_trait]
pub trait PlanningApi: Send + Sync {
    async fn create_scenario(&self, request: &Value) -> Result<ScenarioResponse>;

    async fn apply_and_run_scenario(
        &self,
        market_name: &str,
        scenario_id: &str,
        options: &ApplyOptions,
    ) -> Result<MarketResponse>;

    async fn get_market_by_uuid(&self, market_id: &str) -> Result<MarketResponse>;

    async fn get_actions_by_market_uuid(
        &self,
        market_id: &str,
        paging: &PagingOptions,
        filter: &ActionFilter,
    ) -> Result<Vec<Value>>;

    async fn get_current_actions_by_market_uuid(&self, market_id: &str, paging: &PagingOptions) -> Result<Vec<Value>>;

    async fn get_entities_by_market_uuid(&self, market_id: &str) -> Result<Vec<Value>>;

    async fn get_supply_chain_by_entity_uuid(&self, id: &str, options: &SupplyChainOptions) -> Result<SupplyChain>;

    async fn create_group(&self, body: &GroupRequest) -> Result<Value>;

    async fn get_group_by_uuid(&self, uuid: &str) -> Result<Value>;
}

/// HTTP implementation of [`PlanningApi`] against the instance REST API.
#[derive(Clone)]
pub struct Client {
    base: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(host: &str, insecure: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(insecure)
            .user_agent(USER_AGENT)
            .build()
            .context("building http client")?;
        Ok(Self { base: base_url(host), http })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Opens a session; the cookie store keeps it for later requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let res = self
            .http
            .post(self.url("login"))
            .header(ACCEPT, "application/json")
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            bail!("login as {username} failed: {status} {body}");
        }
        debug!(%username, "logged in");
        Ok(())
    }

    async fn send_json<T: serde::de::DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let res = req.header(ACCEPT, "application/json").send().await?.error_for_status()?;
        res.json().await.with_context(|| format!("decoding {what} json"))
    }

    /// Follows `X-Next-Cursor` until the server stops handing one out.
    async fn collect_pages<F>(&self, what: &str, make: F) -> Result<Vec<Value>>
    where
        F: Fn(Option<&str>) -> RequestBuilder + Send + Sync,
    {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let res = make(cursor.as_deref())
                .header(ACCEPT, "application/json")
                .send()
                .await?
                .error_for_status()?;
            let next = res
                .headers()
                .get(NEXT_CURSOR)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            let page: Vec<Value> = res.json().await.with_context(|| format!("decoding {what} page"))?;
            debug!(what, records = page.len(), cursor = ?cursor, "fetched page");
            all.extend(page);

            match next {
                Some(n) if cursor.as_deref() != Some(n.as_str()) => cursor = Some(n),
                _ => break,
            }
        }
        Ok(all)
    }
}

fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}{API_BASE_PATH}")
    } else {
        format!("https://{host}{API_BASE_PATH}")
    }
}

fn paging_query(paging: &PagingOptions, cursor: Option<&str>) -> Vec<(&'static str, String)> {
    let mut q = Vec::new();
    if let Some(limit) = paging.limit {
        q.push(("limit", limit.to_string()));
    }
    if let Some(order_by) = &paging.order_by {
        q.push(("order_by", order_by.clone()));
    }
    if let Some(asc) = paging.ascending {
        q.push(("ascending", asc.to_string()));
    }
    if let Some(c) = cursor {
        q.push(("cursor", c.to_string()));
    }
    q
}

#[async_trait]
impl PlanningApi for Client {
    async fn create_scenario(&self, request: &Value) -> Result<ScenarioResponse> {
        let req = self.http.post(self.url("scenarios")).json(request);
        self.send_json(req, "scenario").await
    }

    async fn apply_and_run_scenario(
        &self,
        market_name: &str,
        scenario_id: &str,
        options: &ApplyOptions,
    ) -> Result<MarketResponse> {
        let url = self.url(&format!("markets/{market_name}/scenarios/{scenario_id}"));
        let req = self.http.post(url).query(options);
        self.send_json(req, "plan market").await
    }

    async fn get_market_by_uuid(&self, market_id: &str) -> Result<MarketResponse> {
        let req = self.http.get(self.url(&format!("markets/{market_id}")));
        self.send_json(req, "market").await
    }

    async fn get_actions_by_market_uuid(
        &self,
        market_id: &str,
        paging: &PagingOptions,
        filter: &ActionFilter,
    ) -> Result<Vec<Value>> {
        let url = self.url(&format!("markets/{market_id}/actions"));
        self.collect_pages("actions", |cursor| {
            self.http.post(&url).query(&paging_query(paging, cursor)).json(filter)
        })
        .await
    }

    async fn get_current_actions_by_market_uuid(&self, market_id: &str, paging: &PagingOptions) -> Result<Vec<Value>> {
        let url = self.url(&format!("markets/{market_id}/actions"));
        self.collect_pages("actions", |cursor| self.http.get(&url).query(&paging_query(paging, cursor)))
            .await
    }

    async fn get_entities_by_market_uuid(&self, market_id: &str) -> Result<Vec<Value>> {
        let url = self.url(&format!("markets/{market_id}/entities"));
        let none = PagingOptions::default();
        self.collect_pages("entities", |cursor| self.http.get(&url).query(&paging_query(&none, cursor)))
            .await
    }

    async fn get_supply_chain_by_entity_uuid(&self, id: &str, options: &SupplyChainOptions) -> Result<SupplyChain> {
        let req = self.http.get(self.url("supplychains")).query(&[
            ("uuids", id.to_string()),
            ("types", options.types.join(",")),
            ("detail_type", options.detail_type.clone()),
        ]);
        self.send_json(req, "supply chain").await
    }

    async fn create_group(&self, body: &GroupRequest) -> Result<Value> {
        let req = self.http.post(self.url("groups")).json(body);
        self.send_json(req, "group").await
    }

    async fn get_group_by_uuid(&self, uuid: &str) -> Result<Value> {
        let req = self.http.get(self.url(&format!("groups/{uuid}")));
        self.send_json(req, "group").await
    }
}
