use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::RequestBuilder;

use fuel_core::error::RemoteError;
use fuel_core::models::{Plan, PlanDraft, Snapshot};
use fuel_core::port::PersistencePort;
use fuel_core::remote::{
    CalorieResponse, PlanResponse, PlansResponse, plan_from_response, plans_from_response,
};

const CALORIES_PATH: &str = "/api/calories";
const PLANS_PATH: &str = "/api/plans";

/// Client for the fitness tracker backend. Every request carries the stored
/// bearer token.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "fuel-cli/{} (calorie planner)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(resp)
    }
}

#[async_trait(?Send)]
impl PersistencePort for ApiClient {
    async fn load_profile(&self) -> Result<Option<Snapshot>> {
        let resp = self.send(self.client.get(self.url(CALORIES_PATH))).await?;
        let data: CalorieResponse = resp
            .json()
            .await
            .context("Failed to parse calorie response")?;
        Ok(data.calorie)
    }

    async fn save_profile(&self, snapshot: &Snapshot) -> Result<()> {
        self.send(self.client.post(self.url(CALORIES_PATH)).json(snapshot))
            .await?;
        Ok(())
    }

    async fn clear_profile(&self) -> Result<()> {
        self.send(self.client.delete(self.url(CALORIES_PATH)))
            .await?;
        Ok(())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>> {
        let resp = self.send(self.client.get(self.url(PLANS_PATH))).await?;
        let data: PlansResponse = resp
            .json()
            .await
            .context("Failed to parse plan list response")?;
        Ok(plans_from_response(data)?)
    }

    async fn create_plan(&self, draft: &PlanDraft) -> Result<Plan> {
        let resp = self
            .send(self.client.post(self.url(PLANS_PATH)).json(draft))
            .await?;
        let data: PlanResponse = resp
            .json()
            .await
            .context("Failed to parse plan response")?;
        Ok(plan_from_response(data)?)
    }

    async fn delete_plan(&self, id: &str) -> Result<()> {
        let url = format!("{}/{id}", self.url(PLANS_PATH));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
