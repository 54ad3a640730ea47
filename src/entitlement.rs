use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::EnhancerConfig;
use crate::UsageState;

/// The system of record for quota. Failures are reported as plain strings;
/// callers decide how to degrade.
#[async_trait]
pub trait EntitlementService: Send + Sync {
    async fn check_usage_limit(&self, user_id: &str) -> Result<UsageState, String>;
    async fn increment_usage(&self, user_id: &str) -> Result<(), String>;
}

/// Used when no entitlement endpoint is configured.
#[derive(Debug, Default, Clone)]
pub struct UnlimitedEntitlements;

#[async_trait]
impl EntitlementService for UnlimitedEntitlements {
    async fn check_usage_limit(&self, _user_id: &str) -> Result<UsageState, String> {
        Ok(UsageState {
            current_usage: 0,
            monthly_limit: UsageState::UNLIMITED,
            plan_name: "local".to_string(),
            can_use: true,
            is_admin: false,
        })
    }

    async fn increment_usage(&self, _user_id: &str) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct HttpEntitlementClient {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    #[serde(alias = "canUse")]
    can_use: bool,
    #[serde(alias = "currentUsage")]
    current_usage: u32,
    #[serde(alias = "monthlyLimit")]
    monthly_limit: i64,
    #[serde(alias = "planName", default)]
    plan_name: String,
    #[serde(alias = "isAdmin", default)]
    is_admin: bool,
}

impl HttpEntitlementClient {
    pub fn from_config(config: &EnhancerConfig) -> Result<Option<Self>, String> {
        match config.usage.endpoint.as_ref() {
            Some(endpoint) => {
                let timeout = Duration::from_millis(config.usage.timeout_ms);
                HttpEntitlementClient::new(endpoint.clone(), timeout).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| format!("failed to build entitlement client: {}", err))?;
        Ok(Self { endpoint, client })
    }

    fn usage_url(&self, user_id: &str) -> String {
        format!(
            "{}/usage/{}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(user_id)
        )
    }
}

#[async_trait]
impl EntitlementService for HttpEntitlementClient {
    async fn check_usage_limit(&self, user_id: &str) -> Result<UsageState, String> {
        let response = self
            .client
            .get(self.usage_url(user_id))
            .send()
            .await
            .map_err(|err| format!("entitlement request failed: {}", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("entitlement error {}: {}", status, body));
        }

        let body = response
            .json::<UsageResponse>()
            .await
            .map_err(|err| format!("entitlement response parse failed: {}", err))?;

        Ok(UsageState {
            current_usage: body.current_usage,
            monthly_limit: body.monthly_limit,
            plan_name: body.plan_name,
            can_use: body.can_use,
            is_admin: body.is_admin,
        })
    }

    async fn increment_usage(&self, user_id: &str) -> Result<(), String> {
        let url = format!("{}/increment", self.usage_url(user_id));
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|err| format!("entitlement increment failed: {}", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("entitlement increment error {}: {}", status, body));
        }
        Ok(())
    }
}
