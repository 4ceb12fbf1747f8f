//! Ways a submitted contact message reaches its destination.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use shared::{
    error::DeliveryError,
    protocol::{ContactSubmission, RelayForm},
};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_millis(1500);

#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, submission: &ContactSubmission) -> Result<(), DeliveryError>;
}

/// Acknowledges every message after a fixed delay without any network call.
#[derive(Debug, Clone)]
pub struct SimulatedDelivery {
    latency: Duration,
}

impl SimulatedDelivery {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SimulatedDelivery {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_LATENCY)
    }
}

#[async_trait]
impl DeliveryStrategy for SimulatedDelivery {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn deliver(&self, submission: &ContactSubmission) -> Result<(), DeliveryError> {
        debug!(submission = %submission.id, latency_ms = u64::try_from(self.latency.as_millis()).unwrap_or(u64::MAX), "contact: simulating delivery");
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

/// Posts the form to a third-party form relay. The relay answers a
/// successful post with a redirect to the thank-you page, which is treated as
/// delivered rather than followed.
#[derive(Debug, Clone)]
pub struct RelayDelivery {
    http: Client,
    endpoint: Url,
    redirect: Option<Url>,
    disable_captcha: bool,
}

impl RelayDelivery {
    pub fn new(endpoint: Url) -> Result<Self, reqwest::Error> {
        let http = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            http,
            endpoint,
            redirect: None,
            disable_captcha: true,
        })
    }

    pub fn with_redirect(mut self, redirect: Url) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn with_captcha_disabled(mut self, disable_captcha: bool) -> Self {
        self.disable_captcha = disable_captcha;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DeliveryStrategy for RelayDelivery {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn deliver(&self, submission: &ContactSubmission) -> Result<(), DeliveryError> {
        let form = RelayForm::new(
            &submission.fields,
            self.disable_captcha,
            self.redirect.as_ref().map(Url::as_str),
        );
        let response = self
            .http
            .post(self.endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        info!(
            submission = %submission.id,
            endpoint = %self.endpoint,
            status = status.as_u16(),
            "contact: relay responded"
        );
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
#[path = "tests/delivery_tests.rs"]
mod tests;
