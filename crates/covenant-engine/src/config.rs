//! Engine configuration
//!
//! All knobs the administrator can tune at runtime, plus the lifecycle
//! windows. Durations are configured in seconds so the config stays
//! serde-friendly.

use chrono::Duration;
use covenant_types::{JobId, ONE_UNIT};
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fee paid per oracle request, in oracle-payment raw units
    #[serde(default = "default_oracle_payment")]
    pub oracle_payment: u128,

    /// Job the Oracle Service runs for initial pricing
    #[serde(default = "default_pricing_job")]
    pub pricing_job: JobId,

    /// Job the Oracle Service runs for the delayed settlement trigger
    #[serde(default = "default_settlement_job")]
    pub settlement_job: JobId,

    /// Data path the pricing job resolves
    #[serde(default = "default_price_path")]
    pub price_path: String,

    /// How long a priced agreement stays open for entry
    #[serde(default = "default_agreement_valid_period_secs")]
    pub agreement_valid_period_secs: i64,

    /// Delay between entry and the settlement trigger
    #[serde(default = "default_settlement_delay_secs")]
    pub settlement_delay_secs: i64,

    /// Window after which a stuck request becomes cancellable
    #[serde(default = "default_request_ttl_secs")]
    pub request_ttl_secs: i64,
}

fn default_oracle_payment() -> u128 {
    // 0.1 payment units per request
    ONE_UNIT / 10
}

fn default_pricing_job() -> JobId {
    JobId::new("agreement-pricing")
}

fn default_settlement_job() -> JobId {
    JobId::new("settlement-trigger")
}

fn default_price_path() -> String {
    "USD".to_string()
}

fn default_agreement_valid_period_secs() -> i64 {
    // 1 day
    86_400
}

fn default_settlement_delay_secs() -> i64 {
    // 30 days
    2_592_000
}

fn default_request_ttl_secs() -> i64 {
    // 5 minutes
    300
}

impl EngineConfig {
    pub fn agreement_valid_period(&self) -> Duration {
        Duration::seconds(self.agreement_valid_period_secs)
    }

    pub fn settlement_delay(&self) -> Duration {
        Duration::seconds(self.settlement_delay_secs)
    }

    pub fn request_ttl(&self) -> Duration {
        Duration::seconds(self.request_ttl_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            oracle_payment: default_oracle_payment(),
            pricing_job: default_pricing_job(),
            settlement_job: default_settlement_job(),
            price_path: default_price_path(),
            agreement_valid_period_secs: default_agreement_valid_period_secs(),
            settlement_delay_secs: default_settlement_delay_secs(),
            request_ttl_secs: default_request_ttl_secs(),
        }
    }
}
