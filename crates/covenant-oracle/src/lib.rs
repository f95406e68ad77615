//! Covenant Oracle - Oracle Request Gateway
//!
//! Builds request descriptors, submits them to the external Oracle Service,
//! and records a pending correlation per outstanding request. Callbacks are
//! authorized per-request: the caller must be the oracle account the request
//! was addressed to, and the correlation must still be outstanding.
//!
//! Timing lives on the oracle side. The gateway never polls; the "wait
//! until" delay for settlement triggers travels inside the request
//! parameters and the Oracle Service invokes the callback when it elapses.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use covenant_types::{Asset, CovenantError, JobId, PartyId, RequestId, Result};
use covenant_ledger::ValueLedger;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Which engine entry point the callback will target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackKind {
    /// Initial pricing of a pending agreement
    Pricing,
    /// Delayed settlement trigger
    Settlement,
}

/// Opaque parameter carried inside a request descriptor
///
/// The gateway does not interpret these; the Oracle Service does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestParam {
    /// Invoke the callback no earlier than this timestamp
    Until(DateTime<Utc>),
    /// Data path the job should resolve (e.g. a quote symbol)
    Path(String),
}

/// A fully built oracle request descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    pub id: RequestId,
    pub job: JobId,
    /// The oracle account this request is addressed to; only it may answer
    pub oracle: PartyId,
    pub callback: CallbackKind,
    /// Fee paid in [`Asset::OracleFee`] on submission
    pub fee: u128,
    pub params: Vec<RequestParam>,
}

/// Boundary with the external Oracle Service transport
#[async_trait]
pub trait OracleService: Send + Sync {
    /// Hand a request descriptor to the oracle network
    async fn deliver(&self, request: OracleRequest) -> Result<()>;
}

/// Test double that records every delivered descriptor
#[derive(Clone, Default)]
pub struct RecordingOracle {
    requests: Arc<RwLock<Vec<OracleRequest>>>,
}

impl RecordingOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn requests(&self) -> Vec<OracleRequest> {
        self.requests.read().await.clone()
    }

    pub async fn last_request(&self) -> Option<OracleRequest> {
        self.requests.read().await.last().cloned()
    }
}

#[async_trait]
impl OracleService for RecordingOracle {
    async fn deliver(&self, request: OracleRequest) -> Result<()> {
        self.requests.write().await.push(request);
        Ok(())
    }
}

/// An outstanding correlation awaiting its callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub oracle: PartyId,
    pub callback: CallbackKind,
    pub fee: u128,
    /// After this instant the administrator may cancel the stuck request
    pub expires_at: DateTime<Utc>,
}

/// The Oracle Request Gateway
///
/// Owns the pending-correlation registry and pays the per-request fee from
/// the submitting account.
pub struct OracleGateway {
    ledger: Arc<dyn ValueLedger>,
    service: Arc<dyn OracleService>,
    pending: RwLock<HashMap<RequestId, PendingRequest>>,
}

impl OracleGateway {
    pub fn new(ledger: Arc<dyn ValueLedger>, service: Arc<dyn OracleService>) -> Self {
        Self {
            ledger,
            service,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Build and submit a request; returns the fresh correlation ID
    ///
    /// The fee moves from `payer` to the oracle account before the
    /// descriptor leaves the gateway; a fee failure aborts the submission
    /// with nothing recorded.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit(
        &self,
        payer: &PartyId,
        oracle: &PartyId,
        job: JobId,
        callback: CallbackKind,
        fee: u128,
        params: Vec<RequestParam>,
        expires_at: DateTime<Utc>,
    ) -> Result<RequestId> {
        let id = RequestId::new();
        let request = OracleRequest {
            id: id.clone(),
            job: job.clone(),
            oracle: oracle.clone(),
            callback,
            fee,
            params,
        };

        if fee > 0 {
            self.ledger
                .transfer(payer, oracle, Asset::OracleFee, fee)
                .await?;
        }
        self.service.deliver(request).await?;

        self.pending.write().await.insert(
            id.clone(),
            PendingRequest {
                oracle: oracle.clone(),
                callback,
                fee,
                expires_at,
            },
        );

        info!(request = %id, %job, ?callback, fee, "oracle request submitted");
        Ok(id)
    }

    /// Authorize a callback without consuming the correlation
    ///
    /// Rejects unknown correlations, wrong-oracle callers, and callbacks
    /// aimed at the wrong engine entry point. Runs before any state-machine
    /// logic.
    pub async fn verify(
        &self,
        caller: &PartyId,
        request_id: &RequestId,
        expected: CallbackKind,
    ) -> Result<()> {
        let pending = self.pending.read().await;
        let record = pending
            .get(request_id)
            .ok_or_else(|| CovenantError::UnknownRequest {
                request_id: request_id.to_string(),
            })?;

        if &record.oracle != caller {
            warn!(request = %request_id, %caller, "callback from wrong oracle");
            return Err(CovenantError::UnauthorizedCallback {
                request_id: request_id.to_string(),
                caller: caller.to_string(),
            });
        }

        if record.callback != expected {
            return Err(CovenantError::UnknownRequest {
                request_id: request_id.to_string(),
            });
        }

        Ok(())
    }

    /// Consume a verified correlation exactly once
    pub async fn consume(&self, request_id: &RequestId) -> Result<PendingRequest> {
        self.pending
            .write()
            .await
            .remove(request_id)
            .ok_or_else(|| CovenantError::UnknownRequest {
                request_id: request_id.to_string(),
            })
    }

    /// Cancel a stuck request after its expiration window passed
    ///
    /// The committed fee is forfeited and nothing is retried.
    pub async fn cancel(&self, request_id: &RequestId, now: DateTime<Utc>) -> Result<PendingRequest> {
        let mut pending = self.pending.write().await;
        let record = pending
            .get(request_id)
            .cloned()
            .ok_or_else(|| CovenantError::UnknownRequest {
                request_id: request_id.to_string(),
            })?;

        if now < record.expires_at {
            return Err(CovenantError::RequestNotExpired);
        }

        pending.remove(request_id);
        warn!(request = %request_id, "stuck oracle request cancelled, fee forfeited");
        Ok(record)
    }

    /// Number of outstanding correlations
    pub async fn outstanding(&self) -> usize {
        self.pending.read().await.len()
    }
}
