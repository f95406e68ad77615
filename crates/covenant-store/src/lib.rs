//! Covenant Store - keyed persistent records for pending and active agreements
//!
//! Pure key-value semantics over three record types, with atomic per-key
//! read-modify-write: every transition's precondition check and mutation run
//! inside one critical section, so no lost-update race can split a check
//! from its write. Only the state machine writes here.
//!
//! Existence convention: an agreement exists iff its `amount` field is
//! nonzero. Lookups on absent keys return a zeroed record, so "does not
//! exist" and "already consumed" are indistinguishable — exactly the
//! contract-storage semantics the settlement guard relies on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use covenant_types::{AgreementKey, CovenantError, PartyId, RequestId, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// A deposit awaiting its initial-pricing callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAgreement {
    pub party1: PartyId,
    /// Deposited amount in native raw units
    pub amount: u128,
    pub premium: u128,
}

/// A priced agreement between party1 and (eventually) a counterparty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub party1: PartyId,
    /// Unset until a counterparty enters
    pub party2: Option<PartyId>,
    /// Native deposit; nonzero iff the agreement exists
    pub amount: u128,
    /// Derived settlement amount in stable raw units
    pub transfer_amount: u128,
    pub premium: u128,
    pub expires_at: DateTime<Utc>,
    pub executed: bool,
}

impl Agreement {
    /// The zeroed record standing in for an absent key
    pub fn zeroed() -> Self {
        Self {
            party1: PartyId::from_uuid(uuid::Uuid::nil()),
            party2: None,
            amount: 0,
            transfer_amount: 0,
            premium: 0,
            expires_at: DateTime::<Utc>::MIN_UTC,
            executed: false,
        }
    }

    /// Existence marker: a nonzero deposit
    pub fn exists(&self) -> bool {
        self.amount > 0
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn enter_checks(&self, payment: u128, now: DateTime<Utc>) -> Result<()> {
        if !self.exists() {
            return Err(CovenantError::AgreementMissing);
        }
        if self.is_expired(now) {
            return Err(CovenantError::AgreementExpired);
        }
        if self.party2.is_some() {
            return Err(CovenantError::CounterpartyTaken);
        }
        if payment < self.premium {
            return Err(CovenantError::PremiumNotMet);
        }
        Ok(())
    }
}

#[derive(Default)]
struct StoreInner {
    pending: HashMap<RequestId, PendingAgreement>,
    agreements: HashMap<AgreementKey, Agreement>,
    settlements: HashMap<RequestId, AgreementKey>,
}

impl StoreInner {
    fn snapshot(&self, key: &AgreementKey) -> Agreement {
        self.agreements
            .get(key)
            .cloned()
            .unwrap_or_else(Agreement::zeroed)
    }
}

/// The Agreement Store
#[derive(Default)]
pub struct AgreementStore {
    inner: RwLock<StoreInner>,
}

impl AgreementStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Pending agreements (create -> priced callback)
    // ------------------------------------------------------------------

    /// Record a fresh deposit against its pricing correlation
    pub async fn insert_pending(&self, request_id: RequestId, record: PendingAgreement) {
        self.inner.write().await.pending.insert(request_id, record);
    }

    /// Look up a pending deposit without consuming it
    pub async fn pending(&self, request_id: &RequestId) -> Option<PendingAgreement> {
        self.inner.read().await.pending.get(request_id).cloned()
    }

    /// Promote a pending deposit into a live agreement
    ///
    /// Fails with `AgreementExists` when a live record already occupies the
    /// key — in that case the pending record is deliberately left in place.
    /// Its correlation has been answered, so the deposit is stranded there:
    /// the documented cost of colliding (party1, amount, premium) flows.
    pub async fn promote(
        &self,
        request_id: &RequestId,
        key: AgreementKey,
        agreement: Agreement,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        if !inner.pending.contains_key(request_id) {
            return Err(CovenantError::PendingMissing {
                request_id: request_id.to_string(),
            });
        }
        if inner.snapshot(&key).exists() {
            return Err(CovenantError::AgreementExists);
        }

        inner.pending.remove(request_id);
        inner.agreements.insert(key, agreement);
        info!(%key, "agreement promoted from pending");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Live agreements
    // ------------------------------------------------------------------

    /// Read the record at a key (zeroed if absent)
    pub async fn snapshot(&self, key: &AgreementKey) -> Agreement {
        self.inner.read().await.snapshot(key)
    }

    /// Run the entry preconditions without mutating
    pub async fn ensure_enterable(
        &self,
        key: &AgreementKey,
        payment: u128,
        now: DateTime<Utc>,
    ) -> Result<Agreement> {
        let inner = self.inner.read().await;
        let record = inner.snapshot(key);
        record.enter_checks(payment, now)?;
        Ok(record)
    }

    /// Set the counterparty, re-running the entry preconditions atomically
    pub async fn set_counterparty(
        &self,
        key: &AgreementKey,
        party2: PartyId,
        payment: u128,
        now: DateTime<Utc>,
    ) -> Result<Agreement> {
        let mut inner = self.inner.write().await;
        let record = inner.snapshot(key);
        record.enter_checks(payment, now)?;

        let record = inner
            .agreements
            .get_mut(key)
            .ok_or(CovenantError::AgreementMissing)?;
        record.party2 = Some(party2);
        Ok(record.clone())
    }

    /// Mark the agreement executed; caller must be the stored counterparty
    pub async fn mark_executed(&self, key: &AgreementKey, caller: &PartyId) -> Result<Agreement> {
        let mut inner = self.inner.write().await;
        let snapshot = inner.snapshot(key);
        if snapshot.party2.as_ref() != Some(caller) {
            return Err(CovenantError::IncorrectAgreement);
        }

        let record = inner
            .agreements
            .get_mut(key)
            .ok_or(CovenantError::IncorrectAgreement)?;
        record.executed = true;
        Ok(record.clone())
    }

    /// Delete an expired agreement; caller identity is already baked into
    /// the key derivation
    pub async fn remove_expired(&self, key: &AgreementKey, now: DateTime<Utc>) -> Result<Agreement> {
        let mut inner = self.inner.write().await;
        let record = inner.snapshot(key);
        if !record.exists() {
            return Err(CovenantError::AgreementMissing);
        }
        if !record.is_expired(now) {
            return Err(CovenantError::AgreementNotExpired);
        }

        inner.agreements.remove(key);
        info!(%key, "expired agreement removed");
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Pending settlements (enter -> settlement callback)
    // ------------------------------------------------------------------

    /// Map a settlement correlation to the agreement it will settle
    pub async fn insert_pending_settlement(&self, request_id: RequestId, key: AgreementKey) {
        self.inner
            .write()
            .await
            .settlements
            .insert(request_id, key);
    }

    /// Resolve and consume a settlement correlation
    ///
    /// The zero-amount guard runs on a snapshot taken inside the same
    /// critical section that deletes the record, so a second delivery of the
    /// same correlation (which the Oracle Service promises not to send)
    /// reads a zeroed record and is rejected here.
    pub async fn take_for_settlement(
        &self,
        request_id: &RequestId,
    ) -> Result<(AgreementKey, Agreement)> {
        let mut inner = self.inner.write().await;
        let key = *inner
            .settlements
            .get(request_id)
            .ok_or_else(|| CovenantError::UnknownRequest {
                request_id: request_id.to_string(),
            })?;

        let record = inner.snapshot(&key);
        if !record.exists() {
            return Err(CovenantError::AlreadySettled);
        }

        inner.settlements.remove(request_id);
        inner.agreements.remove(&key);
        info!(%key, "agreement taken for settlement");
        Ok((key, record))
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    pub async fn agreement_count(&self) -> usize {
        self.inner.read().await.agreements.len()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.read().await.pending.len()
    }

    pub async fn pending_settlement_count(&self) -> usize {
        self.inner.read().await.settlements.len()
    }
}
