//! The Agreement State Machine
//!
//! Each externally visible operation runs to completion without internal
//! suspension; callbacks are matched to outstanding requests strictly by
//! correlation ID and authorized per-request at the gateway boundary.

use std::sync::Arc;

use chrono::Utc;
use covenant_ledger::ValueLedger;
use covenant_oracle::{CallbackKind, OracleGateway, OracleService, RequestParam};
use covenant_store::{Agreement, AgreementStore, PendingAgreement};
use covenant_types::{
    derived_transfer_amount, AgreementKey, Asset, CovenantError, JobId, PartyId, RequestId, Result,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::EngineConfig;
use crate::guard::AdminGuard;

/// What a settlement callback moved, and to whom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// The counterparty executed: stable units go to party1, the deposit
    /// returns to party2
    Physical {
        party1: PartyId,
        party2: PartyId,
        transfer_amount: u128,
        deposit: u128,
    },
    /// No execution happened: only the original depositor is made whole
    Unwound { party1: PartyId, deposit: u128 },
}

/// The agreement lifecycle orchestrator
///
/// Owns a custody account that holds deposits, escrowed stable units, and
/// the oracle-fee float.
pub struct AgreementEngine {
    config: RwLock<EngineConfig>,
    guard: AdminGuard,
    engine_account: PartyId,
    oracle_account: PartyId,
    store: AgreementStore,
    gateway: OracleGateway,
    ledger: Arc<dyn ValueLedger>,
}

impl AgreementEngine {
    pub fn new(
        config: EngineConfig,
        admin: PartyId,
        oracle_account: PartyId,
        ledger: Arc<dyn ValueLedger>,
        service: Arc<dyn OracleService>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            guard: AdminGuard::new(admin),
            engine_account: PartyId::new(),
            oracle_account,
            store: AgreementStore::new(),
            gateway: OracleGateway::new(ledger.clone(), service),
            ledger,
        }
    }

    /// The custody account holding deposits, escrow, and the fee float
    pub fn engine_account(&self) -> &PartyId {
        &self.engine_account
    }

    /// The oracle account requests are addressed to
    pub fn oracle_account(&self) -> &PartyId {
        &self.oracle_account
    }

    /// The current administrator
    pub async fn admin(&self) -> PartyId {
        self.guard.admin().await
    }

    /// The live agreement for (party1, amount, premium), if any
    pub async fn agreement(
        &self,
        party1: &PartyId,
        amount: u128,
        premium: u128,
    ) -> Option<Agreement> {
        let key = AgreementKey::derive(party1, amount, premium);
        let record = self.store.snapshot(&key).await;
        record.exists().then_some(record)
    }

    /// Number of oracle correlations still awaiting callbacks
    pub async fn outstanding_requests(&self) -> usize {
        self.gateway.outstanding().await
    }

    /// Number of deposits awaiting their pricing callback
    pub async fn pending_agreements(&self) -> usize {
        self.store.pending_count().await
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Deposit value and request initial pricing
    ///
    /// The deposit moves into custody and waits there; no agreement exists
    /// until the pricing callback lands.
    pub async fn create_agreement(
        &self,
        party1: &PartyId,
        deposit: u128,
        premium: u128,
    ) -> Result<RequestId> {
        if deposit == 0 {
            return Err(CovenantError::NoPayment);
        }

        let config = self.config.read().await.clone();
        self.ensure_fee_float(config.oracle_payment).await?;

        self.ledger
            .transfer(party1, &self.engine_account, Asset::Native, deposit)
            .await?;

        let request_id = self
            .gateway
            .submit(
                &self.engine_account,
                &self.oracle_account,
                config.pricing_job.clone(),
                CallbackKind::Pricing,
                config.oracle_payment,
                vec![RequestParam::Path(config.price_path.clone())],
                Utc::now() + config.request_ttl(),
            )
            .await?;

        self.store
            .insert_pending(
                request_id.clone(),
                PendingAgreement {
                    party1: party1.clone(),
                    amount: deposit,
                    premium,
                },
            )
            .await;

        info!(%party1, deposit, premium, request = %request_id, "agreement created, awaiting pricing");
        Ok(request_id)
    }

    /// Pricing callback: finalize the agreement at the reported value
    ///
    /// Only the oracle the request was addressed to may call this, and only
    /// while the correlation is outstanding.
    pub async fn initialize_agreement(
        &self,
        caller: &PartyId,
        request_id: &RequestId,
        raw_value: u128,
    ) -> Result<AgreementKey> {
        self.gateway
            .verify(caller, request_id, CallbackKind::Pricing)
            .await?;

        let pending =
            self.store
                .pending(request_id)
                .await
                .ok_or_else(|| CovenantError::PendingMissing {
                    request_id: request_id.to_string(),
                })?;

        let transfer_amount = derived_transfer_amount(raw_value, pending.amount)?;
        let key = AgreementKey::derive(&pending.party1, pending.amount, pending.premium);
        let expires_at = {
            let config = self.config.read().await;
            Utc::now() + config.agreement_valid_period()
        };

        self.store
            .promote(
                request_id,
                key,
                Agreement {
                    party1: pending.party1.clone(),
                    party2: None,
                    amount: pending.amount,
                    transfer_amount,
                    premium: pending.premium,
                    expires_at,
                    executed: false,
                },
            )
            .await?;
        self.gateway.consume(request_id).await?;

        info!(%key, raw_value, transfer_amount, "agreement priced");
        Ok(key)
    }

    /// Enter an agreement as the counterparty, paying the premium
    ///
    /// Schedules the delayed settlement trigger and forwards the premium to
    /// party1. Payment beyond the premium stays in custody.
    pub async fn enter_agreement(
        &self,
        caller: &PartyId,
        party1: &PartyId,
        amount: u128,
        premium: u128,
        payment: u128,
    ) -> Result<RequestId> {
        if payment == 0 {
            return Err(CovenantError::NoPayment);
        }

        let key = AgreementKey::derive(party1, amount, premium);
        let now = Utc::now();
        self.store.ensure_enterable(&key, payment, now).await?;

        let config = self.config.read().await.clone();
        self.ensure_fee_float(config.oracle_payment).await?;

        self.ledger
            .transfer(caller, &self.engine_account, Asset::Native, payment)
            .await?;
        let agreement = self
            .store
            .set_counterparty(&key, caller.clone(), payment, now)
            .await?;

        let settle_at = now + config.settlement_delay();
        let request_id = self
            .gateway
            .submit(
                &self.engine_account,
                &self.oracle_account,
                config.settlement_job.clone(),
                CallbackKind::Settlement,
                config.oracle_payment,
                vec![RequestParam::Until(settle_at)],
                settle_at + config.request_ttl(),
            )
            .await?;
        self.store
            .insert_pending_settlement(request_id.clone(), key)
            .await;

        if agreement.premium > 0 {
            self.ledger
                .transfer(&self.engine_account, party1, Asset::Native, agreement.premium)
                .await?;
        }

        info!(%key, party2 = %caller, request = %request_id, "agreement entered, settlement scheduled");
        Ok(request_id)
    }

    /// Execute the agreement: escrow the settlement asset
    ///
    /// Pulls `transfer_amount` stable units from the counterparty into
    /// custody; the whole call fails if the pull is not approved.
    pub async fn execute_agreement(
        &self,
        caller: &PartyId,
        party1: &PartyId,
        amount: u128,
        premium: u128,
    ) -> Result<()> {
        let key = AgreementKey::derive(party1, amount, premium);
        let snapshot = self.store.snapshot(&key).await;
        if snapshot.party2.as_ref() != Some(caller) {
            return Err(CovenantError::IncorrectAgreement);
        }

        if snapshot.transfer_amount > 0 {
            self.ledger
                .transfer_from(
                    &self.engine_account,
                    caller,
                    &self.engine_account,
                    Asset::Stable,
                    snapshot.transfer_amount,
                )
                .await
                .map_err(|_| CovenantError::EscrowNotApproved)?;
        }
        self.store.mark_executed(&key, caller).await?;

        info!(%key, party2 = %caller, escrowed = snapshot.transfer_amount, "agreement executed");
        Ok(())
    }

    /// Settlement callback: distribute custody to the right party
    ///
    /// Deletes the agreement and its correlation before any value moves.
    pub async fn settle_agreement(
        &self,
        caller: &PartyId,
        request_id: &RequestId,
    ) -> Result<SettlementOutcome> {
        self.gateway
            .verify(caller, request_id, CallbackKind::Settlement)
            .await?;

        let (key, agreement) = self.store.take_for_settlement(request_id).await?;
        self.gateway.consume(request_id).await?;

        let outcome = if agreement.executed {
            let party2 = agreement
                .party2
                .clone()
                .ok_or(CovenantError::IncorrectAgreement)?;
            if agreement.transfer_amount > 0 {
                self.ledger
                    .transfer(
                        &self.engine_account,
                        &agreement.party1,
                        Asset::Stable,
                        agreement.transfer_amount,
                    )
                    .await?;
            }
            self.ledger
                .transfer(&self.engine_account, &party2, Asset::Native, agreement.amount)
                .await?;
            SettlementOutcome::Physical {
                party1: agreement.party1.clone(),
                party2,
                transfer_amount: agreement.transfer_amount,
                deposit: agreement.amount,
            }
        } else {
            self.ledger
                .transfer(
                    &self.engine_account,
                    &agreement.party1,
                    Asset::Native,
                    agreement.amount,
                )
                .await?;
            SettlementOutcome::Unwound {
                party1: agreement.party1.clone(),
                deposit: agreement.amount,
            }
        };

        info!(%key, executed = agreement.executed, "agreement settled");
        Ok(outcome)
    }

    /// Reclaim the deposit from an expired agreement
    ///
    /// The caller is implicitly party1: the key derivation embeds their
    /// identity, so nobody else's (amount, premium) resolves to this record.
    pub async fn end_expired_agreement(
        &self,
        caller: &PartyId,
        amount: u128,
        premium: u128,
    ) -> Result<()> {
        let key = AgreementKey::derive(caller, amount, premium);
        let agreement = self.store.remove_expired(&key, Utc::now()).await?;

        self.ledger
            .transfer(&self.engine_account, caller, Asset::Native, agreement.amount)
            .await?;

        info!(%key, refunded = agreement.amount, "expired agreement ended");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Update the per-request oracle fee
    pub async fn set_oracle_payment(&self, caller: &PartyId, fee: u128) -> Result<()> {
        self.guard.ensure(caller).await?;
        self.config.write().await.oracle_payment = fee;
        Ok(())
    }

    /// Update the oracle job identifiers
    pub async fn set_jobs(
        &self,
        caller: &PartyId,
        pricing_job: JobId,
        settlement_job: JobId,
    ) -> Result<()> {
        self.guard.ensure(caller).await?;
        let mut config = self.config.write().await;
        config.pricing_job = pricing_job;
        config.settlement_job = settlement_job;
        Ok(())
    }

    /// Cancel a stuck oracle request after its expiration window
    ///
    /// Forfeits the committed fee. A deposit already committed to the
    /// cancelled flow stays where it is; there is no in-lifecycle recovery.
    pub async fn cancel_request(&self, caller: &PartyId, request_id: &RequestId) -> Result<()> {
        self.guard.ensure(caller).await?;
        self.gateway.cancel(request_id, Utc::now()).await?;
        Ok(())
    }

    /// Sweep the custody account's oracle-fee balance
    pub async fn withdraw_fee_balance(&self, caller: &PartyId, to: &PartyId) -> Result<u128> {
        self.guard.ensure(caller).await?;
        let balance = self
            .ledger
            .balance(&self.engine_account, Asset::OracleFee)
            .await;
        if balance > 0 {
            self.ledger
                .transfer(&self.engine_account, to, Asset::OracleFee, balance)
                .await?;
        }
        info!(%to, amount = balance, "fee balance withdrawn");
        Ok(balance)
    }

    /// Hand administration to a new identity
    pub async fn transfer_admin(&self, caller: &PartyId, new_admin: PartyId) -> Result<()> {
        self.guard.transfer(caller, new_admin).await
    }

    // ------------------------------------------------------------------

    /// Verify the custody account can cover the next oracle fee
    ///
    /// Checked before pulling the caller's value so a fee shortfall cannot
    /// strand a fresh deposit in custody.
    async fn ensure_fee_float(&self, fee: u128) -> Result<()> {
        if fee == 0 {
            return Ok(());
        }
        let available = self
            .ledger
            .balance(&self.engine_account, Asset::OracleFee)
            .await;
        if available < fee {
            return Err(CovenantError::InsufficientFunds {
                account: self.engine_account.to_string(),
                asset: Asset::OracleFee.to_string(),
                requested: fee,
                available,
            });
        }
        Ok(())
    }
}
