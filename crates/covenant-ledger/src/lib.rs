//! Covenant Ledger - Value Ledger Adapter
//!
//! A thin boundary over the external fungible-asset transfer capability.
//! The ledger is:
//! - Asset-scoped (native value, the stable settlement asset, the oracle
//!   payment asset)
//! - Account-keyed by PartyId
//! - Append-only (the in-memory ledger journals every movement)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Zero-amount movements are rejected
//! 3. Pull-style transfers spend a prior allowance

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use covenant_types::{Asset, CovenantError, PartyId, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Side of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySide {
    /// Credit (increase) to an account
    Credit,
    /// Debit (decrease) from an account
    Debit,
}

/// A single journal entry (one side of a movement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account: PartyId,
    pub asset: Asset,
    pub side: EntrySide,
    pub amount: u128,
    pub balance_after: u128,
    pub created_at: DateTime<Utc>,
}

/// Boundary with the external Value Ledger
///
/// Native-value transfers are push-style (`transfer`); secondary-asset
/// escrow-in is pull-style (`transfer_from`, requiring a prior allowance).
#[async_trait]
pub trait ValueLedger: Send + Sync {
    /// Current balance of an account for an asset
    async fn balance(&self, account: &PartyId, asset: Asset) -> u128;

    /// Push-style transfer initiated by `from`
    async fn transfer(&self, from: &PartyId, to: &PartyId, asset: Asset, amount: u128)
        -> Result<()>;

    /// Grant `spender` the right to pull up to `amount` from `owner`
    async fn approve(&self, owner: &PartyId, spender: &PartyId, asset: Asset, amount: u128)
        -> Result<()>;

    /// Remaining allowance from `owner` to `spender`
    async fn allowance(&self, owner: &PartyId, spender: &PartyId, asset: Asset) -> u128;

    /// Pull-style transfer: `spender` moves `owner`'s funds to `to`,
    /// consuming allowance
    async fn transfer_from(
        &self,
        spender: &PartyId,
        owner: &PartyId,
        to: &PartyId,
        asset: Asset,
        amount: u128,
    ) -> Result<()>;
}

#[derive(Default)]
struct LedgerInner {
    balances: HashMap<(PartyId, Asset), u128>,
    allowances: HashMap<(PartyId, PartyId, Asset), u128>,
    entries: Vec<LedgerEntry>,
}

impl LedgerInner {
    fn balance(&self, account: &PartyId, asset: Asset) -> u128 {
        self.balances
            .get(&(account.clone(), asset))
            .copied()
            .unwrap_or(0)
    }

    fn journal(&mut self, account: &PartyId, asset: Asset, side: EntrySide, amount: u128) {
        let balance_after = self.balance(account, asset);
        self.entries.push(LedgerEntry {
            id: Uuid::new_v4(),
            account: account.clone(),
            asset,
            side,
            amount,
            balance_after,
            created_at: Utc::now(),
        });
    }

    fn move_value(
        &mut self,
        from: &PartyId,
        to: &PartyId,
        asset: Asset,
        amount: u128,
    ) -> Result<()> {
        let from_balance = self.balance(from, asset);
        let new_from = from_balance
            .checked_sub(amount)
            .ok_or_else(|| CovenantError::InsufficientFunds {
                account: from.to_string(),
                asset: asset.to_string(),
                requested: amount,
                available: from_balance,
            })?;

        let to_balance = self.balance(to, asset);
        let new_to = to_balance
            .checked_add(amount)
            .ok_or(CovenantError::AmountOverflow)?;

        self.balances.insert((from.clone(), asset), new_from);
        self.balances.insert((to.clone(), asset), new_to);
        self.journal(from, asset, EntrySide::Debit, amount);
        self.journal(to, asset, EntrySide::Credit, amount);
        Ok(())
    }
}

/// In-memory Value Ledger
///
/// Backs tests and the runnable demo. A deployment would implement
/// [`ValueLedger`] over the real transfer capability instead.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance (issuer-style credit)
    pub async fn credit(&self, account: &PartyId, asset: Asset, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(CovenantError::invalid_amount(
                "Amount must be greater than zero",
            ));
        }
        let mut inner = self.inner.write().await;
        let balance = inner.balance(account, asset);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(CovenantError::AmountOverflow)?;
        inner.balances.insert((account.clone(), asset), new_balance);
        inner.journal(account, asset, EntrySide::Credit, amount);
        Ok(())
    }

    /// Total number of journal entries
    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Recent journal entries (newest first)
    pub async fn recent_entries(&self, limit: usize) -> Vec<LedgerEntry> {
        let inner = self.inner.read().await;
        inner.entries.iter().rev().take(limit).cloned().collect()
    }
}

#[async_trait]
impl ValueLedger for InMemoryLedger {
    async fn balance(&self, account: &PartyId, asset: Asset) -> u128 {
        self.inner.read().await.balance(account, asset)
    }

    async fn transfer(
        &self,
        from: &PartyId,
        to: &PartyId,
        asset: Asset,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(CovenantError::invalid_amount(
                "Amount must be greater than zero",
            ));
        }
        let mut inner = self.inner.write().await;
        inner.move_value(from, to, asset, amount)?;
        info!(%from, %to, %asset, amount, "ledger transfer");
        Ok(())
    }

    async fn approve(
        &self,
        owner: &PartyId,
        spender: &PartyId,
        asset: Asset,
        amount: u128,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .allowances
            .insert((owner.clone(), spender.clone(), asset), amount);
        Ok(())
    }

    async fn allowance(&self, owner: &PartyId, spender: &PartyId, asset: Asset) -> u128 {
        self.inner
            .read()
            .await
            .allowances
            .get(&(owner.clone(), spender.clone(), asset))
            .copied()
            .unwrap_or(0)
    }

    async fn transfer_from(
        &self,
        spender: &PartyId,
        owner: &PartyId,
        to: &PartyId,
        asset: Asset,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(CovenantError::invalid_amount(
                "Amount must be greater than zero",
            ));
        }
        let mut inner = self.inner.write().await;

        let granted = inner
            .allowances
            .get(&(owner.clone(), spender.clone(), asset))
            .copied()
            .unwrap_or(0);
        let remaining =
            granted
                .checked_sub(amount)
                .ok_or_else(|| CovenantError::InsufficientAllowance {
                    owner: owner.to_string(),
                    spender: spender.to_string(),
                    asset: asset.to_string(),
                    requested: amount,
                    available: granted,
                })?;

        inner.move_value(owner, to, asset, amount)?;
        inner
            .allowances
            .insert((owner.clone(), spender.clone(), asset), remaining);
        info!(%owner, %spender, %to, %asset, amount, "ledger pull");
        Ok(())
    }
}
