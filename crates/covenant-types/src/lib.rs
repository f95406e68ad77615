//! Covenant Types - Canonical domain types for the agreement engine
//!
//! This crate contains all foundational types for Covenant with zero
//! dependencies on other covenant crates. It defines:
//!
//! - Identity types (PartyId, RequestId, JobId)
//! - Asset and fixed-point amount conventions
//! - The derived agreement key
//! - The workspace-wide error type
//!
//! # Architectural Invariants
//!
//! 1. Amounts are raw `u128` smallest units; arithmetic is checked integer
//!    arithmetic, never floating point
//! 2. The agreement key depends only on (party1, amount, premium)
//! 3. Every failure is explicit and carries a human-readable reason

pub mod asset;
pub mod error;
pub mod identity;
pub mod key;

pub use asset::*;
pub use error::*;
pub use identity::*;
pub use key::*;

/// Version of the Covenant types schema
pub const TYPES_VERSION: &str = "0.1.0";
