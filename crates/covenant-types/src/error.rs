//! Error types for Covenant
//!
//! All errors are explicit; a failed transition surfaces exactly one of
//! these and leaves no partial state behind.

use thiserror::Error;

/// Result type for Covenant operations
pub type Result<T> = std::result::Result<T, CovenantError>;

/// Covenant error types
#[derive(Debug, Clone, Error)]
pub enum CovenantError {
    // ========================================================================
    // Input Validation
    // ========================================================================

    /// Zero value accompanied a call that requires payment
    #[error("No payment given")]
    NoPayment,

    /// The entry payment does not cover the stored premium
    #[error("Premium amount not met")]
    PremiumNotMet,

    /// Checked arithmetic overflowed
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    // ========================================================================
    // Agreement State
    // ========================================================================

    /// A live agreement already occupies the derived key
    #[error("Agreement already exists")]
    AgreementExists,

    /// No live agreement at the derived key
    #[error("Agreement does not exist")]
    AgreementMissing,

    /// The agreement's expiration timestamp has not passed yet
    #[error("Agreement is not expired")]
    AgreementNotExpired,

    /// The agreement's expiration timestamp has passed
    #[error("Agreement is expired")]
    AgreementExpired,

    /// A counterparty has already entered the agreement
    #[error("Agreement already has counterparty")]
    CounterpartyTaken,

    /// The caller is not the stored counterparty
    #[error("Incorrect agreement")]
    IncorrectAgreement,

    /// The settlement callback resolved to a zeroed (consumed) agreement
    #[error("Agreement already executed")]
    AlreadySettled,

    /// No pending record for the given correlation ID
    #[error("Pending agreement {request_id} not found")]
    PendingMissing { request_id: String },

    // ========================================================================
    // Oracle Boundary
    // ========================================================================

    /// Callback correlation ID matches no outstanding request
    #[error("Unknown oracle request {request_id}")]
    UnknownRequest { request_id: String },

    /// Callback came from an account other than the addressed oracle
    #[error("Caller {caller} is not the oracle for request {request_id}")]
    UnauthorizedCallback { request_id: String, caller: String },

    /// Cancellation attempted before the request's expiration window passed
    #[error("Request is not expired")]
    RequestNotExpired,

    // ========================================================================
    // Value Ledger
    // ========================================================================

    /// The counterparty has not approved the settlement-asset pull
    #[error("Settlement asset not approved")]
    EscrowNotApproved,

    /// Account balance cannot cover the transfer
    #[error("Insufficient funds in {account}: requested {requested} {asset}, available {available}")]
    InsufficientFunds {
        account: String,
        asset: String,
        requested: u128,
        available: u128,
    },

    /// Allowance cannot cover the pull
    #[error("Insufficient allowance from {owner} to {spender}: requested {requested} {asset}, available {available}")]
    InsufficientAllowance {
        owner: String,
        spender: String,
        asset: String,
        requested: u128,
        available: u128,
    },

    /// Zero-amount or otherwise malformed value movement
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    // ========================================================================
    // Access Control
    // ========================================================================

    /// Caller is not the administrator
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },
}

impl CovenantError {
    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    /// Check if the error was rejected at the oracle callback boundary,
    /// before any state-machine logic ran
    pub fn is_callback_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownRequest { .. } | Self::UnauthorizedCallback { .. }
        )
    }

    /// Get an error code for logs and API surfaces
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoPayment => "NO_PAYMENT",
            Self::PremiumNotMet => "PREMIUM_NOT_MET",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AgreementExists => "AGREEMENT_EXISTS",
            Self::AgreementMissing => "AGREEMENT_MISSING",
            Self::AgreementNotExpired => "AGREEMENT_NOT_EXPIRED",
            Self::AgreementExpired => "AGREEMENT_EXPIRED",
            Self::CounterpartyTaken => "COUNTERPARTY_TAKEN",
            Self::IncorrectAgreement => "INCORRECT_AGREEMENT",
            Self::AlreadySettled => "ALREADY_SETTLED",
            Self::PendingMissing { .. } => "PENDING_MISSING",
            Self::UnknownRequest { .. } => "UNKNOWN_REQUEST",
            Self::UnauthorizedCallback { .. } => "UNAUTHORIZED_CALLBACK",
            Self::RequestNotExpired => "REQUEST_NOT_EXPIRED",
            Self::EscrowNotApproved => "ESCROW_NOT_APPROVED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
        }
    }
}
