//! Error types for the staking client.
//!
//! Every failure the client can surface is a variant of [`ClientError`].
//! Variants are grouped by the stage at which they occur:
//!
//! ## Error Groups
//! - Construction: caller contract violations caught before any network call
//! - Derivation: PDA search exhaustion
//! - Decoding: account data that does not match the expected record layout
//! - Submission: signing or sending rejected, local state untouched
//! - Confirmation: sent but not observed finalized
//! - Fetch: read-back failures

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::program_error::ProgramError;
use solana_sdk::signature::Signature;
use solana_sdk::signer::SignerError;

/// Result alias used throughout the client.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by the staking client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // ========== Construction Errors ==========

    /// A required identity was left unset (the all-zero key).
    #[error("Missing required identity: {role}")]
    MissingIdentity { role: &'static str },

    /// The requested action is not valid from the record's current state.
    #[error("Cannot {action} while record is {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// The holding account does not custody the collectible for this owner.
    #[error("Collectible is not held in the designated holding account")]
    CollectibleNotHeld,

    /// Cumulative reward has not reached the next lootbox threshold.
    #[error("Cumulative reward {cumulative} is below the lootbox threshold {threshold}")]
    BelowLootboxThreshold { cumulative: u64, threshold: u64 },

    /// No lootbox reward is pending redemption.
    #[error("No lootbox reward is pending redemption")]
    LootboxNotRedeemable,

    /// A lootbox reward is already pending; redeem it before opening another.
    #[error("A lootbox reward is already pending redemption")]
    LootboxPending,

    /// The lootbox user record already exists.
    #[error("Lootbox is already enabled for this owner")]
    LootboxAlreadyEnabled,

    /// The lootbox user record does not exist yet.
    #[error("Lootbox is not enabled for this owner")]
    LootboxNotEnabled,

    /// An instruction helper rejected its inputs.
    #[error("Failed to build instruction: {0}")]
    Instruction(ProgramError),

    /// Another operation is still in flight on this client.
    #[error("Another operation is already in flight")]
    Busy,

    // ========== Derivation Errors ==========

    /// No bump in 255..=0 produced an off-curve address.
    #[error("Unable to find a viable program address bump seed")]
    DerivationExhausted,

    // ========== Decoding Errors ==========

    /// Account data shorter than the fixed record layout.
    #[error("Account data too small: expected {expected} bytes, got {actual}")]
    AccountDataTooSmall { expected: usize, actual: usize },

    /// Account data belongs to a different record type.
    #[error("Account discriminator mismatch for {record}")]
    DiscriminatorMismatch { record: &'static str },

    /// Stake state byte outside the known variants.
    #[error("Invalid stake state tag {0}")]
    InvalidStakeState(u8),

    /// Token account data could not be unpacked.
    #[error("Invalid token account data")]
    InvalidTokenAccount,

    /// Borsh encoding or decoding failed.
    #[error("Borsh codec error: {0}")]
    Codec(#[from] std::io::Error),

    // ========== Submission Errors ==========

    /// The wallet declined to sign.
    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    /// Partial signing with an extra signer failed.
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    /// The network refused the transaction.
    #[error("Failed to send transaction: {0}")]
    SendFailed(String),

    /// The transaction landed but the program returned an error.
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },

    // ========== Confirmation Errors ==========

    /// Not observed finalized within the polling window; outcome unknown.
    #[error("Transaction {signature} was not finalized in time; outcome unknown")]
    ConfirmationTimeout { signature: Signature },

    /// The blockhash expired before the transaction was observed.
    #[error("Blockhash expired before transaction {signature} was confirmed")]
    BlockhashExpired { signature: Signature },

    /// Finalized, but the mutated records could not be read back yet.
    #[error("Transaction {signature} finalized but read-back is pending: {reason}")]
    ReadBackPending { signature: Signature, reason: String },

    // ========== Fetch Errors ==========

    /// The record does not exist.
    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),

    /// Network error while reading.
    #[error("Transient network error: {0}")]
    Transient(String),
}

impl ClientError {
    /// True when the network-side outcome is unknown and the next re-fetch is
    /// the only source of truth.
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, ClientError::ConfirmationTimeout { .. })
    }

    /// True when the transaction is known to have landed and only the
    /// read-back failed.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ClientError::ReadBackPending { .. })
    }

    /// True for failures detected before anything was sent.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            ClientError::MissingIdentity { .. }
                | ClientError::InvalidTransition { .. }
                | ClientError::CollectibleNotHeld
                | ClientError::BelowLootboxThreshold { .. }
                | ClientError::LootboxNotRedeemable
                | ClientError::LootboxPending
                | ClientError::LootboxAlreadyEnabled
                | ClientError::LootboxNotEnabled
                | ClientError::Instruction(_)
                | ClientError::Busy
        )
    }
}
