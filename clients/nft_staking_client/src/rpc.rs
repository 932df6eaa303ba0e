//! Network and wallet capabilities the client is given at construction.
//!
//! The client never reaches for ambient connection or wallet state; every
//! suspending operation goes through one of these traits.

use anchor_lang::prelude::Pubkey;
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

use crate::config::Commitment;
use crate::error::{ClientError, Result};

/// Result of reading one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Found(T),
    NotFound,
    TransientError(String),
}

impl<T> FetchOutcome<T> {
    /// Applies a fallible decoder to a found value. Decoding errors are
    /// returned, never folded into `NotFound`.
    pub fn try_map<U, F>(self, decode: F) -> Result<FetchOutcome<U>>
    where
        F: FnOnce(T) -> Result<U>,
    {
        Ok(match self {
            FetchOutcome::Found(value) => FetchOutcome::Found(decode(value)?),
            FetchOutcome::NotFound => FetchOutcome::NotFound,
            FetchOutcome::TransientError(reason) => FetchOutcome::TransientError(reason),
        })
    }

    /// `NotFound` becomes `None`; a transient error is returned.
    pub fn into_option(self) -> Result<Option<T>> {
        match self {
            FetchOutcome::Found(value) => Ok(Some(value)),
            FetchOutcome::NotFound => Ok(None),
            FetchOutcome::TransientError(reason) => Err(ClientError::Transient(reason)),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }
}

/// A recent blockhash and the last block height at which it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashReference {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Status of a sent signature as reported by the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub commitment: Commitment,
    /// Program error, if the transaction landed and failed.
    pub error: Option<String>,
}

/// Source of network time in integer seconds, non-decreasing.
#[allow(async_fn_in_trait)]
pub trait NetworkClock {
    async fn network_time(&self) -> Result<i64>;
}

/// Read, send and status primitives of one network connection.
#[allow(async_fn_in_trait)]
pub trait RpcTransport: NetworkClock {
    async fn get_account_data(&self, address: &Pubkey) -> FetchOutcome<Vec<u8>>;

    async fn get_latest_blockhash(&self) -> Result<BlockhashReference>;

    async fn get_block_height(&self) -> Result<u64>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// `None` while the network has not seen the signature.
    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>>;
}

/// The holder's external signer.
#[allow(async_fn_in_trait)]
pub trait WalletSigner {
    fn pubkey(&self) -> Pubkey;

    /// Adds the holder's signature. The message's blockhash is already set.
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;
}

impl WalletSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let blockhash = transaction.message.recent_blockhash;
        transaction.try_partial_sign(&[self], blockhash)?;
        Ok(transaction)
    }
}

/// Reads `address` and decodes it with `decode`.
pub async fn fetch_record<R, T, F>(rpc: &R, address: &Pubkey, decode: F) -> Result<FetchOutcome<T>>
where
    R: RpcTransport,
    F: FnOnce(&[u8]) -> Result<T>,
{
    rpc.get_account_data(address)
        .await
        .try_map(|data| decode(&data))
}
