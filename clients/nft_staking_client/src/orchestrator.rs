//! Transaction submission and confirmation.
//!
//! Handles building, signing, sending and awaiting one transaction.
//!
//! ## Guarantees
//! - Confirmation is awaited at finalized commitment before `submit` returns
//! - A failed attempt is discarded; a retry must rebuild with a fresh blockhash
//! - Nothing is written to local state here; callers re-fetch after success

use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use log::{debug, info, warn};
use solana_sdk::message::Message;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;

use crate::config::{ClientConfig, Commitment};
use crate::error::{ClientError, Result};
use crate::rpc::{BlockhashReference, RpcTransport, WalletSigner};

/// Submits instruction bundles on behalf of one wallet.
pub struct TransactionOrchestrator<R, W> {
    rpc: R,
    wallet: W,
    commitment: Commitment,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl<R, W> TransactionOrchestrator<R, W>
where
    R: RpcTransport,
    W: WalletSigner,
{
    pub fn new(rpc: R, wallet: W, config: &ClientConfig) -> Self {
        Self {
            rpc,
            wallet,
            commitment: config.commitment(),
            poll_interval: config.poll_interval,
            confirmation_timeout: config.confirmation_timeout,
        }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Commitment `submit` waits for.
    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Fee payer and primary signer.
    pub fn payer(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    /// Signs, sends and awaits `instructions` as one transaction.
    ///
    /// `extra_signers` sign before the wallet does (e.g. a fresh VRF keypair).
    ///
    /// # Errors
    /// - `SigningRejected` / `Signer` / `SendFailed` when nothing reached the network
    /// - `TransactionFailed` when the program rejected it
    /// - `BlockhashExpired` when it was never observed before expiry
    /// - `ConfirmationTimeout` when the outcome is unknown
    pub async fn submit(&self, instructions: &[Instruction], extra_signers: &[&Keypair]) -> Result<Signature> {
        let reference = self.rpc.get_latest_blockhash().await?;
        let transaction = self.build(instructions, extra_signers, &reference)?;

        let transaction = self.wallet.sign_transaction(transaction).await?;
        let signature = self.rpc.send_transaction(&transaction).await?;
        info!(
            "Sent transaction {} ({} instructions)",
            signature,
            instructions.len()
        );

        self.await_commitment(&signature, reference.last_valid_block_height)
            .await?;
        info!("Transaction {} reached {:?}", signature, self.commitment);

        Ok(signature)
    }

    fn build(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
        reference: &BlockhashReference,
    ) -> Result<Transaction> {
        let payer = self.payer();
        let message = Message::new(instructions, Some(&payer));
        let mut transaction = Transaction::new_unsigned(message);
        transaction.message.recent_blockhash = reference.blockhash;

        if !extra_signers.is_empty() {
            transaction.try_partial_sign(extra_signers, reference.blockhash)?;
        }

        Ok(transaction)
    }

    /// Polls until `signature` reaches the target commitment, fails, expires
    /// or the confirmation window closes.
    pub async fn await_commitment(&self, signature: &Signature, last_valid_block_height: u64) -> Result<()> {
        let polling = self.poll_until_committed(signature, last_valid_block_height);
        match tokio::time::timeout(self.confirmation_timeout, polling).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Transaction {} not finalized in time", signature);
                Err(ClientError::ConfirmationTimeout {
                    signature: *signature,
                })
            }
        }
    }

    async fn poll_until_committed(&self, signature: &Signature, last_valid_block_height: u64) -> Result<()> {
        loop {
            match self.rpc.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(reason) = status.error {
                        return Err(ClientError::TransactionFailed {
                            signature: *signature,
                            reason,
                        });
                    }
                    if status.commitment >= self.commitment {
                        return Ok(());
                    }
                    debug!("Transaction {} at {:?}", signature, status.commitment);
                }
                Ok(None) => match self.rpc.get_block_height().await {
                    Ok(height) if height > last_valid_block_height => {
                        return Err(ClientError::BlockhashExpired {
                            signature: *signature,
                        });
                    }
                    Ok(_) => {}
                    Err(err) => warn!("Block height poll failed: {}", err),
                },
                // The status poll is retried; only the window bounds it.
                Err(err) => warn!("Status poll for {} failed: {}", signature, err),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
