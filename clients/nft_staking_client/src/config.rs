//! Runtime configuration for the staking client.

use std::time::Duration;

use anchor_lang::prelude::Pubkey;

use crate::constants::*;

/// Commitment level a signature status can report, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

/// Deployment identities and timing knobs for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub staking_program: Pubkey,
    pub lootbox_program: Pubkey,
    pub reward_mint: Pubkey,
    /// Commitment awaited before any dependent read. Fixed at `Finalized`.
    commitment: Commitment,
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    /// Reward display refresh period while staking.
    pub ticker_period: Duration,
    /// Lamports funded into the wrapped-SOL payer account per VRF request.
    pub vrf_fee_lamports: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            staking_program: STAKING_PROGRAM_ID,
            lootbox_program: LOOTBOX_PROGRAM_ID,
            reward_mint: REWARD_MINT,
            commitment: Commitment::Finalized,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            confirmation_timeout: Duration::from_millis(DEFAULT_CONFIRMATION_TIMEOUT_MS),
            ticker_period: Duration::from_millis(DEFAULT_TICKER_PERIOD_MS),
            vrf_fee_lamports: VRF_REQUEST_FEE_LAMPORTS,
        }
    }
}

impl ClientConfig {
    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    pub fn with_staking_program(mut self, program: Pubkey) -> Self {
        self.staking_program = program;
        self
    }

    pub fn with_lootbox_program(mut self, program: Pubkey) -> Self {
        self.lootbox_program = program;
        self
    }

    pub fn with_reward_mint(mut self, mint: Pubkey) -> Self {
        self.reward_mint = mint;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_ticker_period(mut self, period: Duration) -> Self {
        self.ticker_period = period;
        self
    }
}
