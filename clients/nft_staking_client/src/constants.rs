//! Client constants for the NFT staking and lootbox programs.
//!
//! This module defines the deployment identities, PDA seeds, time units and
//! reward parameters shared by the encoder, the calculator and the lootbox flow.

use anchor_lang::prelude::Pubkey;

/// Staking program that custodies the collectible and mints rewards
pub const STAKING_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("2pE13XRXtstNEuBZ912ooGAnTQhabLYm57cFJW7tQXvK");

/// Reward token mint ($BLD)
pub const REWARD_MINT: Pubkey =
    solana_sdk::pubkey!("398X9iYckL5xfMRi6uEGmSRX5ACWAmPmFe7j7pLEcxkL");

/// Lootbox program that gates gear behind a VRF round
pub const LOOTBOX_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("3vnfmoJk6zuEyXt9QfYaCp6psgwe5UL4jLRZKmxThTc9");

/// Seed for the delegated-authority PDA that freezes staked collectibles
pub const AUTHORITY_SEED: &[u8] = b"authority";

/// Seed for the reward mint-authority PDA
pub const MINT_SEED: &[u8] = b"mint";

/// Seed prefix for the per-owner lootbox pointer PDA
pub const LOOTBOX_SEED: &[u8] = b"lootbox";

/// Seeds used by the token-metadata program for master editions
pub const METADATA_SEED: &[u8] = b"metadata";
pub const EDITION_SEED: &[u8] = b"edition";

/// Seeds used by the Switchboard program for its state and permission PDAs
pub const SWITCHBOARD_STATE_SEED: &[u8] = b"STATE";
pub const SWITCHBOARD_PERMISSION_SEED: &[u8] = b"PermissionAccountData";

/// Number of seconds in a minute
pub const SECONDS_PER_MINUTE: i64 = 60;

/// Number of seconds in an hour
pub const SECONDS_PER_HOUR: i64 = 3_600;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Reward token decimals
pub const REWARD_DECIMALS: u8 = 2;

/// Whole reward tokens minted per staked day
pub const REWARD_TOKENS_PER_DAY: i64 = 10;

/// Lootbox threshold assumed when the pointer record cannot be read
pub const DEFAULT_LOOTBOX_THRESHOLD: u64 = 10;

/// Lamports moved into the wrapped-SOL payer account to cover one VRF request
pub const VRF_REQUEST_FEE_LAMPORTS: u64 = 2_000_000;

/// Size of Anchor's account and instruction discriminators
pub const DISCRIMINATOR_LEN: usize = 8;

/// Confirmation polling defaults (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 90_000;

/// Reward display refresh period (milliseconds)
pub const DEFAULT_TICKER_PERIOD_MS: u64 = 1_000;

/// Reads of a mutated record attempted after finalization, one poll interval apart.
pub const READ_BACK_ATTEMPTS: u32 = 3;
