//! # NFT Staking Client
//!
//! Off-chain client for the NFT staking program and its lootbox companion.
//! A holder stakes a collectible into program custody, accrues $BLD over
//! time, redeems or unstakes, and once enough reward has been earned opens a
//! lootbox whose item is picked by a VRF round.
//!
//! ## Features
//! - Deterministic PDA derivation for every program-owned record
//! - Positional instruction encoding for the four staking opcodes and the
//!   three lootbox instructions
//! - Stake lifecycle state machine with idempotent record initialization
//! - Reward accrual arithmetic and a cancellable display ticker
//! - Submission awaited at finalized commitment, with an explicit timeout
//! - Lootbox flow with a logged default threshold when the pointer is missing
//!
//! ## Capabilities
//! Network access, signing and VRF setup are injected through
//! [`RpcTransport`], [`WalletSigner`] and [`VrfOracle`]. Nothing in the crate
//! reaches for ambient connection or wallet state.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod instructions;
pub mod lifecycle;
pub mod lootbox_flow;
pub mod orchestrator;
pub mod pda;
pub mod reward;
pub mod rpc;
pub mod state;

pub use client::StakingClient;
pub use config::{ClientConfig, Commitment};
pub use error::{ClientError, Result};
pub use lifecycle::{StakeAction, StakePlan};
pub use lootbox_flow::{LootboxAction, LootboxPhase, LootboxView, SwitchboardQueue, VrfOracle, VrfSetup};
pub use orchestrator::TransactionOrchestrator;
pub use reward::{ticker_channel, AccrualSnapshot, ConfirmedRecord, TickerHandle};
pub use rpc::{BlockhashReference, FetchOutcome, NetworkClock, RpcTransport, SignatureStatus, WalletSigner};
pub use state::{LootboxPointer, LootboxUserState, StakeRecord, StakeState};
