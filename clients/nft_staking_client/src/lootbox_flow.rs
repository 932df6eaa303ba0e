//! Lootbox flow controller.
//!
//! Phases per owner, read from the lootbox user state:
//! - `Uninitialized`: no user state yet; `enable` sets up a VRF account
//! - `Accruing`: nothing pending; `open` once cumulative reward reaches the threshold
//! - `Redeemable`: a VRF round resolved to an unclaimed item; `redeem` claims it
//!
//! The VRF callback flips `redeemable` on its own schedule, so the phase is
//! only ever learned by re-fetching after a confirmed submission.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_spl::token::spl_token;
use log::{debug, warn};
use solana_sdk::signature::{Keypair, Signer};

use crate::config::ClientConfig;
use crate::constants::DEFAULT_LOOTBOX_THRESHOLD;
use crate::error::{ClientError, Result};
use crate::instructions::{fund_wrapped_sol, InitUserParams, LootboxInstructions, VrfRequestAccounts};
use crate::pda;
use crate::rpc::{fetch_record, FetchOutcome, RpcTransport};
use crate::state::{LootboxPointer, LootboxUserState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LootboxPhase {
    Uninitialized,
    Accruing,
    Redeemable,
}

/// Where the threshold in a [`LootboxView`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSource {
    Pointer,
    /// The pointer was missing, unreadable or zero.
    Default,
}

/// What the lootbox widget should offer the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LootboxAction {
    KeepStaking,
    Enable,
    Open { threshold: u64 },
    Redeem,
}

/// Lootbox state of one owner as last read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootboxView {
    pub phase: LootboxPhase,
    pub threshold: u64,
    pub threshold_source: ThresholdSource,
    pub user_state: Option<LootboxUserState>,
}

impl LootboxView {
    /// Combines the two reads into one view.
    ///
    /// A transient error on the user state is returned since the phase cannot
    /// be known without it. Any pointer failure falls back to
    /// [`DEFAULT_LOOTBOX_THRESHOLD`] and is logged.
    pub fn resolve(
        user_state: FetchOutcome<LootboxUserState>,
        pointer: FetchOutcome<LootboxPointer>,
    ) -> Result<Self> {
        let user_state = user_state.into_option()?;
        let phase = match &user_state {
            None => LootboxPhase::Uninitialized,
            Some(state) if state.redeemable => LootboxPhase::Redeemable,
            Some(_) => LootboxPhase::Accruing,
        };

        let (threshold, threshold_source) = match pointer {
            FetchOutcome::Found(pointer) if pointer.available_lootbox_threshold > 0 => {
                (pointer.available_lootbox_threshold, ThresholdSource::Pointer)
            }
            FetchOutcome::Found(_) => {
                warn!("Lootbox pointer threshold is zero, using default {}", DEFAULT_LOOTBOX_THRESHOLD);
                (DEFAULT_LOOTBOX_THRESHOLD, ThresholdSource::Default)
            }
            FetchOutcome::NotFound => {
                warn!("Lootbox pointer not created yet, using default {}", DEFAULT_LOOTBOX_THRESHOLD);
                (DEFAULT_LOOTBOX_THRESHOLD, ThresholdSource::Default)
            }
            FetchOutcome::TransientError(reason) => {
                warn!(
                    "Lootbox pointer unreadable ({}), using default {}",
                    reason, DEFAULT_LOOTBOX_THRESHOLD
                );
                (DEFAULT_LOOTBOX_THRESHOLD, ThresholdSource::Default)
            }
        };

        Ok(Self {
            phase,
            threshold,
            threshold_source,
            user_state,
        })
    }

    pub fn can_open(&self, cumulative_reward: u64) -> bool {
        cumulative_reward >= self.threshold
    }

    pub fn action(&self, cumulative_reward: u64) -> LootboxAction {
        match self.phase {
            LootboxPhase::Redeemable => LootboxAction::Redeem,
            _ if !self.can_open(cumulative_reward) => LootboxAction::KeepStaking,
            LootboxPhase::Uninitialized => LootboxAction::Enable,
            LootboxPhase::Accruing => LootboxAction::Open {
                threshold: self.threshold,
            },
        }
    }
}

/// VRF account setup handed back by an oracle.
#[derive(Debug, Clone)]
pub struct VrfSetup {
    /// Creates the VRF account and its queue permission.
    pub instructions: Vec<Instruction>,
    pub params: InitUserParams,
}

/// The VRF oracle as the lootbox flow needs it.
#[allow(async_fn_in_trait)]
pub trait VrfOracle {
    /// Instructions creating `vrf` with `authority` as its callback authority,
    /// funded by `payer`.
    async fn setup(&self, vrf: &Pubkey, authority: &Pubkey, payer: &Pubkey) -> Result<VrfSetup>;

    /// Accounts `open_lootbox` passes through to the randomness request.
    fn request_accounts(&self, vrf: &Pubkey, payer: &Pubkey) -> Result<VrfRequestAccounts>;
}

/// The derivable half of a Switchboard oracle queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchboardQueue {
    pub program: Pubkey,
    pub queue: Pubkey,
    pub queue_authority: Pubkey,
    pub data_buffer: Pubkey,
}

impl SwitchboardQueue {
    pub fn request_accounts(&self, vrf: &Pubkey, payer: &Pubkey) -> Result<VrfRequestAccounts> {
        let native_mint = spl_token::native_mint::ID;
        let (permission, _) =
            pda::switchboard_permission(&self.queue_authority, &self.queue, vrf, &self.program)?;
        let (program_state, _) = pda::switchboard_program_state(&self.program)?;

        Ok(VrfRequestAccounts {
            vrf: *vrf,
            oracle_queue: self.queue,
            queue_authority: self.queue_authority,
            data_buffer: self.data_buffer,
            permission,
            escrow: pda::token_account(vrf, &native_mint),
            program_state,
            switchboard_program: self.program,
            payer_wallet: pda::token_account(payer, &native_mint),
        })
    }

    /// Bumps `init_user` stores so the program can re-sign for the queue.
    pub fn init_params(&self, vrf: &Pubkey) -> Result<InitUserParams> {
        let (_, switchboard_state_bump) = pda::switchboard_program_state(&self.program)?;
        let (_, vrf_permission_bump) =
            pda::switchboard_permission(&self.queue_authority, &self.queue, vrf, &self.program)?;
        Ok(InitUserParams {
            switchboard_state_bump,
            vrf_permission_bump,
        })
    }
}

/// Bundle for `enable`, with the fresh VRF keypair that must co-sign it.
#[derive(Debug)]
pub struct EnableBundle {
    pub instructions: Vec<Instruction>,
    pub vrf_keypair: Keypair,
}

/// Builds lootbox bundles from a [`LootboxView`].
#[derive(Debug, Clone)]
pub struct LootboxFlow {
    builder: LootboxInstructions,
    vrf_fee_lamports: u64,
}

impl LootboxFlow {
    pub fn new(builder: LootboxInstructions, vrf_fee_lamports: u64) -> Self {
        Self {
            builder,
            vrf_fee_lamports,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(LootboxInstructions::from_config(config), config.vrf_fee_lamports)
    }

    pub fn builder(&self) -> &LootboxInstructions {
        &self.builder
    }

    /// Reads the user state and pointer of `owner`.
    pub async fn status<R: RpcTransport>(&self, rpc: &R, owner: &Pubkey) -> Result<LootboxView> {
        let (state_address, _) = pda::lootbox_user_state(owner, &self.builder.program)?;
        let (pointer_address, _) = pda::lootbox_pointer(owner, &self.builder.program)?;
        debug!("Lootbox state {} pointer {}", state_address, pointer_address);

        let user_state = fetch_record(rpc, &state_address, LootboxUserState::try_from_account_data).await?;
        let pointer = fetch_record(rpc, &pointer_address, LootboxPointer::try_from_account_data).await?;
        LootboxView::resolve(user_state, pointer)
    }

    /// VRF account setup followed by `init_user`, signed by a fresh keypair.
    pub async fn enable<O: VrfOracle>(
        &self,
        oracle: &O,
        owner: &Pubkey,
        view: &LootboxView,
    ) -> Result<EnableBundle> {
        if view.phase != LootboxPhase::Uninitialized {
            return Err(ClientError::LootboxAlreadyEnabled);
        }

        let vrf_keypair = Keypair::new();
        let vrf = vrf_keypair.pubkey();
        let (state, _) = pda::lootbox_user_state(owner, &self.builder.program)?;

        let setup = oracle.setup(&vrf, &state, owner).await?;
        let mut instructions = setup.instructions;
        instructions.push(self.builder.init_user(owner, &vrf, setup.params)?);

        Ok(EnableBundle {
            instructions,
            vrf_keypair,
        })
    }

    /// Funds the VRF fee and opens the box numbered by the current threshold.
    ///
    /// # Errors
    /// - `LootboxNotEnabled` without a user state
    /// - `LootboxPending` while an item awaits redemption
    /// - `BelowLootboxThreshold` when `cumulative_reward` is short
    pub fn open<O: VrfOracle>(
        &self,
        oracle: &O,
        owner: &Pubkey,
        holding_account: &Pubkey,
        view: &LootboxView,
        cumulative_reward: u64,
        payer_wallet_exists: bool,
    ) -> Result<Vec<Instruction>> {
        let user_state = match (view.phase, &view.user_state) {
            (LootboxPhase::Accruing, Some(state)) => state,
            (LootboxPhase::Redeemable, _) => return Err(ClientError::LootboxPending),
            _ => return Err(ClientError::LootboxNotEnabled),
        };
        if !view.can_open(cumulative_reward) {
            return Err(ClientError::BelowLootboxThreshold {
                cumulative: cumulative_reward,
                threshold: view.threshold,
            });
        }

        let accounts = oracle.request_accounts(&user_state.vrf, owner)?;
        let mut instructions = fund_wrapped_sol(owner, self.vrf_fee_lamports, !payer_wallet_exists)?;
        instructions.push(
            self.builder
                .open_lootbox(owner, holding_account, view.threshold, &accounts)?,
        );
        Ok(instructions)
    }

    /// Claims the item picked by the last VRF round.
    pub fn redeem(&self, owner: &Pubkey, view: &LootboxView) -> Result<Instruction> {
        match (view.phase, &view.user_state) {
            (LootboxPhase::Redeemable, Some(state)) => self.builder.retrieve_item(owner, &state.mint),
            _ => Err(ClientError::LootboxNotRedeemable),
        }
    }
}
