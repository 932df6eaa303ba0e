//! Stake lifecycle state machine.
//!
//! ## Transitions
//! - `Unstaked --stake--> Staking`
//! - `Staking --redeem--> Staking`
//! - `Staking --unstake--> Unstaked`
//!
//! A record that was never created starts as `Unstaked`. There is no terminal
//! state; an unstaked record is reused by the next stake.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::instructions::{create_token_account, StakingInstructions};
use crate::pda;
use crate::state::{StakeRecord, StakeState};

/// An owner-initiated action on a stake record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeAction {
    Stake,
    Redeem,
    Unstake,
}

impl StakeAction {
    pub const ALL: [StakeAction; 3] = [StakeAction::Stake, StakeAction::Redeem, StakeAction::Unstake];

    pub fn name(&self) -> &'static str {
        match self {
            StakeAction::Stake => "stake",
            StakeAction::Redeem => "redeem",
            StakeAction::Unstake => "unstake",
        }
    }
}

/// Actions accepted from `state`.
pub fn available_actions(state: StakeState) -> &'static [StakeAction] {
    match state {
        StakeState::Unstaked => &[StakeAction::Stake],
        StakeState::Staking => &[StakeAction::Redeem, StakeAction::Unstake],
    }
}

/// State the record moves to once `action` is confirmed.
///
/// # Errors
/// Returns [`ClientError::InvalidTransition`] for any pair not listed in the
/// module docs.
pub fn transition(state: StakeState, action: StakeAction) -> Result<StakeState> {
    match (state, action) {
        (StakeState::Unstaked, StakeAction::Stake) => Ok(StakeState::Staking),
        (StakeState::Staking, StakeAction::Redeem) => Ok(StakeState::Staking),
        (StakeState::Staking, StakeAction::Unstake) => Ok(StakeState::Unstaked),
        (from, action) => Err(ClientError::InvalidTransition {
            from: from.name(),
            action: action.name(),
        }),
    }
}

/// What one submission has to do for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakePlan {
    pub action: StakeAction,
    /// Prepend `InitializeStakeAccount`. Only set when no record exists yet.
    pub initialize: bool,
    pub next_state: StakeState,
}

/// Plans `action` against the last confirmed record (`None` if it was never
/// created).
pub fn plan(action: StakeAction, record: Option<&StakeRecord>) -> Result<StakePlan> {
    let current = record.map(|r| r.state).unwrap_or_default();
    let next_state = transition(current, action)?;

    Ok(StakePlan {
        action,
        initialize: action == StakeAction::Stake && record.is_none(),
        next_state,
    })
}

/// Turns a [`StakePlan`] into the ordered instruction bundle.
#[derive(Debug, Clone)]
pub struct StakeLifecycle {
    builder: StakingInstructions,
}

impl StakeLifecycle {
    pub fn new(builder: StakingInstructions) -> Self {
        Self { builder }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(StakingInstructions::from_config(config))
    }

    pub fn builder(&self) -> &StakingInstructions {
        &self.builder
    }

    /// Owner's associated account for the reward mint.
    pub fn reward_account(&self, owner: &Pubkey) -> Pubkey {
        pda::token_account(owner, &self.builder.reward_mint)
    }

    /// Builds `[create reward account?, initialize?, <action>]`.
    ///
    /// The reward account is created first whenever it is absent so that the
    /// paying instruction never targets a missing destination.
    pub fn instructions(
        &self,
        plan: &StakePlan,
        owner: &Pubkey,
        holding_account: &Pubkey,
        collectible_mint: &Pubkey,
        reward_account_exists: bool,
    ) -> Result<Vec<Instruction>> {
        let reward_account = self.reward_account(owner);
        let mut instructions = Vec::with_capacity(3);

        if !reward_account_exists {
            instructions.push(create_token_account(owner, &self.builder.reward_mint)?);
        }
        if plan.initialize {
            instructions.push(self.builder.initialize_stake_account(owner, holding_account)?);
        }

        let op = match plan.action {
            StakeAction::Stake => self.builder.stake(owner, holding_account, collectible_mint)?,
            StakeAction::Redeem => self.builder.redeem(owner, holding_account, &reward_account)?,
            StakeAction::Unstake => {
                self.builder
                    .unstake(owner, holding_account, collectible_mint, &reward_account)?
            }
        };
        instructions.push(op);

        Ok(instructions)
    }
}
