//! Builders for the four staking program instructions.
//!
//! ## Account order
//! Matching on the program side is positional, so each list below is part of
//! the wire contract:
//!
//! | Op | Accounts |
//! |---|---|
//! | InitializeStakeAccount (0) | owner, holding, stake record, system program |
//! | Stake (1) | owner, holding, mint, edition, stake record, delegated authority, token program, metadata program |
//! | Redeem (2) | owner, holding, stake record, reward mint, mint authority, owner reward account, token program |
//! | Unstake (3) | owner, holding, mint, edition, stake record, delegated authority, reward mint, mint authority, owner reward account, token program, metadata program |

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::system_program;
use anchor_lang::Id;
use anchor_spl::metadata::Metadata;
use anchor_spl::token;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::instructions::{require_identity, StakeOpcode};
use crate::pda;

/// Builds staking instructions for one program deployment.
#[derive(Debug, Clone)]
pub struct StakingInstructions {
    pub program: Pubkey,
    pub reward_mint: Pubkey,
}

impl StakingInstructions {
    pub fn new(program: Pubkey, reward_mint: Pubkey) -> Self {
        Self {
            program,
            reward_mint,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.staking_program, config.reward_mint)
    }

    /// Creates the stake record for (owner, holding account).
    ///
    /// # Errors
    /// Returns `MissingIdentity` if any identity is unset.
    pub fn initialize_stake_account(&self, owner: &Pubkey, holding_account: &Pubkey) -> Result<Instruction> {
        require_identity(owner, "owner")?;
        require_identity(holding_account, "holding account")?;

        let (stake_record, _) = pda::stake_record(owner, holding_account, &self.program)?;

        Ok(Instruction {
            program_id: self.program,
            accounts: vec![
                AccountMeta::new_readonly(*owner, true),
                AccountMeta::new(*holding_account, false),
                AccountMeta::new(stake_record, false),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data: StakeOpcode::InitializeStakeAccount.data(),
        })
    }

    /// Delegates and freezes the collectible, moving the record to staking.
    pub fn stake(&self, owner: &Pubkey, holding_account: &Pubkey, collectible_mint: &Pubkey) -> Result<Instruction> {
        require_identity(owner, "owner")?;
        require_identity(holding_account, "holding account")?;
        require_identity(collectible_mint, "collectible mint")?;

        let (stake_record, _) = pda::stake_record(owner, holding_account, &self.program)?;
        let (delegated_authority, _) = pda::delegated_authority(&self.program)?;
        let (edition, _) = pda::master_edition(collectible_mint)?;

        Ok(Instruction {
            program_id: self.program,
            accounts: vec![
                AccountMeta::new_readonly(*owner, true),
                AccountMeta::new(*holding_account, false),
                AccountMeta::new_readonly(*collectible_mint, false),
                AccountMeta::new_readonly(edition, false),
                AccountMeta::new(stake_record, false),
                AccountMeta::new(delegated_authority, false),
                AccountMeta::new_readonly(token::ID, false),
                AccountMeta::new_readonly(Metadata::id(), false),
            ],
            data: StakeOpcode::Stake.data(),
        })
    }

    /// Pays out accrued reward without releasing custody.
    pub fn redeem(&self, owner: &Pubkey, holding_account: &Pubkey, owner_reward_account: &Pubkey) -> Result<Instruction> {
        require_identity(owner, "owner")?;
        require_identity(holding_account, "holding account")?;
        require_identity(owner_reward_account, "owner reward account")?;
        require_identity(&self.reward_mint, "reward mint")?;

        let (stake_record, _) = pda::stake_record(owner, holding_account, &self.program)?;
        let (mint_authority, _) = pda::mint_authority(&self.program)?;

        Ok(Instruction {
            program_id: self.program,
            accounts: vec![
                AccountMeta::new_readonly(*owner, true),
                AccountMeta::new(*holding_account, false),
                AccountMeta::new(stake_record, false),
                AccountMeta::new(self.reward_mint, false),
                AccountMeta::new_readonly(mint_authority, false),
                AccountMeta::new(*owner_reward_account, false),
                AccountMeta::new_readonly(token::ID, false),
            ],
            data: StakeOpcode::Redeem.data(),
        })
    }

    /// Thaws and revokes the collectible and pays the final reward.
    pub fn unstake(
        &self,
        owner: &Pubkey,
        holding_account: &Pubkey,
        collectible_mint: &Pubkey,
        owner_reward_account: &Pubkey,
    ) -> Result<Instruction> {
        require_identity(owner, "owner")?;
        require_identity(holding_account, "holding account")?;
        require_identity(collectible_mint, "collectible mint")?;
        require_identity(owner_reward_account, "owner reward account")?;
        require_identity(&self.reward_mint, "reward mint")?;

        let (stake_record, _) = pda::stake_record(owner, holding_account, &self.program)?;
        let (delegated_authority, _) = pda::delegated_authority(&self.program)?;
        let (mint_authority, _) = pda::mint_authority(&self.program)?;
        let (edition, _) = pda::master_edition(collectible_mint)?;

        Ok(Instruction {
            program_id: self.program,
            accounts: vec![
                AccountMeta::new_readonly(*owner, true),
                AccountMeta::new(*holding_account, false),
                AccountMeta::new_readonly(*collectible_mint, false),
                AccountMeta::new_readonly(edition, false),
                AccountMeta::new(stake_record, false),
                AccountMeta::new(delegated_authority, false),
                AccountMeta::new(self.reward_mint, false),
                AccountMeta::new_readonly(mint_authority, false),
                AccountMeta::new(*owner_reward_account, false),
                AccountMeta::new_readonly(token::ID, false),
                AccountMeta::new_readonly(Metadata::id(), false),
            ],
            data: StakeOpcode::Unstake.data(),
        })
    }
}
