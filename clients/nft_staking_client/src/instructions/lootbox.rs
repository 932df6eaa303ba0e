//! Builders for the lootbox program instructions.
//!
//! The lootbox program is an Anchor program, so instruction data is the
//! 8-byte sighash of the method name followed by borsh-encoded arguments.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::sysvar;
use anchor_lang::system_program;
use anchor_lang::Discriminator;
use anchor_spl::associated_token;
use anchor_spl::token;
use borsh::BorshSerialize;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::instructions::{anchor_instruction_data, require_identity};
use crate::pda;

/// Arguments of `init_user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct InitUserParams {
    pub switchboard_state_bump: u8,
    pub vrf_permission_bump: u8,
}

impl Discriminator for InitUserParams {
    const DISCRIMINATOR: [u8; 8] = [0x0e, 0x33, 0x44, 0x9f, 0xed, 0x4e, 0x9e, 0x66];
}

/// Arguments of `open_lootbox`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct OpenLootboxParams {
    pub box_number: u64,
}

impl Discriminator for OpenLootboxParams {
    const DISCRIMINATOR: [u8; 8] = [0x66, 0xb8, 0x1b, 0xb2, 0xec, 0x6c, 0x0b, 0xe1];
}

/// `retrieve_item_from_lootbox` takes no arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct RetrieveItemParams;

impl Discriminator for RetrieveItemParams {
    const DISCRIMINATOR: [u8; 8] = [0x8e, 0x6d, 0x18, 0x65, 0xa8, 0x06, 0xbf, 0x6c];
}

/// Oracle accounts referenced by `open_lootbox` when it requests randomness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrfRequestAccounts {
    pub vrf: Pubkey,
    pub oracle_queue: Pubkey,
    pub queue_authority: Pubkey,
    pub data_buffer: Pubkey,
    pub permission: Pubkey,
    pub escrow: Pubkey,
    pub program_state: Pubkey,
    pub switchboard_program: Pubkey,
    /// Owner's wrapped-SOL account that pays the request fee.
    pub payer_wallet: Pubkey,
}

/// Builds lootbox instructions for one deployment of the lootbox and
/// staking programs.
#[derive(Debug, Clone)]
pub struct LootboxInstructions {
    pub program: Pubkey,
    pub staking_program: Pubkey,
    /// Mint burned to open a lootbox (the staking reward token).
    pub reward_mint: Pubkey,
}

impl LootboxInstructions {
    pub fn new(program: Pubkey, staking_program: Pubkey, reward_mint: Pubkey) -> Self {
        Self {
            program,
            staking_program,
            reward_mint,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.lootbox_program,
            config.staking_program,
            config.reward_mint,
        )
    }

    /// Creates the owner's user-state record bound to a VRF account.
    pub fn init_user(&self, owner: &Pubkey, vrf: &Pubkey, params: InitUserParams) -> Result<Instruction> {
        require_identity(owner, "owner")?;
        require_identity(vrf, "vrf account")?;

        let (state, _) = pda::lootbox_user_state(owner, &self.program)?;

        let data = anchor_instruction_data(&params)?;

        Ok(Instruction {
            program_id: self.program,
            accounts: vec![
                AccountMeta::new(state, false),
                AccountMeta::new_readonly(*vrf, false),
                AccountMeta::new(*owner, true),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data,
        })
    }

    /// Burns `box_number` reward tokens and requests randomness.
    ///
    /// The stake record derived from (owner, holding account) under the
    /// staking program is passed so the program can check `total_earned`.
    pub fn open_lootbox(
        &self,
        owner: &Pubkey,
        holding_account: &Pubkey,
        box_number: u64,
        oracle: &VrfRequestAccounts,
    ) -> Result<Instruction> {
        require_identity(owner, "owner")?;
        require_identity(holding_account, "holding account")?;
        require_identity(&self.reward_mint, "reward mint")?;
        require_identity(&oracle.vrf, "vrf account")?;
        require_identity(&oracle.oracle_queue, "oracle queue")?;
        require_identity(&oracle.switchboard_program, "switchboard program")?;

        let (pointer, _) = pda::lootbox_pointer(owner, &self.program)?;
        let (state, _) = pda::lootbox_user_state(owner, &self.program)?;
        let (stake_record, _) = pda::stake_record(owner, holding_account, &self.staking_program)?;
        let reward_account = pda::token_account(owner, &self.reward_mint);

        let data = anchor_instruction_data(&OpenLootboxParams { box_number })?;

        #[allow(deprecated)]
        let recent_blockhashes = sysvar::recent_blockhashes::ID;

        Ok(Instruction {
            program_id: self.program,
            accounts: vec![
                AccountMeta::new(*owner, true),
                AccountMeta::new(pointer, false),
                AccountMeta::new_readonly(system_program::ID, false),
                AccountMeta::new_readonly(token::ID, false),
                AccountMeta::new(self.reward_mint, false),
                AccountMeta::new(reward_account, false),
                AccountMeta::new_readonly(associated_token::ID, false),
                AccountMeta::new_readonly(stake_record, false),
                AccountMeta::new(state, false),
                AccountMeta::new(oracle.vrf, false),
                AccountMeta::new(oracle.oracle_queue, false),
                AccountMeta::new(oracle.queue_authority, false),
                AccountMeta::new(oracle.data_buffer, false),
                AccountMeta::new(oracle.permission, false),
                AccountMeta::new(oracle.escrow, false),
                AccountMeta::new(oracle.program_state, false),
                AccountMeta::new_readonly(oracle.switchboard_program, false),
                AccountMeta::new(oracle.payer_wallet, false),
                AccountMeta::new_readonly(recent_blockhashes, false),
            ],
            data,
        })
    }

    /// Mints the gear picked by the last VRF round to the owner. The program
    /// checks the pointer's mint and clears its claim.
    pub fn retrieve_item(&self, owner: &Pubkey, gear_mint: &Pubkey) -> Result<Instruction> {
        require_identity(owner, "owner")?;
        require_identity(gear_mint, "gear mint")?;

        let (pointer, _) = pda::lootbox_pointer(owner, &self.program)?;
        let (mint_authority, _) = pda::mint_authority(&self.program)?;
        let gear_account = pda::token_account(owner, gear_mint);

        Ok(Instruction {
            program_id: self.program,
            accounts: vec![
                AccountMeta::new(*owner, true),
                AccountMeta::new(pointer, false),
                AccountMeta::new(*gear_mint, false),
                AccountMeta::new(gear_account, false),
                AccountMeta::new_readonly(mint_authority, false),
                AccountMeta::new_readonly(token::ID, false),
                AccountMeta::new_readonly(associated_token::ID, false),
                AccountMeta::new_readonly(system_program::ID, false),
                AccountMeta::new_readonly(sysvar::rent::ID, false),
            ],
            data: anchor_instruction_data(&RetrieveItemParams)?,
        })
    }
}
