//! Instruction builders for the staking and lootbox programs.
//!
//! Builders are pure: they derive the addresses they need, order the account
//! metas exactly as the receiving program expects, and never touch the network.

pub mod lootbox;
pub mod staking;
pub mod token;

pub use lootbox::*;
pub use staking::*;
pub use token::*;

use anchor_lang::prelude::Pubkey;
use anchor_lang::Discriminator;
use borsh::BorshSerialize;

use crate::error::{ClientError, Result};

/// Single-byte operation selector understood by the staking program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StakeOpcode {
    InitializeStakeAccount = 0,
    Stake = 1,
    Redeem = 2,
    Unstake = 3,
}

impl StakeOpcode {
    /// Instruction data: the opcode byte and nothing else.
    pub fn data(self) -> Vec<u8> {
        vec![self as u8]
    }
}

/// Anchor instruction data: the method discriminator, then the arguments.
pub(crate) fn anchor_instruction_data<T>(args: &T) -> Result<Vec<u8>>
where
    T: Discriminator + BorshSerialize,
{
    let mut data = T::DISCRIMINATOR.to_vec();
    args.serialize(&mut data)?;
    Ok(data)
}

/// Rejects the all-zero key, which stands for an identity the caller never set.
pub(crate) fn require_identity(key: &Pubkey, role: &'static str) -> Result<()> {
    if *key == Pubkey::default() {
        return Err(ClientError::MissingIdentity { role });
    }
    Ok(())
}
