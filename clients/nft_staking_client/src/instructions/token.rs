//! Token account helpers bundled ahead of paying instructions.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::system_instruction;
use anchor_spl::token;
use anchor_spl::token::spl_token;
use spl_associated_token_account::instruction::create_associated_token_account;

use crate::error::{ClientError, Result};
use crate::instructions::require_identity;
use crate::pda;

/// Creates `owner`'s associated token account for `mint`, paid by `owner`.
pub fn create_token_account(owner: &Pubkey, mint: &Pubkey) -> Result<Instruction> {
    require_identity(owner, "owner")?;
    require_identity(mint, "mint")?;

    Ok(create_associated_token_account(owner, owner, mint, &token::ID))
}

/// Moves `lamports` into `owner`'s wrapped-SOL account and syncs its balance.
///
/// Prepends the account creation when `create` is set.
pub fn fund_wrapped_sol(owner: &Pubkey, lamports: u64, create: bool) -> Result<Vec<Instruction>> {
    require_identity(owner, "owner")?;

    let native_mint = spl_token::native_mint::ID;
    let wrapped = pda::token_account(owner, &native_mint);

    let mut instructions = Vec::with_capacity(3);
    if create {
        instructions.push(create_token_account(owner, &native_mint)?);
    }
    instructions.push(system_instruction::transfer(owner, &wrapped, lamports));
    instructions.push(
        spl_token::instruction::sync_native(&token::ID, &wrapped)
            .map_err(ClientError::Instruction)?,
    );

    Ok(instructions)
}
