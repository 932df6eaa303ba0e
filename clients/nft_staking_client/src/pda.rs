//! Program-derived address helpers.
//!
//! Every record the programs own lives at an address derived from a fixed
//! seed convention. The client and the programs must agree byte-for-byte on
//! these seeds, or account validation fails on-chain.
//!
//! ## Seed conventions
//! - stake record: `[owner, holding_account]` under the staking program
//! - delegated authority: `["authority"]` under the staking program
//! - mint authority: `["mint"]` under the owning program
//! - lootbox user state: `[owner]` under the lootbox program
//! - lootbox pointer: `["lootbox", owner]` under the lootbox program

use anchor_lang::prelude::Pubkey;
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::metadata::Metadata;
use anchor_lang::Id;

use crate::constants::*;
use crate::error::{ClientError, Result};

/// Derives the canonical program address for `seeds` under `program`.
///
/// Bumps are tried from 255 downward and the first off-curve result wins,
/// so repeated calls always return the same `(address, bump)` pair.
///
/// # Errors
/// Returns [`ClientError::DerivationExhausted`] if no bump yields an
/// off-curve address.
pub fn derive(seeds: &[&[u8]], program: &Pubkey) -> Result<(Pubkey, u8)> {
    Pubkey::try_find_program_address(seeds, program).ok_or(ClientError::DerivationExhausted)
}

/// Stake record for one (owner, holding account) pair.
pub fn stake_record(owner: &Pubkey, holding_account: &Pubkey, program: &Pubkey) -> Result<(Pubkey, u8)> {
    derive(&[owner.as_ref(), holding_account.as_ref()], program)
}

/// Delegated authority that freezes staked collectibles.
pub fn delegated_authority(program: &Pubkey) -> Result<(Pubkey, u8)> {
    derive(&[AUTHORITY_SEED], program)
}

/// Mint authority for reward tokens (staking program) or gear (lootbox program).
pub fn mint_authority(program: &Pubkey) -> Result<(Pubkey, u8)> {
    derive(&[MINT_SEED], program)
}

pub fn lootbox_user_state(owner: &Pubkey, program: &Pubkey) -> Result<(Pubkey, u8)> {
    derive(&[owner.as_ref()], program)
}

pub fn lootbox_pointer(owner: &Pubkey, program: &Pubkey) -> Result<(Pubkey, u8)> {
    derive(&[LOOTBOX_SEED, owner.as_ref()], program)
}

/// Master edition account of a collectible mint.
pub fn master_edition(mint: &Pubkey) -> Result<(Pubkey, u8)> {
    let metadata_program = Metadata::id();
    derive(
        &[
            METADATA_SEED,
            metadata_program.as_ref(),
            mint.as_ref(),
            EDITION_SEED,
        ],
        &metadata_program,
    )
}

/// Associated token account holding `mint` for `owner`.
pub fn token_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// Switchboard program state.
pub fn switchboard_program_state(switchboard_program: &Pubkey) -> Result<(Pubkey, u8)> {
    derive(&[SWITCHBOARD_STATE_SEED], switchboard_program)
}

/// Switchboard permission granting `vrf` access to the oracle queue.
pub fn switchboard_permission(
    queue_authority: &Pubkey,
    queue: &Pubkey,
    vrf: &Pubkey,
    switchboard_program: &Pubkey,
) -> Result<(Pubkey, u8)> {
    derive(
        &[
            SWITCHBOARD_PERMISSION_SEED,
            queue_authority.as_ref(),
            queue.as_ref(),
            vrf.as_ref(),
        ],
        switchboard_program,
    )
}
