//! Record types owned by the staking and lootbox programs.
//!
//! Each record is decoded from raw account data with an explicit fixed
//! layout: Anchor's 8-byte discriminator followed by the record body.

pub mod lootbox;
pub mod stake_record;

pub use lootbox::*;
pub use stake_record::*;

use anchor_lang::Discriminator;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::constants::DISCRIMINATOR_LEN;
use crate::error::{ClientError, Result};

impl Discriminator for StakeRecord {
    const DISCRIMINATOR: [u8; 8] = [0xdb, 0xe9, 0xec, 0x7b, 0x1c, 0x71, 0x59, 0x38];
}

impl Discriminator for LootboxUserState {
    const DISCRIMINATOR: [u8; 8] = [0x48, 0xb1, 0x55, 0xf9, 0x4c, 0xa7, 0xba, 0x7e];
}

impl Discriminator for LootboxPointer {
    const DISCRIMINATOR: [u8; 8] = [0xcf, 0x86, 0x5e, 0x37, 0x6d, 0xdd, 0x3f, 0x79];
}

/// Checks length and `R`'s discriminator, then decodes `body_len` bytes of
/// body. Trailing bytes past the body are ignored.
pub(crate) fn decode_record<R, L>(data: &[u8], name: &'static str, body_len: usize) -> Result<L>
where
    R: Discriminator,
    L: BorshDeserialize,
{
    let expected = DISCRIMINATOR_LEN + body_len;
    if data.len() < expected {
        return Err(ClientError::AccountDataTooSmall {
            expected,
            actual: data.len(),
        });
    }
    if data[..DISCRIMINATOR_LEN] != R::DISCRIMINATOR {
        return Err(ClientError::DiscriminatorMismatch { record: name });
    }

    let mut body = &data[DISCRIMINATOR_LEN..expected];
    Ok(L::deserialize(&mut body)?)
}

pub(crate) fn encode_record<R, L>(layout: &L) -> Result<Vec<u8>>
where
    R: Discriminator,
    L: BorshSerialize,
{
    let mut data = R::DISCRIMINATOR.to_vec();
    layout.serialize(&mut data)?;
    Ok(data)
}
