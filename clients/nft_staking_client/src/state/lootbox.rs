//! Lootbox records read back from the lootbox program.

use anchor_lang::prelude::Pubkey;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::Result;
use crate::state::{decode_record, encode_record};

/// `UserState` is a packed zero-copy account, so its fields sit back to back
/// with no padding and decode sequentially.
#[derive(BorshSerialize, BorshDeserialize)]
struct UserStateLayout {
    bump: u8,
    switchboard_state_bump: u8,
    vrf_permission_bump: u8,
    result_buffer: [u8; 32],
    vrf: [u8; 32],
    user: [u8; 32],
    mint: [u8; 32],
    redeemable: bool,
}

/// Per-owner lootbox state, created on the first VRF setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootboxUserState {
    pub bump: u8,
    pub switchboard_state_bump: u8,
    pub vrf_permission_bump: u8,
    pub result_buffer: [u8; 32],
    pub vrf: Pubkey,
    pub user: Pubkey,
    /// Gear mint picked by the last VRF round.
    pub mint: Pubkey,
    /// True once a VRF round resolved to an unclaimed reward.
    pub redeemable: bool,
}

impl LootboxUserState {
    pub const ACCOUNT_NAME: &'static str = "UserState";
    pub const BODY_LEN: usize = 3 + 32 * 4 + 1;

    pub fn try_from_account_data(data: &[u8]) -> Result<Self> {
        let raw: UserStateLayout = decode_record::<Self, _>(data, Self::ACCOUNT_NAME, Self::BODY_LEN)?;
        Ok(Self {
            bump: raw.bump,
            switchboard_state_bump: raw.switchboard_state_bump,
            vrf_permission_bump: raw.vrf_permission_bump,
            result_buffer: raw.result_buffer,
            vrf: Pubkey::new_from_array(raw.vrf),
            user: Pubkey::new_from_array(raw.user),
            mint: Pubkey::new_from_array(raw.mint),
            redeemable: raw.redeemable,
        })
    }

    pub fn to_account_data(&self) -> Result<Vec<u8>> {
        let raw = UserStateLayout {
            bump: self.bump,
            switchboard_state_bump: self.switchboard_state_bump,
            vrf_permission_bump: self.vrf_permission_bump,
            result_buffer: self.result_buffer,
            vrf: self.vrf.to_bytes(),
            user: self.user.to_bytes(),
            mint: self.mint.to_bytes(),
            redeemable: self.redeemable,
        };
        encode_record::<Self, _>(&raw)
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct LootboxPointerLayout {
    mint: [u8; 32],
    redeemable: bool,
    randomness_requested: bool,
    available_lootbox: u64,
    is_initialized: bool,
}

/// Per-owner pointer to the next lootbox threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootboxPointer {
    pub mint: Pubkey,
    pub redeemable: bool,
    pub randomness_requested: bool,
    /// Reward units at which the next lootbox unlocks.
    pub available_lootbox_threshold: u64,
    pub is_initialized: bool,
}

impl LootboxPointer {
    pub const ACCOUNT_NAME: &'static str = "LootboxPointer";
    pub const BODY_LEN: usize = 32 + 1 + 1 + 8 + 1;

    pub fn try_from_account_data(data: &[u8]) -> Result<Self> {
        let raw: LootboxPointerLayout = decode_record::<Self, _>(data, Self::ACCOUNT_NAME, Self::BODY_LEN)?;
        Ok(Self {
            mint: Pubkey::new_from_array(raw.mint),
            redeemable: raw.redeemable,
            randomness_requested: raw.randomness_requested,
            available_lootbox_threshold: raw.available_lootbox,
            is_initialized: raw.is_initialized,
        })
    }

    pub fn to_account_data(&self) -> Result<Vec<u8>> {
        let raw = LootboxPointerLayout {
            mint: self.mint.to_bytes(),
            redeemable: self.redeemable,
            randomness_requested: self.randomness_requested,
            available_lootbox: self.available_lootbox_threshold,
            is_initialized: self.is_initialized,
        };
        encode_record::<Self, _>(&raw)
    }
}
