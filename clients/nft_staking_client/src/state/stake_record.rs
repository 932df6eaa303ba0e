//! Stake record read back from the staking program.

use anchor_lang::prelude::Pubkey;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::{ClientError, Result};
use crate::state::{decode_record, encode_record};

/// Lifecycle state of a stake record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StakeState {
    #[default]
    Unstaked,
    Staking,
}

impl StakeState {
    pub fn name(&self) -> &'static str {
        match self {
            StakeState::Unstaked => "Unstaked",
            StakeState::Staking => "Staking",
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(StakeState::Unstaked),
            1 => Ok(StakeState::Staking),
            other => Err(ClientError::InvalidStakeState(other)),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            StakeState::Unstaked => 0,
            StakeState::Staking => 1,
        }
    }
}

/// On-chain body of `UserStakeInfo`, in field order.
#[derive(BorshSerialize, BorshDeserialize)]
struct UserStakeInfoLayout {
    token_account: [u8; 32],
    stake_start_time: i64,
    last_stake_redeem: i64,
    user_pubkey: [u8; 32],
    stake_state: u8,
    is_initialized: bool,
    total_earned: u64,
}

/// Per (owner, collectible) stake record.
///
/// `last_redeem_time >= stake_start_time` holds for every record the program
/// writes. `total_earned` is the program's cumulative reward counter and the
/// value the lootbox threshold is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeRecord {
    pub owner: Pubkey,
    pub holding_account: Pubkey,
    pub state: StakeState,
    pub stake_start_time: i64,
    pub last_redeem_time: i64,
    pub is_initialized: bool,
    pub total_earned: u64,
}

impl StakeRecord {
    pub const ACCOUNT_NAME: &'static str = "UserStakeInfo";
    pub const BODY_LEN: usize = 32 + 8 + 8 + 32 + 1 + 1 + 8;

    pub fn try_from_account_data(data: &[u8]) -> Result<Self> {
        let raw: UserStakeInfoLayout = decode_record::<Self, _>(data, Self::ACCOUNT_NAME, Self::BODY_LEN)?;
        Ok(Self {
            owner: Pubkey::new_from_array(raw.user_pubkey),
            holding_account: Pubkey::new_from_array(raw.token_account),
            state: StakeState::from_tag(raw.stake_state)?,
            stake_start_time: raw.stake_start_time,
            last_redeem_time: raw.last_stake_redeem,
            is_initialized: raw.is_initialized,
            total_earned: raw.total_earned,
        })
    }

    pub fn to_account_data(&self) -> Result<Vec<u8>> {
        let raw = UserStakeInfoLayout {
            token_account: self.holding_account.to_bytes(),
            stake_start_time: self.stake_start_time,
            last_stake_redeem: self.last_redeem_time,
            user_pubkey: self.owner.to_bytes(),
            stake_state: self.state.tag(),
            is_initialized: self.is_initialized,
            total_earned: self.total_earned,
        };
        encode_record::<Self, _>(&raw)
    }

    pub fn is_staking(&self) -> bool {
        self.state == StakeState::Staking
    }
}
