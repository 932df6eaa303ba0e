//! Reward accrual arithmetic and the display refresh ticker.
//!
//! All values are derived from the last *confirmed* record and a freshly
//! queried network time. Nothing here extrapolates past confirmation, so a
//! pending redeem can never be counted twice.

use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;

use crate::constants::*;
use crate::error::Result;
use crate::rpc::NetworkClock;
use crate::state::{StakeRecord, StakeState};

/// Seconds accrued since the last redeem. Clamped at zero if the network
/// clock reads behind the record.
pub fn accrued(now: i64, last_redeem_time: i64) -> i64 {
    now.saturating_sub(last_redeem_time).max(0)
}

/// Seconds since the stake started.
pub fn elapsed_since_start(now: i64, stake_start_time: i64) -> i64 {
    now.saturating_sub(stake_start_time).max(0)
}

/// Whole days since the stake started (floor).
pub fn days_staked(now: i64, stake_start_time: i64) -> i64 {
    elapsed_since_start(now, stake_start_time) / SECONDS_PER_DAY
}

/// Reward in token base units the program mints for `seconds` of staking:
/// `REWARD_TOKENS_PER_DAY * 10^decimals * seconds / SECONDS_PER_DAY`.
pub fn estimated_reward(seconds: i64) -> u64 {
    let per_day = REWARD_TOKENS_PER_DAY as i128 * 10i128.pow(REWARD_DECIMALS as u32);
    let amount = per_day * seconds.max(0) as i128 / SECONDS_PER_DAY as i128;
    u64::try_from(amount).unwrap_or(u64::MAX)
}

/// Formats base units as a decimal token amount, e.g. `1234` -> `12.34`.
pub fn format_reward(base_units: u64) -> String {
    let scale = 10u64.pow(REWARD_DECIMALS as u32);
    format!(
        "{}.{:0width$}",
        base_units / scale,
        base_units % scale,
        width = REWARD_DECIMALS as usize
    )
}

/// Hours, minutes and seconds of an accrued duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Elapsed {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Elapsed {
    pub fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        Self {
            hours: total / SECONDS_PER_HOUR,
            minutes: total / SECONDS_PER_MINUTE % 60,
            seconds: total % SECONDS_PER_MINUTE,
        }
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Display state of one stake record at one network time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualSnapshot {
    pub state: StakeState,
    pub now: i64,
    pub accrued_seconds: i64,
    pub elapsed: Elapsed,
    pub days_staked: i64,
    /// Base units the next redeem would mint.
    pub claimable: u64,
    /// Cumulative reward counter read back from the record.
    pub total_earned: u64,
}

impl AccrualSnapshot {
    /// Builds the snapshot; a missing or unstaked record accrues nothing.
    pub fn new(record: Option<&StakeRecord>, now: i64) -> Self {
        match record {
            Some(record) if record.is_staking() => {
                let accrued_seconds = accrued(now, record.last_redeem_time);
                Self {
                    state: StakeState::Staking,
                    now,
                    accrued_seconds,
                    elapsed: Elapsed::from_seconds(accrued_seconds),
                    days_staked: days_staked(now, record.stake_start_time),
                    claimable: estimated_reward(accrued_seconds),
                    total_earned: record.total_earned,
                }
            }
            _ => Self {
                state: StakeState::Unstaked,
                now,
                accrued_seconds: 0,
                elapsed: Elapsed::default(),
                days_staked: 0,
                claimable: 0,
                total_earned: record.map(|r| r.total_earned).unwrap_or(0),
            },
        }
    }

    /// Status badge, e.g. `STAKING 4 DAYS` or `READY TO STAKE`.
    pub fn status_label(&self) -> String {
        match self.state {
            StakeState::Staking => format!(
                "STAKING {} DAY{}",
                self.days_staked,
                if self.days_staked == 1 { "" } else { "S" }
            ),
            StakeState::Unstaked => "READY TO STAKE".to_string(),
        }
    }
}

/// Cancels a running [`run_accrual_ticker`]. Dropping the handle cancels too.
#[derive(Debug)]
pub struct TickerHandle {
    cancel: watch::Sender<bool>,
}

impl TickerHandle {
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

/// Creates a handle and the receiver the ticker listens on.
pub fn ticker_channel() -> (TickerHandle, watch::Receiver<bool>) {
    let (cancel, receiver) = watch::channel(false);
    (TickerHandle { cancel }, receiver)
}

/// Where the ticker re-reads the last confirmed stake record each period.
#[allow(async_fn_in_trait)]
pub trait ConfirmedRecord {
    async fn confirmed_record(&self) -> Result<Option<StakeRecord>>;
}

async fn tick_snapshot<C, S>(clock: &C, source: &S) -> Result<AccrualSnapshot>
where
    C: NetworkClock,
    S: ConfirmedRecord,
{
    let record = source.confirmed_record().await?;
    let now = clock.network_time().await?;
    Ok(AccrualSnapshot::new(record.as_ref(), now))
}

/// Every `period`, re-reads the confirmed record and network time and hands
/// the snapshot to `on_tick`, until cancelled.
///
/// Stops on its own after delivering the first snapshot whose record is no
/// longer staking. A failed read skips that tick rather than extrapolating.
/// Returns the number of snapshots delivered.
pub async fn run_accrual_ticker<C, S, F>(
    clock: &C,
    source: &S,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
    mut on_tick: F,
) -> usize
where
    C: NetworkClock,
    S: ConfirmedRecord,
    F: FnMut(AccrualSnapshot),
{
    let mut interval = tokio::time::interval(period);
    let mut delivered = 0;

    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    debug!("Accrual ticker cancelled after {} ticks", delivered);
                    break;
                }
            }
            _ = interval.tick() => {
                match tick_snapshot(clock, source).await {
                    Ok(snapshot) => {
                        let staking = snapshot.state == StakeState::Staking;
                        on_tick(snapshot);
                        delivered += 1;
                        if !staking {
                            debug!("Stake no longer staking, accrual ticker stopped after {} ticks", delivered);
                            break;
                        }
                    }
                    Err(err) => warn!("Skipping accrual tick: {}", err),
                }
            }
        }
    }

    delivered
}
