//! Session facade wiring the builders, the orchestrator and the read-back.
//!
//! Every mutating call follows the same shape: read the confirmed record,
//! plan, build, submit and await finalization, then re-fetch. Local copies
//! are never updated ahead of that re-fetch, and a transient failure of the
//! re-fetch is retried before it is reported.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::token::spl_token;
use log::{debug, info, warn};
use solana_sdk::signature::Signature;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::constants::READ_BACK_ATTEMPTS;
use crate::error::{ClientError, Result};
use crate::lifecycle::{self, StakeAction, StakeLifecycle};
use crate::lootbox_flow::{LootboxAction, LootboxFlow, LootboxView, VrfOracle};
use crate::orchestrator::TransactionOrchestrator;
use crate::pda;
use crate::reward::{run_accrual_ticker, AccrualSnapshot, ConfirmedRecord};
use crate::rpc::{fetch_record, FetchOutcome, RpcTransport, WalletSigner};
use crate::state::StakeRecord;

/// Clears the busy flag when the operation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Stake record at one address, read fresh on every call.
struct StakeRecordReader<'a, R> {
    rpc: &'a R,
    address: Pubkey,
}

impl<R: RpcTransport> ConfirmedRecord for StakeRecordReader<'_, R> {
    async fn confirmed_record(&self) -> Result<Option<StakeRecord>> {
        fetch_record(self.rpc, &self.address, StakeRecord::try_from_account_data)
            .await?
            .into_option()
    }
}

/// Staking and lootbox client for one wallet.
///
/// At most one mutating operation runs at a time; a second one started while
/// the first is outstanding fails with [`ClientError::Busy`].
pub struct StakingClient<R, W> {
    orchestrator: TransactionOrchestrator<R, W>,
    config: ClientConfig,
    lifecycle: StakeLifecycle,
    lootbox: LootboxFlow,
    busy: AtomicBool,
}

impl<R, W> StakingClient<R, W>
where
    R: RpcTransport,
    W: WalletSigner,
{
    pub fn new(rpc: R, wallet: W, config: ClientConfig) -> Self {
        Self {
            orchestrator: TransactionOrchestrator::new(rpc, wallet, &config),
            lifecycle: StakeLifecycle::from_config(&config),
            lootbox: LootboxFlow::from_config(&config),
            config,
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rpc(&self) -> &R {
        self.orchestrator.rpc()
    }

    pub fn orchestrator(&self) -> &TransactionOrchestrator<R, W> {
        &self.orchestrator
    }

    pub fn owner(&self) -> Pubkey {
        self.orchestrator.payer()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(ClientError::Busy);
        }
        Ok(InFlight(&self.busy))
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn stake_record_address(&self, holding_account: &Pubkey) -> Result<Pubkey> {
        let (address, _) = pda::stake_record(&self.owner(), holding_account, &self.config.staking_program)?;
        Ok(address)
    }

    fn stake_record_reader(&self, holding_account: &Pubkey) -> Result<StakeRecordReader<'_, R>> {
        Ok(StakeRecordReader {
            rpc: self.rpc(),
            address: self.stake_record_address(holding_account)?,
        })
    }

    /// Last confirmed stake record, `None` if it was never created.
    pub async fn fetch_stake_record(&self, holding_account: &Pubkey) -> Result<Option<StakeRecord>> {
        self.stake_record_reader(holding_account)?
            .confirmed_record()
            .await
    }

    /// Accrual snapshot at the current network time.
    pub async fn accrual(&self, holding_account: &Pubkey) -> Result<AccrualSnapshot> {
        let record = self.fetch_stake_record(holding_account).await?;
        let now = self.rpc().network_time().await?;
        Ok(AccrualSnapshot::new(record.as_ref(), now))
    }

    /// Re-reads the confirmed record every configured period and reports its
    /// accrual, until `cancel` fires or the record leaves `Staking`.
    pub async fn watch_accrual<F>(
        &self,
        holding_account: &Pubkey,
        cancel: watch::Receiver<bool>,
        on_tick: F,
    ) -> Result<usize>
    where
        F: FnMut(AccrualSnapshot),
    {
        let reader = self.stake_record_reader(holding_account)?;
        Ok(run_accrual_ticker(self.rpc(), &reader, self.config.ticker_period, cancel, on_tick).await)
    }

    /// Reads back after `signature` finalized. Transient failures are retried
    /// one poll interval apart; if they persist the error carries the
    /// signature so the caller knows the transaction landed.
    async fn read_back<T, F, Fut>(&self, signature: &Signature, mut read: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match read().await {
                Err(ClientError::Transient(reason)) if attempt < READ_BACK_ATTEMPTS => {
                    warn!(
                        "Read-back after {} failed (attempt {}/{}): {}",
                        signature, attempt, READ_BACK_ATTEMPTS, reason
                    );
                    attempt += 1;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(ClientError::Transient(reason)) => {
                    return Err(ClientError::ReadBackPending {
                        signature: *signature,
                        reason,
                    })
                }
                other => return other,
            }
        }
    }

    /// Absence is an answer; any other read failure is returned.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        match self.rpc().get_account_data(address).await {
            FetchOutcome::Found(_) => Ok(true),
            FetchOutcome::NotFound => Ok(false),
            FetchOutcome::TransientError(reason) => Err(ClientError::Transient(reason)),
        }
    }

    pub async fn reward_account_exists(&self) -> Result<bool> {
        let address = self.lifecycle.reward_account(&self.owner());
        self.account_exists(&address).await
    }

    /// Checks that `holding_account` is the owner's token account for
    /// `collectible_mint` and holds exactly one unit.
    pub async fn verify_holding(&self, holding_account: &Pubkey, collectible_mint: &Pubkey) -> Result<()> {
        let data = match self.rpc().get_account_data(holding_account).await {
            FetchOutcome::Found(data) => data,
            FetchOutcome::NotFound => return Err(ClientError::CollectibleNotHeld),
            FetchOutcome::TransientError(reason) => return Err(ClientError::Transient(reason)),
        };
        let account =
            spl_token::state::Account::unpack(&data).map_err(|_| ClientError::InvalidTokenAccount)?;

        if account.owner != self.owner() || account.mint != *collectible_mint || account.amount != 1 {
            return Err(ClientError::CollectibleNotHeld);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Stake lifecycle
    // ---------------------------------------------------------------------

    /// Stakes the collectible, creating the record on first use.
    pub async fn stake(&self, holding_account: &Pubkey, collectible_mint: &Pubkey) -> Result<StakeRecord> {
        self.run_stake_action(StakeAction::Stake, holding_account, collectible_mint)
            .await
    }

    /// Pays out accrued reward; the record stays `Staking`.
    pub async fn redeem(&self, holding_account: &Pubkey, collectible_mint: &Pubkey) -> Result<StakeRecord> {
        self.run_stake_action(StakeAction::Redeem, holding_account, collectible_mint)
            .await
    }

    /// Releases custody and pays the final reward.
    pub async fn unstake(&self, holding_account: &Pubkey, collectible_mint: &Pubkey) -> Result<StakeRecord> {
        self.run_stake_action(StakeAction::Unstake, holding_account, collectible_mint)
            .await
    }

    async fn run_stake_action(
        &self,
        action: StakeAction,
        holding_account: &Pubkey,
        collectible_mint: &Pubkey,
    ) -> Result<StakeRecord> {
        let _in_flight = self.begin()?;
        let owner = self.owner();
        let address = self.stake_record_address(holding_account)?;

        let record = self.fetch_stake_record(holding_account).await?;
        let plan = lifecycle::plan(action, record.as_ref())?;
        if action == StakeAction::Stake {
            self.verify_holding(holding_account, collectible_mint).await?;
        }

        let reward_account_exists = self.reward_account_exists().await?;
        let instructions = self.lifecycle.instructions(
            &plan,
            &owner,
            holding_account,
            collectible_mint,
            reward_account_exists,
        )?;
        debug!(
            "Planned {} for {} (initialize: {}, create reward account: {})",
            action.name(),
            address,
            plan.initialize,
            !reward_account_exists
        );

        let signature = self.orchestrator.submit(&instructions, &[]).await?;
        info!("{} confirmed for {}: {}", action.name(), address, signature);

        self.read_back(&signature, move || async move {
            self.fetch_stake_record(holding_account)
                .await
                .and_then(|record| record.ok_or(ClientError::AccountNotFound(address)))
        })
        .await
    }

    // ---------------------------------------------------------------------
    // Lootbox
    // ---------------------------------------------------------------------

    pub async fn lootbox_status(&self) -> Result<LootboxView> {
        self.lootbox.status(self.rpc(), &self.owner()).await
    }

    /// Widget action for the owner, gated by the record's `total_earned`.
    pub async fn lootbox_action(&self, holding_account: &Pubkey) -> Result<LootboxAction> {
        let cumulative = self.cumulative_reward(holding_account).await?;
        let view = self.lootbox_status().await?;
        Ok(view.action(cumulative))
    }

    async fn cumulative_reward(&self, holding_account: &Pubkey) -> Result<u64> {
        Ok(self
            .fetch_stake_record(holding_account)
            .await?
            .map(|record| record.total_earned)
            .unwrap_or(0))
    }

    /// Sets up the VRF account and the lootbox user state.
    pub async fn enable_lootbox<O: VrfOracle>(&self, oracle: &O) -> Result<LootboxView> {
        let _in_flight = self.begin()?;
        let owner = self.owner();

        let view = self.lootbox_status().await?;
        let bundle = self.lootbox.enable(oracle, &owner, &view).await?;
        let signature = self
            .orchestrator
            .submit(&bundle.instructions, &[&bundle.vrf_keypair])
            .await?;
        info!("Lootbox enabled for {}: {}", owner, signature);

        self.read_back(&signature, move || self.lootbox_status()).await
    }

    /// Opens the next lootbox. The returned view still reads `Accruing`
    /// until the VRF callback lands.
    pub async fn open_lootbox<O: VrfOracle>(&self, oracle: &O, holding_account: &Pubkey) -> Result<LootboxView> {
        let _in_flight = self.begin()?;
        let owner = self.owner();

        let cumulative = self.cumulative_reward(holding_account).await?;
        let view = self.lootbox_status().await?;
        let payer_wallet = pda::token_account(&owner, &spl_token::native_mint::ID);
        let payer_wallet_exists = self.account_exists(&payer_wallet).await?;

        let instructions = self.lootbox.open(
            oracle,
            &owner,
            holding_account,
            &view,
            cumulative,
            payer_wallet_exists,
        )?;
        let signature = self.orchestrator.submit(&instructions, &[]).await?;
        info!("Lootbox {} opened for {}: {}", view.threshold, owner, signature);

        self.read_back(&signature, move || self.lootbox_status()).await
    }

    /// Claims the pending lootbox item.
    pub async fn redeem_loot(&self) -> Result<LootboxView> {
        let _in_flight = self.begin()?;
        let owner = self.owner();

        let view = self.lootbox_status().await?;
        let instruction = self.lootbox.redeem(&owner, &view)?;
        let signature = self.orchestrator.submit(&[instruction], &[]).await?;
        info!("Lootbox item redeemed for {}: {}", owner, signature);

        self.read_back(&signature, move || self.lootbox_status()).await
    }
}
