#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::program_option::COption;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_lang::solana_program::system_instruction;
use anchor_lang::system_program;
use anchor_lang::Discriminator;
use anchor_spl::associated_token;
use anchor_spl::token::{self, spl_token};
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

use nft_staking_client::instructions::{
    InitUserParams, OpenLootboxParams, RetrieveItemParams, VrfRequestAccounts,
};
use nft_staking_client::lootbox_flow::{SwitchboardQueue, VrfOracle, VrfSetup};
use nft_staking_client::pda;
use nft_staking_client::{
    BlockhashReference, ClientConfig, ClientError, Commitment, FetchOutcome, LootboxPointer,
    LootboxUserState, NetworkClock, Result, RpcTransport, SignatureStatus, StakeRecord, StakeState,
    StakingClient, WalletSigner,
};

const BLOCKHASH_VALIDITY: u64 = 150;

/// Program id, data and account keys of one executed instruction.
#[derive(Debug, Clone)]
pub struct Executed {
    pub program: Pubkey,
    pub data: Vec<u8>,
    pub accounts: Vec<Pubkey>,
}

struct Landed {
    polls: u32,
    error: Option<String>,
}

struct ClusterState {
    staking_program: Pubkey,
    lootbox_program: Pubkey,
    clock: i64,
    block_height: u64,
    accounts: HashMap<Pubkey, Vec<u8>>,
    statuses: HashMap<Signature, Landed>,
    polls_to_finalize: u32,
    never_finalize: bool,
    drop_transactions: bool,
    send_failure: Option<String>,
    transient: HashSet<Pubkey>,
    flaky_after_send: HashMap<Pubkey, u32>,
    flaky: HashMap<Pubkey, u32>,
    transactions: Vec<Vec<Executed>>,
}

/// In-memory cluster that runs the staking and lootbox programs' observable
/// effects against its own clock.
pub struct MockCluster {
    state: RefCell<ClusterState>,
}

impl MockCluster {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            state: RefCell::new(ClusterState {
                staking_program: config.staking_program,
                lootbox_program: config.lootbox_program,
                clock: 0,
                block_height: 1,
                accounts: HashMap::new(),
                statuses: HashMap::new(),
                polls_to_finalize: 1,
                never_finalize: false,
                drop_transactions: false,
                send_failure: None,
                transient: HashSet::new(),
                flaky_after_send: HashMap::new(),
                flaky: HashMap::new(),
                transactions: Vec::new(),
            }),
        }
    }

    pub fn set_clock(&self, now: i64) {
        self.state.borrow_mut().clock = now;
    }

    pub fn set_polls_to_finalize(&self, polls: u32) {
        self.state.borrow_mut().polls_to_finalize = polls;
    }

    /// Transactions land but never get past `Confirmed`.
    pub fn never_finalize(&self) {
        self.state.borrow_mut().never_finalize = true;
    }

    /// Accepted transactions are silently dropped and block height races ahead.
    pub fn drop_transactions(&self) {
        self.state.borrow_mut().drop_transactions = true;
    }

    pub fn fail_sends(&self, reason: &str) {
        self.state.borrow_mut().send_failure = Some(reason.to_string());
    }

    pub fn make_transient(&self, address: Pubkey) {
        self.state.borrow_mut().transient.insert(address);
    }

    pub fn clear_transient(&self, address: &Pubkey) {
        self.state.borrow_mut().transient.remove(address);
    }

    /// Once the next transaction lands, the following `reads` of `address`
    /// fail with a transient error.
    pub fn fail_reads_after_send(&self, address: Pubkey, reads: u32) {
        self.state.borrow_mut().flaky_after_send.insert(address, reads);
    }

    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>) {
        self.state.borrow_mut().accounts.insert(address, data);
    }

    pub fn account(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.state.borrow().accounts.get(address).cloned()
    }

    pub fn token_account(&self, address: &Pubkey) -> Option<spl_token::state::Account> {
        self.account(address)
            .map(|data| spl_token::state::Account::unpack(&data).expect("token account"))
    }

    pub fn token_balance(&self, address: &Pubkey) -> u64 {
        self.token_account(address).map(|a| a.amount).unwrap_or(0)
    }

    pub fn transaction_count(&self) -> usize {
        self.state.borrow().transactions.len()
    }

    pub fn last_transaction(&self) -> Vec<Executed> {
        self.state
            .borrow()
            .transactions
            .last()
            .cloned()
            .unwrap_or_default()
    }

    /// Lets the VRF callback land: the owner's user state becomes redeemable
    /// for a freshly picked gear mint, which is returned.
    pub fn resolve_vrf(&self, owner: &Pubkey) -> Pubkey {
        let mut state = self.state.borrow_mut();
        let lootbox_program = state.lootbox_program;
        let gear_mint = Pubkey::new_unique();

        let (state_address, _) = pda::lootbox_user_state(owner, &lootbox_program).unwrap();
        let mut user_state = state
            .accounts
            .get(&state_address)
            .map(|data| LootboxUserState::try_from_account_data(data).unwrap())
            .expect("lootbox user state");
        user_state.redeemable = true;
        user_state.mint = gear_mint;
        state
            .accounts
            .insert(state_address, user_state.to_account_data().unwrap());

        let (pointer_address, _) = pda::lootbox_pointer(owner, &lootbox_program).unwrap();
        let pointer = state
            .accounts
            .get(&pointer_address)
            .map(|data| LootboxPointer::try_from_account_data(data).unwrap());
        if let Some(mut pointer) = pointer {
            pointer.randomness_requested = false;
            pointer.redeemable = true;
            pointer.mint = gear_mint;
            state
                .accounts
                .insert(pointer_address, pointer.to_account_data().unwrap());
        }

        gear_mint
    }
}

pub fn token_account_data(owner: &Pubkey, mint: &Pubkey, amount: u64) -> Vec<u8> {
    let account = spl_token::state::Account {
        mint: *mint,
        owner: *owner,
        amount,
        delegate: COption::None,
        state: spl_token::state::AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; spl_token::state::Account::LEN];
    spl_token::state::Account::pack(account, &mut data).unwrap();
    data
}

type Accounts = HashMap<Pubkey, Vec<u8>>;
type Outcome = std::result::Result<(), String>;

impl ClusterState {
    /// Runs every instruction against a scratch copy; commits only if all pass.
    fn execute(&mut self, executed: &[Executed]) -> Outcome {
        let mut accounts = self.accounts.clone();
        for ix in executed {
            self.dispatch(&mut accounts, ix)?;
        }
        self.accounts = accounts;
        Ok(())
    }

    fn dispatch(&self, accounts: &mut Accounts, ix: &Executed) -> Outcome {
        if ix.program == self.staking_program {
            self.run_staking(accounts, &ix.accounts, &ix.data)
        } else if ix.program == self.lootbox_program {
            self.run_lootbox(accounts, &ix.accounts, &ix.data)
        } else if ix.program == associated_token::ID {
            let (address, wallet, mint) = (ix.accounts[1], ix.accounts[2], ix.accounts[3]);
            if accounts.contains_key(&address) {
                return Err(format!("account {} already in use", address));
            }
            accounts.insert(address, token_account_data(&wallet, &mint, 0));
            Ok(())
        } else if ix.program == system_program::ID || ix.program == token::ID {
            Ok(())
        } else {
            Err(format!("unknown program {}", ix.program))
        }
    }

    fn run_staking(&self, accounts: &mut Accounts, keys: &[Pubkey], data: &[u8]) -> Outcome {
        match data {
            [0] => {
                if accounts.contains_key(&keys[2]) {
                    return Err("stake account already initialized".into());
                }
                let record = StakeRecord {
                    owner: keys[0],
                    holding_account: keys[1],
                    state: StakeState::Unstaked,
                    stake_start_time: 0,
                    last_redeem_time: 0,
                    is_initialized: true,
                    total_earned: 0,
                };
                store_record(accounts, keys[2], &record)
            }
            [1] => {
                let mut record = load_record(accounts, &keys[4])?;
                if record.state == StakeState::Staking {
                    return Err("already staking".into());
                }
                if load_token(accounts, &keys[1])?.is_frozen() {
                    return Err("account is frozen".into());
                }
                record.state = StakeState::Staking;
                record.stake_start_time = self.clock;
                record.last_redeem_time = self.clock;
                update_token(accounts, &keys[1], |account| {
                    account.delegate = COption::Some(keys[5]);
                    account.delegated_amount = 1;
                    account.state = spl_token::state::AccountState::Frozen;
                })?;
                store_record(accounts, keys[4], &record)
            }
            [2] => {
                let mut record = load_record(accounts, &keys[2])?;
                self.pay(accounts, &keys[5], &mut record)?;
                store_record(accounts, keys[2], &record)
            }
            [3] => {
                let mut record = load_record(accounts, &keys[4])?;
                self.pay(accounts, &keys[8], &mut record)?;
                record.state = StakeState::Unstaked;
                update_token(accounts, &keys[1], |account| {
                    account.delegate = COption::None;
                    account.delegated_amount = 0;
                    account.state = spl_token::state::AccountState::Initialized;
                })?;
                store_record(accounts, keys[4], &record)
            }
            _ => Err(format!("invalid instruction data {:?}", data)),
        }
    }

    /// One reward unit per second since the last redeem.
    fn pay(&self, accounts: &mut Accounts, reward_account: &Pubkey, record: &mut StakeRecord) -> Outcome {
        if record.state != StakeState::Staking {
            return Err("not staking".into());
        }
        let reward = (self.clock - record.last_redeem_time).max(0) as u64;
        update_token(accounts, reward_account, |account| account.amount += reward)?;
        record.total_earned += reward;
        record.last_redeem_time = self.clock;
        Ok(())
    }

    fn run_lootbox(&self, accounts: &mut Accounts, keys: &[Pubkey], data: &[u8]) -> Outcome {
        if data.len() < 8 {
            return Err("missing sighash".into());
        }
        let (sighash, args) = data.split_at(8);

        if sighash == InitUserParams::DISCRIMINATOR {
            if accounts.contains_key(&keys[0]) {
                return Err("user state already initialized".into());
            }
            let (_, bump) = Pubkey::find_program_address(&[keys[2].as_ref()], &self.lootbox_program);
            let user_state = LootboxUserState {
                bump,
                switchboard_state_bump: args[0],
                vrf_permission_bump: args[1],
                result_buffer: [0u8; 32],
                vrf: keys[1],
                user: keys[2],
                mint: Pubkey::default(),
                redeemable: false,
            };
            accounts.insert(keys[0], user_state.to_account_data().map_err(|e| e.to_string())?);
            Ok(())
        } else if sighash == OpenLootboxParams::DISCRIMINATOR {
            let box_number = u64::from_le_bytes(args[..8].try_into().map_err(|_| "bad box number")?);
            let record = load_record(accounts, &keys[7])?;
            if record.total_earned < box_number {
                return Err("not enough earned".into());
            }
            let user_state = load_user_state(accounts, &keys[8])?;
            if user_state.redeemable {
                return Err("item pending".into());
            }
            let mut short = false;
            update_token(accounts, &keys[5], |account| match account.amount.checked_sub(box_number) {
                Some(left) => account.amount = left,
                None => short = true,
            })?;
            if short {
                return Err("insufficient reward balance".into());
            }
            let pointer = LootboxPointer {
                mint: Pubkey::default(),
                redeemable: false,
                randomness_requested: true,
                available_lootbox_threshold: box_number + 10,
                is_initialized: true,
            };
            accounts.insert(keys[1], pointer.to_account_data().map_err(|e| e.to_string())?);
            Ok(())
        } else if sighash == RetrieveItemParams::DISCRIMINATOR {
            let (user, pointer_address, gear_mint, gear_account) = (keys[0], keys[1], keys[2], keys[3]);
            let mut pointer = load_pointer(accounts, &pointer_address)?;
            if !pointer.is_initialized || pointer.mint != gear_mint {
                return Err("pointer mint mismatch".into());
            }
            let (state_address, _) = pda::lootbox_user_state(&user, &self.lootbox_program).map_err(|e| e.to_string())?;
            let mut user_state = load_user_state(accounts, &state_address)?;
            if !user_state.redeemable || user_state.mint != gear_mint {
                return Err("nothing to redeem".into());
            }
            user_state.redeemable = false;
            pointer.redeemable = false;
            accounts.insert(state_address, user_state.to_account_data().map_err(|e| e.to_string())?);
            accounts.insert(pointer_address, pointer.to_account_data().map_err(|e| e.to_string())?);
            if !accounts.contains_key(&gear_account) {
                accounts.insert(gear_account, token_account_data(&user, &gear_mint, 0));
            }
            update_token(accounts, &gear_account, |account| account.amount += 1)
        } else {
            Err("unknown lootbox instruction".into())
        }
    }
}

fn load_record(accounts: &Accounts, address: &Pubkey) -> std::result::Result<StakeRecord, String> {
    let data = accounts.get(address).ok_or("stake account not initialized")?;
    StakeRecord::try_from_account_data(data).map_err(|e| e.to_string())
}

fn store_record(accounts: &mut Accounts, address: Pubkey, record: &StakeRecord) -> Outcome {
    accounts.insert(address, record.to_account_data().map_err(|e| e.to_string())?);
    Ok(())
}

fn load_user_state(accounts: &Accounts, address: &Pubkey) -> std::result::Result<LootboxUserState, String> {
    let data = accounts.get(address).ok_or("user state not initialized")?;
    LootboxUserState::try_from_account_data(data).map_err(|e| e.to_string())
}

fn load_pointer(accounts: &Accounts, address: &Pubkey) -> std::result::Result<LootboxPointer, String> {
    let data = accounts.get(address).ok_or("lootbox pointer not initialized")?;
    LootboxPointer::try_from_account_data(data).map_err(|e| e.to_string())
}

fn load_token(accounts: &Accounts, address: &Pubkey) -> std::result::Result<spl_token::state::Account, String> {
    let data = accounts
        .get(address)
        .ok_or_else(|| format!("token account {} missing", address))?;
    spl_token::state::Account::unpack(data).map_err(|e| e.to_string())
}

fn update_token<F>(accounts: &mut Accounts, address: &Pubkey, update: F) -> Outcome
where
    F: FnOnce(&mut spl_token::state::Account),
{
    let data = accounts
        .get_mut(address)
        .ok_or_else(|| format!("token account {} missing", address))?;
    let mut account = spl_token::state::Account::unpack(data).map_err(|e| e.to_string())?;
    update(&mut account);
    spl_token::state::Account::pack(account, data).map_err(|e| e.to_string())
}

impl NetworkClock for MockCluster {
    async fn network_time(&self) -> Result<i64> {
        Ok(self.state.borrow().clock)
    }
}

impl RpcTransport for MockCluster {
    async fn get_account_data(&self, address: &Pubkey) -> FetchOutcome<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        if state.transient.contains(address) {
            return FetchOutcome::TransientError("connection reset".into());
        }
        if let Some(left) = state.flaky.get_mut(address) {
            if *left > 0 {
                *left -= 1;
                return FetchOutcome::TransientError("connection reset".into());
            }
        }
        match state.accounts.get(address) {
            Some(data) => FetchOutcome::Found(data.clone()),
            None => FetchOutcome::NotFound,
        }
    }

    async fn get_latest_blockhash(&self) -> Result<BlockhashReference> {
        let state = self.state.borrow();
        Ok(BlockhashReference {
            blockhash: Hash::new_unique(),
            last_valid_block_height: state.block_height + BLOCKHASH_VALIDITY,
        })
    }

    async fn get_block_height(&self) -> Result<u64> {
        let mut state = self.state.borrow_mut();
        if state.drop_transactions {
            state.block_height += 100;
        }
        Ok(state.block_height)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = &state.send_failure {
            return Err(ClientError::SendFailed(reason.clone()));
        }
        transaction
            .verify()
            .map_err(|e| ClientError::SendFailed(e.to_string()))?;

        let signature = transaction.signatures[0];
        if state.drop_transactions {
            return Ok(signature);
        }

        let message = &transaction.message;
        let executed: Vec<Executed> = message
            .instructions
            .iter()
            .map(|ix| Executed {
                program: message.account_keys[ix.program_id_index as usize],
                data: ix.data.clone(),
                accounts: ix
                    .accounts
                    .iter()
                    .map(|index| message.account_keys[*index as usize])
                    .collect(),
            })
            .collect();

        let error = state.execute(&executed).err();
        let flaky: Vec<(Pubkey, u32)> = state.flaky_after_send.drain().collect();
        state.flaky.extend(flaky);
        state.transactions.push(executed);
        state.block_height += 1;
        state.statuses.insert(signature, Landed { polls: 0, error });
        Ok(signature)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        let mut state = self.state.borrow_mut();
        let polls_to_finalize = state.polls_to_finalize;
        let never_finalize = state.never_finalize;

        Ok(state.statuses.get_mut(signature).map(|landed| {
            landed.polls += 1;
            let commitment = if !never_finalize && landed.polls >= polls_to_finalize {
                Commitment::Finalized
            } else {
                Commitment::Confirmed
            };
            SignatureStatus {
                commitment,
                error: landed.error.clone(),
            }
        }))
    }
}

/// A wallet whose holder declines every request.
pub struct RejectingWallet(pub Pubkey);

impl WalletSigner for RejectingWallet {
    fn pubkey(&self) -> Pubkey {
        self.0
    }

    async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction> {
        Err(ClientError::SigningRejected("user declined".into()))
    }
}

/// VRF oracle backed by a made-up Switchboard deployment.
pub struct MockOracle {
    pub queue: SwitchboardQueue,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            queue: SwitchboardQueue {
                program: Pubkey::new_unique(),
                queue: Pubkey::new_unique(),
                queue_authority: Pubkey::new_unique(),
                data_buffer: Pubkey::new_unique(),
            },
        }
    }
}

impl VrfOracle for MockOracle {
    async fn setup(&self, vrf: &Pubkey, _authority: &Pubkey, payer: &Pubkey) -> Result<VrfSetup> {
        Ok(VrfSetup {
            instructions: vec![system_instruction::create_account(
                payer,
                vrf,
                1_000_000,
                376,
                &self.queue.program,
            )],
            params: self.queue.init_params(vrf)?,
        })
    }

    fn request_accounts(&self, vrf: &Pubkey, payer: &Pubkey) -> Result<VrfRequestAccounts> {
        self.queue.request_accounts(vrf, payer)
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::default()
        .with_poll_interval(Duration::from_millis(100))
        .with_confirmation_timeout(Duration::from_secs(5))
}

/// A collectible held by `owner` in its associated token account.
pub struct Collectible {
    pub mint: Pubkey,
    pub holding: Pubkey,
}

pub fn mint_collectible(cluster: &MockCluster, owner: &Pubkey) -> Collectible {
    let mint = Pubkey::new_unique();
    let holding = pda::token_account(owner, &mint);
    cluster.insert_account(holding, token_account_data(owner, &mint, 1));
    Collectible { mint, holding }
}

pub struct Harness {
    pub client: StakingClient<MockCluster, Keypair>,
    pub owner: Pubkey,
    pub collectible: Collectible,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let wallet = Keypair::new();
        let owner = Signer::pubkey(&wallet);
        let cluster = MockCluster::new(&config);
        let collectible = mint_collectible(&cluster, &owner);

        Self {
            client: StakingClient::new(cluster, wallet, config),
            owner,
            collectible,
        }
    }

    pub fn cluster(&self) -> &MockCluster {
        self.client.rpc()
    }

    pub fn reward_account(&self) -> Pubkey {
        pda::token_account(&self.owner, &self.client.config().reward_mint)
    }

    pub async fn stake(&self) -> Result<StakeRecord> {
        self.client
            .stake(&self.collectible.holding, &self.collectible.mint)
            .await
    }

    pub async fn redeem(&self) -> Result<StakeRecord> {
        self.client
            .redeem(&self.collectible.holding, &self.collectible.mint)
            .await
    }

    pub async fn unstake(&self) -> Result<StakeRecord> {
        self.client
            .unstake(&self.collectible.holding, &self.collectible.mint)
            .await
    }

    pub async fn record(&self) -> Option<StakeRecord> {
        self.client
            .fetch_stake_record(&self.collectible.holding)
            .await
            .unwrap()
    }
}
