#![allow(dead_code)]

use async_trait::async_trait;
use ethers::{
    abi::{encode, AbiDecode, AbiEncode, Token},
    contract::EthCall,
    types::{Address, Bytes, TransactionReceipt, H256, U256, U64},
    utils::{get_create2_address, get_create2_address_from_hash, keccak256},
};
use gasless_account::{Clients, KeyStore, LocalSigner, MnemonicKeyStore, Signer};
use gasless_contracts::{
    entry_point, forwarder, kernel, kernel_factory, light_account, light_account_factory,
    safe_module, safe_proxy_factory, token, token_faucet,
};
use gasless_primitives::{
    network::LightAccountConfig,
    relay::RelayTransactionRequest,
    AccountError, AccountResult, ConfirmationPolicy, NetworkConfig, RetryPolicy,
    SignedUserOperation, UserOperation, UserOperationGasEstimation, UserOperationHash,
    UserOperationReceipt, UserOperationSponsorship,
};
use gasless_rpc::{BundlerClient, ChainClient, PaymasterClient, RelayClient};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

pub const PHRASE: &str = "test test test test test test test test test test test junk";
pub const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const LIGHT_ACCOUNT: &str = "0xe924f8f758cb0fb1c893e169537af77fb3187c76";
pub const KERNEL_ACCOUNT: &str = "0xc53453553b193361aefa1d85f53e61078be411e8";
pub const SAFE_ACCOUNT: &str = "0x899596bd50b3887f14039a40445458005f2b9b58";
pub const WORKER_NONCE: u64 = 7;

/// keccak of the proxy init code of the local Kernel factory
const KERNEL_PROXY_INIT_CODE_HASH: &str =
    "0xc9a1687ec0a5a7ce0ba1d59c814813f69a212aacc26632599fce75c6b59646ff";
/// keccak of the Safe 1.4.1 proxy creation code followed by the local singleton
const SAFE_DEPLOYMENT_CODE_HASH: &str =
    "0x8a4e78191a4e9b5bb5e3620b48ae41e98f6f845058e79b18c738261b7a6a3db0";

/// Address the factory call in `init_code` deploys, the way the factory computes it on chain
fn deployed_sender(init_code: &[u8], light: Option<&LightAccountConfig>) -> Option<Address> {
    let factory = Address::from_slice(init_code.get(..20)?);
    let data = &init_code[20..];

    if let Ok(call) = kernel_factory::CreateAccountCall::decode(data) {
        let digest = keccak256([call.data.as_ref(), &call.index.encode()[..]].concat());
        let mut salt = [0u8; 32];
        salt[20..].copy_from_slice(&digest[20..]);
        let hash: H256 = KERNEL_PROXY_INIT_CODE_HASH.parse().ok()?;
        return Some(get_create2_address_from_hash(factory, salt, hash));
    }
    if let Ok(call) = safe_proxy_factory::CreateProxyWithNonceCall::decode(data) {
        let salt =
            keccak256([&keccak256(&call.initializer)[..], &call.salt_nonce.encode()[..]].concat());
        let hash: H256 = SAFE_DEPLOYMENT_CODE_HASH.parse().ok()?;
        return Some(get_create2_address_from_hash(factory, salt, hash));
    }
    if let Ok(call) = light_account_factory::CreateAccountCall::decode(data) {
        let light = light?;
        let initializer = light_account::InitializeCall { an_owner: call.owner }.encode();
        let args = encode(&[Token::Address(light.implementation), Token::Bytes(initializer)]);
        let code = [light.proxy_creation_code.to_vec(), args].concat();
        return Some(get_create2_address(factory, call.salt.encode(), code));
    }
    None
}

pub fn ether(amount: u64) -> U256 {
    U256::exp10(18) * amount
}

pub fn owner_signer() -> Arc<dyn Signer> {
    let store = MnemonicKeyStore::new();
    store.import_account("default", PHRASE).unwrap();
    store.signer("default").unwrap()
}

pub fn random_signer() -> Arc<dyn Signer> {
    let wallet = ethers::signers::LocalWallet::new(&mut ethers::core::rand::thread_rng());
    Arc::new(LocalSigner::new(wallet))
}

/// Local preset with a LightAccount deployment and fast retry/polling
pub fn network() -> NetworkConfig {
    let mut network = NetworkConfig::local();
    network.submission =
        RetryPolicy { max_attempts: 3, initial_backoff_ms: 1, max_backoff_ms: 2, multiplier: 2 };
    network.confirmation = ConfirmationPolicy { poll_interval_ms: 5, timeout_ms: 500 };
    if let Some(aa) = network.aa.as_mut() {
        aa.light_account = Some(LightAccountConfig {
            factory: "0x00004EC70002a32400f8ae005A26081065620D20".parse().unwrap(),
            implementation: "0xae8c656ad28F2B59a196AB61815C16A0AE1c3cba".parse().unwrap(),
            proxy_creation_code: "0x60806040526040516104c83803806104c883398101604081905261002291610267565b61002e82826000610035565b505061035d565b".parse().unwrap(),
            salt: U256::zero(),
        });
    }
    network
}

pub fn reward_token(network: &NetworkConfig) -> Address {
    network.tokens.reward_token.unwrap()
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<Address, U256>,
    token_balances: HashMap<(Address, Address), U256>,
    code: HashMap<Address, Bytes>,
    entry_point_nonces: HashMap<Address, U256>,
    forwarder_nonces: HashMap<Address, U256>,
    worker_nonce: U256,
    /// Faucet contract -> token it hands out
    faucets: HashMap<Address, Address>,
    decimals: HashMap<Address, u8>,
    receipts: HashMap<H256, TransactionReceipt>,
    blocks: u64,
}

impl Ledger {
    fn move_native(&mut self, from: Address, to: Address, value: U256) {
        if value.is_zero() {
            return;
        }
        let balance = self.balances.entry(from).or_default();
        *balance = balance.saturating_sub(value);
        *self.balances.entry(to).or_default() += value;
    }

    fn move_token(&mut self, token: Address, from: Address, to: Address, amount: U256) -> bool {
        let balance = self.token_balances.entry((token, from)).or_default();
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        *self.token_balances.entry((token, to)).or_default() += amount;
        true
    }

    /// Executes one call of `sender`; false when it reverts
    fn execute(&mut self, sender: Address, to: Address, value: U256, data: &[u8]) -> bool {
        self.move_native(sender, to, value);
        if let Ok(call) = token::TransferCall::decode(data) {
            return self.move_token(to, sender, call.to, call.amount);
        }
        if token_faucet::ClaimCall::decode(data).is_ok() {
            let token = self.faucets.get(&to).copied().unwrap_or(to);
            *self.token_balances.entry((token, sender)).or_default() += U256::exp10(18);
        }
        true
    }

    /// Executes the calldata of a smart account
    fn execute_account(&mut self, sender: Address, call_data: &[u8]) -> bool {
        if let Ok(call) = kernel::ExecuteBatchCall::decode(call_data) {
            return call.calls.iter().all(|c| self.execute(sender, c.to, c.value, &c.data));
        }
        if let Ok(call) = kernel::ExecuteCall::decode(call_data) {
            return self.execute(sender, call.to, call.value, &call.data);
        }
        if let Ok(call) = light_account::ExecuteBatchCall::decode(call_data) {
            return call
                .dest
                .iter()
                .zip(call.value.iter())
                .zip(call.func.iter())
                .all(|((to, value), data)| self.execute(sender, *to, *value, data));
        }
        if let Ok(call) = light_account::ExecuteCall::decode(call_data) {
            return self.execute(sender, call.dest, call.value, &call.func);
        }
        if let Ok(call) = safe_module::ExecuteUserOpCall::decode(call_data) {
            // multiSend batches are not executed by the mock
            return call.operation != 0 || self.execute(sender, call.to, call.value, &call.data);
        }
        false
    }

    fn receipt(&mut self, hash: H256, success: bool) -> TransactionReceipt {
        self.blocks += 1;
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(self.blocks.into()),
            status: Some(if success { U64::one() } else { U64::zero() }),
            ..Default::default()
        };
        self.receipts.insert(hash, receipt.clone());
        receipt
    }
}

/// Execution node, bundler, paymaster and relay server of an in-memory chain
///
/// Nothing is included until [mine](MockNetwork::mine) is called.
#[derive(Debug)]
pub struct MockNetwork {
    entry_point: Address,
    light_account: Option<LightAccountConfig>,
    ledger: Mutex<Ledger>,
    mempool: Mutex<Vec<SignedUserOperation>>,
    submitted: Mutex<Vec<SignedUserOperation>>,
    estimated: Mutex<Vec<UserOperation>>,
    sponsored: Mutex<Vec<UserOperation>>,
    uo_receipts: Mutex<HashMap<UserOperationHash, UserOperationReceipt>>,
    relay_pool: Mutex<Vec<(H256, RelayTransactionRequest)>>,
    relayed: Mutex<Vec<RelayTransactionRequest>>,
    estimation: Mutex<UserOperationGasEstimation>,
    sponsorship: Mutex<AccountResult<UserOperationSponsorship>>,
    send_failures: Mutex<Vec<AccountError>>,
    send_delay: Mutex<Duration>,
    send_calls: AtomicU32,
    sponsor_calls: AtomicU32,
}

impl MockNetwork {
    pub fn new(network: &NetworkConfig) -> Arc<Self> {
        let faucets = match (network.tokens.faucet, network.tokens.reward_token) {
            (Some(faucet), Some(token)) => HashMap::from([(faucet, token)]),
            _ => HashMap::new(),
        };
        let ledger = Ledger { worker_nonce: WORKER_NONCE.into(), faucets, ..Default::default() };
        Arc::new(Self {
            entry_point: network.aa.as_ref().map(|aa| aa.entry_point).unwrap_or_default(),
            light_account: network.aa.as_ref().and_then(|aa| aa.light_account.clone()),
            ledger: Mutex::new(ledger),
            mempool: Mutex::new(vec![]),
            submitted: Mutex::new(vec![]),
            estimated: Mutex::new(vec![]),
            sponsored: Mutex::new(vec![]),
            uo_receipts: Mutex::new(HashMap::new()),
            relay_pool: Mutex::new(vec![]),
            relayed: Mutex::new(vec![]),
            estimation: Mutex::new(UserOperationGasEstimation {
                pre_verification_gas: 44_056.into(),
                verification_gas_limit: 60_624.into(),
                call_gas_limit: 33_100.into(),
            }),
            sponsorship: Mutex::new(Err(AccountError::PaymasterRejected("no policy".into()))),
            send_failures: Mutex::new(vec![]),
            send_delay: Mutex::new(Duration::ZERO),
            send_calls: AtomicU32::new(0),
            sponsor_calls: AtomicU32::new(0),
        })
    }

    /// Chain, bundler and relay (no paymaster)
    pub fn clients(self: &Arc<Self>) -> Clients {
        Clients::new(self.clone()).with_bundler(self.clone()).with_relay(self.clone())
    }

    pub fn fund(&self, account: Address, amount: U256) {
        *self.ledger.lock().balances.entry(account).or_default() += amount;
    }

    pub fn fund_token(&self, token: Address, account: Address, amount: U256) {
        *self.ledger.lock().token_balances.entry((token, account)).or_default() += amount;
    }

    pub fn set_decimals(&self, token: Address, decimals: u8) {
        self.ledger.lock().decimals.insert(token, decimals);
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.ledger.lock().balances.get(&account).copied().unwrap_or_default()
    }

    pub fn token_balance(&self, token: Address, account: Address) -> U256 {
        self.ledger.lock().token_balances.get(&(token, account)).copied().unwrap_or_default()
    }

    pub fn is_deployed(&self, account: Address) -> bool {
        self.ledger.lock().code.contains_key(&account)
    }

    pub fn submitted(&self) -> Vec<SignedUserOperation> {
        self.submitted.lock().clone()
    }

    pub fn estimated(&self) -> Vec<UserOperation> {
        self.estimated.lock().clone()
    }

    /// Operations sent to the paymaster, in order
    pub fn sponsored(&self) -> Vec<UserOperation> {
        self.sponsored.lock().clone()
    }

    pub fn relayed(&self) -> Vec<RelayTransactionRequest> {
        self.relayed.lock().clone()
    }

    pub fn set_estimation(&self, estimation: UserOperationGasEstimation) {
        *self.estimation.lock() = estimation;
    }

    pub fn set_sponsorship(&self, sponsorship: AccountResult<UserOperationSponsorship>) {
        *self.sponsorship.lock() = sponsorship;
    }

    pub fn fail_sends(&self, failures: Vec<AccountError>) {
        *self.send_failures.lock() = failures;
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = delay;
    }

    pub fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn sponsor_calls(&self) -> u32 {
        self.sponsor_calls.load(Ordering::SeqCst)
    }

    /// Includes every pending user operation and relayed transaction
    pub fn mine(&self) {
        let mut ledger = self.ledger.lock();

        for uo in self.mempool.lock().drain(..) {
            if uo.deploys_account() {
                ledger.code.insert(uo.sender, vec![0xef].into());
            }
            ledger.entry_point_nonces.insert(uo.sender, uo.nonce + 1);
            let success = ledger.execute_account(uo.sender, &uo.call_data);
            let tx_receipt = ledger.receipt(H256::random(), true);
            self.uo_receipts.lock().insert(
                uo.hash(),
                UserOperationReceipt {
                    user_operation_hash: uo.hash(),
                    sender: uo.sender,
                    nonce: uo.nonce,
                    paymaster: None,
                    actual_gas_cost: U256::zero(),
                    actual_gas_used: U256::zero(),
                    success,
                    reason: if success { String::new() } else { "call reverted".into() },
                    logs: vec![],
                    tx_receipt,
                },
            );
        }

        for (hash, request) in self.relay_pool.lock().drain(..) {
            let forward = &request.relay_request.request;
            ledger.forwarder_nonces.insert(forward.from, forward.nonce + 1);
            ledger.worker_nonce += U256::one();
            let success = ledger.execute(forward.from, forward.to, forward.value, &forward.data);
            ledger.receipt(hash, success);
        }
    }
}

#[async_trait]
impl ChainClient for MockNetwork {
    async fn chain_id(&self) -> AccountResult<u64> {
        Ok(1337)
    }

    async fn get_balance(&self, address: Address) -> AccountResult<U256> {
        Ok(self.balance(address))
    }

    async fn get_code(&self, address: Address) -> AccountResult<Bytes> {
        Ok(self.ledger.lock().code.get(&address).cloned().unwrap_or_default())
    }

    async fn get_transaction_count(&self, _address: Address) -> AccountResult<U256> {
        Ok(self.ledger.lock().worker_nonce)
    }

    async fn call(&self, to: Address, data: Bytes) -> AccountResult<Bytes> {
        let ledger = self.ledger.lock();
        let res = if let Ok(call) = entry_point::GetNonceCall::decode(&data) {
            ledger.entry_point_nonces.get(&call.sender).copied().unwrap_or_default().encode()
        } else if let Ok(call) = forwarder::GetNonceCall::decode(&data) {
            ledger.forwarder_nonces.get(&call.from).copied().unwrap_or_default().encode()
        } else if let Ok(call) = token::BalanceOfCall::decode(&data) {
            ledger.token_balances.get(&(to, call.account)).copied().unwrap_or_default().encode()
        } else if data.starts_with(&token::DecimalsCall::selector()[..]) {
            U256::from(ledger.decimals.get(&to).copied().unwrap_or(18)).encode()
        } else {
            return Err(AccountError::ExecutionReverted { reason: "unknown call".into() });
        };
        Ok(res.into())
    }

    async fn estimate_gas(
        &self,
        _from: Address,
        _to: Address,
        _value: U256,
        _data: Bytes,
    ) -> AccountResult<U256> {
        Ok(50_000.into())
    }

    async fn estimate_fees(&self) -> AccountResult<(U256, U256)> {
        Ok((2_000_000_000u64.into(), 1_000_000_000u64.into()))
    }

    async fn get_transaction_receipt(
        &self,
        hash: H256,
    ) -> AccountResult<Option<TransactionReceipt>> {
        Ok(self.ledger.lock().receipts.get(&hash).cloned())
    }
}

#[async_trait]
impl BundlerClient for MockNetwork {
    async fn send_user_operation(
        &self,
        user_operation: &SignedUserOperation,
    ) -> AccountResult<UserOperationHash> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.send_delay.lock();
        tokio::time::sleep(delay).await;

        if let Some(err) = self.send_failures.lock().pop() {
            return Err(err);
        }
        if user_operation.deploys_account() &&
            deployed_sender(&user_operation.init_code, self.light_account.as_ref()) !=
                Some(user_operation.sender)
        {
            return Err(AccountError::ValidationRejected {
                code: -32500,
                message: "AA14 initCode must return sender".into(),
            });
        }
        self.mempool.lock().push(user_operation.clone());
        self.submitted.lock().push(user_operation.clone());
        Ok(user_operation.hash())
    }

    async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperation,
        _entry_point: Address,
    ) -> AccountResult<UserOperationGasEstimation> {
        self.estimated.lock().push(user_operation.clone());
        Ok(self.estimation.lock().clone())
    }

    async fn get_user_operation_receipt(
        &self,
        user_operation_hash: UserOperationHash,
    ) -> AccountResult<Option<UserOperationReceipt>> {
        Ok(self.uo_receipts.lock().get(&user_operation_hash).cloned())
    }

    async fn supported_entry_points(&self) -> AccountResult<Vec<Address>> {
        Ok(vec![self.entry_point])
    }
}

#[async_trait]
impl PaymasterClient for MockNetwork {
    async fn sponsor_user_operation(
        &self,
        user_operation: &UserOperation,
        _entry_point: Address,
    ) -> AccountResult<UserOperationSponsorship> {
        self.sponsor_calls.fetch_add(1, Ordering::SeqCst);
        self.sponsored.lock().push(user_operation.clone());
        self.sponsorship.lock().clone()
    }
}

#[async_trait]
impl RelayClient for MockNetwork {
    async fn relay_transaction(&self, request: &RelayTransactionRequest) -> AccountResult<Bytes> {
        let forward = &request.relay_request.request;
        let signed_tx: Bytes =
            [&[0x02][..], forward.from.as_bytes(), &forward.nonce.encode()[..]].concat().into();
        self.relay_pool.lock().push((keccak256(&signed_tx).into(), request.clone()));
        self.relayed.lock().push(request.clone());
        Ok(signed_tx)
    }
}
