use ethers::{
    contract::{abigen, EthCall},
    types::Selector,
};
use lazy_static::lazy_static;
use std::collections::HashMap;

abigen!(
    EntryPoint,
    r#"[
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce)
    ]"#;

    LightAccount,
    r#"[
        function initialize(address anOwner) external
        function execute(address dest, uint256 value, bytes func) external
        function executeBatch(address[] dest, uint256[] value, bytes[] func) external
    ]"#;

    LightAccountFactory,
    r#"[
        function createAccount(address owner, uint256 salt) external returns (address ret)
    ]"#;

    Kernel,
    r#"[
        struct Call {address to; uint256 value; bytes data;}
        function initialize(address defaultValidator, bytes data) external
        function execute(address to, uint256 value, bytes data, uint8 operation) external
        function executeBatch(Call[] calls) external
    ]"#;

    KernelFactory,
    r#"[
        function createAccount(address implementation, bytes data, uint256 index) external returns (address proxy)
    ]"#;

    Safe,
    r#"[
        function setup(address[] owners, uint256 threshold, address to, bytes data, address fallbackHandler, address paymentToken, uint256 payment, address paymentReceiver) external
    ]"#;

    SafeModuleSetup,
    r#"[
        function enableModules(address[] modules) external
    ]"#;

    SafeModule,
    r#"[
        function executeUserOp(address to, uint256 value, bytes data, uint8 operation) external
    ]"#;

    SafeProxyFactory,
    r#"[
        function createProxyWithNonce(address singleton, bytes initializer, uint256 saltNonce) external returns (address proxy)
    ]"#;

    MultiSend,
    r#"[
        function multiSend(bytes transactions) external payable
    ]"#;

    Forwarder,
    r#"[
        function getNonce(address from) external view returns (uint256 nonce)
    ]"#;

    Token,
    r#"[
        function balanceOf(address account) external view returns (uint256 balance)
        function decimals() external view returns (uint8 decimals)
        function transfer(address to, uint256 amount) external returns (bool success)
        function approve(address spender, uint256 amount) external returns (bool success)
    ]"#;

    TokenFaucet,
    r#"[
        function claim() external
    ]"#
);

lazy_static! {
    /// Names of the calls an account can be asked to execute (used in logs)
    pub static ref SELECTORS_NAMES: HashMap<Selector, String> = {
        let mut map = HashMap::new();
        // light account
        map.insert(light_account::ExecuteCall::selector(), light_account::ExecuteCall::function_name().into());
        map.insert(light_account::ExecuteBatchCall::selector(), light_account::ExecuteBatchCall::function_name().into());
        // kernel
        map.insert(kernel::ExecuteCall::selector(), kernel::ExecuteCall::function_name().into());
        map.insert(kernel::ExecuteBatchCall::selector(), kernel::ExecuteBatchCall::function_name().into());
        // safe
        map.insert(safe_module::ExecuteUserOpCall::selector(), safe_module::ExecuteUserOpCall::function_name().into());
        map.insert(multi_send::MultiSendCall::selector(), multi_send::MultiSendCall::function_name().into());
        // token
        map.insert(token::TransferCall::selector(), token::TransferCall::function_name().into());
        map.insert(token::ApproveCall::selector(), token::ApproveCall::function_name().into());
        map.insert(token_faucet::ClaimCall::selector(), token_faucet::ClaimCall::function_name().into());
        map
    };
}
