//! Constants shared by the account managers, the operation builder and the network presets

/// Entry point smart contract
pub mod entry_point {
    /// Address of the entry point smart contract
    pub const ADDRESS: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";
    /// Version of the entry point smart contract
    pub const VERSION: &str = "0.6.0";
    /// Nonce key used for all user operations (sequential nonces)
    pub const NONCE_KEY: u64 = 0;
}

/// Account abstraction JSON-RPC error codes
/// https://eips.ethereum.org/EIPS/eip-4337#rpc-methods-eth-namespace
pub mod rpc_error_codes {
    pub const VALIDATION: i32 = -32500;
    pub const PAYMASTER: i32 = -32501;
    pub const OPCODE: i32 = -32502;
    pub const EXPIRATION: i32 = -32503;
    pub const ENTITY_BANNED: i32 = -32504;
    pub const STAKE_TOO_LOW: i32 = -32505;
    pub const UNSUPPORTED_AGGREGATOR: i32 = -32506;
    pub const SIGNATURE: i32 = -32507;
    pub const EXECUTION: i32 = -32521;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL: i32 = -32603;
}

/// Legacy relay (GSN v3 compatible) parameters
pub mod relay {
    /// Name of the EIP-712 domain used by the forwarder
    pub const DOMAIN_SEPARATOR_NAME: &str = "GSN Relayed Transaction";
    /// Version of the EIP-712 domain used by the forwarder
    pub const DOMAIN_SEPARATOR_VERSION: &str = "3";
    /// How long a relay request stays valid (in seconds)
    pub const REQUEST_VALID_SECONDS: u64 = 172_800;
    /// Gas charged per zero byte of transaction calldata
    pub const GTX_DATA_ZERO: u64 = 4;
    /// Gas charged per non-zero byte of transaction calldata
    pub const GTX_DATA_NON_ZERO: u64 = 16;
    /// Allowed gap between the relay worker nonce and the nonce of the relayed transaction
    pub const MAX_RELAY_NONCE_GAP: u64 = 3;
    pub const MAX_ACCEPTANCE_BUDGET: u64 = 285_252;
    /// Path of the relay endpoint on the relay server
    pub const RELAY_PATH: &str = "relay";
}

/// Gas policy defaults
pub mod gas {
    /// Smallest call gas limit accepted from an estimate
    pub const MIN_CALL_GAS_LIMIT: u64 = 9_000;
    /// Smallest verification gas limit accepted from an estimate
    pub const MIN_VERIFICATION_GAS_LIMIT: u64 = 10_000;
    /// Multiplier applied to gas estimates (in percent)
    pub const GAS_LIMIT_MULTIPLIER_PERCENT: u64 = 120;
    /// Percentage increase of the node suggested fees
    pub const FEE_BUMP_PERCENT: u64 = 10;
    /// Gas limit floor for relayed calls
    pub const RELAY_GAS_LIMIT: u64 = 100_000;
}

/// Signature placeholders used while estimating gas
pub mod dummy_signature {
    /// ECDSA signature which passes `ecrecover` without reverting
    pub const ECDSA: &str = "0xfffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";
    /// Kernel validation mode prefix (sudo mode)
    pub const KERNEL_SUDO_MODE: [u8; 4] = [0u8; 4];
}

/// Submission retry defaults
pub mod submission {
    pub const MAX_ATTEMPTS: u32 = 3;
    /// Delay before the first retry (in milliseconds)
    pub const INITIAL_BACKOFF: u64 = 250;
    /// Upper bound of the retry delay (in milliseconds)
    pub const MAX_BACKOFF: u64 = 4_000;
    pub const BACKOFF_MULTIPLIER: u32 = 2;
    /// Timeout of one bundler, paymaster or relay request (in milliseconds)
    pub const REQUEST_TIMEOUT: u64 = 10_000;
}

/// Confirmation polling defaults
pub mod confirmation {
    /// Interval between two receipt polls (in milliseconds)
    pub const POLL_INTERVAL: u64 = 1_000;
    /// Wall-clock budget for confirmation (in milliseconds)
    pub const TIMEOUT: u64 = 60_000;
    /// Poll interval on local development chains (in milliseconds)
    pub const DEV_POLL_INTERVAL: u64 = 50;
    /// Settled results a tracker keeps for repeated polls
    pub const SETTLED_CAPACITY: usize = 1_024;
}

/// Safe (1.4.1) deployment shared by every chain
pub mod safe {
    pub const PROXY_FACTORY: &str = "0x4e1DCf7AD4e460CfD30791CCC4F9c8a4f820ec67";
    pub const SINGLETON: &str = "0x41675C099F32341bf84BFc5382aF534df5C7461a";
    /// Safe4337Module (v0.2.0, entry point v0.6)
    pub const MODULE: &str = "0xa581c4A4DB7175302464fF3C06380BC3270b4037";
    pub const MODULE_SETUP: &str = "0x8EcD4ec46D4D2a6B64fE960B3D64e8B94B2234eb";
    pub const MULTI_SEND: &str = "0x38869bf66a61cF6bDB996A6aE40D5853Fd43B526";
    /// `SafeProxy` creation code (`proxyCreationCode()` of the factory), without the singleton
    pub const PROXY_CREATION_CODE: &str = "0x608060405234801561001057600080fd5b506040516101e63803806101e68339818101604052602081101561003357600080fd5b8101908080519060200190929190505050600073ffffffffffffffffffffffffffffffffffffffff168173ffffffffffffffffffffffffffffffffffffffff1614156100ca576040517f08c379a00000000000000000000000000000000000000000000000000000000081526004018080602001828103825260228152602001806101c46022913960400191505060405180910390fd5b806000806101000a81548173ffffffffffffffffffffffffffffffffffffffff021916908373ffffffffffffffffffffffffffffffffffffffff1602179055505060ab806101196000396000f3fe608060405273ffffffffffffffffffffffffffffffffffffffff600054167fa619486e0000000000000000000000000000000000000000000000000000000060003514156050578060005260206000f35b3660008037600080366000845af43d6000803e60008114156070573d6000fd5b3d6000f3fea2646970667358221220d1429297349653a4918076d650332de1a1068c5f3e07c5c82360c277770b955264736f6c63430007060033496e76616c69642073696e676c65746f6e20616464726573732070726f7669646564";
}

/// Kernel (v2) deployment shared by every chain
pub mod kernel {
    pub const FACTORY: &str = "0x5de4839a76cf55d0c90e2061ef4386d962E15ae3";
    pub const IMPLEMENTATION: &str = "0xd3082872F8B06073A021b4602e022d5A070d7cfC";
    pub const ECDSA_VALIDATOR: &str = "0xd9AB5096a832b9ce79914329DAEE236f8Eea0390";
}

/// Local development network
pub mod local {
    pub const RPC_URL: &str = "http://127.0.0.1:8545";
    pub const BUNDLER_URL: &str = "http://127.0.0.1:4337";
    pub const RELAY_URL: &str = "http://127.0.0.1:8090";
    pub const CHAIN_ID: u64 = 1337;
    pub const REWARD_TOKEN: &str = "0x76b8D57e5ac6afAc5D415a054453d1DD2c3C0094";
    /// Contract exposing `claim()` for the reward token
    pub const FAUCET: &str = "0x78a0794Bb3BB06238ed5f8D926419bD8fc9546d8";
}

/// Hosted bundler and paymaster of the public presets
pub mod hosted {
    use alloy_chains::NamedChain;

    /// `{chain}` is replaced by the chain name (e.g. `amoy`, `base-sepolia`)
    pub const BUNDLER_URL_TEMPLATE: &str = "https://api.rallyprotocol.com/bundler/{chain}";
    pub const PAYMASTER_URL_TEMPLATE: &str = "https://api.rallyprotocol.com/paymaster/{chain}";
    pub const POLYGON_REWARD_TOKEN: &str = "0x76b8D57e5ac6afAc5D415a054453d1DD2c3C0094";

    /// Endpoint of `chain` built from one of the templates above
    pub fn endpoint(template: &str, chain: NamedChain) -> String {
        template.replace("{chain}", chain.as_str())
    }
}

/// Token formatting
pub mod tokens {
    /// Decimals of the native currency
    pub const NATIVE_DECIMALS: u32 = 18;
    /// Number of fractional digits shown by display balances
    pub const DISPLAY_PRECISION: usize = 2;
}

/// Key derivation
pub mod wallet {
    /// BIP-44 derivation path of the account key
    pub const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";
}
