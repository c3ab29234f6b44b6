mod common;

use common::*;
use ethers::{
    abi::AbiDecode,
    types::{Address, Signature, U256},
};
use gasless_account::{create_account_manager, AccountManager, EoaAccountManager};
use gasless_contracts::token;
use gasless_primitives::{
    relay::RelayDomain, AccountError, AccountVariant, Call, CallIntent, ConfirmationStatus,
    OperationHandle,
};
use std::{sync::Arc, time::Duration};

fn manager(net: &Arc<MockNetwork>) -> EoaAccountManager {
    EoaAccountManager::new(Arc::new(network()), owner_signer(), &net.clients()).unwrap()
}

#[tokio::test]
async fn relayed_token_transfer() -> eyre::Result<()> {
    let network = network();
    let relay = network.relay()?.clone();
    let token = reward_token(&network);
    let net = MockNetwork::new(&network);
    let manager = manager(&net);
    let owner: Address = OWNER.parse()?;
    let to = Address::random();

    assert_eq!(manager.variant(), AccountVariant::Eoa);
    assert_eq!(manager.address(), owner);
    net.fund_token(token, owner, ether(2));

    let handle = manager.transfer(to, "1.5", Some(token)).await?;
    let request = net.relayed().remove(0);
    let forward = &request.relay_request.request;

    assert_eq!(forward.from, owner);
    assert_eq!(forward.to, token);
    assert_eq!(forward.nonce, U256::zero());
    assert!(forward.value.is_zero());
    // 50k estimate scaled to 60k, floored at the relay gas limit
    assert_eq!(forward.gas, U256::from(100_000));
    let call = token::TransferCall::decode(&forward.data)?;
    assert_eq!((call.to, call.amount), (to, ether(3) / 2));

    let relay_data = &request.relay_request.relay_data;
    assert_eq!(relay_data.forwarder, relay.forwarder);
    assert_eq!(relay_data.paymaster, relay.paymaster);
    assert_eq!(relay_data.max_fee_per_gas, U256::from(2_200_000_000u64));
    assert!(!relay_data.transaction_calldata_gas_used.is_zero());

    assert_eq!(request.metadata.relay_hub_address, relay.relay_hub);
    assert_eq!(request.metadata.relay_last_known_nonce, WORKER_NONCE);
    assert_eq!(request.metadata.relay_max_nonce, WORKER_NONCE + relay.max_relay_nonce_gap);

    // raw ECDSA over the EIP-712 digest of the request
    let domain = RelayDomain::new(&relay.domain_separator_name, network.chain_id, relay.forwarder);
    let signature = Signature::try_from(&request.metadata.signature[..])?;
    assert!(signature.v == 27 || signature.v == 28);
    assert_eq!(signature.recover(request.relay_request.digest(&domain))?, owner);

    assert!(matches!(handle, OperationHandle::Transaction(_)));
    net.mine();
    let result = manager.confirm(handle).await.into_result()?;
    assert_eq!(result.status, ConfirmationStatus::Success);
    assert_eq!(net.token_balance(token, to), ether(3) / 2);
    assert_eq!(manager.get_display_balance(Some(token)).await?, "0.50");

    Ok(())
}

#[tokio::test]
async fn account_stays_claimed_until_confirmed() -> eyre::Result<()> {
    let network = network();
    let token = reward_token(&network);
    let net = MockNetwork::new(&network);
    let manager = manager(&net);
    net.fund_token(token, manager.address(), ether(10));

    let handle = manager.transfer(Address::random(), "1", Some(token)).await?;
    assert!(manager.has_pending());
    assert!(matches!(
        manager.transfer(Address::random(), "1", Some(token)).await,
        Err(AccountError::OperationInFlight { .. })
    ));

    // still pending: polling gives up but the claim is released
    let result = manager.confirm_within(handle, Duration::from_millis(20)).await;
    assert_eq!(result.status, ConfirmationStatus::TimedOut);
    assert!(!manager.has_pending());

    net.mine();
    let handle = manager.transfer(Address::random(), "1", Some(token)).await?;
    net.mine();
    manager.confirm(handle).await.into_result()?;
    assert!(!manager.has_pending());

    let forwarder_nonces: Vec<U256> =
        net.relayed().iter().map(|request| request.relay_request.request.nonce).collect();
    assert_eq!(forwarder_nonces, vec![U256::zero(), U256::one()]);

    Ok(())
}

#[tokio::test]
async fn confirmed_requests_advance_the_forwarder_nonce() -> eyre::Result<()> {
    let network = network();
    let token = reward_token(&network);
    let net = MockNetwork::new(&network);
    let manager = manager(&net);
    net.fund_token(token, manager.address(), ether(10));

    for _ in 0..3 {
        let handle = manager.transfer(Address::random(), "1", Some(token)).await?;
        net.mine();
        manager.confirm(handle).await.into_result()?;
    }

    let forwarder_nonces: Vec<U256> =
        net.relayed().iter().map(|request| request.relay_request.request.nonce).collect();
    assert_eq!(forwarder_nonces, vec![U256::from(0), U256::from(1), U256::from(2)]);
    assert_eq!(net.relayed()[2].metadata.relay_last_known_nonce, WORKER_NONCE + 2);

    Ok(())
}

#[tokio::test]
async fn only_single_calls_without_value_are_relayed() -> eyre::Result<()> {
    let network = network();
    let token = reward_token(&network);
    let net = MockNetwork::new(&network);
    let manager = manager(&net);
    net.fund(manager.address(), ether(1));

    assert!(matches!(
        manager.transfer(Address::random(), "0.1", None).await,
        Err(AccountError::InvalidIntent(_))
    ));

    let batch = CallIntent::Batch(vec![
        Call::contract(token, vec![0x4e, 0x71, 0xd9, 0x2d]),
        Call::contract(token, vec![0x4e, 0x71, 0xd9, 0x2d]),
    ]);
    assert!(matches!(manager.build_and_submit(batch).await, Err(AccountError::InvalidIntent(_))));

    // rejected intents release the account
    assert!(!manager.has_pending());
    manager.claim_reward().await?;
    assert_eq!(net.relayed().len(), 1);

    Ok(())
}

#[tokio::test]
async fn relay_section_is_required() -> eyre::Result<()> {
    let net = MockNetwork::new(&network());

    let mut network = network();
    network.relay = None;
    assert!(matches!(
        create_account_manager(AccountVariant::Eoa, Arc::new(network), random_signer(), &net.clients()),
        Err(AccountError::Configuration(_))
    ));

    let manager =
        create_account_manager(AccountVariant::Eoa, Arc::new(common::network()), random_signer(), &net.clients())?;
    assert_eq!(manager.variant(), AccountVariant::Eoa);

    Ok(())
}
