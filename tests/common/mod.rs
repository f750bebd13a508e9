//! Shared utilities for integration tests.

#![allow(dead_code)]

use alloy::primitives::{address, Address, U256};
use std::sync::Arc;
use std::time::Duration;

use listing_gateway::gateway::{
    ConnectionSession, Deployments, EndpointSettings, GatewaySettings, InMemoryChain,
    InMemoryProvider, NetworkId, NetworkValidator, ProviderResolver,
};
use listing_gateway::listings::{ClientSettings, ListingClient, NewListing};
use listing_gateway::resilience::RetryPolicy;

pub const NETWORK: NetworkId = NetworkId(5777);
pub const CONTRACT: Address = address!("0x3F2e28eAf710b19e7472195CE825ca4277a9803C");
pub const MAINNET: NetworkId = NetworkId(1);
pub const MAINNET_CONTRACT: Address = address!("0x00000000000000000000000000000000000000d4");
pub const SELLER: Address = address!("0x00000000000000000000000000000000000000a1");
pub const ALICE: Address = address!("0x00000000000000000000000000000000000000b2");
pub const BOB: Address = address!("0x00000000000000000000000000000000000000c3");

/// One wei-denominated ether.
pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

pub fn fast_settings() -> ClientSettings {
    ClientSettings {
        confirmation_timeout: Duration::from_secs(2),
        read_retry: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        ..ClientSettings::default()
    }
}

fn gateway_settings() -> GatewaySettings {
    GatewaySettings {
        gas_limit: 3_000_000,
        poll_interval: Duration::from_millis(5),
    }
}

pub fn client_with_resolver(resolver: ProviderResolver) -> ListingClient {
    client_with_deployments(resolver, Deployments::new().with(NETWORK, CONTRACT))
}

pub fn client_with_deployments(resolver: ProviderResolver, deployments: Deployments) -> ListingClient {
    let session = ConnectionSession::new(
        resolver,
        NetworkValidator::new(NETWORK),
        deployments,
        gateway_settings(),
    );
    ListingClient::new(Arc::new(session), fast_settings())
}

/// A client whose injected provider holds `accounts`.
pub fn client_on(provider: Arc<InMemoryProvider>) -> ListingClient {
    client_with_resolver(ProviderResolver::new().with_injected(provider))
}

pub fn new_chain() -> Arc<InMemoryChain> {
    InMemoryChain::new(NETWORK, CONTRACT)
}

/// A client whose only provider path is an endpoint nobody listens on.
pub fn unreachable_client() -> ListingClient {
    client_with_resolver(ProviderResolver::new().with_endpoint(EndpointSettings {
        url: "http://127.0.0.1:1".to_string(),
        rpc_timeout: Duration::from_millis(500),
        probe_timeout: Duration::from_millis(500),
        private_key_env: None,
    }))
}

pub fn listing_input(name: &str, price: &str) -> NewListing {
    NewListing {
        name: name.to_string(),
        description: format!("{name} weights"),
        price: price.to_string(),
    }
}
