//! Shared test utilities for warpnet-transport tests.

#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use iroh::endpoint::{Endpoint, RelayMode};
use warpnet_transport::{
    NetworkConfig, SecretKey, WarpEndpoint, alpn_for, framing::decode_request,
};

pub const ECHO_PROTOCOL: &str = "/warpnet/test/echo/1.0.0";

/// Network configuration that stays off the public relays.
pub fn test_config() -> NetworkConfig {
    NetworkConfig::builder()
        .connect_timeout(Duration::from_secs(5))
        .request_timeout(Duration::from_secs(5))
        .use_public_relays(false)
        .build()
        .expect("valid test config")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn random_secret_key() -> SecretKey {
    SecretKey::generate(&mut rand::rng())
}

/// Create a test endpoint with default configuration.
pub async fn test_endpoint() -> WarpEndpoint {
    init_tracing();
    WarpEndpoint::builder()
        .config(test_config())
        .bind()
        .await
        .expect("failed to create test endpoint")
}

/// A minimal node that answers [`ECHO_PROTOCOL`] requests with their body and
/// resets streams for any other protocol.
pub struct EchoNode {
    pub endpoint: Endpoint,
    pub addr: SocketAddr,
}

impl EchoNode {
    pub async fn spawn(psk: Option<&[u8]>) -> Self {
        let endpoint = Endpoint::builder()
            .secret_key(random_secret_key())
            .alpns(vec![alpn_for(psk).expect("valid psk")])
            .relay_mode(RelayMode::Disabled)
            .clear_discovery()
            .bind()
            .await
            .expect("failed to bind echo node");
        let addr = *endpoint
            .bound_sockets()
            .iter()
            .find(|addr| addr.is_ipv4())
            .expect("ipv4 socket");
        let addr = SocketAddr::new([127, 0, 0, 1].into(), addr.port());

        let server = endpoint.clone();
        tokio::spawn(async move {
            while let Some(incoming) = server.accept().await {
                let Ok(conn) = incoming.await else { continue };
                tokio::spawn(async move {
                    while let Ok((mut send, mut recv)) = conn.accept_bi().await {
                        let Ok(buf) = recv.read_to_end(64 * 1024).await else {
                            continue;
                        };
                        match decode_request(&buf) {
                            Ok((ECHO_PROTOCOL, body)) => {
                                let _ = send.write_all(body).await;
                                let _ = send.finish();
                            }
                            _ => {
                                let _ = send.reset(1u32.into());
                            }
                        }
                    }
                });
            }
        });

        Self { endpoint, addr }
    }

    pub fn peer_id(&self) -> String {
        self.endpoint.id().to_string()
    }
}
