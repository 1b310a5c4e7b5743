//! HTTP implementations of the core's directory and transport seams.

use futures::future::BoxFuture;
use reqwest::Client;

use veil_core::directory::{Directory, DirectoryError, RelayDescriptor};
use veil_core::transport::{HopKind, Transport, TransportError};
use veil_crypto::{decode_text, PublicKey, KEY_SIZE};
use veil_packet::NodeId;

use crate::models::{MessageBody, NodeRegistryBody};
use crate::node_config::Addressing;

/// Directory client fetching the listing from the registry process.
#[derive(Clone)]
pub struct HttpDirectory {
    client: Client,
    registry_url: String,
}

impl HttpDirectory {
    /// Create new `HttpDirectory` querying the registry at `registry_url`.
    pub fn new(client: Client, registry_url: String) -> Self {
        HttpDirectory { client, registry_url }
    }
}

impl Directory for HttpDirectory {
    fn list(&self) -> BoxFuture<'_, Result<Vec<RelayDescriptor>, DirectoryError>> {
        Box::pin(async move {
            let response = self.client
                .get(format!("{}/getNodeRegistry", self.registry_url))
                .send().await
                .and_then(|response| response.error_for_status())
                .map_err(|e| DirectoryError::Fetch(e.to_string()))?;
            let body: NodeRegistryBody = response.json().await
                .map_err(|e| DirectoryError::Fetch(e.to_string()))?;

            body.nodes.into_iter()
                .map(|node| {
                    let key = decode_text(&node.public_key)
                        .map_err(|e| DirectoryError::Fetch(format!("bad public key: {}", e)))?;
                    let key: [u8; KEY_SIZE] = key.try_into()
                        .map_err(|_| DirectoryError::Fetch("bad public key length".to_owned()))?;
                    Ok(RelayDescriptor {
                        id: NodeId(node.node_id),
                        public_key: PublicKey::from(key),
                    })
                })
                .collect()
        })
    }
}

/// Hop transport posting messages to id-derived endpoints.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    addressing: Addressing,
}

impl HttpTransport {
    /// Create new `HttpTransport` over the given addressing scheme.
    pub fn new(client: Client, addressing: Addressing) -> Self {
        HttpTransport { client, addressing }
    }
}

impl Transport for HttpTransport {
    fn send_message<'a>(&'a self, target: NodeId, kind: HopKind, message: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            let url = self.addressing.message_url(target, kind)
                .ok_or_else(|| TransportError::Unreachable {
                    id: target,
                    reason: "id maps outside the port range".to_owned(),
                })?;
            self.client
                .post(url)
                .json(&MessageBody { message: message.to_owned() })
                .send().await
                .and_then(|response| response.error_for_status())
                .map_err(|e| TransportError::Unreachable {
                    id: target,
                    reason: e.to_string(),
                })?;
            Ok(())
        })
    }
}
