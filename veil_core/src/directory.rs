/*! Node directory: relay registration and lookup.

The directory is a bootstrap dependency, not a protocol participant. The
circuit builder queries it once per send and each relay announces itself
once at startup.
*/

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use thiserror::Error;

use veil_crypto::PublicKey;
use veil_packet::NodeId;

/// Public identity a relay announces at startup. Immutable for the relay's
/// lifetime.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelayDescriptor {
    /// Stable identity of the relay.
    pub id: NodeId,
    /// Long-lived `PublicKey` layers addressed to this relay are sealed to.
    pub public_key: PublicKey,
}

/// Error that can happen when registering or fetching the node listing.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DirectoryError {
    /// A relay with this id is already registered.
    #[error("Node {0} is already registered")]
    DuplicateNode(NodeId),
    /// The directory can't be reached or replied with garbage.
    #[error("Directory fetch failed: {0}")]
    Fetch(String),
}

/// Lookup interface consumed by the circuit builder and the forwarding
/// engine. Implemented by the in-process [`Registry`] and by the HTTP
/// directory client in the node binary.
pub trait Directory: Send + Sync {
    /// Fetch the current listing. Order carries no meaning.
    fn list(&self) -> BoxFuture<'_, Result<Vec<RelayDescriptor>, DirectoryError>>;
}

/** In-memory append-only node registry.

The duplicate check and the insert happen under one lock acquisition, so
two relays racing to register the same id can't both win. Listing order
follows registration order but callers must not rely on it.
*/
#[derive(Clone, Default)]
pub struct Registry {
    nodes: Arc<Mutex<Vec<RelayDescriptor>>>,
}

impl Registry {
    /// Create new empty `Registry`.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Register a relay, rejecting an already-taken id. A rejected attempt
    /// leaves the listing untouched.
    pub fn register(&self, descriptor: RelayDescriptor) -> Result<(), DirectoryError> {
        let mut nodes = self.nodes.lock().expect("registry lock poisoned");
        if nodes.iter().any(|node| node.id == descriptor.id) {
            return Err(DirectoryError::DuplicateNode(descriptor.id));
        }
        nodes.push(descriptor);
        Ok(())
    }

    /// Snapshot of all registered relays.
    pub fn nodes(&self) -> Vec<RelayDescriptor> {
        self.nodes.lock().expect("registry lock poisoned").clone()
    }
}

impl Directory for Registry {
    fn list(&self) -> BoxFuture<'_, Result<Vec<RelayDescriptor>, DirectoryError>> {
        Box::pin(futures::future::ready(Ok(self.nodes())))
    }
}
