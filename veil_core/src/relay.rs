/*! Relay-side forwarding engine.

Per inbound message a relay runs one step of the onion protocol: unwrap
the outermost layer with its own key, classify the next hop by directory
membership and either forward the remainder to another relay or deliver
the terminal plaintext to a user. Both outcomes are terminal; nothing is
queued or retried.
*/

use std::sync::{Arc, Mutex};

use log::{debug, warn};
use thiserror::Error;

use veil_binary_io::*;
use veil_crypto::{decode_text, encode_text, PublicKey, SecretKey};
use veil_packet::{NodeId, OnionLayer, UnwrapError};

use crate::directory::{Directory, DirectoryError};
use crate::transport::{HopKind, Transport, TransportError};

/// Terminal state of one handled message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// The remainder was sent on to another relay.
    Forwarded(NodeId),
    /// The terminal plaintext was delivered to its destination user.
    Delivered(NodeId),
}

/// Error that can happen when handling one inbound message.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RelayError {
    /// The message text is not transport encoding of an onion layer.
    #[error("Malformed envelope: {0}")]
    Malformed(String),
    /// The outermost layer can't be unwrapped with our key.
    #[error("Envelope unwrap failed: {0}")]
    Unwrap(UnwrapError),
    /// The directory listing needed for hop classification is unavailable.
    #[error("Directory error: {0}")]
    Directory(DirectoryError),
    /// The next hop could not be reached.
    #[error("Forwarding failed: {0}")]
    ForwardingFailed(TransportError),
}

/** Diagnostic slots, overwritten on every message.

Concurrent messages at the same relay race on these slots; the semantics
are last-writer-wins. The slots are read-only to the outside and never
feed back into protocol decisions.
*/
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RelayObservation {
    /// Transport-encoded envelope as it arrived, including failed attempts.
    pub last_received_encrypted: Option<String>,
    /// Transport-encoded remainder of the last successful unwrap.
    pub last_received_decrypted: Option<String>,
    /// Next hop of the last successful unwrap.
    pub last_forward_target: Option<NodeId>,
}

/// One relay's long-lived state and collaborators.
pub struct ForwardingEngine<D, T> {
    id: NodeId,
    secret_key: SecretKey,
    directory: D,
    transport: T,
    observation: Arc<Mutex<RelayObservation>>,
}

impl<D: Directory, T: Transport> ForwardingEngine<D, T> {
    /// Create new `ForwardingEngine` with a freshly generated or loaded
    /// long-lived secret key.
    pub fn new(id: NodeId, secret_key: SecretKey, directory: D, transport: T) -> Self {
        ForwardingEngine {
            id,
            secret_key,
            directory,
            transport,
            observation: Arc::new(Mutex::new(RelayObservation::default())),
        }
    }

    /// Identity of this relay.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Public half of this relay's long-lived keypair.
    pub fn public_key(&self) -> PublicKey {
        self.secret_key.public_key()
    }

    /// Secret half of this relay's keypair, for the diagnostic key
    /// endpoint. Simulation-only; a production relay would never expose it.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Snapshot of the diagnostic slots.
    pub fn observation(&self) -> RelayObservation {
        self.observation.lock().expect("observation lock poisoned").clone()
    }

    /** Handle one inbound message: `RECEIVED -> UNWRAPPED ->
    {FORWARDED | DELIVERED}`.

    On any failure the message is dropped and the error surfaces to
    whoever delivered the envelope; the decrypted/target observation slots
    keep describing the last successful unwrap.
    */
    pub async fn handle_message(&self, message: &str) -> Result<Disposition, RelayError> {
        self.observation.lock().expect("observation lock poisoned")
            .last_received_encrypted = Some(message.to_owned());

        let bytes = decode_text(message)
            .map_err(|e| RelayError::Malformed(e.to_string()))?;
        let layer = match OnionLayer::from_bytes(&bytes) {
            Ok((_, layer)) => layer,
            Err(e) => return Err(RelayError::Malformed(e.to_string())),
        };

        let payload = layer.get_payload(&self.secret_key).map_err(|e| {
            warn!("Relay {}: dropping envelope: {}", self.id, e);
            RelayError::Unwrap(e)
        })?;

        let remainder = encode_text(&payload.inner);
        {
            let mut observation = self.observation.lock().expect("observation lock poisoned");
            observation.last_received_decrypted = Some(remainder.clone());
            observation.last_forward_target = Some(payload.next_hop);
        }

        // a registered id is a relay, anything else is a user
        let listing = self.directory.list().await.map_err(RelayError::Directory)?;
        let kind = if listing.iter().any(|node| node.id == payload.next_hop) {
            HopKind::Relay
        } else {
            HopKind::User
        };

        debug!("Relay {}: forwarding to {:?} {}", self.id, kind, payload.next_hop);
        self.transport.send_message(payload.next_hop, kind, &remainder).await
            .map_err(RelayError::ForwardingFailed)?;

        match kind {
            HopKind::Relay => Ok(Disposition::Forwarded(payload.next_hop)),
            HopKind::User => Ok(Disposition::Delivered(payload.next_hop)),
        }
    }
}
