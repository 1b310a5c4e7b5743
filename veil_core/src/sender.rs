/*! Client side of one send operation.

The sender queries the directory, picks a fresh circuit and hands the
fully wrapped envelope to its first hop. Any failure aborts before the
envelope leaves the process; a partial envelope is never sent.
*/

use std::sync::{Arc, Mutex};

use log::info;
use rand::thread_rng;
use thiserror::Error;

use veil_crypto::encode_text;
use veil_packet::NodeId;

use crate::circuit::{build_envelope, pick_circuit, CircuitError};
use crate::directory::{Directory, DirectoryError};
use crate::transport::{HopKind, Transport, TransportError};

/// Error that can happen when sending one message.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SendError {
    /// The directory listing could not be fetched.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    /// No usable circuit or the payload does not fit an envelope.
    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),
    /// The first hop could not be reached.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Diagnostic slots of a user participant, overwritten per message.
/// Last-writer-wins under concurrent load, same as the relay slots.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserObservation {
    /// Last plaintext delivered to this user.
    pub last_received_message: Option<String>,
    /// Last message this user successfully handed to a first hop.
    pub last_sent_message: Option<String>,
}

/// Client side of the overlay, one per user participant.
pub struct Sender<D, T> {
    id: NodeId,
    directory: D,
    transport: T,
    observation: Arc<Mutex<UserObservation>>,
}

impl<D: Directory, T: Transport> Sender<D, T> {
    /// Create new `Sender` for the user with the given identity.
    pub fn new(id: NodeId, directory: D, transport: T) -> Self {
        Sender {
            id,
            directory,
            transport,
            observation: Arc::new(Mutex::new(UserObservation::default())),
        }
    }

    /// Identity of this user.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Snapshot of the diagnostic slots.
    pub fn observation(&self) -> UserObservation {
        self.observation.lock().expect("observation lock poisoned").clone()
    }

    /// Record an inbound plaintext delivery.
    pub fn record_received(&self, message: &str) {
        self.observation.lock().expect("observation lock poisoned")
            .last_received_message = Some(message.to_owned());
    }

    /** Send one message through a fresh 3-relay circuit.

    The sent-message slot is updated only after the first hop accepted the
    envelope.
    */
    pub async fn send_message(&self, destination: NodeId, message: &str) -> Result<(), SendError> {
        let listing = self.directory.list().await?;
        // ThreadRng is !Send, keep it out of scope across the await
        let (first_hop, envelope) = {
            let mut rng = thread_rng();
            let circuit = pick_circuit(&mut rng, &listing, destination)?;
            build_envelope(&mut rng, &circuit, destination, message.as_bytes())?
        };

        info!("User {}: sending {} envelope bytes via circuit entering at relay {}",
              self.id, envelope.len(), first_hop);
        self.transport.send_message(first_hop, HopKind::Relay, &encode_text(&envelope)).await?;

        self.observation.lock().expect("observation lock poisoned")
            .last_sent_message = Some(message.to_owned());
        Ok(())
    }
}
