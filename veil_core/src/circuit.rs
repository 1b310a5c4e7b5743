/*! Circuit selection and envelope construction.

A circuit exists only for the duration of one send. Selection guarantees
distinctness and count; it is deliberately not deterministic.
*/

use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};
use thiserror::Error;

use veil_binary_io::*;
use veil_crypto::MACBYTES;
use veil_packet::*;

use crate::directory::{DirectoryError, RelayDescriptor};

/// Number of relays every circuit traverses.
pub const CIRCUIT_LENGTH: usize = 3;

/// Bytes one `wrap` adds around its payload.
const LAYER_GROWTH: usize = ONION_LAYER_OVERHEAD + NODE_ID_DIGITS + MACBYTES;

/// Largest terminal payload that still fits a fully wrapped envelope.
pub const MAX_PAYLOAD_SIZE: usize = ONION_MAX_ENVELOPE_SIZE - CIRCUIT_LENGTH * LAYER_GROWTH;

/// Ordered relays one message traverses before the final destination.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Circuit {
    /// Relays in traversal order: the envelope enters at `relays[0]`.
    pub relays: [RelayDescriptor; CIRCUIT_LENGTH],
}

impl Circuit {
    /// Identity of the relay the wrapped envelope is handed to.
    pub fn first_hop(&self) -> NodeId {
        self.relays[0].id
    }
}

/// Error that can happen when picking a circuit or building an envelope.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CircuitError {
    /// The listing does not contain enough relays distinct from the
    /// destination.
    #[error("Directory listing has {available} relays distinct from the destination when 3 are needed")]
    InsufficientRelays {
        /// Number of usable relays found.
        available: usize,
    },
    /// The directory listing could not be fetched.
    #[error("Directory error: {0}")]
    Directory(DirectoryError),
    /// The terminal payload does not fit the envelope size limit.
    #[error("Payload of {len} bytes exceeds the envelope size limit")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        len: usize,
    },
    /// A hop identity does not fit the 10-digit wire form.
    #[error("Hop id {id} does not fit the wire form")]
    UnencodableHop {
        /// The rejected identity.
        id: NodeId,
    },
}

/** Select a circuit of `CIRCUIT_LENGTH` distinct relays uniformly at random
from the listing, excluding the destination identity.

Fails before any encryption work if fewer than `CIRCUIT_LENGTH` usable
relays exist.
*/
pub fn pick_circuit<R: Rng>(rng: &mut R, listing: &[RelayDescriptor], destination: NodeId) -> Result<Circuit, CircuitError> {
    let mut candidates: Vec<RelayDescriptor> = listing.iter()
        .filter(|node| node.id != destination)
        .cloned()
        .collect();
    if candidates.len() < CIRCUIT_LENGTH {
        return Err(CircuitError::InsufficientRelays { available: candidates.len() });
    }

    let (chosen, _) = candidates.partial_shuffle(rng, CIRCUIT_LENGTH);
    Ok(Circuit {
        relays: [chosen[0].clone(), chosen[1].clone(), chosen[2].clone()],
    })
}

/** Build the fully wrapped envelope for one send: the `wrap` of the codec
applied from the last hop to the first.

The innermost layer targets the final destination and carries the terminal
plaintext; each outer layer targets the next relay inward and carries the
previous layer's bytes; the outermost layer is sealed to the first relay's
key. Returns the first hop identity and the envelope bytes.
*/
pub fn build_envelope<R: Rng + CryptoRng>(rng: &mut R, circuit: &Circuit, destination: NodeId, payload: &[u8]) -> Result<(NodeId, Vec<u8>), CircuitError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(CircuitError::PayloadTooLarge { len: payload.len() });
    }
    // every hop id becomes a forward-target field in some layer
    let oversized = std::iter::once(destination)
        .chain(circuit.relays.iter().map(|relay| relay.id))
        .find(|id| id.0 > NODE_ID_MAX);
    if let Some(id) = oversized {
        return Err(CircuitError::UnencodableHop { id });
    }

    let mut next_hop = destination;
    let mut inner = payload.to_vec();
    for relay in circuit.relays.iter().rev() {
        let layer = OnionLayer::new(rng, &relay.public_key, &LayerPayload { next_hop, inner });
        inner = layer_to_bytes(&layer);
        next_hop = relay.id;
    }

    Ok((circuit.first_hop(), inner))
}

/// Serialize one layer. The size limit is enforced by the payload check in
/// `build_envelope`, so serialization of a freshly built layer can't fail.
fn layer_to_bytes(layer: &OnionLayer) -> Vec<u8> {
    let mut buf = [0; ONION_MAX_ENVELOPE_SIZE];
    let (_, size) = layer.to_bytes((&mut buf, 0)).unwrap();
    buf[..size].to_vec()
}
