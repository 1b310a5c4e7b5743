/*! Transport seam between overlay participants.

The overlay never talks to a socket directly; everything leaves through
this trait. The node binary implements it over HTTP, tests implement it
with an in-memory recorder.
*/

use futures::future::BoxFuture;
use thiserror::Error;

use veil_packet::NodeId;

/// What kind of endpoint the next hop is. Decided by directory membership,
/// never by id arithmetic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HopKind {
    /// Another relay; the message is a still-wrapped envelope.
    Relay,
    /// The final destination; the message is the terminal plaintext.
    User,
}

/// Error that can happen when handing a message to the next hop.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TransportError {
    /// The hop endpoint can't be reached or refused the message.
    #[error("Failed to deliver message to node {id}: {reason}")]
    Unreachable {
        /// Identity of the unreachable hop.
        id: NodeId,
        /// Transport-level failure description.
        reason: String,
    },
}

/// One-way delivery of a transport-encoded message to a participant's
/// message endpoint. No retry lives at this layer; a failed hop fails the
/// in-flight message.
pub trait Transport: Send + Sync {
    /// Deliver `message` to the hop `target` of kind `kind`.
    fn send_message<'a>(&'a self, target: NodeId, kind: HopKind, message: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;
}
