/*! Wire types of the veil onion envelope.

An envelope is one or more nested [`OnionLayer`]s. Each layer carries a
symmetric key sealed to one relay's public key and a symmetrically encrypted
[`LayerPayload`] holding the next-hop identity and the remaining bytes.
*/

#![forbid(unsafe_code)]

mod errors;
mod node_id;
mod onion_layer;

pub use self::errors::*;
pub use self::node_id::*;
pub use self::onion_layer::*;
