/*! The core of the veil overlay: directory registry, circuit construction
and the relay forwarding engine.

The envelope wire format lives in `veil_packet`; this crate decides who a
message visits and drives one unwrap-and-forward step per relay.
*/

#![forbid(unsafe_code)]

pub mod circuit;
pub mod directory;
pub mod relay;
pub mod sender;
pub mod transport;
