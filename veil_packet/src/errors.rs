/*! Errors enum for envelope layers.
*/

use thiserror::Error;

/// Error that can happen when calling `get_payload` of a layer.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum UnwrapError {
    /// The sealed symmetric key does not open with the supplied secret key.
    /// Either the layer is addressed to somebody else or the key field was
    /// corrupted in transit.
    #[error("Sealed symmetric key does not open with this secret key")]
    KeyMismatch,
    /// The symmetric ciphertext failed authentication.
    #[error("Symmetric payload failed authentication")]
    CorruptPayload,
    /// The decrypted payload can't be parsed as a layer payload.
    #[error("Decrypted payload deserialize error")]
    Deserialize,
}
