//! Functions for the core crypto.
//!
//! Asymmetric encryption comes from `crypto_box` (X25519 + XSalsa20Poly1305),
//! per-hop symmetric encryption from `XSalsa20Poly1305`. Everything here is a
//! pure function; keys carry no process state.

use crypto_box::aead::generic_array::typenum::marker_traits::Unsigned;
use crypto_box::aead::{Aead, AeadCore, Error as AeadError};
use rand::{CryptoRng, Rng};

pub use crypto_box::{PublicKey, SalsaBox, SecretKey, KEY_SIZE};
pub use xsalsa20poly1305::{Key as SymmetricKey, KeyInit, XSalsa20Poly1305};

/// Nonce used by both the asymmetric and the symmetric cipher.
pub type Nonce = [u8; NONCEBYTES];
/// Size of a nonce in bytes.
pub const NONCEBYTES: usize = <SalsaBox as AeadCore>::NonceSize::USIZE;
/// Size of an authentication tag in bytes.
pub const MACBYTES: usize = <SalsaBox as AeadCore>::TagSize::USIZE;
/// Size of a symmetric key in bytes.
pub const SYMMETRIC_KEY_SIZE: usize = xsalsa20poly1305::KEY_SIZE;

/// Generate a fresh symmetric key.
pub fn gen_symmetric_key<R: Rng + CryptoRng>(rng: &mut R) -> SymmetricKey {
    XSalsa20Poly1305::generate_key(rng)
}

/** Encrypt bytes to a public key without a long-term sender identity.

A fresh ephemeral keypair is generated per call; the ephemeral public key
travels in the clear next to the nonce so the recipient can derive the
shared secret. The ephemeral secret key is dropped here and the plaintext
is unrecoverable by the sender afterwards.
*/
pub fn seal<R: Rng + CryptoRng>(rng: &mut R, recipient_pk: &PublicKey, plain: &[u8]) -> (PublicKey, Nonce, Vec<u8>) {
    let ephemeral_sk = SecretKey::generate(rng);
    let ephemeral_pk = ephemeral_sk.public_key();
    let precomputed = SalsaBox::new(recipient_pk, &ephemeral_sk);
    let nonce = SalsaBox::generate_nonce(rng);
    let payload = precomputed.encrypt(&nonce, plain).unwrap();
    (ephemeral_pk, nonce.into(), payload)
}

/// Decrypt bytes sealed to our public key. Fails if the payload was sealed
/// to a different key or was corrupted in transit.
pub fn open(ephemeral_pk: &PublicKey, nonce: &Nonce, payload: &[u8], recipient_sk: &SecretKey) -> Result<Vec<u8>, AeadError> {
    let precomputed = SalsaBox::new(ephemeral_pk, recipient_sk);
    precomputed.decrypt(nonce.into(), payload)
}

/// Encode binary material for transport inside JSON string fields.
pub fn encode_text(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode transport-encoded binary material.
pub fn decode_text(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn seal_open() {
        let mut rng = thread_rng();
        let recipient_sk = SecretKey::generate(&mut rng);
        let recipient_pk = recipient_sk.public_key();

        let (ephemeral_pk, nonce, payload) = seal(&mut rng, &recipient_pk, b"onions have layers");
        let opened = open(&ephemeral_pk, &nonce, &payload, &recipient_sk).unwrap();

        assert_eq!(opened, b"onions have layers");
    }

    #[test]
    fn seal_open_wrong_key() {
        let mut rng = thread_rng();
        let recipient_pk = SecretKey::generate(&mut rng).public_key();
        let eve_sk = SecretKey::generate(&mut rng);

        let (ephemeral_pk, nonce, payload) = seal(&mut rng, &recipient_pk, b"onions have layers");

        assert!(open(&ephemeral_pk, &nonce, &payload, &eve_sk).is_err());
    }

    #[test]
    fn seal_is_randomized() {
        let mut rng = thread_rng();
        let recipient_pk = SecretKey::generate(&mut rng).public_key();

        let (_, _, payload_1) = seal(&mut rng, &recipient_pk, b"same plaintext");
        let (_, _, payload_2) = seal(&mut rng, &recipient_pk, b"same plaintext");

        assert_ne!(payload_1, payload_2);
    }

    #[test]
    fn text_encoding() {
        let bytes = b"\x00\x01\x02binary\xff".to_vec();
        let text = encode_text(&bytes);
        assert_eq!(decode_text(&text).unwrap(), bytes);
    }

    #[test]
    fn text_decoding_invalid() {
        assert!(decode_text("not!base64!!").is_err());
    }
}
