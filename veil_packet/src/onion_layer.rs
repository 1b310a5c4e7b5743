/*! OnionLayer packet with LayerPayload
*/

use super::*;

use rand::{CryptoRng, Rng};
use veil_binary_io::*;
use veil_crypto::*;
use xsalsa20poly1305::aead::{Aead, AeadCore, Error as AeadError};

use cookie_factory::{do_gen, gen_call, gen_cond, gen_slice};
use nom::bytes::complete::take;
use nom::combinator::{map, rest, rest_len, verify};
use nom::IResult;

/// Size of the sealed symmetric key field: the key itself plus the AEAD tag.
pub const SEALED_KEY_SIZE: usize = SYMMETRIC_KEY_SIZE + MACBYTES;

/// Size of everything in a layer except the symmetric ciphertext.
pub const ONION_LAYER_OVERHEAD: usize = KEY_SIZE + NONCEBYTES + SEALED_KEY_SIZE + NONCEBYTES;

/// Smallest possible symmetric ciphertext: an encrypted forward target with
/// an empty inner payload.
pub const ONION_LAYER_MIN_PAYLOAD_SIZE: usize = NODE_ID_DIGITS + MACBYTES;

/// The maximum size of a serialized envelope. Three layers of overhead plus
/// a generous terminal payload fit well within this.
pub const ONION_MAX_ENVELOPE_SIZE: usize = 16 * 1024;

/** One layer of a veil envelope, addressed to a single relay.

Only the holder of the addressee's secret key can recover the symmetric key
and with it the forward target; everything routing-relevant sits inside the
symmetric ciphertext.

Serialized form:

Length   | Content
-------- | ------
`32`     | Ephemeral `PublicKey` the symmetric key was sealed with
`24`     | `Nonce` of the sealed symmetric key
`48`     | Sealed symmetric key
`24`     | `Nonce` of the symmetric ciphertext
variable | Symmetric ciphertext

where the symmetric ciphertext decrypts to a
[`LayerPayload`](./struct.LayerPayload.html)

*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OnionLayer {
    /// Ephemeral `PublicKey` for the sealed symmetric key
    pub ephemeral_pk: PublicKey,
    /// Nonce of the sealed symmetric key
    pub key_nonce: Nonce,
    /// Symmetric key sealed to the addressee's `PublicKey`
    pub sealed_key: Vec<u8>,
    /// Nonce of the symmetric ciphertext
    pub payload_nonce: Nonce,
    /// Encrypted payload
    pub payload: Vec<u8>
}

impl FromBytes for OnionLayer {
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _) = verify(rest_len, |len| *len <= ONION_MAX_ENVELOPE_SIZE)(input)?;
        let (input, ephemeral_pk) = PublicKey::from_bytes(input)?;
        let (input, key_nonce) = Nonce::from_bytes(input)?;
        let (input, sealed_key) = map(take(SEALED_KEY_SIZE), |key: &[u8]| key.to_vec())(input)?;
        let (input, payload_nonce) = Nonce::from_bytes(input)?;
        let (input, payload) = verify(rest, |payload: &[u8]| payload.len() >= ONION_LAYER_MIN_PAYLOAD_SIZE)(input)?;
        Ok((input, OnionLayer {
            ephemeral_pk,
            key_nonce,
            sealed_key,
            payload_nonce,
            payload: payload.to_vec()
        }))
    }
}

impl ToBytes for OnionLayer {
    fn to_bytes<'a>(&self, buf: (&'a mut [u8], usize)) -> Result<(&'a mut [u8], usize), GenError> {
        do_gen!(buf,
            gen_cond!(
                self.sealed_key.len() != SEALED_KEY_SIZE ||
                    self.payload.len() < ONION_LAYER_MIN_PAYLOAD_SIZE,
                |buf| gen_error(buf, 0)
            ) >>
            gen_slice!(self.ephemeral_pk.as_ref()) >>
            gen_slice!(self.key_nonce.as_ref()) >>
            gen_slice!(self.sealed_key.as_slice()) >>
            gen_slice!(self.payload_nonce.as_ref()) >>
            gen_slice!(self.payload.as_slice()) >>
            gen_len_limit(ONION_MAX_ENVELOPE_SIZE)
        )
    }
}

impl OnionLayer {
    /** Create new `OnionLayer` object: the `wrap` operation.

    Generates a fresh symmetric key, encrypts the payload with it and seals
    the key to the addressee's `PublicKey`. The symmetric key never leaves
    this function.
    */
    pub fn new<R: Rng + CryptoRng>(rng: &mut R, addressee_pk: &PublicKey, payload: &LayerPayload) -> OnionLayer {
        let symmetric_key = gen_symmetric_key(rng);
        let cipher = XSalsa20Poly1305::new(&symmetric_key);
        let payload_nonce = XSalsa20Poly1305::generate_nonce(&mut *rng);

        let mut buf = [0; ONION_MAX_ENVELOPE_SIZE];
        let (_, size) = payload.to_bytes((&mut buf, 0)).unwrap();
        let encrypted = cipher.encrypt(&payload_nonce, &buf[..size]).unwrap();

        let (ephemeral_pk, key_nonce, sealed_key) = seal(rng, addressee_pk, symmetric_key.as_slice());

        OnionLayer {
            ephemeral_pk,
            key_nonce,
            sealed_key,
            payload_nonce: payload_nonce.into(),
            payload: encrypted
        }
    }

    /** Decrypt payload and try to parse it as `LayerPayload`: the `unwrap`
    operation.

    Returns `Error` in case of failure:

    - fails to open the sealed symmetric key with the given secret key
    - fails to decrypt the symmetric ciphertext
    - fails to parse the plaintext as `LayerPayload`
    */
    pub fn get_payload(&self, secret_key: &SecretKey) -> Result<LayerPayload, UnwrapError> {
        let key_bytes = open(&self.ephemeral_pk, &self.key_nonce, &self.sealed_key, secret_key)
            .map_err(|AeadError| UnwrapError::KeyMismatch)?;
        if key_bytes.len() != SYMMETRIC_KEY_SIZE {
            return Err(UnwrapError::KeyMismatch);
        }

        let cipher = XSalsa20Poly1305::new(SymmetricKey::from_slice(&key_bytes));
        let decrypted = cipher.decrypt((&self.payload_nonce).into(), self.payload.as_slice())
            .map_err(|AeadError| UnwrapError::CorruptPayload)?;

        match LayerPayload::from_bytes(&decrypted) {
            Err(_) => Err(UnwrapError::Deserialize),
            Ok((_, payload)) => Ok(payload)
        }
    }
}

/** Plaintext of a layer's symmetric ciphertext.

The forward target is embedded here, inside the encrypted region, so only
the addressee learns the next hop. `inner` is either the next-inner
serialized layer or the terminal plaintext payload; this codec never looks
inside it.

Serialized form:

Length   | Content
-------- | ------
`10`     | `NodeId` of the next hop, ASCII digits
variable | Inner bytes

*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LayerPayload {
    /// Identity of the next hop (a relay or the final destination)
    pub next_hop: NodeId,
    /// Next-inner layer or terminal plaintext
    pub inner: Vec<u8>
}

impl FromBytes for LayerPayload {
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, next_hop) = NodeId::from_bytes(input)?;
        let (input, inner) = rest(input)?;
        Ok((input, LayerPayload {
            next_hop,
            inner: inner.to_vec()
        }))
    }
}

impl ToBytes for LayerPayload {
    fn to_bytes<'a>(&self, buf: (&'a mut [u8], usize)) -> Result<(&'a mut [u8], usize), GenError> {
        do_gen!(buf,
            gen_call!(|buf, next_hop| NodeId::to_bytes(next_hop, buf), &self.next_hop) >>
            gen_slice!(self.inner.as_slice())
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;

    encode_decode_test!(
        onion_layer_encode_decode,
        OnionLayer {
            ephemeral_pk: SecretKey::generate(&mut thread_rng()).public_key(),
            key_nonce: [42; NONCEBYTES],
            sealed_key: vec![42; SEALED_KEY_SIZE],
            payload_nonce: [43; NONCEBYTES],
            payload: vec![42; 123]
        }
    );

    encode_decode_test!(
        layer_payload_encode_decode,
        LayerPayload {
            next_hop: NodeId(7),
            inner: vec![42; 123]
        }
    );

    #[test]
    fn onion_layer_wrap_unwrap() {
        let mut rng = thread_rng();
        let addressee_sk = SecretKey::generate(&mut rng);
        let addressee_pk = addressee_sk.public_key();
        let payload = LayerPayload {
            next_hop: NodeId(3),
            inner: b"hello".to_vec()
        };
        // wrap payload to the addressee's public key
        let layer = OnionLayer::new(&mut rng, &addressee_pk, &payload);
        // unwrap with the addressee's secret key
        let unwrapped = layer.get_payload(&addressee_sk).unwrap();
        // payloads should be equal
        assert_eq!(unwrapped, payload);
    }

    #[test]
    fn onion_layer_wrap_unwrap_invalid_key() {
        let mut rng = thread_rng();
        let addressee_pk = SecretKey::generate(&mut rng).public_key();
        let eve_sk = SecretKey::generate(&mut rng);
        let payload = LayerPayload {
            next_hop: NodeId(3),
            inner: b"hello".to_vec()
        };
        let layer = OnionLayer::new(&mut rng, &addressee_pk, &payload);
        // try to unwrap with eve's secret key
        assert_eq!(layer.get_payload(&eve_sk), Err(UnwrapError::KeyMismatch));
    }

    #[test]
    fn onion_layer_corrupted_payload() {
        let mut rng = thread_rng();
        let addressee_sk = SecretKey::generate(&mut rng);
        let addressee_pk = addressee_sk.public_key();
        let payload = LayerPayload {
            next_hop: NodeId(3),
            inner: b"hello".to_vec()
        };
        let mut layer = OnionLayer::new(&mut rng, &addressee_pk, &payload);
        // flip a bit somewhere inside the symmetric ciphertext
        layer.payload[10] ^= 1;
        assert_eq!(layer.get_payload(&addressee_sk), Err(UnwrapError::CorruptPayload));
    }

    #[test]
    fn onion_layer_unwrap_invalid() {
        let mut rng = thread_rng();
        let addressee_sk = SecretKey::generate(&mut rng);
        let addressee_pk = addressee_sk.public_key();

        // a plaintext shorter than the forward-target field can't be a layer
        // payload even though it decrypts fine
        let symmetric_key = gen_symmetric_key(&mut rng);
        let cipher = XSalsa20Poly1305::new(&symmetric_key);
        let payload_nonce = XSalsa20Poly1305::generate_nonce(&mut rng);
        let encrypted = cipher.encrypt(&payload_nonce, &b"short"[..]).unwrap();
        let (ephemeral_pk, key_nonce, sealed_key) = seal(&mut rng, &addressee_pk, symmetric_key.as_slice());

        let layer = OnionLayer {
            ephemeral_pk,
            key_nonce,
            sealed_key,
            payload_nonce: payload_nonce.into(),
            payload: encrypted
        };
        assert_eq!(layer.get_payload(&addressee_sk), Err(UnwrapError::Deserialize));
    }

    #[test]
    fn onion_layer_parse_random_bytes() {
        // random bytes shorter than the fixed header never parse
        assert!(OnionLayer::from_bytes(&[42; 64]).is_err());
    }
}
