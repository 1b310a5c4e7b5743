/*! Serialization traits every veil wire type implements: `FromBytes` parses
with nom combinators, `ToBytes` generates with cookie-factory.
*/

#![forbid(unsafe_code)]

#[cfg(feature = "crypto")]
mod crypto;

use nom::IResult;

pub use cookie_factory::GenError;

/// De-serialize a struct from bytes.
pub trait FromBytes: Sized {
    /// De-serialize an object using `nom`.
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self>;
}

/// Serialize a struct into bytes.
pub trait ToBytes: Sized {
    /// Serialize an object into growable byte buffer.
    fn to_bytes<'a>(&self, buf: (&'a mut [u8], usize)) -> Result<(&'a mut [u8], usize), GenError>;
}

/// Fail serialization with a custom error code.
pub fn gen_error(_buf: (&mut [u8], usize), code: u32) -> Result<(&mut [u8], usize), GenError> {
    Err(GenError::CustomError(code))
}

/// Fail serialization if the written size exceeds the limit.
pub fn gen_len_limit(buf: (&mut [u8], usize), limit: usize) -> Result<(&mut [u8], usize), GenError> {
    if buf.1 <= limit {
        Ok(buf)
    } else {
        Err(GenError::BufferTooSmall(buf.1))
    }
}

impl<const N: usize> FromBytes for [u8; N] {
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        use nom::bytes::complete::take;
        use nom::combinator::map_opt;
        use std::convert::TryInto;

        map_opt(take(N), |bytes: &[u8]| bytes.try_into().ok())(input)
    }
}

/// Test that a value serializes and de-serializes back to itself.
#[macro_export]
macro_rules! encode_decode_test (
    ($test:ident, $value:expr) => (
        #[test]
        fn $test() {
            fn same_type<T>(_: &T, _: &T) {}
            let value = $value;
            let mut buf = [0; 1024 * 1024];
            let (_, size) = value.to_bytes((&mut buf, 0)).unwrap();
            let (rest, decoded_value) = FromBytes::from_bytes(&buf[..size]).unwrap();
            same_type(&value, &decoded_value);
            assert!(rest.is_empty());
            assert_eq!(decoded_value, value);
        }
    )
);
