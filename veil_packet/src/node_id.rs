/*! Node identity and its fixed-width wire form.
*/

use std::fmt;
use std::str::FromStr;

use veil_binary_io::*;

use cookie_factory::{do_gen, gen_call, gen_cond, gen_slice};
use nom::bytes::complete::take;
use nom::combinator::{map_opt, verify};
use nom::IResult;

/// Number of ASCII digits a `NodeId` occupies on the wire.
pub const NODE_ID_DIGITS: usize = 10;

/// Largest identity that fits the wire form.
pub const NODE_ID_MAX: u64 = 9_999_999_999;

/** Identity of an overlay participant (relay or user).

Serialized form: exactly `10` ASCII digits, zero-padded. The forward-target
field of a layer payload uses this form so the boundary between target and
inner bytes needs no delimiter.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> NodeId {
        NodeId(id)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str(s).map(NodeId)
    }
}

impl FromBytes for NodeId {
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        map_opt(
            verify(take(NODE_ID_DIGITS), |digits: &[u8]| digits.iter().all(u8::is_ascii_digit)),
            |digits: &[u8]| std::str::from_utf8(digits).ok()?.parse::<u64>().ok().map(NodeId)
        )(input)
    }
}

impl ToBytes for NodeId {
    fn to_bytes<'a>(&self, buf: (&'a mut [u8], usize)) -> Result<(&'a mut [u8], usize), GenError> {
        do_gen!(buf,
            gen_cond!(
                self.0 > NODE_ID_MAX,
                |buf| gen_error(buf, 0)
            ) >>
            gen_slice!(format!("{:010}", self.0).as_bytes())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    encode_decode_test!(
        node_id_encode_decode,
        NodeId(42)
    );

    #[test]
    fn node_id_zero_padded() {
        let mut buf = [0; NODE_ID_DIGITS];
        let (_, size) = NodeId(7).to_bytes((&mut buf, 0)).unwrap();
        assert_eq!(size, NODE_ID_DIGITS);
        assert_eq!(&buf, b"0000000007");
    }

    #[test]
    fn node_id_parse_leading_zeros() {
        let (rest, id) = NodeId::from_bytes(b"0000000123rest").unwrap();
        assert_eq!(id, NodeId(123));
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn node_id_parse_non_digit() {
        assert!(NodeId::from_bytes(b"00000x0007").is_err());
    }

    #[test]
    fn node_id_parse_short() {
        assert!(NodeId::from_bytes(b"007").is_err());
    }

    #[test]
    fn node_id_too_large_to_serialize() {
        let mut buf = [0; NODE_ID_DIGITS];
        assert!(NodeId(NODE_ID_MAX + 1).to_bytes((&mut buf, 0)).is_err());
    }
}
