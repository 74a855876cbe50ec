use crate::errors::FieldError;
use crate::parser::ParserError;
use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::Parser;
use nom::bytes::take;
use serde::{Deserialize, Serialize};
use std::fmt::Formatter;

pub const LENGTH_BYTES: usize = 6;
pub const BROADCAST_MAC: [u8; LENGTH_BYTES] = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
pub const ZERO_MAC: [u8; LENGTH_BYTES] = [0x00; LENGTH_BYTES];

#[derive(Clone, Copy, Debug, Eq, Hash, Serialize, Deserialize, PartialEq)]
pub struct MacAddress(pub [u8; LENGTH_BYTES]);

impl MacAddress {
    pub const BROADCAST: Self = Self(BROADCAST_MAC);
    pub const ZERO: Self = Self(ZERO_MAC);

    pub fn put(&self, buffer: &mut BytesMut) {
        buffer.put_slice(&self.0);
    }
}

impl From<[u8; LENGTH_BYTES]> for MacAddress {
    fn from(value: [u8; LENGTH_BYTES]) -> Self {
        Self(value)
    }
}

impl TryFrom<&str> for MacAddress {
    type Error = FieldError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || FieldError::InvalidValue {
            field: "mac",
            value: value.to_string(),
        };

        let s = value.trim().replace([':', '.', '-'], "");
        let bytes = hex::decode(&s).map_err(|_| invalid())?;
        let bytes = <[u8; LENGTH_BYTES]>::try_from(bytes).map_err(|_| invalid())?;

        Ok(Self(bytes))
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let string = format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        );

        write!(f, "{}", string)
    }
}

pub fn parse(input: &[u8]) -> IResult<&[u8], MacAddress> {
    let (rest, mac_bytes) = take(LENGTH_BYTES).parse(input)?;
    let mac = <[u8; LENGTH_BYTES]>::try_from(mac_bytes)
        .map_err(|_| ParserError::ErrorVerify.to_nom(input))?;

    Ok((rest, MacAddress(mac)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_string() {
        let mac = MacAddress::try_from("ff:ff:ff:ff:ff:ff").unwrap();
        assert_eq!(mac, MacAddress::BROADCAST);
        assert_eq!(MacAddress::ZERO.to_string(), "00:00:00:00:00:00");
    }

    #[test]
    fn test_dotted_and_dashed_notation() {
        let dotted = MacAddress::try_from("001a.2b3c.4d5e").unwrap();
        let dashed = MacAddress::try_from("00-1A-2B-3C-4D-5E").unwrap();
        assert_eq!(dotted, dashed);
        assert_eq!(dotted.to_string(), "00:1A:2B:3C:4D:5E");
    }

    #[test]
    fn test_invalid_string() {
        assert!(MacAddress::try_from("00:1A:2B").is_err());
        assert!(MacAddress::try_from("zz:1A:2B:3C:4D:5E").is_err());
    }

    #[test]
    fn test_parse_leaves_rest() {
        let bytes = [0x00, 0x1A, 0x8C, 0x15, 0xF9, 0x80, 0x08, 0x00];
        let (rest, mac) = parse(&bytes).unwrap();
        assert_eq!(mac.to_string(), "00:1A:8C:15:F9:80");
        assert_eq!(rest, &[0x08, 0x00]);
    }
}
