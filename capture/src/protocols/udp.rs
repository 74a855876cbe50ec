use crate::checksum;
use crate::errors::FieldError;
use crate::parser::ParserError;
use crate::protocols::ip::protocol::IpNextLevelProtocol;
use crate::protocols::ipv4::IPv4;
use crate::protocols::{Layer, Transport};
use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::Parser;
use nom::number::be_u16;
use serde::{Deserialize, Serialize};

// UDP Protocol
// RFC 768: https://datatracker.ietf.org/doc/html/rfc768

pub const HEADER_LENGTH_BYTES: usize = 8;

pub fn parse(bytes: &[u8]) -> IResult<&[u8], Layer> {
    // Source port. 2 bytes
    let (rest, port_source) = be_u16().parse(bytes)?;
    // Destination port. 2 bytes
    let (rest, port_destination) = be_u16().parse(rest)?;
    // Length. 2 bytes
    let (rest, length) = be_u16().parse(rest)?;
    // Checksum. 2 bytes, not verified
    let (rest, _checksum) = be_u16().parse(rest)?;

    let payload_length = usize::from(length)
        .checked_sub(HEADER_LENGTH_BYTES)
        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;
    let payload = rest
        .get(..payload_length)
        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;

    let protocol = UDP {
        port_source,
        port_destination,
    };

    Ok((payload, Layer::Transport(Transport::Udp(protocol))))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UDP {
    pub port_source: u16,
    pub port_destination: u16,
}

impl UDP {
    pub fn encode(&self, network: Option<&IPv4>, payload: &[u8]) -> Result<BytesMut, FieldError> {
        let length = u16::try_from(HEADER_LENGTH_BYTES + payload.len())
            .map_err(|_| FieldError::PayloadTooLarge(payload.len()))?;

        let mut buffer = BytesMut::with_capacity(usize::from(length));
        buffer.put_u16(self.port_source);
        buffer.put_u16(self.port_destination);
        buffer.put_u16(length);
        buffer.put_u16(0);
        buffer.put_slice(payload);

        if let Some(ipv4) = network {
            let checksum = match checksum::transport(
                ipv4.address_source,
                ipv4.address_destination,
                IpNextLevelProtocol::UDP,
                &buffer,
            ) {
                // Zero means "no checksum" in UDP, so it goes on the wire as all ones
                0 => 0xFFFF,
                value => value,
            };
            buffer[6..8].copy_from_slice(&checksum.to_be_bytes());
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_udp_roundtrip_with_captured_checksum() {
        let hex_actual = "D5 48 14 EB 00 1E 20 88 76 F2 00 00 00 01 00 00 00 00 00 00 04 77 70 61 64 00 00 01 00 01".replace(" ", "");
        let datagram = hex::decode(hex_actual).unwrap();

        let (payload, layer) = parse(&datagram).unwrap();
        let actual = match layer {
            Layer::Transport(Transport::Udp(value)) => value,
            _ => panic!(),
        };

        let expected = UDP {
            port_source: 54600,
            port_destination: 5355,
        };
        assert_eq!(actual, expected);
        assert_eq!(payload.len(), 30 - HEADER_LENGTH_BYTES);

        let ipv4 = IPv4::new(
            Ipv4Addr::new(192, 168, 3, 131),
            Ipv4Addr::new(224, 0, 0, 252),
            IpNextLevelProtocol::UDP,
        );
        let bytes = actual.encode(Some(&ipv4), payload).unwrap();
        assert_eq!(bytes.as_ref(), datagram.as_slice());
    }

    #[test]
    fn test_length_shorter_than_header() {
        let datagram = hex::decode("D54814EB00042088").unwrap();
        assert!(parse(&datagram).is_err());
    }
}
