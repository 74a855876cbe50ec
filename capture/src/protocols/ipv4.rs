use crate::checksum;
use crate::errors::FieldError;
use crate::parser::ParserError;
use crate::protocols::ip::protocol::IpNextLevelProtocol;
use crate::protocols::{Layer, ProtocolId, ip};
use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::Parser;
use nom::bytes::take;
use nom::number::{be_u8, be_u16};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

// IPv4 Protocol
// RFC 791: https://datatracker.ietf.org/doc/html/rfc791

pub const VERSION: u8 = 4;
pub const MIN_HEADER_LENGTH_BYTES: usize = 20;
pub const MAX_HEADER_LENGTH_BYTES: usize = 60;
const CHECKSUM_OFFSET: usize = 10;

const FLAG_DONT_FRAGMENT: u16 = 0x4000;
const FLAG_MORE_FRAGMENTS: u16 = 0x2000;
const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;

pub fn parse(bytes: &[u8]) -> IResult<&[u8], Layer> {
    // Version (4 bits), IHL (4 bits)
    let (rest, version_ihl) = be_u8().parse(bytes)?;
    let version = version_ihl >> 4;
    if version != VERSION {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }
    // IHL is stored in 32bit words
    let header_length = usize::from(version_ihl & 0x0F) * 4;
    if header_length < MIN_HEADER_LENGTH_BYTES {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    // DSCP (6 bits), ECN (2 bits)
    let (rest, type_of_service) = be_u8().parse(rest)?;
    // Total length. 2 bytes
    let (rest, total_length) = be_u16().parse(rest)?;
    // Identification. 2 bytes
    let (rest, identification) = be_u16().parse(rest)?;
    // Flags (3 bits), Fragment offset (13 bits)
    let (rest, flags_fragment) = be_u16().parse(rest)?;
    // TTL. 1 byte
    let (rest, time_to_live) = be_u8().parse(rest)?;
    // Protocol. 1 byte
    let (rest, protocol_inner) = ip::protocol::parse(rest)?;
    // Header checksum. 2 bytes, not verified
    let (rest, _checksum) = be_u16().parse(rest)?;
    // Source Address
    let (rest, address_source) = ip::address::v4_parse(rest)?;
    // Destination Address
    let (rest, address_destination) = ip::address::v4_parse(rest)?;
    // Options
    let (rest, options) = take(header_length - MIN_HEADER_LENGTH_BYTES).parse(rest)?;

    // Cutting ethernet padding
    let payload_length = usize::from(total_length)
        .checked_sub(header_length)
        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;
    let payload = rest
        .get(..payload_length)
        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;

    let protocol = IPv4 {
        differentiated_services_code_point: type_of_service >> 2,
        explicit_congestion_notification: type_of_service & 0b11,
        identification,
        dont_fragment: flags_fragment & FLAG_DONT_FRAGMENT != 0,
        more_fragments: flags_fragment & FLAG_MORE_FRAGMENTS != 0,
        fragment_offset: flags_fragment & FRAGMENT_OFFSET_MASK,
        time_to_live,
        protocol_inner,
        address_source,
        address_destination,
        options: options.to_vec(),
    };

    Ok((payload, Layer::Network(protocol)))
}

pub fn best_children(layer: &IPv4) -> Option<ProtocolId> {
    // Only the first fragment starts with a transport header
    if layer.fragment_offset != 0 {
        return None;
    }

    match layer.protocol_inner {
        IpNextLevelProtocol::TCP => Some(ProtocolId::TCP),
        IpNextLevelProtocol::UDP => Some(ProtocolId::UDP),
        _ => None,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IPv4 {
    pub differentiated_services_code_point: u8,
    pub explicit_congestion_notification: u8,
    pub identification: u16,
    pub dont_fragment: bool,
    pub more_fragments: bool,
    pub fragment_offset: u16,
    pub time_to_live: u8,
    pub protocol_inner: IpNextLevelProtocol,
    pub address_source: Ipv4Addr,
    pub address_destination: Ipv4Addr,
    pub options: Vec<u8>,
}

impl IPv4 {
    pub fn new(
        address_source: Ipv4Addr, address_destination: Ipv4Addr,
        protocol_inner: IpNextLevelProtocol,
    ) -> Self {
        Self {
            differentiated_services_code_point: 0,
            explicit_congestion_notification: 0,
            identification: 0,
            dont_fragment: false,
            more_fragments: false,
            fragment_offset: 0,
            time_to_live: 64,
            protocol_inner,
            address_source,
            address_destination,
            options: vec![],
        }
    }

    pub fn encode(&self, payload: &[u8]) -> Result<BytesMut, FieldError> {
        // Options are padded with End of Option List up to a 32bit boundary
        let options_length = self.options.len().div_ceil(4) * 4;
        let header_length = MIN_HEADER_LENGTH_BYTES + options_length;
        if header_length > MAX_HEADER_LENGTH_BYTES {
            return Err(FieldError::InvalidValue {
                field: "ipv4.options",
                value: hex::encode(&self.options),
            });
        }
        let total_length = u16::try_from(header_length + payload.len())
            .map_err(|_| FieldError::PayloadTooLarge(payload.len()))?;

        let mut buffer = BytesMut::with_capacity(usize::from(total_length));
        buffer.put_u8((VERSION << 4) | (header_length / 4) as u8);
        buffer.put_u8(
            (self.differentiated_services_code_point << 2)
                | (self.explicit_congestion_notification & 0b11),
        );
        buffer.put_u16(total_length);
        buffer.put_u16(self.identification);

        let mut flags_fragment = self.fragment_offset & FRAGMENT_OFFSET_MASK;
        if self.dont_fragment {
            flags_fragment |= FLAG_DONT_FRAGMENT;
        }
        if self.more_fragments {
            flags_fragment |= FLAG_MORE_FRAGMENTS;
        }
        buffer.put_u16(flags_fragment);

        buffer.put_u8(self.time_to_live);
        buffer.put_u8(self.protocol_inner.into());
        buffer.put_u16(0);
        ip::address::v4_put(&mut buffer, &self.address_source);
        ip::address::v4_put(&mut buffer, &self.address_destination);
        buffer.put_slice(&self.options);
        buffer.put_bytes(0, options_length - self.options.len());

        let checksum = checksum::internet(&buffer[..header_length]);
        buffer[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());

        buffer.put_slice(payload);

        Ok(buffer)
    }
}
