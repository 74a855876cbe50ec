use crate::protocols::ethernet::ether_type::EtherType;
use crate::protocols::ethernet::mac::MacAddress;
use crate::protocols::{Layer, ProtocolId};
use bytes::{BufMut, BytesMut};
use nom::IResult;
use serde::{Deserialize, Serialize};

// Ethernet II
// IEEE 802.3: https://standards.ieee.org/ieee/802.3/10422/

pub const HEADER_LENGTH_BYTES: usize = 14;

pub fn parse(bytes: &[u8]) -> IResult<&[u8], Layer> {
    // Destination MAC. 6 bytes
    let (rest, destination_mac) = mac::parse(bytes)?;
    // Source MAC. 6 bytes
    let (rest, source_mac) = mac::parse(rest)?;
    // EtherType. 2 bytes
    let (rest, ether_type) = ether_type::parse(rest)?;

    let protocol = Ethernet {
        destination_mac,
        source_mac,
        ether_type,
    };

    Ok((rest, Layer::Link(protocol)))
}

pub fn best_children(layer: &Ethernet) -> Option<ProtocolId> {
    match layer.ether_type {
        EtherType::Ipv4 => Some(ProtocolId::IPv4),
        _ => None,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ethernet {
    pub destination_mac: MacAddress,
    pub source_mac: MacAddress,
    pub ether_type: EtherType,
}

impl Ethernet {
    pub fn encode(&self, payload: &[u8]) -> BytesMut {
        let mut buffer = BytesMut::with_capacity(HEADER_LENGTH_BYTES + payload.len());

        self.destination_mac.put(&mut buffer);
        self.source_mac.put(&mut buffer);
        buffer.put_u16(self.ether_type.into());
        buffer.put_slice(payload);

        buffer
    }
}

pub mod ether_type;
pub mod mac;
