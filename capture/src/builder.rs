use crate::errors::{CaptureError, FieldError};
use crate::protocols::ethernet::Ethernet;
use crate::protocols::ethernet::ether_type::EtherType;
use crate::protocols::ethernet::mac::MacAddress;
use crate::protocols::ipv4::IPv4;
use crate::protocols::tcp::{Flags, TCP};
use crate::protocols::udp::UDP;
use crate::protocols::{Layer, Transport, TransportKind};
use crate::record::PacketRecord;
use std::net::Ipv4Addr;

pub const DEFAULT_SOURCE_MAC: MacAddress = MacAddress::ZERO;
pub const DEFAULT_DESTINATION_MAC: MacAddress = MacAddress::BROADCAST;
pub const DEFAULT_SOURCE_IPV4: Ipv4Addr = Ipv4Addr::LOCALHOST;
pub const DEFAULT_TIME_TO_LIVE: u8 = 64;
pub const DEFAULT_IDENTIFICATION: u16 = 1;
pub const DEFAULT_TCP_SOURCE_PORT: u16 = 20;
pub const DEFAULT_UDP_SOURCE_PORT: u16 = 53;
pub const DEFAULT_TCP_FLAGS: Flags = Flags::SYN;
pub const DEFAULT_TCP_WINDOW: u16 = 8192;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkFields {
    pub source_mac: Option<MacAddress>,
    pub destination_mac: Option<MacAddress>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkFields {
    pub address_source: Option<Ipv4Addr>,
    pub address_destination: Option<Ipv4Addr>,
    pub time_to_live: Option<u8>,
    pub identification: Option<u16>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransportFields {
    pub kind: TransportKind,
    pub port_source: Option<u16>,
    pub port_destination: Option<u16>,
    // TCP only
    pub flags: Option<Flags>,
    pub sequence_number: Option<u32>,
    pub acknowledgement_number: Option<u32>,
    pub window: Option<u16>,
}

/// Assembles an Ethernet/IPv4/transport record.
///
/// Destination address and destination port are required. Everything else
/// falls back to the `DEFAULT_*` constants of this module. The EtherType and
/// the IPv4 protocol number are derived from the layers they carry.
pub fn build_packet(
    link: &LinkFields, network: &NetworkFields, transport: &TransportFields,
) -> Result<PacketRecord, CaptureError> {
    let address_destination = network
        .address_destination
        .ok_or(FieldError::Missing("address_destination"))?;
    let port_destination = transport
        .port_destination
        .ok_or(FieldError::Missing("port_destination"))?;

    let transport_layer = match transport.kind {
        TransportKind::Tcp => Transport::Tcp(TCP {
            port_source: transport.port_source.unwrap_or(DEFAULT_TCP_SOURCE_PORT),
            port_destination,
            sequence_number: transport.sequence_number.unwrap_or_default(),
            acknowledgement_number: transport.acknowledgement_number.unwrap_or_default(),
            flags: transport.flags.clone().unwrap_or(DEFAULT_TCP_FLAGS),
            window: transport.window.unwrap_or(DEFAULT_TCP_WINDOW),
            urgent_pointer: 0,
            options: vec![],
        }),
        TransportKind::Udp => Transport::Udp(UDP {
            port_source: transport.port_source.unwrap_or(DEFAULT_UDP_SOURCE_PORT),
            port_destination,
        }),
    };

    let network_layer = IPv4 {
        identification: network.identification.unwrap_or(DEFAULT_IDENTIFICATION),
        time_to_live: network.time_to_live.unwrap_or(DEFAULT_TIME_TO_LIVE),
        ..IPv4::new(
            network.address_source.unwrap_or(DEFAULT_SOURCE_IPV4),
            address_destination,
            transport.kind.ip_protocol(),
        )
    };

    let link_layer = Ethernet {
        destination_mac: link.destination_mac.unwrap_or(DEFAULT_DESTINATION_MAC),
        source_mac: link.source_mac.unwrap_or(DEFAULT_SOURCE_MAC),
        ether_type: EtherType::Ipv4,
    };

    let record = PacketRecord::new(vec![
        Layer::Link(link_layer),
        Layer::Network(network_layer),
        Layer::Transport(transport_layer),
    ])?;

    log::trace!(
        "Built packet to {address_destination}:{port_destination} ({})",
        transport.kind
    );

    Ok(record)
}
