use crate::parser::ParseFn;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Protocols the decoder walks through, outer to inner.
///
/// The root protocol is chosen from the capture link type in `ProtocolId::root`.
/// Every protocol names the parse function of its module and, through
/// `best_children`, the protocol that its header says comes next.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProtocolId {
    Ethernet,

    IPv4,

    TCP,
    UDP,
}

impl ProtocolId {
    pub fn root(link_type: &pcap::Linktype) -> Option<Self> {
        match link_type {
            pcap::Linktype(1) => Some(Self::Ethernet),
            _ => None,
        }
    }

    pub fn parse(&self) -> ParseFn {
        match self {
            Self::Ethernet => ethernet::parse,
            Self::IPv4 => ipv4::parse,
            Self::TCP => tcp::parse,
            Self::UDP => udp::parse,
        }
    }

    pub fn best_children(layer: &Layer) -> Option<Self> {
        match layer {
            Layer::Link(value) => ethernet::best_children(value),
            Layer::Network(value) => ipv4::best_children(value),
            Layer::Transport(_) => None,
        }
    }
}

/// One protocol tier of a packet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Layer {
    Link(ethernet::Ethernet),
    Network(ipv4::IPv4),
    Transport(Transport),
}

impl Layer {
    pub fn tier(&self) -> &'static str {
        match self {
            Self::Link(_) => "link",
            Self::Network(_) => "network",
            Self::Transport(_) => "transport",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Transport {
    Tcp(tcp::TCP),
    Udp(udp::UDP),
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Tcp(_) => TransportKind::Tcp,
            Self::Udp(_) => TransportKind::Udp,
        }
    }

    pub fn port_source(&self) -> u16 {
        match self {
            Self::Tcp(value) => value.port_source,
            Self::Udp(value) => value.port_source,
        }
    }

    pub fn port_destination(&self) -> u16 {
        match self {
            Self::Tcp(value) => value.port_destination,
            Self::Udp(value) => value.port_destination,
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, Display, EnumString, Eq, Serialize, Deserialize, PartialEq,
)]
#[strum(ascii_case_insensitive)]
pub enum TransportKind {
    #[default]
    #[strum(serialize = "TCP")]
    Tcp,

    #[strum(serialize = "UDP")]
    Udp,
}

impl TransportKind {
    pub fn ip_protocol(&self) -> ip::protocol::IpNextLevelProtocol {
        match self {
            Self::Tcp => ip::protocol::IpNextLevelProtocol::TCP,
            Self::Udp => ip::protocol::IpNextLevelProtocol::UDP,
        }
    }
}

pub mod ethernet;
pub mod ip {
    pub mod address;
    pub mod protocol;
}
pub mod ipv4;
pub mod tcp;
pub mod udp;
