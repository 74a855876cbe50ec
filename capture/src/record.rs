use crate::errors::CaptureError;
use crate::parser;
use crate::protocols::ethernet::Ethernet;
use crate::protocols::ethernet::ether_type::EtherType;
use crate::protocols::ipv4::IPv4;
use crate::protocols::{Layer, ProtocolId, Transport, TransportKind};
use std::fmt::Formatter;
use std::net::Ipv4Addr;

/// One packet: an ordered stack of layers, outer to inner, and the bytes
/// that follow the innermost layer.
#[derive(Clone, Debug, PartialEq)]
pub struct PacketRecord {
    layers: Vec<Layer>,
    payload: Vec<u8>,
}

impl PacketRecord {
    pub fn new(layers: Vec<Layer>) -> Result<Self, CaptureError> {
        validate(&layers)?;

        Ok(Self {
            layers,
            payload: vec![],
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CaptureError> {
        parser::decode(ProtocolId::Ethernet, bytes)
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn link(&self) -> Option<&Ethernet> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Link(value) => Some(value),
            _ => None,
        })
    }

    pub fn network(&self) -> Option<&IPv4> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Network(value) => Some(value),
            _ => None,
        })
    }

    pub fn transport(&self) -> Option<&Transport> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Transport(value) => Some(value),
            _ => None,
        })
    }

    /// Serializes the record into an Ethernet frame.
    ///
    /// Layers are encoded inner to outer so that every header knows the
    /// length of what it carries. Lengths and checksums are computed here.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CaptureError> {
        let network = self.network();
        let mut inner = self.payload.clone();

        for layer in self.layers.iter().rev() {
            let encoded = match layer {
                Layer::Transport(Transport::Tcp(value)) => value.encode(network, &inner)?,
                Layer::Transport(Transport::Udp(value)) => value.encode(network, &inner)?,
                Layer::Network(value) => value.encode(&inner)?,
                Layer::Link(value) => value.encode(&inner),
            };
            inner = encoded.to_vec();
        }

        Ok(inner)
    }

    pub fn summarize(&self) -> Summary {
        let network = self.network();
        let transport = self.transport();

        Summary {
            has_network: network.is_some(),
            address_source: network.map(|value| value.address_source),
            address_destination: network.map(|value| value.address_destination),
            has_transport: transport.is_some(),
            transport: transport.map(Transport::kind),
            port_source: transport.map(Transport::port_source),
            port_destination: transport.map(Transport::port_destination),
        }
    }
}

/// Produces `count` independent copies of `record`.
pub fn repeat(record: &PacketRecord, count: usize) -> Result<Vec<PacketRecord>, CaptureError> {
    if count == 0 {
        return Err(CaptureError::InvalidCount(0));
    }

    Ok(vec![record.clone(); count])
}

// Link first, then network, then transport. Each layer declares the one below it.
fn validate(layers: &[Layer]) -> Result<(), CaptureError> {
    let inconsistent = |reason: String| Err(CaptureError::InconsistentLayers(reason));

    match layers.first() {
        Some(Layer::Link(_)) => {},
        Some(layer) => {
            return inconsistent(format!("Record starts with a {} layer", layer.tier()));
        },
        None => return inconsistent("Record has no layers".to_string()),
    }

    for pair in layers.windows(2) {
        match (&pair[0], &pair[1]) {
            (Layer::Link(link), Layer::Network(_)) => {
                if link.ether_type != EtherType::Ipv4 {
                    return inconsistent(format!(
                        "Link layer declares {:?} but carries IPv4",
                        link.ether_type
                    ));
                }
            },
            (Layer::Network(network), Layer::Transport(transport)) => {
                let expected = transport.kind().ip_protocol();
                if network.protocol_inner != expected {
                    return inconsistent(format!(
                        "Network layer declares {:?} but carries {}",
                        network.protocol_inner,
                        transport.kind()
                    ));
                }
            },
            (outer, inner) => {
                return inconsistent(format!(
                    "A {} layer cannot carry a {} layer",
                    outer.tier(),
                    inner.tier()
                ));
            },
        }
    }

    Ok(())
}

/// Fields of a record that are present, for reporting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub has_network: bool,
    pub address_source: Option<Ipv4Addr>,
    pub address_destination: Option<Ipv4Addr>,
    pub has_transport: bool,
    pub transport: Option<TransportKind>,
    pub port_source: Option<u16>,
    pub port_destination: Option<u16>,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let (Some(source), Some(destination)) =
            (self.address_source, self.address_destination)
        {
            writeln!(f, "IP Source: {source}, IP Destination: {destination}")?;
        }

        if let (Some(kind), Some(source), Some(destination)) =
            (self.transport, self.port_source, self.port_destination)
        {
            writeln!(
                f,
                "{kind} Source Port: {source}, {kind} Destination Port: {destination}"
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::ethernet::mac::MacAddress;
    use crate::protocols::ip::protocol::IpNextLevelProtocol;
    use crate::protocols::tcp::{Flags, TCP};
    use crate::protocols::udp::UDP;

    fn ethernet(ether_type: EtherType) -> Layer {
        Layer::Link(Ethernet {
            destination_mac: MacAddress::BROADCAST,
            source_mac: MacAddress::ZERO,
            ether_type,
        })
    }

    fn ipv4(protocol: IpNextLevelProtocol) -> Layer {
        Layer::Network(IPv4::new(
            Ipv4Addr::new(4, 3, 6, 8),
            Ipv4Addr::new(1, 2, 3, 4),
            protocol,
        ))
    }

    fn tcp(port_destination: u16) -> Layer {
        Layer::Transport(Transport::Tcp(TCP {
            port_source: 20,
            port_destination,
            sequence_number: 0,
            acknowledgement_number: 0,
            flags: Flags::SYN,
            window: 8192,
            urgent_pointer: 0,
            options: vec![],
        }))
    }

    #[test]
    fn test_consistent_stack() {
        let record = PacketRecord::new(vec![
            ethernet(EtherType::Ipv4),
            ipv4(IpNextLevelProtocol::TCP),
            tcp(80),
        ])
        .unwrap();

        assert!(record.link().is_some());
        assert!(record.network().is_some());
        assert_eq!(record.transport().map(Transport::port_destination), Some(80));
    }

    #[test]
    fn test_protocol_mismatch() {
        let result = PacketRecord::new(vec![
            ethernet(EtherType::Ipv4),
            ipv4(IpNextLevelProtocol::UDP),
            tcp(80),
        ]);

        assert!(matches!(result, Err(CaptureError::InconsistentLayers(_))));
    }

    #[test]
    fn test_ether_type_mismatch() {
        let result = PacketRecord::new(vec![
            ethernet(EtherType::Ipv6),
            ipv4(IpNextLevelProtocol::TCP),
        ]);

        assert!(matches!(result, Err(CaptureError::InconsistentLayers(_))));
    }

    #[test]
    fn test_wrong_order() {
        let missing_link = PacketRecord::new(vec![ipv4(IpNextLevelProtocol::TCP), tcp(80)]);
        let skipped_network = PacketRecord::new(vec![ethernet(EtherType::Ipv4), tcp(80)]);
        let empty = PacketRecord::new(vec![]);

        assert!(matches!(missing_link, Err(CaptureError::InconsistentLayers(_))));
        assert!(matches!(skipped_network, Err(CaptureError::InconsistentLayers(_))));
        assert!(matches!(empty, Err(CaptureError::InconsistentLayers(_))));
    }

    #[test]
    fn test_repeat_length_and_independence() {
        let record = PacketRecord::new(vec![
            ethernet(EtherType::Ipv4),
            ipv4(IpNextLevelProtocol::TCP),
            tcp(100),
        ])
        .unwrap();

        let mut copies = repeat(&record, 3).unwrap();
        assert_eq!(copies.len(), 3);

        copies[0] = copies[0].clone().with_payload(vec![0xAA]);
        assert_eq!(copies[0].payload(), &[0xAA]);
        assert!(copies[1].payload().is_empty());
        assert_eq!(copies[2], record);
    }

    #[test]
    fn test_repeat_zero() {
        let record = PacketRecord::new(vec![ethernet(EtherType::Arp)]).unwrap();
        assert!(matches!(repeat(&record, 0), Err(CaptureError::InvalidCount(0))));
    }

    #[test]
    fn test_summary_without_layers() {
        let record = PacketRecord::new(vec![ethernet(EtherType::Arp)]).unwrap();
        let summary = record.summarize();

        assert_eq!(summary, Summary::default());
        assert_eq!(summary.to_string(), "");
    }

    #[test]
    fn test_summary_display() {
        let record = PacketRecord::new(vec![
            ethernet(EtherType::Ipv4),
            ipv4(IpNextLevelProtocol::UDP),
            Layer::Transport(Transport::Udp(UDP {
                port_source: 53,
                port_destination: 30,
            })),
        ])
        .unwrap();

        assert_eq!(
            record.summarize().to_string(),
            "IP Source: 4.3.6.8, IP Destination: 1.2.3.4\n\
             UDP Source Port: 53, UDP Destination Port: 30\n"
        );
    }

    #[test]
    fn test_encoded_frame_decodes_to_same_record() {
        let record = PacketRecord::new(vec![
            ethernet(EtherType::Ipv4),
            ipv4(IpNextLevelProtocol::TCP),
            tcp(443),
        ])
        .unwrap()
        .with_payload(b"GET / HTTP/1.1\r\n\r\n".to_vec());

        let bytes = record.to_bytes().unwrap();
        assert_eq!(bytes.len(), 14 + 20 + 20 + 18);
        assert_eq!(PacketRecord::decode(&bytes).unwrap(), record);
    }
}
