use nom::IResult;
use nom::Parser;
use nom::number::be_u16;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, Serialize, Deserialize, PartialEq)]
pub enum EtherType {
    Arp,
    ArpFrameRelay,
    ArpReverse,
    Ipv4,
    Ipv6,
    Lldp,
    Vlan,

    // Unassigned types and 802.3 length fields (below 0x0600)
    Other(u16),
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            0x0806 => Self::Arp,
            0x0808 => Self::ArpFrameRelay,
            0x8035 => Self::ArpReverse,
            0x0800 => Self::Ipv4,
            0x86DD => Self::Ipv6,
            0x88CC => Self::Lldp,
            0x8100 => Self::Vlan,
            other => Self::Other(other),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(value: EtherType) -> Self {
        match value {
            EtherType::Arp => 0x0806,
            EtherType::ArpFrameRelay => 0x0808,
            EtherType::ArpReverse => 0x8035,
            EtherType::Ipv4 => 0x0800,
            EtherType::Ipv6 => 0x86DD,
            EtherType::Lldp => 0x88CC,
            EtherType::Vlan => 0x8100,
            EtherType::Other(other) => other,
        }
    }
}

pub fn parse(input: &[u8]) -> IResult<&[u8], EtherType> {
    let (rest, ether_type) = be_u16().parse(input)?;

    Ok((rest, EtherType::from(ether_type)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_matches_parse() {
        for ether_type in [EtherType::Arp, EtherType::Ipv4, EtherType::Ipv6, EtherType::Vlan] {
            let bytes = u16::from(ether_type).to_be_bytes();
            let (rest, parsed) = parse(&bytes).unwrap();
            assert!(rest.is_empty());
            assert_eq!(parsed, ether_type);
        }
    }

    #[test]
    fn test_unknown_ether_type() {
        let (_, parsed) = parse(&[0x12, 0x34]).unwrap();
        assert_eq!(parsed, EtherType::Other(0x1234));
        assert_eq!(u16::from(parsed), 0x1234);

        // 802.3 frame: the field holds the payload length
        let (_, parsed) = parse(&[0x00, 0x2E]).unwrap();
        assert_eq!(parsed, EtherType::Other(0x002E));
    }

    #[test]
    fn test_known_number_is_never_other() {
        assert_eq!(EtherType::from(0x0800), EtherType::Ipv4);
    }
}
