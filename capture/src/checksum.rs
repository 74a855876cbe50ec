use crate::protocols::ip::protocol::IpNextLevelProtocol;
use std::net::Ipv4Addr;

// Internet Checksum
// RFC 1071: https://datatracker.ietf.org/doc/html/rfc1071

pub fn internet(data: &[u8]) -> u16 {
    fold(sum_words(0, data))
}

/// TCP and UDP checksums cover an IPv4 pseudo-header in front of the segment.
pub fn transport(
    source: Ipv4Addr, destination: Ipv4Addr, protocol: IpNextLevelProtocol,
    segment: &[u8],
) -> u16 {
    let mut sum = sum_words(0, &source.octets());
    sum = sum_words(sum, &destination.octets());
    sum += u32::from(u8::from(protocol));
    // Segment length always fits: the IPv4 total length is a u16.
    sum += segment.len() as u32;

    fold(sum_words(sum, segment))
}

fn sum_words(mut sum: u32, data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }

    // Odd trailing byte is padded with zero on the right
    if let Some(&byte) = chunks.remainder().first() {
        sum += u32::from(byte) << 8;
    }

    sum
}

fn fold(mut sum: u32) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internet_checksum_ipv4_header() {
        // Header from a captured TCP frame, checksum field zeroed (was 0x793B)
        let header = hex::decode("450000562B9A00003406 0000480ED593C0A80383".replace(" ", ""))
            .unwrap();

        assert_eq!(internet(&header), 0x793B);
    }

    #[test]
    fn test_internet_checksum_verifies_to_zero() {
        let header = hex::decode("450000562B9A00003406793B480ED593C0A80383").unwrap();

        assert_eq!(internet(&header), 0);
    }

    #[test]
    fn test_internet_checksum_odd_length() {
        assert_eq!(internet(&[0x01]), !0x0100);
    }

    #[test]
    fn test_transport_checksum_udp() {
        // UDP datagram from a captured LLMNR query, checksum field zeroed (was 0x2088)
        let datagram = hex::decode(
            "D54814EB001E000076F20000000100000000000004777061640000010001",
        )
        .unwrap();
        let checksum = transport(
            Ipv4Addr::new(192, 168, 3, 131),
            Ipv4Addr::new(224, 0, 0, 252),
            IpNextLevelProtocol::UDP,
            &datagram,
        );

        assert_eq!(checksum, 0x2088);
    }
}
