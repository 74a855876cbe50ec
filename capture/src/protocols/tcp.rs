use crate::checksum;
use crate::errors::FieldError;
use crate::parser::ParserError;
use crate::protocols::ip::protocol::IpNextLevelProtocol;
use crate::protocols::ipv4::IPv4;
use crate::protocols::{Layer, Transport};
use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::Parser;
use nom::bytes::take;
use nom::number::{be_u8, be_u16, be_u32};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// TCP Protocol
// RFC 9293: https://datatracker.ietf.org/doc/html/rfc9293

pub const MIN_HEADER_LENGTH_BYTES: usize = 20;
pub const MAX_HEADER_LENGTH_BYTES: usize = 60;
const CHECKSUM_OFFSET: usize = 16;

pub fn parse(bytes: &[u8]) -> IResult<&[u8], Layer> {
    // Source port. 2 bytes
    let (rest, port_source) = be_u16().parse(bytes)?;
    // Destination port. 2 bytes
    let (rest, port_destination) = be_u16().parse(rest)?;

    // Sequence number, 4 bytes
    let (rest, sequence_number) = be_u32().parse(rest)?;
    // Acknowledgement number, 4 bytes
    let (rest, acknowledgement_number) = be_u32().parse(rest)?;

    // Data Offset (4 bits), Reserved (4 bits)
    let (rest, offset_reserved) = be_u8().parse(rest)?;
    // Data Offset is stored in 32bit words
    let data_offset = usize::from(offset_reserved >> 4) * 4;
    if data_offset < MIN_HEADER_LENGTH_BYTES {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    // Flags: 8 flags by 1 bit.
    let (rest, flags) = be_u8().parse(rest)?;
    let flags = Flags::from(flags);

    // Window: 2 bytes.
    let (rest, window) = be_u16().parse(rest)?;
    // Checksum: 2 bytes, not verified
    let (rest, _checksum) = be_u16().parse(rest)?;
    // Urgent pointer: 2 bytes.
    let (rest, urgent_pointer) = be_u16().parse(rest)?;

    // Options - up to 320 bits.
    let (payload, options) = take(data_offset - MIN_HEADER_LENGTH_BYTES).parse(rest)?;

    let protocol = TCP {
        port_source,
        port_destination,
        sequence_number,
        acknowledgement_number,
        flags,
        window,
        urgent_pointer,
        options: options.to_vec(),
    };

    Ok((payload, Layer::Transport(Transport::Tcp(protocol))))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TCP {
    pub port_source: u16,
    pub port_destination: u16,
    pub sequence_number: u32,
    pub acknowledgement_number: u32,
    pub flags: Flags,
    pub window: u16,
    pub urgent_pointer: u16,
    pub options: Vec<u8>,
}

impl TCP {
    /// Serializes the segment. The checksum needs the IPv4 pseudo-header,
    /// so it is left as zero when there is no network layer.
    pub fn encode(&self, network: Option<&IPv4>, payload: &[u8]) -> Result<BytesMut, FieldError> {
        let options_length = self.options.len().div_ceil(4) * 4;
        let header_length = MIN_HEADER_LENGTH_BYTES + options_length;
        if header_length > MAX_HEADER_LENGTH_BYTES {
            return Err(FieldError::InvalidValue {
                field: "tcp.options",
                value: hex::encode(&self.options),
            });
        }

        let mut buffer = BytesMut::with_capacity(header_length + payload.len());
        buffer.put_u16(self.port_source);
        buffer.put_u16(self.port_destination);
        buffer.put_u32(self.sequence_number);
        buffer.put_u32(self.acknowledgement_number);
        buffer.put_u8(((header_length / 4) as u8) << 4);
        buffer.put_u8(u8::from(&self.flags));
        buffer.put_u16(self.window);
        buffer.put_u16(0);
        buffer.put_u16(self.urgent_pointer);
        buffer.put_slice(&self.options);
        buffer.put_bytes(0, options_length - self.options.len());
        buffer.put_slice(payload);

        if let Some(ipv4) = network {
            let checksum = checksum::transport(
                ipv4.address_source,
                ipv4.address_destination,
                IpNextLevelProtocol::TCP,
                &buffer,
            );
            buffer[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2]
                .copy_from_slice(&checksum.to_be_bytes());
        }

        Ok(buffer)
    }
}

#[derive(Clone, Debug, Default, Eq, Serialize, Deserialize, PartialEq)]
pub struct Flags {
    pub congestion_window_reduced: bool,
    pub ecn_echo: bool,
    pub urgent: bool,
    pub acknowledgment: bool,
    pub push: bool,
    pub reset: bool,
    pub syn: bool,
    pub fin: bool,
}

impl Flags {
    pub const SYN: Self = Self {
        congestion_window_reduced: false,
        ecn_echo: false,
        urgent: false,
        acknowledgment: false,
        push: false,
        reset: false,
        syn: true,
        fin: false,
    };
}

impl From<u8> for Flags {
    fn from(value: u8) -> Self {
        Self {
            congestion_window_reduced: value & 0b1000_0000 != 0,
            ecn_echo: value & 0b0100_0000 != 0,
            urgent: value & 0b0010_0000 != 0,
            acknowledgment: value & 0b0001_0000 != 0,
            push: value & 0b0000_1000 != 0,
            reset: value & 0b0000_0100 != 0,
            syn: value & 0b0000_0010 != 0,
            fin: value & 0b0000_0001 != 0,
        }
    }
}

impl From<&Flags> for u8 {
    fn from(flags: &Flags) -> Self {
        [
            flags.congestion_window_reduced,
            flags.ecn_echo,
            flags.urgent,
            flags.acknowledgment,
            flags.push,
            flags.reset,
            flags.syn,
            flags.fin,
        ]
        .iter()
        .fold(0, |bits, &flag| (bits << 1) | u8::from(flag))
    }
}

/// Letter notation: `F` FIN, `S` SYN, `R` RST, `P` PSH, `A` ACK, `U` URG,
/// `E` ECE, `C` CWR. `"SA"` is a SYN-ACK.
impl FromStr for Flags {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = Self::default();
        for letter in s.trim().chars() {
            match letter.to_ascii_uppercase() {
                'F' => flags.fin = true,
                'S' => flags.syn = true,
                'R' => flags.reset = true,
                'P' => flags.push = true,
                'A' => flags.acknowledgment = true,
                'U' => flags.urgent = true,
                'E' => flags.ecn_echo = true,
                'C' => flags.congestion_window_reduced = true,
                _ => {
                    return Err(FieldError::InvalidValue {
                        field: "tcp.flags",
                        value: s.to_string(),
                    });
                },
            }
        }

        Ok(flags)
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letters = [
            (self.fin, 'F'),
            (self.syn, 'S'),
            (self.reset, 'R'),
            (self.push, 'P'),
            (self.acknowledgment, 'A'),
            (self.urgent, 'U'),
            (self.ecn_echo, 'E'),
            (self.congestion_window_reduced, 'C'),
        ];

        let string: String = letters
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, letter)| *letter)
            .collect();

        write!(f, "{}", string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_tcp_with_options() {
        let hex_actual = "00 50 DA 8E B2 61 2D 93 5D 1A BE A5 80 12 16 58 A0 94 00 00 02 04 05 96 01 01 04 02 01 03 03 06".replace(" ", "");
        let segment = hex::decode(hex_actual).unwrap();

        let (payload, layer) = parse(&segment).unwrap();
        let actual = match layer {
            Layer::Transport(Transport::Tcp(value)) => value,
            _ => panic!(),
        };

        let expected = TCP {
            port_source: 80,
            port_destination: 55950,
            sequence_number: 2992713107,
            acknowledgement_number: 0x5d1abea5,
            flags: Flags {
                congestion_window_reduced: false,
                ecn_echo: false,
                urgent: false,
                acknowledgment: true,
                push: false,
                reset: false,
                syn: true,
                fin: false,
            },
            window: 5720,
            urgent_pointer: 0,
            options: hex::decode("020405960101040201030306").unwrap(),
        };

        assert_eq!(actual, expected);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_encode_reproduces_captured_segment() {
        // Checksum covers the pseudo-header of 72.14.213.102 -> 192.168.3.131
        let captured = hex::decode(
            "0050DA8EB2612D935D1ABEA580121658A0940000020405960101040201030306",
        )
        .unwrap();
        let (_, layer) = parse(&captured).unwrap();
        let tcp = match layer {
            Layer::Transport(Transport::Tcp(value)) => value,
            _ => panic!(),
        };
        let ipv4 = IPv4::new(
            Ipv4Addr::new(72, 14, 213, 102),
            Ipv4Addr::new(192, 168, 3, 131),
            IpNextLevelProtocol::TCP,
        );

        let bytes = tcp.encode(Some(&ipv4), &[]).unwrap();
        assert_eq!(bytes.as_ref(), captured.as_slice());
    }

    #[test]
    fn test_encode_without_network_leaves_checksum_empty() {
        let tcp = TCP {
            port_source: 20,
            port_destination: 80,
            sequence_number: 0,
            acknowledgement_number: 0,
            flags: Flags::SYN,
            window: 8192,
            urgent_pointer: 0,
            options: vec![],
        };

        let bytes = tcp.encode(None, &[]).unwrap();
        assert_eq!(bytes.len(), MIN_HEADER_LENGTH_BYTES);
        assert_eq!(bytes[12], 0x50);
        assert_eq!(bytes[13], 0x02);
        assert_eq!(&bytes[16..18], &[0x00, 0x00]);
    }

    #[test]
    fn test_flags_bits() {
        let flags = Flags::from(0x18);
        assert!(flags.push);
        assert!(flags.acknowledgment);
        assert_eq!(u8::from(&flags), 0x18);
        assert_eq!(u8::from(&Flags::SYN), 0x02);
    }

    #[test]
    fn test_flags_letters() {
        let flags = Flags::from_str("SA").unwrap();
        assert!(flags.syn);
        assert!(flags.acknowledgment);
        assert_eq!(flags.to_string(), "SA");
        assert_eq!(Flags::from_str("").unwrap(), Flags::default());
        assert!(Flags::from_str("SX").is_err());
    }

    #[test]
    fn test_data_offset_too_small() {
        let segment = hex::decode("0050DA8EB2612D935D1ABEA540121658A0940000").unwrap();
        assert!(parse(&segment).is_err());
    }
}
