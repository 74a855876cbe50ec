use nom::IResult;
use nom::Parser;
use nom::number::be_u8;
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};

// Assigned Internet Protocol Numbers
// https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, FromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum IpNextLevelProtocol {
    ICMP = 1,
    IGMP = 2,
    TCP = 6,
    UDP = 17,
    IPv6 = 41,
    GRE = 47,
    ESP = 50,
    AH = 51,
    Ipv6Icmp = 58,
    OSPF = 89,
    SCTP = 132,

    #[num_enum(catch_all)]
    Other(u8),
}

pub fn parse(input: &[u8]) -> IResult<&[u8], IpNextLevelProtocol> {
    let (rest, protocol) = be_u8().parse(input)?;

    Ok((rest, IpNextLevelProtocol::from(protocol)))
}
