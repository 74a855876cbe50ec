use crate::builder::{LinkFields, NetworkFields, TransportFields, build_packet};
use crate::errors::{CaptureError, FieldError};
use crate::protocols::TransportKind;
use crate::protocols::ethernet::mac::MacAddress;
use crate::protocols::tcp::Flags;
use crate::record::PacketRecord;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Packet description as it appears in a configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PacketDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

impl PacketDto {
    pub fn to_fields(&self) -> Result<(LinkFields, NetworkFields, TransportFields), FieldError> {
        let link = LinkFields {
            source_mac: parse_mac(self.source_mac.as_deref())?,
            destination_mac: parse_mac(self.destination_mac.as_deref())?,
        };

        let network = NetworkFields {
            address_source: parse_ip(self.source_ip.as_deref(), "source_ip")?,
            address_destination: parse_ip(self.destination_ip.as_deref(), "destination_ip")?,
            ..Default::default()
        };

        let kind = match &self.transport {
            Some(value) => {
                TransportKind::from_str(value.trim()).map_err(|_| FieldError::InvalidValue {
                    field: "transport",
                    value: value.clone(),
                })?
            },
            None => TransportKind::default(),
        };
        let flags = match (&self.flags, kind) {
            (Some(value), TransportKind::Tcp) => Some(Flags::from_str(value)?),
            (Some(value), TransportKind::Udp) => {
                return Err(FieldError::InvalidValue {
                    field: "flags",
                    value: value.clone(),
                });
            },
            (None, _) => None,
        };
        let transport = TransportFields {
            kind,
            port_source: self.source_port,
            port_destination: self.destination_port,
            flags,
            ..Default::default()
        };

        Ok((link, network, transport))
    }

    pub fn build(&self) -> Result<PacketRecord, CaptureError> {
        let (link, network, transport) = self.to_fields()?;
        build_packet(&link, &network, &transport)
    }
}

fn parse_mac(value: Option<&str>) -> Result<Option<MacAddress>, FieldError> {
    value.map(MacAddress::try_from).transpose()
}

fn parse_ip(value: Option<&str>, field: &'static str) -> Result<Option<Ipv4Addr>, FieldError> {
    value
        .map(|string| {
            Ipv4Addr::from_str(string.trim()).map_err(|_| FieldError::InvalidValue {
                field,
                value: string.to_string(),
            })
        })
        .transpose()
}
