use crate::errors::RuleError;
use crate::protocols::TransportKind;
use crate::record::Summary;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

const LOOPBACK_INTERFACE: &str = "lo";

/// Final decision for a packet.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq)]
pub enum Verdict {
    #[strum(serialize = "ACCEPT")]
    Accept,

    #[strum(serialize = "DROP")]
    Drop,

    #[strum(serialize = "REJECT")]
    Reject,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Verdict(Verdict),
    // Non-terminating
    Log { prefix: Option<String> },
    Jump(String),
}

impl Target {
    pub fn from_name(name: &str) -> Self {
        match name {
            "LOG" => Self::Log { prefix: None },
            _ => match Verdict::from_str(name) {
                Ok(verdict) => Self::Verdict(verdict),
                Err(_) => Self::Jump(name.to_string()),
            },
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verdict(verdict) => write!(f, "{verdict}"),
            Self::Log { prefix: None } => write!(f, "LOG"),
            Self::Log {
                prefix: Some(prefix),
            } => write!(f, "LOG --log-prefix \"{prefix}\""),
            Self::Jump(chain) => write!(f, "{chain}"),
        }
    }
}

/// IPv4 network in CIDR notation. A bare address is a `/32` network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AddressMatch {
    pub network: Ipv4Addr,
    pub prefix_length: u8,
}

impl AddressMatch {
    pub fn parse(value: &str) -> Option<Self> {
        let (address, prefix_length) = match value.split_once('/') {
            Some((address, prefix)) => (address, prefix.parse::<u8>().ok()?),
            None => (value, 32),
        };
        if prefix_length > 32 {
            return None;
        }

        Some(Self {
            network: Ipv4Addr::from_str(address).ok()?,
            prefix_length,
        })
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        let mask = self.mask();
        u32::from(address) & mask == u32::from(self.network) & mask
    }

    fn mask(&self) -> u32 {
        if self.prefix_length == 0 {
            0
        } else {
            !0u32 << (32 - u32::from(self.prefix_length))
        }
    }
}

impl From<Ipv4Addr> for AddressMatch {
    fn from(network: Ipv4Addr) -> Self {
        Self {
            network,
            prefix_length: 32,
        }
    }
}

impl Display for AddressMatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.prefix_length {
            32 => write!(f, "{}", self.network),
            length => write!(f, "{}/{length}", self.network),
        }
    }
}

/// One rule of a chain. Unset criteria match every packet.
///
/// A set criterion needs the matching layer: a rule with `--dport 80` never
/// matches a record without a transport layer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Rule {
    pub chain: String,
    pub protocol: Option<TransportKind>,
    pub source: Option<AddressMatch>,
    pub destination: Option<AddressMatch>,
    pub port_source: Option<u16>,
    pub port_destination: Option<u16>,
    pub interface_in: Option<String>,
    pub interface_out: Option<String>,
    // -m conntrack --ctstate ESTABLISHED
    pub established: bool,
    pub target: Option<Target>,
}

impl Rule {
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            ..Default::default()
        }
    }

    /// Parses the options that follow the chain name of an `-A`/`-I`/`-D`/`-R` line.
    pub fn parse(chain: &str, options: &[String]) -> Result<Self, RuleError> {
        let mut rule = Self::new(chain);
        let mut tokens = options.iter().map(String::as_str);

        while let Some(option) = tokens.next() {
            match option {
                "-p" | "--protocol" => {
                    let value = argument(&mut tokens, option)?;
                    rule.protocol = match value.to_ascii_lowercase().as_str() {
                        "all" => None,
                        _ => Some(
                            TransportKind::from_str(value)
                                .map_err(|_| RuleError::UnsupportedProtocol(value.to_string()))?,
                        ),
                    };
                },
                "-s" | "--source" => {
                    rule.source = Some(address(&mut tokens, option)?);
                },
                "-d" | "--destination" => {
                    rule.destination = Some(address(&mut tokens, option)?);
                },
                "--sport" | "--source-port" => {
                    rule.port_source = Some(port(&mut tokens, option)?);
                },
                "--dport" | "--destination-port" => {
                    rule.port_destination = Some(port(&mut tokens, option)?);
                },
                "-i" | "--in-interface" => {
                    rule.interface_in = Some(argument(&mut tokens, option)?.to_string());
                },
                "-o" | "--out-interface" => {
                    rule.interface_out = Some(argument(&mut tokens, option)?.to_string());
                },
                "-j" | "--jump" => {
                    rule.target = Some(Target::from_name(argument(&mut tokens, option)?));
                },
                "--log-prefix" => {
                    let value = argument(&mut tokens, option)?;
                    match &mut rule.target {
                        Some(Target::Log { prefix }) => *prefix = Some(value.to_string()),
                        _ => return Err(RuleError::UnknownOption(option.to_string())),
                    }
                },
                "-m" | "--match" => {
                    let value = argument(&mut tokens, option)?;
                    if !matches!(value, "conntrack" | "state" | "tcp" | "udp") {
                        return Err(invalid(option, value));
                    }
                },
                "--ctstate" | "--state" => {
                    let value = argument(&mut tokens, option)?;
                    let established = value.split(',').any(|state| state == "ESTABLISHED");
                    let known = value
                        .split(',')
                        .all(|state| matches!(state, "ESTABLISHED" | "RELATED"));
                    if !established || !known {
                        return Err(invalid(option, value));
                    }
                    rule.established = true;
                },
                _ => return Err(RuleError::UnknownOption(option.to_string())),
            }
        }

        Ok(rule)
    }

    pub fn matches(&self, summary: &Summary, established: bool) -> bool {
        let protocol = self.protocol.is_none_or(|kind| summary.transport == Some(kind));
        let source = address_matches(self.source, summary.address_source);
        let destination = address_matches(self.destination, summary.address_destination);
        let port_source = self.port_source.is_none_or(|port| summary.port_source == Some(port));
        let port_destination = self
            .port_destination
            .is_none_or(|port| summary.port_destination == Some(port));
        let state = !self.established || established;

        protocol
            && source
            && destination
            && port_source
            && port_destination
            && state
            && (!self.on_loopback() || is_loopback(summary))
    }

    // Interface names other than loopback cannot be told apart in a capture
    fn on_loopback(&self) -> bool {
        [&self.interface_in, &self.interface_out]
            .into_iter()
            .any(|interface| interface.as_deref() == Some(LOOPBACK_INTERFACE))
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "-A {}", self.chain)?;
        if let Some(interface) = &self.interface_in {
            write!(f, " -i {interface}")?;
        }
        if let Some(interface) = &self.interface_out {
            write!(f, " -o {interface}")?;
        }
        if let Some(protocol) = self.protocol {
            write!(f, " -p {}", protocol.to_string().to_ascii_lowercase())?;
        }
        if let Some(source) = self.source {
            write!(f, " -s {source}")?;
        }
        if let Some(destination) = self.destination {
            write!(f, " -d {destination}")?;
        }
        if let Some(port) = self.port_source {
            write!(f, " --sport {port}")?;
        }
        if let Some(port) = self.port_destination {
            write!(f, " --dport {port}")?;
        }
        if self.established {
            write!(f, " -m conntrack --ctstate ESTABLISHED")?;
        }
        if let Some(target) = &self.target {
            write!(f, " -j {target}")?;
        }

        Ok(())
    }
}

fn argument<'a>(
    tokens: &mut impl Iterator<Item = &'a str>, option: &str,
) -> Result<&'a str, RuleError> {
    tokens.next().ok_or_else(|| RuleError::MissingArgument(option.to_string()))
}

fn address<'a>(
    tokens: &mut impl Iterator<Item = &'a str>, option: &str,
) -> Result<AddressMatch, RuleError> {
    let value = argument(tokens, option)?;
    AddressMatch::parse(value).ok_or_else(|| invalid(option, value))
}

fn port<'a>(tokens: &mut impl Iterator<Item = &'a str>, option: &str) -> Result<u16, RuleError> {
    let value = argument(tokens, option)?;
    value.parse::<u16>().map_err(|_| invalid(option, value))
}

fn invalid(option: &str, value: &str) -> RuleError {
    RuleError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
    }
}

fn address_matches(criterion: Option<AddressMatch>, address: Option<Ipv4Addr>) -> bool {
    criterion.is_none_or(|network| address.is_some_and(|address| network.contains(address)))
}

fn is_loopback(summary: &Summary) -> bool {
    [summary.address_source, summary.address_destination]
        .into_iter()
        .flatten()
        .any(|address| address.is_loopback())
}
