// Library lints
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unsafe_code)]

pub use builder::{LinkFields, NetworkFields, TransportFields, build_packet};
pub use errors::{CaptureError, FieldError, FirewallError, RuleError};
pub use file::{CaptureFile, CaptureHeader, read_capture, write_capture};
pub use record::{PacketRecord, Summary, repeat};

pub mod builder;
pub mod checksum;
pub mod dto {
    pub mod packet;
}
pub mod errors;
pub mod file;
pub mod firewall;
pub mod frame;
pub mod parser;
pub mod protocols;
pub mod record;
