//! iptables-style packet filter over decoded capture records.
//!
//! A [`Table`] holds named chains of [`Rule`]s. Rules files use the usual
//! iptables command lines (`-P`, `-N`, `-F`, `-A`, `-I`, `-D`, `-R`), and every
//! record is matched through its [`Summary`](crate::Summary), so only the
//! fields the decoder knows (IPv4 addresses, TCP/UDP ports) take part.

pub use chain::Chain;
pub use rule::{AddressMatch, Rule, Target, Verdict};
pub use table::{Command, Flow, Table};

pub mod chain;
pub mod rule;
pub mod table;
