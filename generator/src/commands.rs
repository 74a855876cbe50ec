use crate::args::Commands;
use crate::config::Config;
use capture::firewall::{Table, Verdict};
use capture::{CaptureError, FirewallError, PacketRecord};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

const SEPARATOR: &str = "-----";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0}")]
    Capture(#[from] CaptureError),

    #[error("{0}")]
    Firewall(#[from] FirewallError),
}

impl CommandError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            Self::Capture(err) => err.additional_info(),
            Self::Firewall(err) => err.additional_info(),
        }
    }
}

pub fn run(command: Option<Commands>, config: &Config) -> Result<(), CommandError> {
    match command.unwrap_or(Commands::Create {
        output: None,
        count: None,
        read_back: false,
    }) {
        Commands::Create {
            output,
            count,
            read_back,
        } => {
            let output = output.unwrap_or_else(|| config.output.clone());
            let count = count.unwrap_or(config.repeat);

            create(config, &output, count)?;
            if read_back || config.read_back {
                read(&output)?;
            }

            Ok(())
        },
        Commands::Read { path } => Ok(read(&path)?),
        Commands::Filter { rules, path, chain } => filter(&rules, &path, &chain),
    }
}

pub fn create(config: &Config, output: &Path, count: i64) -> Result<(), CaptureError> {
    let records = build_records(config, count)?;
    capture::write_capture(&records, output)?;

    println!("PCAP file created successfully.");
    Ok(())
}

pub fn build_records(config: &Config, count: i64) -> Result<Vec<PacketRecord>, CaptureError> {
    let count = match usize::try_from(count) {
        Ok(value) if value > 0 => value,
        _ => return Err(CaptureError::InvalidCount(count)),
    };

    let mut records = Vec::with_capacity(config.packets.len().saturating_mul(count));
    for (index, packet) in config.packets.iter().enumerate() {
        let record = packet.build().inspect_err(|_| {
            log::error!("Packet #{} of the configuration is invalid", index + 1);
        })?;
        records.extend(capture::repeat(&record, count)?);
    }
    log::debug!("Built {} records", records.len());

    Ok(records)
}

pub fn read(path: &Path) -> Result<(), CaptureError> {
    let capture = capture::read_capture(path)?;

    let mut stdout = std::io::stdout().lock();
    for record in &capture {
        write!(stdout, "{}", record.summarize())?;
        writeln!(stdout, "{SEPARATOR}")?;
    }

    Ok(())
}

pub fn filter(rules: &Path, path: &Path, chain: &str) -> Result<(), CommandError> {
    let verdicts = decide(rules, path, chain)?;

    let mut stdout = std::io::stdout().lock();
    for verdict in &verdicts {
        writeln!(stdout, "{verdict}").map_err(CaptureError::from)?;
    }

    Ok(())
}

/// One verdict per record of `path`, in file order.
pub fn decide(rules: &Path, path: &Path, chain: &str) -> Result<Vec<Verdict>, CommandError> {
    let mut table = Table::from_file(rules)?;
    if table.chain(chain).is_none() {
        return Err(FirewallError::UnknownChain(chain.to_string()).into());
    }

    let capture = capture::read_capture(path)?;
    let verdicts = capture
        .iter()
        .map(|record| table.process(chain, &record.summarize()))
        .collect::<Result<Vec<_>, _>>()?;

    let accepted = verdicts.iter().filter(|verdict| **verdict == Verdict::Accept).count();
    log::info!("{accepted} of {} packets accepted by {chain}", verdicts.len());

    Ok(verdicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_follow_config_order() {
        let config = Config::default();
        let records = build_records(&config, 2).unwrap();

        let ports: Vec<Option<u16>> = records
            .iter()
            .map(|record| record.summarize().port_destination)
            .collect();
        assert_eq!(ports, vec![Some(80), Some(80), Some(30), Some(30)]);
    }

    #[test]
    fn test_invalid_counts() {
        let config = Config::default();

        assert!(matches!(
            build_records(&config, 0),
            Err(CaptureError::InvalidCount(0))
        ));
        assert!(matches!(
            build_records(&config, -5),
            Err(CaptureError::InvalidCount(-5))
        ));
    }

    #[test]
    fn test_create_then_read() {
        let directory = tempfile::tempdir().unwrap();
        let output = directory.path().join("example.pcap");

        create(&Config::default(), &output, 1).unwrap();
        assert_eq!(capture::read_capture(&output).unwrap().len(), 2);
        read(&output).unwrap();
    }

    #[test]
    fn test_read_missing_file() {
        let directory = tempfile::tempdir().unwrap();
        let result = read(&directory.path().join("absent.pcap"));

        assert!(matches!(result, Err(CaptureError::FileNotFound(_))));
    }

    #[test]
    fn test_filter_default_packets() {
        let directory = tempfile::tempdir().unwrap();
        let output = directory.path().join("example.pcap");
        let rules = directory.path().join("firewall.rules");

        create(&Config::default(), &output, 2).unwrap();
        std::fs::write(
            &rules,
            "# web only\n-P INPUT DROP\n-A INPUT -p tcp -d 1.2.3.4 --dport 80 -j ACCEPT\n",
        )
        .unwrap();

        let verdicts = decide(&rules, &output, "INPUT").unwrap();
        assert_eq!(
            verdicts,
            vec![Verdict::Accept, Verdict::Accept, Verdict::Drop, Verdict::Drop]
        );
        filter(&rules, &output, "INPUT").unwrap();
    }

    #[test]
    fn test_filter_errors() {
        let directory = tempfile::tempdir().unwrap();
        let output = directory.path().join("example.pcap");
        let rules = directory.path().join("firewall.rules");
        create(&Config::default(), &output, 1).unwrap();

        assert!(matches!(
            decide(&rules, &output, "INPUT"),
            Err(CommandError::Firewall(FirewallError::FileNotFound(_)))
        ));

        std::fs::write(&rules, "-A INPUT -j ACCEPT\n").unwrap();
        assert!(matches!(
            decide(&rules, &output, "PREROUTING"),
            Err(CommandError::Firewall(FirewallError::UnknownChain(_)))
        ));
        assert!(matches!(
            decide(&rules, &directory.path().join("absent.pcap"), "INPUT"),
            Err(CommandError::Capture(CaptureError::FileNotFound(_)))
        ));
    }
}
