use crate::errors::{CaptureError, FieldError};
use crate::frame::FrameHeader;
use crate::parser;
use crate::protocols::ProtocolId;
use crate::record::PacketRecord;
use std::path::Path;
use tempfile::NamedTempFile;

pub const VERSION_MAJOR: u16 = 2;
pub const VERSION_MINOR: u16 = 4;
pub const LINKTYPE_ETHERNET: i32 = 1;
// Snapshot length libpcap stamps on a dead capture. Longer frames are cut on read.
pub const SNAPSHOT_LENGTH: usize = 65535;

/// Global header of a classic pcap container.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CaptureHeader {
    pub version_major: u16,
    pub version_minor: u16,
    pub link_type: i32,
}

impl Default for CaptureHeader {
    fn default() -> Self {
        Self {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            link_type: LINKTYPE_ETHERNET,
        }
    }
}

/// Records read back from a capture file, in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureFile {
    pub header: CaptureHeader,
    records: Vec<PacketRecord>,
}

impl CaptureFile {
    pub fn records(&self) -> &[PacketRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PacketRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<PacketRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a CaptureFile {
    type Item = &'a PacketRecord;
    type IntoIter = std::slice::Iter<'a, PacketRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Writes `records` to `path` as an Ethernet pcap file.
///
/// The container goes to a temporary file next to `path` first and is renamed
/// over it once flushed, so `path` either keeps its old content or holds the
/// complete new capture.
pub fn write_capture<P: AsRef<Path>>(
    records: &[PacketRecord], path: P,
) -> Result<(), CaptureError> {
    let path = path.as_ref();
    let frames = records
        .iter()
        .map(|record| {
            let frame = record.to_bytes()?;
            if frame.len() > SNAPSHOT_LENGTH {
                return Err(FieldError::PayloadTooLarge(record.payload().len()).into());
            }
            Ok(frame)
        })
        .collect::<Result<Vec<_>, CaptureError>>()?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temporary = temporary_file(directory, path)?;
    log::debug!("Writing {} records through {}", frames.len(), temporary.path().display());

    let timestamp = chrono::Utc::now();
    {
        let mut file = pcap::Capture::dead(pcap::Linktype(LINKTYPE_ETHERNET))
            .and_then(|capture| capture.savefile(temporary.path()))
            .map_err(pcap_io_error)?;

        for frame in &frames {
            // Bounded by SNAPSHOT_LENGTH
            let length = u32::try_from(frame.len())
                .map_err(|_| FieldError::PayloadTooLarge(frame.len()))?;
            let header = pcap::PacketHeader::from(&FrameHeader::new(timestamp, length));
            file.write(&pcap::Packet::new(&header, frame));
        }
        file.flush().map_err(pcap_io_error)?;
    }

    temporary.persist(path).map_err(|err| err.error)?;

    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Reads every record of the capture file at `path`.
pub fn read_capture<P: AsRef<Path>>(path: P) -> Result<CaptureFile, CaptureError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CaptureError::FileNotFound(path.to_path_buf()));
    }

    let mut capture = pcap::Capture::from_file(path)
        .map_err(|err| CaptureError::MalformedCapture(err.to_string()))?;

    let link_type = capture.get_datalink();
    let root = ProtocolId::root(&link_type).ok_or_else(|| {
        CaptureError::MalformedCapture(format!("Unsupported link type {}", link_type.0))
    })?;
    log::debug!("Reading {} with link type {}", path.display(), link_type.0);

    let mut records = Vec::new();
    loop {
        let packet = match capture.next_packet() {
            Ok(packet) => packet,
            Err(pcap::Error::NoMorePackets) => break,
            Err(err) => {
                return Err(CaptureError::MalformedCapture(format!(
                    "Record {}: {err}",
                    records.len() + 1
                )));
            },
        };

        let header = FrameHeader::from(packet.header);
        if header.is_truncated() {
            return Err(CaptureError::MalformedCapture(format!(
                "Record {} holds {} of {} bytes",
                records.len() + 1,
                header.caplen,
                header.len
            )));
        }

        records.push(parser::decode(root, packet.data)?);
    }

    log::info!("Read {} records from {}", records.len(), path.display());
    Ok(CaptureFile {
        header: CaptureHeader {
            link_type: link_type.0,
            ..CaptureHeader::default()
        },
        records,
    })
}

// Created like a regular file, then given the mode of the file it replaces
#[cfg_attr(not(unix), allow(unused_mut, unused_variables))]
fn temporary_file(directory: &Path, path: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let temporary = builder.tempfile_in(directory)?;

    #[cfg(unix)]
    {
        if let Ok(metadata) = std::fs::metadata(path) {
            temporary.as_file().set_permissions(metadata.permissions())?;
        }
    }

    Ok(temporary)
}

fn pcap_io_error(err: pcap::Error) -> CaptureError {
    CaptureError::IOError(std::io::Error::other(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header() {
        let header = CaptureHeader::default();
        assert_eq!((header.version_major, header.version_minor), (2, 4));
        assert_eq!(header.link_type, 1);
    }

    #[test]
    fn test_empty_capture_roundtrip() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("empty.pcap");

        write_capture(&[], &path).unwrap();
        let capture = read_capture(&path).unwrap();

        assert!(capture.is_empty());
        assert_eq!(capture.header, CaptureHeader::default());
    }

    #[test]
    fn test_largest_frame_roundtrip() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("largest.pcap");

        let (records, too_large) = oversized_pair();
        assert_eq!(records[0].to_bytes().unwrap().len(), SNAPSHOT_LENGTH);
        write_capture(&records, &path).unwrap();
        assert_eq!(read_capture(&path).unwrap().records(), records.as_slice());

        let bigger = directory.path().join("bigger.pcap");
        match write_capture(&[too_large], &bigger) {
            Err(CaptureError::InvalidField(FieldError::PayloadTooLarge(_))) => {},
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!bigger.exists());
    }

    // A TCP record whose frame is exactly SNAPSHOT_LENGTH bytes, and one a byte longer
    fn oversized_pair() -> (Vec<PacketRecord>, PacketRecord) {
        use crate::builder::{LinkFields, NetworkFields, TransportFields, build_packet};
        use std::net::Ipv4Addr;

        let record = build_packet(
            &LinkFields::default(),
            &NetworkFields {
                address_destination: Some(Ipv4Addr::new(1, 2, 3, 4)),
                ..Default::default()
            },
            &TransportFields {
                port_destination: Some(80),
                ..Default::default()
            },
        )
        .unwrap();

        let headers = 14 + 20 + 20;
        let fits = record.clone().with_payload(vec![0; SNAPSHOT_LENGTH - headers]);
        let too_large = record.with_payload(vec![0; SNAPSHOT_LENGTH - headers + 1]);

        (vec![fits], too_large)
    }

    #[cfg(unix)]
    #[test]
    fn test_overwrite_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("mode.pcap");

        write_capture(&[], &path).unwrap();
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
        write_capture(&[], &path).unwrap();
        assert_eq!(mode(&path), 0o640);

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        write_capture(&[], &path).unwrap();
        assert_eq!(mode(&path), 0o644);
    }
}
