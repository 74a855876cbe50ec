use chrono::{DateTime, Utc};

/// Per-record header of the capture container.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    pub tv_sec: i64,
    pub tv_usec: i64,
    pub caplen: u32,
    pub len: u32,
}

impl FrameHeader {
    pub fn new(timestamp: DateTime<Utc>, length: u32) -> Self {
        Self {
            tv_sec: timestamp.timestamp(),
            tv_usec: i64::from(timestamp.timestamp_subsec_micros()),
            caplen: length,
            len: length,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let nanoseconds = u32::try_from(self.tv_usec).ok()?.checked_mul(1_000)?;
        DateTime::from_timestamp(self.tv_sec, nanoseconds)
    }

    // Frames cut by a snapshot length cannot be decoded back
    pub fn is_truncated(&self) -> bool {
        self.caplen < self.len
    }
}

impl From<&pcap::PacketHeader> for FrameHeader {
    fn from(header: &pcap::PacketHeader) -> Self {
        Self {
            tv_sec: header.ts.tv_sec.into(),
            tv_usec: header.ts.tv_usec.into(),
            caplen: header.caplen,
            len: header.len,
        }
    }
}

impl From<&FrameHeader> for pcap::PacketHeader {
    fn from(header: &FrameHeader) -> Self {
        // timeval field widths differ between platforms
        pcap::PacketHeader {
            ts: libc::timeval {
                tv_sec: header.tv_sec as _,
                tv_usec: header.tv_usec as _,
            },
            caplen: header.caplen,
            len: header.len,
        }
    }
}
