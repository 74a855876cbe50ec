use crate::errors::CaptureError;
use crate::protocols::{Layer, ProtocolId};
use crate::record::PacketRecord;
use nom::IResult;

pub type ParseFn = fn(&[u8]) -> IResult<&[u8], Layer>;

/// Decodes a raw frame layer by layer, starting from `root`.
///
/// Each parsed header names the protocol that follows it. Decoding stops at
/// the first layer without a known child; the remaining bytes become the
/// record payload.
pub fn decode(root: ProtocolId, bytes: &[u8]) -> Result<PacketRecord, CaptureError> {
    let mut layers = Vec::new();
    let mut next = Some(root);
    let mut rest = bytes;

    while let Some(id) = next {
        let (remaining, layer) = id.parse()(rest).map_err(|err| {
            CaptureError::MalformedCapture(format!(
                "Failed to decode {id:?} header at byte {offset}: {err:?}",
                offset = bytes.len() - rest.len(),
            ))
        })?;

        next = ProtocolId::best_children(&layer);
        layers.push(layer);
        rest = remaining;
    }

    PacketRecord::new(layers).map(|record| record.with_payload(rest.to_vec()))
}

pub enum ParserError {
    ErrorVerify,
}

impl ParserError {
    pub fn to_nom<T>(&self, input: T) -> nom::Err<nom::error::Error<T>> {
        match self {
            Self::ErrorVerify => nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Verify,
            )),
        }
    }
}
