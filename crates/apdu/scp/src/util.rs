//! Common utilities for building and reading BER-TLV data

pub(crate) mod tlv {
    use iso7816_tlv::ber::{Tag, Tlv, Value};

    use crate::{Error, Result};

    /// Build a primitive TLV
    pub(crate) fn primitive<T>(tag: T, value: &[u8]) -> Result<Tlv>
    where
        Tag: TryFrom<T>,
    {
        let tag = Tag::try_from(tag).map_err(|_| Error::Config("invalid TLV tag"))?;
        Tlv::new(tag, Value::Primitive(value.to_vec()))
            .map_err(|_| Error::Config("invalid primitive TLV"))
    }

    /// Build a constructed TLV with a single-byte tag
    pub(crate) fn constructed(tag: u8, children: Vec<Tlv>) -> Result<Tlv> {
        let tag = Tag::try_from(tag).map_err(|_| Error::Config("invalid TLV tag"))?;
        Tlv::new(tag, Value::Constructed(children))
            .map_err(|_| Error::Config("invalid constructed TLV"))
    }

    /// Read a BER length field, returning the length and the bytes it took
    pub(crate) fn read_length(data: &[u8]) -> Option<(usize, usize)> {
        match *data.first()? {
            len @ 0..=0x7F => Some((usize::from(len), 1)),
            0x81 => Some((usize::from(*data.get(1)?), 2)),
            0x82 => {
                let bytes = data.get(1..3)?;
                Some((usize::from(u16::from_be_bytes([bytes[0], bytes[1]])), 3))
            }
            0x83 => {
                let bytes = data.get(1..4)?;
                Some((
                    usize::from(bytes[0]) << 16 | usize::from(bytes[1]) << 8 | usize::from(bytes[2]),
                    4,
                ))
            }
            _ => None,
        }
    }

    /// Value of a TLV with a two-byte tag at the start of `data`, and the rest
    ///
    /// Only for the `BF21` certificate store. Its tag is constructed, so
    /// `Tlv::parse` would decode the DER certificates inside as BER-TLV and
    /// fail on them; they are parsed as X.509 instead.
    pub(crate) fn take_long_tag(tag: [u8; 2], data: &[u8]) -> Option<(&[u8], &[u8])> {
        if !data.starts_with(&tag) {
            return None;
        }
        let (len, len_size) = read_length(&data[2..])?;
        let start = 2 + len_size;
        let value = data.get(start..start + len)?;
        Some((value, &data[start + len..]))
    }

    /// Parse one TLV from the front of `data`
    ///
    /// Returns the TLV, its exact encoding and the remaining bytes.
    pub(crate) fn next(data: &[u8]) -> Result<(Tlv, &[u8], &[u8])> {
        let (parsed, rest) = Tlv::parse(data);
        let tlv = parsed.map_err(|_| Error::malformed("invalid BER-TLV"))?;
        let raw = &data[..data.len() - rest.len()];
        Ok((tlv, raw, rest))
    }

    /// Primitive value of a parsed TLV
    pub(crate) fn primitive_value(tlv: &Tlv) -> Result<&[u8]> {
        match tlv.value() {
            Value::Primitive(bytes) => Ok(bytes),
            Value::Constructed(_) => Err(Error::malformed("expected a primitive TLV")),
        }
    }
}
