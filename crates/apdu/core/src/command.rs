//! APDU command definitions
//!
//! This module provides the command APDU type and its ISO/IEC 7816-4 wire
//! encoding in short and extended length form.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Largest data field of a short APDU
pub const SHORT_MAX_DATA: usize = 255;
/// Largest expected length of a short APDU
pub const SHORT_MAX_LE: usize = 256;
/// Largest data field of an extended APDU
pub const EXTENDED_MAX_DATA: usize = 65_535;
/// Largest expected length of an extended APDU
pub const EXTENDED_MAX_LE: usize = 65_536;
/// CLA bit signalling that further command blocks follow (ISO 7816 command chaining)
pub const CLA_CHAINING: u8 = 0x10;

/// Whether a command with this data length and Le needs extended length encoding
pub const fn requires_extended_length(data_len: usize, le: usize) -> bool {
    data_len > SHORT_MAX_DATA || le > SHORT_MAX_LE
}

/// Append an Lc field for `len` data bytes
///
/// Nothing is written for an empty data field. A length that does not fit
/// the chosen encoding is an error.
pub fn put_lc(buf: &mut BytesMut, len: usize, extended: bool) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    if extended {
        let len = u16::try_from(len).map_err(|_| Error::command_length(len, 0))?;
        buf.put_u8(0x00);
        buf.put_u16(len);
    } else {
        let len = u8::try_from(len).map_err(|_| Error::command_length(len, 0))?;
        buf.put_u8(len);
    }
    Ok(())
}

/// Append an Le field
///
/// `le == 0` writes nothing unless `force` is set, in which case the
/// "maximum" encoding (all zero) is written. Callers check `le` against
/// [`SHORT_MAX_LE`] or [`EXTENDED_MAX_LE`] first.
fn put_le(buf: &mut BytesMut, le: usize, force: bool, has_data: bool, extended: bool) {
    if le == 0 && !force {
        return;
    }
    if extended {
        if !has_data {
            buf.put_u8(0x00);
        }
        // 65536 wraps to 00 00
        buf.put_u16(le as u16);
    } else {
        // 256 wraps to 00
        buf.put_u8(le as u8);
    }
}

/// Command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data, possibly empty
    pub data: Bytes,
    /// Expected response length, 0 when absent
    pub le: usize,
    /// Append a zero Le byte even when `le` is 0
    pub force_add_le: bool,
}

impl Apdu {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Bytes::new(),
            le: 0,
            force_add_le: false,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = data.into();
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: usize) -> Self {
        self.le = le;
        self
    }

    /// Force a zero Le byte when no expected length is set
    pub const fn with_force_add_le(mut self, force: bool) -> Self {
        self.force_add_le = force;
        self
    }

    /// Header bytes CLA INS P1 P2
    pub const fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    /// Whether this command needs extended length encoding
    pub fn needs_extended_length(&self) -> bool {
        requires_extended_length(self.data.len(), self.le)
    }

    /// Encode the command to wire bytes
    ///
    /// Extended length encoding is used only when the command needs it and
    /// `extended_supported` is set.
    pub fn to_bytes(&self, extended_supported: bool) -> Result<Bytes> {
        let data_len = self.data.len();
        if data_len > EXTENDED_MAX_DATA || self.le > EXTENDED_MAX_LE {
            return Err(Error::command_length(data_len, self.le));
        }

        let extended = self.needs_extended_length();
        if extended && !extended_supported {
            return Err(Error::command_length(data_len, self.le));
        }

        let mut buf = BytesMut::with_capacity(4 + 3 + data_len + 3);
        buf.put_slice(&self.header());
        put_lc(&mut buf, data_len, extended)?;
        buf.put_slice(&self.data);
        put_le(&mut buf, self.le, self.force_add_le, data_len > 0, extended);
        Ok(buf.freeze())
    }

    /// Split the data field into ISO 7816 chained short commands
    ///
    /// Every block but the last has [`CLA_CHAINING`] set and no Le. A command
    /// whose data already fits a short APDU is returned unchanged.
    pub fn split_chained(&self) -> Vec<Self> {
        if self.data.len() <= SHORT_MAX_DATA {
            return vec![self.clone()];
        }

        let blocks = self.data.len().div_ceil(SHORT_MAX_DATA);
        (0..blocks)
            .map(|index| {
                let start = index * SHORT_MAX_DATA;
                let end = (start + SHORT_MAX_DATA).min(self.data.len());
                let last = index + 1 == blocks;
                Self {
                    cla: if last { self.cla } else { self.cla | CLA_CHAINING },
                    ins: self.ins,
                    p1: self.p1,
                    p2: self.p2,
                    data: self.data.slice(start..end),
                    le: if last { self.le } else { 0 },
                    force_add_le: last && self.force_add_le,
                }
            })
            .collect()
    }
}

impl fmt::Display for Apdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X} {:02X}",
            self.cla, self.ins, self.p1, self.p2
        )?;
        if !self.data.is_empty() {
            write!(f, " [{} bytes]", self.data.len())?;
        }
        if self.le > 0 || self.force_add_le {
            write!(f, " Le={}", self.le)?;
        }
        Ok(())
    }
}
