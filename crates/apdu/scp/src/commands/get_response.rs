//! GET RESPONSE command
//!
//! Retrieves the remaining response data after a `61xx` status.

use openscp_apdu_core::{Apdu, StatusWord};

use crate::constants::{cla, ins};

/// GET RESPONSE command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetResponseCommand {
    length: usize,
}

impl GetResponseCommand {
    /// GET RESPONSE for the byte count announced by a `61xx` status
    pub const fn for_status(status: StatusWord) -> Self {
        Self {
            length: match status.remaining_bytes() {
                Some(length) => length,
                None => 256,
            },
        }
    }

    /// Build the command APDU
    pub const fn to_apdu(&self) -> Apdu {
        Apdu::new(cla::ISO, ins::GET_RESPONSE, 0x00, 0x00).with_le(self.length)
    }
}
