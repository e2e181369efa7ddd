//! Status words

use std::fmt;

/// SW1-SW2 trailer of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// SW1
    pub sw1: u8,
    /// SW2
    pub sw2: u8,
}

impl StatusWord {
    /// `90 00`
    pub const SUCCESS: Self = Self::new(0x90, 0x00);

    /// Create a status word from its two bytes
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Both bytes in wire order
    pub const fn to_bytes(&self) -> [u8; 2] {
        [self.sw1, self.sw2]
    }

    /// `90 00`
    pub const fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// `61 xx`, the card holds more data for GET RESPONSE
    pub const fn is_more_data_available(&self) -> bool {
        self.sw1 == 0x61
    }

    /// Byte count announced by `61 xx`, where `61 00` means 256
    pub const fn remaining_bytes(&self) -> Option<usize> {
        match (self.sw1, self.sw2) {
            (0x61, 0x00) => Some(256),
            (0x61, n) => Some(n as usize),
            _ => None,
        }
    }

    /// `62 xx` and `63 xx`: processed, with a warning
    ///
    /// Secure messaging protects these responses like `90 00`.
    pub const fn is_warning(&self) -> bool {
        matches!(self.sw1, 0x62 | 0x63)
    }

    /// Short text for the status words a security domain returns
    pub const fn description(&self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Success",
            (0x61, _) => "More data available",
            (0x62, _) => "Warning, non-volatile memory unchanged",
            (0x63, 0x00) => "Authentication of host cryptogram failed",
            (0x63, _) => "Warning, non-volatile memory changed",
            (0x64, 0x00) => "No specific diagnosis",
            (0x65, 0x81) => "Memory failure",
            (0x67, 0x00) => "Wrong length in Lc",
            (0x68, 0x82) => "Secure messaging not supported",
            (0x68, 0x84) => "Command chaining not supported",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x85) => "Conditions of use not satisfied",
            (0x69, 0x88) => "Incorrect secure messaging data objects",
            (0x6A, 0x80) => "Incorrect values in command data",
            (0x6A, 0x82) => "Application not found",
            (0x6A, 0x86) => "Incorrect P1 P2",
            (0x6A, 0x88) => "Referenced data not found",
            (0x6D, 0x00) => "Invalid instruction",
            (0x6E, 0x00) => "Invalid class",
            _ => "Unknown status word",
        }
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from((sw1, sw2): (u8, u8)) -> Self {
        Self::new(sw1, sw2)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}
