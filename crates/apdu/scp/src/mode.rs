//! Secure channel MAC mode

use derive_more::Display;

use crate::constants::scp;

/// Challenge, cryptogram and MAC length used by a secure channel
///
/// The discriminant is the length in bytes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScpMode {
    /// 8-byte challenges, cryptograms and MACs
    S8 = 8,
    /// 16-byte challenges, cryptograms and MACs
    S16 = 16,
}

impl ScpMode {
    /// Length in bytes of challenges, cryptograms and MACs
    pub const fn byte_len(self) -> usize {
        self as usize
    }

    /// Host and card challenge length
    pub const fn challenge_len(self) -> usize {
        self.byte_len()
    }

    /// Card and host cryptogram length
    pub const fn cryptogram_len(self) -> usize {
        self.byte_len()
    }

    /// Length of the truncated C-MAC and R-MAC
    pub const fn mac_len(self) -> usize {
        self.byte_len()
    }

    /// Cryptogram length in bits, as fed to the SCP03 KDF
    pub const fn cryptogram_bits(self) -> u16 {
        (self.byte_len() * 8) as u16
    }

    /// Mode announced by the SCP03 `i` parameter
    pub const fn from_i_param(i: u8) -> Self {
        if i & scp::I_PARAM_S16 != 0 { Self::S16 } else { Self::S8 }
    }
}
