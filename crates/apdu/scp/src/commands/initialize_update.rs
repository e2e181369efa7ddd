//! INITIALIZE UPDATE command for SCP03
//!
//! This command starts an SCP03 session: it announces the host challenge and
//! the static key set to use, and returns the card challenge and cryptogram.

use bytes::Bytes;
use openscp_apdu_core::Apdu;

use crate::{
    Error, Result,
    constants::{cla, ins, scp},
    keys::KeyRef,
    mode::ScpMode,
};

/// Length of the key diversification data
const DIVERSIFICATION_DATA_LEN: usize = 10;
/// Length of the key information field (kvn, SCP id, i)
const KEY_INFO_LEN: usize = 3;
/// Length of the optional sequence counter
const SEQUENCE_COUNTER_LEN: usize = 3;

/// INITIALIZE UPDATE command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeUpdateCommand {
    key_ref: KeyRef,
    host_challenge: Bytes,
}

impl InitializeUpdateCommand {
    /// Create the command for a key set and host challenge
    pub fn new(key_ref: KeyRef, host_challenge: impl Into<Bytes>) -> Self {
        Self {
            key_ref,
            host_challenge: host_challenge.into(),
        }
    }

    /// Build the command APDU
    pub fn to_apdu(&self) -> Apdu {
        Apdu::new(
            cla::GP,
            ins::INITIALIZE_UPDATE,
            self.key_ref.version,
            self.key_ref.id,
        )
        .with_data(self.host_challenge.clone())
        .with_force_add_le(true)
    }
}

/// Successful INITIALIZE UPDATE response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeUpdateResponse {
    /// Key diversification data
    pub diversification_data: [u8; DIVERSIFICATION_DATA_LEN],
    /// Version of the key set the card used
    pub key_version: u8,
    /// SCP identifier, `03` for SCP03
    pub scp_id: u8,
    /// SCP `i` parameter
    pub i_param: u8,
    /// Card challenge
    pub card_challenge: Vec<u8>,
    /// Card cryptogram
    pub card_cryptogram: Vec<u8>,
    /// Sequence counter, present with pseudo-random card challenges
    pub sequence_counter: Option<[u8; SEQUENCE_COUNTER_LEN]>,
}

impl InitializeUpdateResponse {
    /// Parse the response data of a successful INITIALIZE UPDATE
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let header_len = DIVERSIFICATION_DATA_LEN + KEY_INFO_LEN;
        if payload.len() < header_len {
            return Err(Error::malformed("INITIALIZE UPDATE response too short"));
        }

        let key_info = &payload[DIVERSIFICATION_DATA_LEN..header_len];
        let scp_id = key_info[1];
        if scp_id != scp::SCP03 {
            return Err(Error::malformed("card does not report SCP03"));
        }

        let i_param = key_info[2];
        let mode = ScpMode::from_i_param(i_param);
        let body_len = mode.challenge_len() + mode.cryptogram_len();
        let sequence_counter = match payload.len() - header_len {
            len if len == body_len => None,
            len if len == body_len + SEQUENCE_COUNTER_LEN => {
                let mut counter = [0u8; SEQUENCE_COUNTER_LEN];
                counter.copy_from_slice(&payload[header_len + body_len..]);
                Some(counter)
            }
            _ => return Err(Error::malformed("INITIALIZE UPDATE response length")),
        };

        let mut diversification_data = [0u8; DIVERSIFICATION_DATA_LEN];
        diversification_data.copy_from_slice(&payload[..DIVERSIFICATION_DATA_LEN]);

        let challenge_end = header_len + mode.challenge_len();
        Ok(Self {
            diversification_data,
            key_version: key_info[0],
            scp_id,
            i_param,
            card_challenge: payload[header_len..challenge_end].to_vec(),
            card_cryptogram: payload[challenge_end..header_len + body_len].to_vec(),
            sequence_counter,
        })
    }

    /// Mode the card selected
    pub const fn mode(&self) -> ScpMode {
        ScpMode::from_i_param(self.i_param)
    }
}
