//! GlobalPlatform constants used by the secure channel protocols

/// Class bytes
pub mod cla {
    /// GlobalPlatform proprietary class
    pub const GP: u8 = 0x80;
    /// Secure messaging indicator, ORed into CLA of wrapped commands
    pub const SECURE_MESSAGING: u8 = 0x04;
    /// Interindustry class, used for GET RESPONSE
    pub const ISO: u8 = 0x00;
}

/// Instruction codes
pub mod ins {
    /// INITIALIZE UPDATE
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// MUTUAL AUTHENTICATE (SCP11a/c), same code as EXTERNAL AUTHENTICATE
    pub const MUTUAL_AUTHENTICATE: u8 = 0x82;
    /// INTERNAL AUTHENTICATE (SCP11b)
    pub const INTERNAL_AUTHENTICATE: u8 = 0x88;
    /// PERFORM SECURITY OPERATION
    pub const PERFORM_SECURITY_OPERATION: u8 = 0x2A;
    /// GET DATA
    pub const GET_DATA: u8 = 0xCA;
    /// GET RESPONSE
    pub const GET_RESPONSE: u8 = 0xC0;
}

/// EXTERNAL AUTHENTICATE P1 security levels
pub mod security_level {
    /// Command MAC
    pub const C_MAC: u8 = 0x01;
    /// Command decryption
    pub const C_DECRYPTION: u8 = 0x02;
    /// Response MAC
    pub const R_MAC: u8 = 0x10;
    /// Response encryption
    pub const R_ENCRYPTION: u8 = 0x20;
    /// Full protection in both directions
    pub const FULL: u8 = C_MAC | C_DECRYPTION | R_MAC | R_ENCRYPTION;
}

/// SCP03 key derivation constants
pub mod derivation {
    /// Card cryptogram
    pub const CARD_CRYPTOGRAM: u8 = 0x00;
    /// Host cryptogram
    pub const HOST_CRYPTOGRAM: u8 = 0x01;
    /// S-ENC
    pub const S_ENC: u8 = 0x04;
    /// S-MAC
    pub const S_MAC: u8 = 0x06;
    /// S-RMAC
    pub const S_RMAC: u8 = 0x07;
}

/// SCP identifiers and key ids
pub mod scp {
    /// SCP03 identifier in key information
    pub const SCP03: u8 = 0x03;
    /// SCP11 identifier in the control reference template
    pub const SCP11: u8 = 0x11;
    /// SD key id for SCP11a
    pub const KID_SCP11A: u8 = 0x11;
    /// SD key id for SCP11b
    pub const KID_SCP11B: u8 = 0x13;
    /// SD key id for SCP11c
    pub const KID_SCP11C: u8 = 0x15;
    /// Bit of the SCP03 `i` parameter selecting S16 mode
    pub const I_PARAM_S16: u8 = 0x01;
    /// Key usage qualifier: C-MAC, C-DEC, R-MAC, R-ENC
    pub const KEY_USAGE: u8 = 0x3C;
    /// Key type: AES
    pub const KEY_TYPE_AES: u8 = 0x88;
}

/// BER-TLV tags
pub mod tags {
    /// Control reference template for key agreement
    pub const CONTROL_REFERENCE: u8 = 0xA6;
    /// SCP identifier and parameters
    pub const SCP_PARAMETERS: u8 = 0x90;
    /// Key usage qualifier
    pub const KEY_USAGE: u8 = 0x95;
    /// Key type
    pub const KEY_TYPE: u8 = 0x80;
    /// Key length
    pub const KEY_LENGTH: u8 = 0x81;
    /// Key identifier and version
    pub const KEY_ID_VERSION: u8 = 0x83;
    /// Receipt
    pub const RECEIPT: u8 = 0x86;
    /// Ephemeral public key
    pub const EPHEMERAL_PUBLIC_KEY: u16 = 0x5F49;
    /// Certificate store (two-byte tag)
    pub const CERTIFICATE_STORE: [u8; 2] = [0xBF, 0x21];
    /// GlobalPlatform proprietary certificate (two-byte tag)
    pub const GP_CERTIFICATE: [u8; 2] = [0x7F, 0x21];
    /// DER SEQUENCE, first byte of an X.509 certificate
    pub const SEQUENCE: u8 = 0x30;
}
