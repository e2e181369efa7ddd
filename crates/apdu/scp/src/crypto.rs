//! Cryptographic primitives for SCP03 and SCP11
//!
//! AES in ECB and CBC mode, AES-CMAC, the SCP03 counter-mode KDF,
//! the X9.63 KDF used by SCP11 and P-256 key agreement.

use aes::{Aes128, Aes192, Aes256};
use cipher::{
    BlockCipher, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, BlockSizeUser, KeyInit,
    KeyIvInit, block_padding::Iso7816, consts::U16, generic_array::GenericArray,
};
use cmac::{Cmac, Mac, digest::OutputSizeUser};
use p256::{PublicKey, SecretKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{Error, Result};

/// AES block length
pub const BLOCK_LEN: usize = 16;

/// One AES block
pub type Block = [u8; BLOCK_LEN];

const INVALID_KEY_LENGTH: Error = Error::Config("AES key must be 16, 24 or 32 bytes");

macro_rules! dispatch_aes {
    ($key:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $key.len() {
            16 => $func::<Aes128>($($arg),*),
            24 => $func::<Aes192>($($arg),*),
            32 => $func::<Aes256>($($arg),*),
            _ => Err(INVALID_KEY_LENGTH),
        }
    };
}

/// AES-CMAC over the concatenation of `parts`
pub fn aes_cmac(key: &[u8], parts: &[&[u8]]) -> Result<Block> {
    fn compute<M>(key: &[u8], parts: &[&[u8]]) -> Result<Block>
    where
        M: Mac + KeyInit + OutputSizeUser<OutputSize = U16>,
    {
        let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|_| INVALID_KEY_LENGTH)?;
        for part in parts {
            mac.update(part);
        }
        Ok(mac.finalize().into_bytes().into())
    }

    match key.len() {
        16 => compute::<Cmac<Aes128>>(key, parts),
        24 => compute::<Cmac<Aes192>>(key, parts),
        32 => compute::<Cmac<Aes256>>(key, parts),
        _ => Err(INVALID_KEY_LENGTH),
    }
}

/// Encrypt a single block in ECB mode
pub fn aes_ecb_encrypt(key: &[u8], block: &Block) -> Result<Block> {
    fn encrypt<C>(key: &[u8], block: &Block) -> Result<Block>
    where
        C: BlockEncrypt + KeyInit + BlockSizeUser<BlockSize = U16>,
    {
        let cipher = C::new_from_slice(key).map_err(|_| INVALID_KEY_LENGTH)?;
        let mut out = GenericArray::from(*block);
        cipher.encrypt_block(&mut out);
        Ok(out.into())
    }

    dispatch_aes!(key, encrypt(key, block))
}

/// Encrypt in CBC mode after ISO/IEC 7816-4 padding
pub fn aes_cbc_encrypt(key: &[u8], iv: &Block, data: &[u8]) -> Result<Vec<u8>> {
    fn encrypt<C>(key: &[u8], iv: &Block, data: &[u8]) -> Result<Vec<u8>>
    where
        C: BlockEncryptMut + BlockCipher + KeyInit,
    {
        let encryptor =
            cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(|_| INVALID_KEY_LENGTH)?;
        Ok(encryptor.encrypt_padded_vec_mut::<Iso7816>(data))
    }

    dispatch_aes!(key, encrypt(key, iv, data))
}

/// Decrypt in CBC mode and strip ISO/IEC 7816-4 padding
pub fn aes_cbc_decrypt(key: &[u8], iv: &Block, data: &[u8]) -> Result<Vec<u8>> {
    fn decrypt<C>(key: &[u8], iv: &Block, data: &[u8]) -> Result<Vec<u8>>
    where
        C: BlockDecryptMut + BlockCipher + KeyInit,
    {
        let decryptor =
            cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|_| INVALID_KEY_LENGTH)?;
        decryptor
            .decrypt_padded_vec_mut::<Iso7816>(data)
            .map_err(|_| Error::Crypto("invalid padding in decrypted data"))
    }

    if data.is_empty() || data.len() % BLOCK_LEN != 0 {
        return Err(Error::Crypto("ciphertext is not a whole number of blocks"));
    }
    dispatch_aes!(key, decrypt(key, iv, data))
}

/// SCP03 key derivation: NIST SP 800-108 counter mode with AES-CMAC
///
/// `bits` is the output length L in bits and must be a multiple of 8.
pub fn scp03_kdf(
    key: &[u8],
    constant: u8,
    context: &[u8],
    bits: u16,
) -> Result<Zeroizing<Vec<u8>>> {
    let out_len = usize::from(bits / 8);
    let blocks = out_len.div_ceil(BLOCK_LEN);
    let mut output = Zeroizing::new(Vec::with_capacity(blocks * BLOCK_LEN));

    let mut label = [0u8; 16];
    label[11] = constant;
    // label[12] is the zero separator
    label[13..15].copy_from_slice(&bits.to_be_bytes());

    for counter in 1..=blocks {
        label[15] = counter as u8;
        let block = aes_cmac(key, &[&label[..], context])?;
        output.extend_from_slice(&block);
    }
    output.truncate(out_len);
    Ok(output)
}

/// ANSI X9.63 key derivation with SHA-256
pub fn x963_kdf(shared_secret: &[u8], shared_info: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
    let mut output = Zeroizing::new(Vec::with_capacity(len + 32));
    let mut counter: u32 = 1;
    while output.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(shared_secret);
        hasher.update(counter.to_be_bytes());
        hasher.update(shared_info);
        output.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    output.truncate(len);
    output
}

/// P-256 ECDH, returning the x-coordinate of the shared point
pub fn ecdh(secret: &SecretKey, public: &PublicKey) -> Zeroizing<Vec<u8>> {
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Zeroizing::new(shared.raw_secret_bytes().to_vec())
}

/// Constant time equality of two byte strings
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Fresh random bytes, used for host challenges
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// Fresh ephemeral P-256 key pair
pub fn generate_ephemeral_key() -> SecretKey {
    SecretKey::random(&mut rand_v8::thread_rng())
}

/// Block holding `counter` big-endian in its low bytes and `prefix` in byte 0
///
/// Used as ECB input for the command (prefix 00) and response (prefix 80) ICVs.
pub const fn counter_block(prefix: u8, counter: u32) -> Block {
    let mut block = [0u8; BLOCK_LEN];
    block[0] = prefix;
    let bytes = counter.to_be_bytes();
    block[12] = bytes[0];
    block[13] = bytes[1];
    block[14] = bytes[2];
    block[15] = bytes[3];
    block
}
