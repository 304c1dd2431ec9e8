//! Decryption of the encrypted `user_account` / `role` token claims.
//!
//! COMPATIBILITY SHIM: the token issuer derives an AES-128 key as the MD5
//! digest of a shared secret and encrypts each claim with AES in ECB mode,
//! padding with low control bytes instead of PKCS#7. None of that is a
//! recommended construction. It is reproduced here byte-for-byte so that
//! tokens minted by the existing issuer keep working; changing it requires
//! changing the issuer at the same time.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};
use thiserror::Error;

const BLOCK_SIZE: usize = 16;

#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("claim is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    BlockLength(usize),
    #[error("decrypted claim is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("decrypted claim is empty")]
    Empty,
}

/// AES-128-ECB cipher keyed by `MD5(encryption_secret)`.
#[derive(Clone)]
pub struct ClaimCipher {
    cipher: Aes128,
}

impl ClaimCipher {
    pub fn new(encryption_secret: &str) -> Self {
        let key = Md5::digest(encryption_secret.as_bytes());
        Self {
            cipher: Aes128::new(&key),
        }
    }

    /// Decrypt a base64 claim into its plaintext.
    pub fn decrypt(&self, encrypted_claim: &str) -> Result<String, DecryptError> {
        let mut bytes = STANDARD.decode(encrypted_claim.trim())?;
        if bytes.is_empty() || bytes.len() % BLOCK_SIZE != 0 {
            return Err(DecryptError::BlockLength(bytes.len()));
        }

        // ECB: every block is decrypted on its own, no chaining.
        for block in bytes.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher
                .decrypt_block(GenericArray::from_mut_slice(block));
        }

        let plaintext = String::from_utf8(bytes)?;
        match strip_padding(&plaintext) {
            "" => Err(DecryptError::Empty),
            claim => Ok(claim.to_string()),
        }
    }

    /// Encrypt a plaintext claim the way the issuer does.
    ///
    /// Pads with `n` copies of the byte `n` (1..=16), which always falls in
    /// the control range that [`ClaimCipher::decrypt`] strips.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut bytes = plaintext.as_bytes().to_vec();
        let pad = BLOCK_SIZE - bytes.len() % BLOCK_SIZE;
        bytes.resize(bytes.len() + pad, pad as u8);

        for block in bytes.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher
                .encrypt_block(GenericArray::from_mut_slice(block));
        }

        STANDARD.encode(bytes)
    }
}

impl std::fmt::Debug for ClaimCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimCipher").finish_non_exhaustive()
    }
}

/// Strip trailing characters below the visible ASCII range.
///
/// Observed issuer padding is a control byte, sometimes followed by a tab.
/// Until the issuer's scheme is pinned down, every trailing ASCII control
/// character is treated as padding.
fn strip_padding(plaintext: &str) -> &str {
    plaintext.trim_end_matches(|c: char| c.is_ascii_control())
}
