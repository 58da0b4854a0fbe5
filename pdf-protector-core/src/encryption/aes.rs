//! AES encryption implementation for PDF
//!
//! AES-128 and AES-256 in CBC mode (ISO 32000-1 Section 7.6.2 and
//! ISO 32000-2 Section 7.6.3), plus the raw single-block and unpadded
//! variants the revision 6 key derivation needs.

use crate::error::PdfError;
use aes::cipher::block_padding::NoPadding;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::{Aes128, Aes256};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// AES key sizes supported by PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesKeySize {
    /// AES-128 (16 bytes)
    Aes128,
    /// AES-256 (32 bytes)
    Aes256,
}

impl AesKeySize {
    /// Get key size in bytes
    pub fn key_length(&self) -> usize {
        match self {
            AesKeySize::Aes128 => 16,
            AesKeySize::Aes256 => 32,
        }
    }
}

/// AES encryption key, wiped on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AesKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    size: AesKeySize,
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesKey")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl AesKey {
    /// Create new AES-128 key
    pub fn new_128(key: &[u8]) -> Result<Self, AesError> {
        Self::with_size(key, AesKeySize::Aes128)
    }

    /// Create new AES-256 key
    pub fn new_256(key: &[u8]) -> Result<Self, AesError> {
        Self::with_size(key, AesKeySize::Aes256)
    }

    fn with_size(key: &[u8], size: AesKeySize) -> Result<Self, AesError> {
        if key.len() != size.key_length() {
            return Err(AesError::InvalidKeyLength {
                expected: size.key_length(),
                actual: key.len(),
            });
        }
        Ok(Self {
            key: key.to_vec(),
            size,
        })
    }

    /// Get key size
    pub fn size(&self) -> AesKeySize {
        self.size
    }
}

/// AES-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AesError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid IV length: expected 16, got {0}")]
    InvalidIvLength(usize),

    #[error("Data length {0} is not a multiple of the block size")]
    InvalidDataLength(usize),

    #[error("Invalid PKCS#7 padding")]
    InvalidPadding,
}

impl From<AesError> for PdfError {
    fn from(err: AesError) -> Self {
        PdfError::EncryptionFailed {
            reason: err.to_string(),
            source: None,
        }
    }
}

/// AES cipher bound to one key
pub struct Aes {
    key: AesKey,
}

impl Aes {
    pub fn new(key: AesKey) -> Self {
        Self { key }
    }

    /// CBC encryption with PKCS#7 padding
    pub fn encrypt_cbc(&self, data: &[u8], iv: &[u8]) -> Result<Vec<u8>, AesError> {
        let padding = BLOCK_SIZE - data.len() % BLOCK_SIZE;
        let mut buffer = Vec::with_capacity(data.len() + padding);
        buffer.extend_from_slice(data);
        buffer.resize(data.len() + padding, padding as u8);
        self.encrypt_cbc_no_padding(&buffer, iv)
    }

    /// CBC decryption, removing PKCS#7 padding
    pub fn decrypt_cbc(&self, data: &[u8], iv: &[u8]) -> Result<Vec<u8>, AesError> {
        let mut plain = self.decrypt_cbc_no_padding(data, iv)?;
        let padding = *plain.last().ok_or(AesError::InvalidPadding)? as usize;
        if padding == 0 || padding > BLOCK_SIZE || padding > plain.len() {
            return Err(AesError::InvalidPadding);
        }
        let data_len = plain.len() - padding;
        if plain[data_len..].iter().any(|&b| b as usize != padding) {
            return Err(AesError::InvalidPadding);
        }
        plain.truncate(data_len);
        Ok(plain)
    }

    /// CBC encryption of whole blocks
    pub fn encrypt_cbc_no_padding(&self, data: &[u8], iv: &[u8]) -> Result<Vec<u8>, AesError> {
        check_iv(iv)?;
        if data.len() % BLOCK_SIZE != 0 {
            return Err(AesError::InvalidDataLength(data.len()));
        }
        let mut buffer = data.to_vec();
        let len = buffer.len();
        let result = match self.key.size {
            AesKeySize::Aes128 => cbc::Encryptor::<Aes128>::new_from_slices(&self.key.key, iv)
                .map_err(|_| self.key_length_error())?
                .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
                .map(|_| ()),
            AesKeySize::Aes256 => cbc::Encryptor::<Aes256>::new_from_slices(&self.key.key, iv)
                .map_err(|_| self.key_length_error())?
                .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
                .map(|_| ()),
        };
        result.map_err(|_| AesError::InvalidDataLength(len))?;
        Ok(buffer)
    }

    /// CBC decryption of whole blocks
    pub fn decrypt_cbc_no_padding(&self, data: &[u8], iv: &[u8]) -> Result<Vec<u8>, AesError> {
        check_iv(iv)?;
        if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
            return Err(AesError::InvalidDataLength(data.len()));
        }
        let mut buffer = data.to_vec();
        let result = match self.key.size {
            AesKeySize::Aes128 => cbc::Decryptor::<Aes128>::new_from_slices(&self.key.key, iv)
                .map_err(|_| self.key_length_error())?
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .map(|_| ()),
            AesKeySize::Aes256 => cbc::Decryptor::<Aes256>::new_from_slices(&self.key.key, iv)
                .map_err(|_| self.key_length_error())?
                .decrypt_padded_mut::<NoPadding>(&mut buffer)
                .map(|_| ()),
        };
        result.map_err(|_| AesError::InvalidDataLength(data.len()))?;
        Ok(buffer)
    }

    /// Encrypt a single block (ECB), as used for the `Perms` entry
    pub fn encrypt_block(&self, block: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE], AesError> {
        let mut buffer = GenericArray::clone_from_slice(block);
        match self.key.size {
            AesKeySize::Aes128 => Aes128::new_from_slice(&self.key.key)
                .map_err(|_| self.key_length_error())?
                .encrypt_block(&mut buffer),
            AesKeySize::Aes256 => Aes256::new_from_slice(&self.key.key)
                .map_err(|_| self.key_length_error())?
                .encrypt_block(&mut buffer),
        }
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(&buffer);
        Ok(out)
    }

    /// Decrypt a single block (ECB)
    pub fn decrypt_block(&self, block: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE], AesError> {
        let mut buffer = GenericArray::clone_from_slice(block);
        match self.key.size {
            AesKeySize::Aes128 => Aes128::new_from_slice(&self.key.key)
                .map_err(|_| self.key_length_error())?
                .decrypt_block(&mut buffer),
            AesKeySize::Aes256 => Aes256::new_from_slice(&self.key.key)
                .map_err(|_| self.key_length_error())?
                .decrypt_block(&mut buffer),
        }
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(&buffer);
        Ok(out)
    }

    fn key_length_error(&self) -> AesError {
        AesError::InvalidKeyLength {
            expected: self.key.size.key_length(),
            actual: self.key.key.len(),
        }
    }
}

fn check_iv(iv: &[u8]) -> Result<(), AesError> {
    if iv.len() != BLOCK_SIZE {
        return Err(AesError::InvalidIvLength(iv.len()));
    }
    Ok(())
}

/// Fresh random initialization vector
pub fn generate_iv() -> [u8; BLOCK_SIZE] {
    let mut iv = [0u8; BLOCK_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}
