//! Protection detection
//!
//! A document is protected exactly when its effective trailer carries an
//! `Encrypt` entry. No password or key derivation is involved.

use crate::document::Document;
use crate::encryption::{EncryptionAlgorithm, EncryptionDictionary, PermissionFlags, Permissions};
use crate::error::Result;
use crate::objects::Dictionary;

/// Summary of a protected document's encryption settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtectionInfo {
    pub algorithm: EncryptionAlgorithm,
    /// Algorithm version `V`
    pub version: u32,
    /// Security handler revision `R`
    pub revision: u32,
    /// Key length in bits
    pub key_length: u32,
    pub permissions: PermissionFlags,
    pub encrypt_metadata: bool,
}

impl ProtectionInfo {
    pub fn from_dictionary(dict: &EncryptionDictionary) -> Self {
        Self {
            algorithm: dict.algorithm(),
            version: dict.v,
            revision: dict.r,
            key_length: dict.length,
            permissions: dict.permissions().flags(),
            encrypt_metadata: dict.encrypt_metadata,
        }
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::from_flags(self.permissions)
    }
}

/// Whether a trailer dictionary declares encryption
pub fn trailer_declares_encryption(trailer: &Dictionary) -> bool {
    trailer.contains_key("Encrypt")
}

pub fn is_protected(document: &Document) -> bool {
    trailer_declares_encryption(&document.trailer)
}

/// Decode the encryption settings; `None` for an unprotected document
pub fn inspect(document: &Document) -> Result<Option<ProtectionInfo>> {
    Ok(EncryptionDictionary::decode(document)?
        .as_ref()
        .map(ProtectionInfo::from_dictionary))
}
