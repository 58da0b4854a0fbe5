//! PDF encryption support according to ISO 32000-1 Section 7.6 and
//! ISO 32000-2 Section 7.6
//!
//! The Standard Security Handler, revisions 2 to 6: RC4 40 to 128-bit,
//! AES-128 and AES-256.

mod aes;
mod encryption_dict;
mod object_encryption;
mod permissions;
mod rc4;
mod standard_security;

pub use aes::{generate_iv, Aes, AesError, AesKey, AesKeySize};
pub use encryption_dict::{
    CryptFilterMethod, EncryptionAlgorithm, EncryptionDictionary, STANDARD_CRYPT_FILTER,
};
pub use object_encryption::{object_key, transform, CipherDirection, ObjectEncryptor};
pub use permissions::{PermissionFlags, Permissions};
pub use rc4::{rc4, Rc4};
pub use standard_security::{
    pad_password, EncryptionKey, Role, SecurityHandlerRevision, StandardSecurityHandler, PADDING,
};
