//! Top-level operations over in-memory PDF bytes
//!
//! [`Protector`] binds the operations to a [`ParseOptions`]
//! configuration; the free functions use the strict defaults.

use crate::detector::{self, ProtectionInfo};
use crate::document::Document;
use crate::encryption::{
    EncryptionAlgorithm, EncryptionDictionary, ObjectEncryptor, Permissions, Role,
    StandardSecurityHandler,
};
use crate::error::{PdfError, Result};
use crate::objects::Object;
use crate::parser::{ParseOptions, PdfReader};
use crate::writer;
use rand::RngCore;
use std::fmt;
use tracing::{debug, info};

/// Settings for [`protect`]
#[derive(Clone, PartialEq, Eq)]
pub struct ProtectOptions {
    /// Falls back to the user password when absent or empty
    pub owner_password: Option<String>,
    pub permissions: Permissions,
    /// 40 to 128 in steps of 8, or 256
    pub key_length: u32,
    /// Use AES rather than RC4 for 128-bit keys
    pub prefer_aes: bool,
    /// Encrypt XMP metadata streams (AES only; RC4 always encrypts them)
    pub encrypt_metadata: bool,
}

impl Default for ProtectOptions {
    fn default() -> Self {
        Self {
            owner_password: None,
            permissions: Permissions::default_policy(),
            key_length: 128,
            prefer_aes: true,
            encrypt_metadata: true,
        }
    }
}

impl fmt::Debug for ProtectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectOptions")
            .field("owner_password", &self.owner_password.as_ref().map(|_| "<redacted>"))
            .field("permissions", &self.permissions)
            .field("key_length", &self.key_length)
            .field("prefer_aes", &self.prefer_aes)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .finish()
    }
}

impl ProtectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner_password(mut self, password: impl Into<String>) -> Self {
        self.owner_password = Some(password.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_key_length(mut self, bits: u32) -> Self {
        self.key_length = bits;
        self
    }

    pub fn with_prefer_aes(mut self, prefer_aes: bool) -> Self {
        self.prefer_aes = prefer_aes;
        self
    }

    pub fn with_encrypt_metadata(mut self, encrypt_metadata: bool) -> Self {
        self.encrypt_metadata = encrypt_metadata;
        self
    }

    pub fn algorithm(&self) -> Result<EncryptionAlgorithm> {
        EncryptionAlgorithm::for_key_length(self.key_length, self.prefer_aes)
    }
}

/// PDF protection operations bound to a parser configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Protector {
    options: ParseOptions,
}

impl Protector {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Encrypt an unprotected document.
    ///
    /// Every failure, including unreadable or already-encrypted input, is
    /// reported as `EncryptionFailed` (size-limit errors excepted).
    pub fn protect(
        &self,
        input: &[u8],
        user_password: &str,
        options: &ProtectOptions,
    ) -> Result<Vec<u8>> {
        let algorithm = options.algorithm()?;
        let mut document = self
            .read_document(input)
            .map_err(|e| e.into_encryption_failure("cannot read input document"))?;

        if document.is_encrypted() {
            return Err(PdfError::encryption_failed("document is already encrypted"));
        }

        let file_id = new_file_id();
        let (dict, key) = EncryptionDictionary::encode(
            options.permissions,
            user_password,
            options.owner_password.as_deref(),
            algorithm,
            options.encrypt_metadata,
            &file_id,
        )?;

        ObjectEncryptor::new(key, &dict, None)
            .encrypt_document(&mut document)
            .map_err(|e| e.into_encryption_failure("cannot encrypt objects"))?;

        let encrypt_id = document.add_object(dict.to_dict());
        document.trailer.set("Encrypt", encrypt_id);
        document.trailer.set(
            "ID",
            vec![Object::String(file_id.to_vec()), Object::String(file_id.to_vec())],
        );
        raise_version(&mut document, algorithm.minimum_pdf_version());

        let output = writer::write_to_vec(&document)
            .map_err(|e| e.into_encryption_failure("cannot write output document"))?;
        info!(
            "Protected document with {} ({} objects, {} bytes)",
            algorithm,
            document.objects.len(),
            output.len()
        );
        Ok(output)
    }

    /// Structural check for an `Encrypt` trailer entry; needs no password
    pub fn is_protected(&self, input: &[u8]) -> Result<bool> {
        let trailer = PdfReader::new(input, self.options)?.read_trailer()?;
        Ok(detector::trailer_declares_encryption(&trailer))
    }

    /// Which password `candidate` is. Unprotected documents report
    /// `Role::Owner`; a wrong password is `Role::None`, not an error.
    pub fn check_password(&self, input: &[u8], candidate: &str) -> Result<Role> {
        let document = self.read_document(input)?;
        let Some(dict) = EncryptionDictionary::decode(&document)? else {
            return Ok(Role::Owner);
        };
        let handler = StandardSecurityHandler::for_dictionary(&dict)?;
        let role = handler.check_password(candidate, &dict, document.file_id().unwrap_or_default())?;
        debug!("Candidate password role: {role}");
        Ok(role)
    }

    /// Decrypt with the owner or user password and rewrite without
    /// encryption. Unprotected input is returned unchanged.
    pub fn unprotect(&self, input: &[u8], password: &str) -> Result<Vec<u8>> {
        let mut document = self.read_document(input)?;
        let Some(dict) = EncryptionDictionary::decode(&document)? else {
            debug!("Document is not protected; nothing to remove");
            return Ok(input.to_vec());
        };

        let handler = StandardSecurityHandler::for_dictionary(&dict)?;
        let file_id = document.file_id().unwrap_or_default().to_vec();
        let (role, key) = handler
            .authenticate(password, &dict, &file_id)?
            .ok_or(PdfError::IncorrectPassword)?;

        let encrypt_id = document.encryption_dictionary_id();
        ObjectEncryptor::new(key, &dict, encrypt_id).decrypt_document(&mut document)?;

        if let Some(id) = encrypt_id {
            document.objects.remove(&id);
        }
        document.trailer.remove("Encrypt");
        document.expand_object_streams(&self.options)?;

        let output = writer::write_to_vec(&document)?;
        info!(
            "Removed {} protection using the {role} password",
            dict.algorithm()
        );
        Ok(output)
    }

    /// Encryption settings of a protected document
    pub fn inspect(&self, input: &[u8]) -> Result<Option<ProtectionInfo>> {
        let document = self.read_document(input)?;
        detector::inspect(&document)
    }

    fn read_document(&self, input: &[u8]) -> Result<Document> {
        let reader = PdfReader::new(input, self.options)?;
        Ok(reader.read_document()?)
    }
}

/// Protect `input` with the strict parser defaults
pub fn protect(input: &[u8], user_password: &str, options: &ProtectOptions) -> Result<Vec<u8>> {
    Protector::default().protect(input, user_password, options)
}

pub fn is_protected(input: &[u8]) -> Result<bool> {
    Protector::default().is_protected(input)
}

pub fn check_password(input: &[u8], candidate: &str) -> Result<Role> {
    Protector::default().check_password(input, candidate)
}

pub fn unprotect(input: &[u8], password: &str) -> Result<Vec<u8>> {
    Protector::default().unprotect(input, password)
}

pub fn inspect(input: &[u8]) -> Result<Option<ProtectionInfo>> {
    Protector::default().inspect(input)
}

fn new_file_id() -> [u8; 16] {
    let mut id = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut id);
    id
}

/// Raise the header version to at least `minimum`
fn raise_version(document: &mut Document, minimum: &str) {
    let parse = |v: &str| -> (u32, u32) {
        let mut parts = v.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
    };
    if parse(&document.version) < parse(minimum) {
        debug!("Raising header version {} to {}", document.version, minimum);
        document.version = minimum.to_string();
    }
}
