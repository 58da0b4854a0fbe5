//! Standard Security Handler implementation according to ISO 32000-1 and
//! ISO 32000-2 (revisions 2 through 6)

use crate::encryption::aes::{Aes, AesKey, BLOCK_SIZE};
use crate::encryption::encryption_dict::{EncryptionAlgorithm, EncryptionDictionary};
use crate::encryption::rc4::rc4;
use crate::encryption::Permissions;
use crate::error::{PdfError, Result};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Padding used in password processing
pub const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Longest revision 5/6 password, in UTF-8 bytes
const MAX_UTF8_PASSWORD: usize = 127;

/// Salt length for revision 5/6 validation and key salts
const SALT_LEN: usize = 8;

/// File encryption key, wiped on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: Vec<u8>,
}

impl EncryptionKey {
    /// Create from bytes
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Get key length in bytes
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey({} bytes)", self.key.len())
    }
}

/// Security handler revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityHandlerRevision {
    /// Revision 2 (RC4 40-bit)
    R2 = 2,
    /// Revision 3 (RC4 up to 128-bit)
    R3 = 3,
    /// Revision 4 (crypt filters, metadata encryption control)
    R4 = 4,
    /// Revision 5 (AES-256, SHA-256 password validation)
    R5 = 5,
    /// Revision 6 (AES-256, hardened hash, Unicode passwords)
    R6 = 6,
}

impl SecurityHandlerRevision {
    pub fn from_number(r: u32) -> Option<Self> {
        match r {
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            5 => Some(Self::R5),
            6 => Some(Self::R6),
            _ => None,
        }
    }

    fn is_aes256(self) -> bool {
        self >= Self::R5
    }
}

/// Which password a candidate matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    /// Full access, permissions do not apply
    Owner,
    /// Access bound by the permission bitmask
    User,
    /// Neither password matched
    None,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::User => write!(f, "user"),
            Role::None => write!(f, "none"),
        }
    }
}

/// Standard Security Handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardSecurityHandler {
    /// Revision
    revision: SecurityHandlerRevision,
    /// Key length in bytes
    key_length: usize,
}

impl StandardSecurityHandler {
    /// Create handler for RC4 40-bit encryption
    pub fn rc4_40bit() -> Self {
        Self {
            revision: SecurityHandlerRevision::R2,
            key_length: 5,
        }
    }

    /// Create handler for RC4 128-bit encryption
    pub fn rc4_128bit() -> Self {
        Self {
            revision: SecurityHandlerRevision::R3,
            key_length: 16,
        }
    }

    /// Create handler for AES-128 encryption (Revision 4)
    pub fn aes_128() -> Self {
        Self {
            revision: SecurityHandlerRevision::R4,
            key_length: 16,
        }
    }

    /// Create handler for AES-256 encryption (Revision 6)
    pub fn aes_256() -> Self {
        Self {
            revision: SecurityHandlerRevision::R6,
            key_length: 32,
        }
    }

    /// Handler that writes `algorithm`
    pub fn for_algorithm(algorithm: EncryptionAlgorithm) -> Self {
        match algorithm {
            EncryptionAlgorithm::Rc4 { key_bits: 40 } => Self::rc4_40bit(),
            EncryptionAlgorithm::Rc4 { key_bits } => Self {
                revision: SecurityHandlerRevision::R3,
                key_length: (key_bits / 8) as usize,
            },
            EncryptionAlgorithm::Aes128 => Self::aes_128(),
            EncryptionAlgorithm::Aes256 => Self::aes_256(),
        }
    }

    /// Handler matching a decoded dictionary
    pub fn for_dictionary(dict: &EncryptionDictionary) -> Result<Self> {
        let revision = SecurityHandlerRevision::from_number(dict.r).ok_or_else(|| {
            PdfError::UnsupportedSecurityHandler(format!(
                "Standard security handler revision {}",
                dict.r
            ))
        })?;
        let key_length = if revision.is_aes256() {
            32
        } else {
            dict.key_length_bytes()
        };
        Ok(Self {
            revision,
            key_length,
        })
    }

    pub fn revision(&self) -> SecurityHandlerRevision {
        self.revision
    }

    /// Key length in bytes
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    fn algorithm(&self) -> EncryptionAlgorithm {
        match self.revision {
            SecurityHandlerRevision::R2 | SecurityHandlerRevision::R3 => EncryptionAlgorithm::Rc4 {
                key_bits: (self.key_length * 8) as u32,
            },
            SecurityHandlerRevision::R4 => EncryptionAlgorithm::Aes128,
            SecurityHandlerRevision::R5 | SecurityHandlerRevision::R6 => {
                EncryptionAlgorithm::Aes256
            }
        }
    }

    /// Password bytes as the revision hashes them
    pub fn prepare_password(&self, password: &str) -> Zeroizing<Vec<u8>> {
        if self.revision.is_aes256() {
            prepare_utf8_password(password)
        } else {
            encode_legacy_password(password)
        }
    }

    /// Build a complete encryption dictionary and the file key it implies.
    ///
    /// An absent or empty owner password is replaced by the user password.
    pub fn build_dictionary(
        &self,
        permissions: Permissions,
        user_password: &str,
        owner_password: Option<&str>,
        encrypt_metadata: bool,
        file_id: &[u8],
    ) -> Result<(EncryptionDictionary, EncryptionKey)> {
        let owner_password = owner_password
            .filter(|owner| !owner.is_empty())
            .unwrap_or(user_password);
        let mut dict =
            EncryptionDictionary::skeleton(self.algorithm(), permissions, encrypt_metadata);

        let key = if self.revision.is_aes256() {
            let mut key = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut key);
            let key = EncryptionKey::new(key);

            let (u, ue) = self.compute_user_entries_r6(user_password, &key)?;
            let (o, oe) = self.compute_owner_entries_r6(owner_password, &u, &key)?;
            dict.perms = Some(self.compute_perms(&key, dict.p, dict.encrypt_metadata)?);
            dict.u = u;
            dict.ue = Some(ue);
            dict.o = o;
            dict.oe = Some(oe);
            key
        } else {
            dict.o = self.compute_owner_hash(owner_password, user_password);
            let user = pad_password(&self.prepare_password(user_password));
            let key =
                self.compute_encryption_key(&user, &dict.o, dict.p, file_id, dict.encrypt_metadata);
            dict.u = self.compute_user_hash(&key, file_id);
            key
        };

        debug!(
            "Built {} encryption dictionary (V {}, R {})",
            self.algorithm(),
            dict.v,
            dict.r
        );
        Ok((dict, key))
    }

    /// Compute owner password hash (O entry), revisions 2 to 4 (Algorithm 3)
    pub fn compute_owner_hash(&self, owner_password: &str, user_password: &str) -> Vec<u8> {
        let owner_pad = pad_password(&self.prepare_password(owner_password));
        let user_pad = pad_password(&self.prepare_password(user_password));
        let rc4_key = self.owner_rc4_key(&owner_pad);
        self.rc4_rounds(&rc4_key, &user_pad[..], false)
    }

    /// Compute user password hash (U entry), revisions 2 to 4 (Algorithms 4, 5)
    pub fn compute_user_hash(&self, key: &EncryptionKey, file_id: &[u8]) -> Vec<u8> {
        if self.revision == SecurityHandlerRevision::R2 {
            return rc4(key.as_bytes(), &PADDING);
        }

        let mut input = Vec::with_capacity(PADDING.len() + file_id.len());
        input.extend_from_slice(&PADDING);
        input.extend_from_slice(file_id);
        let hash = md5::compute(&input).0;

        let mut result = self.rc4_rounds(key.as_bytes(), &hash, false);
        // Arbitrary filler up to 32 bytes; only the first 16 are compared
        result.resize(32, 0);
        result
    }

    /// Compute file encryption key from the padded password (Algorithm 2)
    pub fn compute_encryption_key(
        &self,
        padded_password: &[u8; 32],
        owner_hash: &[u8],
        p: i32,
        file_id: &[u8],
        encrypt_metadata: bool,
    ) -> EncryptionKey {
        let mut input = Zeroizing::new(Vec::with_capacity(32 + 32 + 4 + file_id.len() + 4));
        input.extend_from_slice(padded_password);
        input.extend_from_slice(&owner_hash[..owner_hash.len().min(32)]);
        input.extend_from_slice(&(p as u32).to_le_bytes());
        input.extend_from_slice(file_id);
        if self.revision >= SecurityHandlerRevision::R4 && !encrypt_metadata {
            input.extend_from_slice(&[0xFF; 4]);
        }

        let mut hash = md5::compute(&input[..]).0;
        if self.revision >= SecurityHandlerRevision::R3 {
            for _ in 0..50 {
                hash = md5::compute(&hash[..self.key_length]).0;
            }
        }

        let key = EncryptionKey::new(hash[..self.key_length].to_vec());
        hash.zeroize();
        key
    }

    /// Compute the encrypted permissions entry (Algorithm 10)
    pub fn compute_perms(
        &self,
        key: &EncryptionKey,
        p: i32,
        encrypt_metadata: bool,
    ) -> Result<Vec<u8>> {
        let mut block = [0u8; BLOCK_SIZE];
        block[..8].copy_from_slice(&i64::from(p).to_le_bytes());
        block[8] = if encrypt_metadata { b'T' } else { b'F' };
        block[9..12].copy_from_slice(b"adb");
        rand::thread_rng().fill_bytes(&mut block[12..]);

        let aes = Aes::new(AesKey::new_256(key.as_bytes())?);
        Ok(aes.encrypt_block(&block)?.to_vec())
    }

    /// Derive the file key for `password`.
    ///
    /// Revisions 2 to 4 treat the password as the user password
    /// (Algorithm 2) and never fail on a wrong password; the result simply
    /// does not decrypt the document. Revisions 5 and 6 validate the
    /// password first (Algorithm 2.A) and return `IncorrectPassword` when
    /// it matches neither hash.
    pub fn derive_key(
        &self,
        password: &str,
        dict: &EncryptionDictionary,
        file_id: &[u8],
    ) -> Result<EncryptionKey> {
        if self.revision.is_aes256() {
            return self
                .authenticate(password, dict, file_id)?
                .map(|(_, key)| key)
                .ok_or(PdfError::IncorrectPassword);
        }
        let padded = pad_password(&self.prepare_password(password));
        Ok(self.compute_encryption_key(&padded, &dict.o, dict.p, file_id, dict.encrypt_metadata))
    }

    /// Classify `password` against a decoded dictionary
    pub fn check_password(
        &self,
        password: &str,
        dict: &EncryptionDictionary,
        file_id: &[u8],
    ) -> Result<Role> {
        Ok(self
            .authenticate(password, dict, file_id)?
            .map_or(Role::None, |(role, _)| role))
    }

    /// Authenticate `password` and recover the file key.
    ///
    /// A password accepted as both owner and user password (as when the
    /// owner password defaulted to the user password) reports `Role::User`.
    pub fn authenticate(
        &self,
        password: &str,
        dict: &EncryptionDictionary,
        file_id: &[u8],
    ) -> Result<Option<(Role, EncryptionKey)>> {
        let prepared = self.prepare_password(password);
        let owner = if self.revision.is_aes256() {
            self.authenticate_owner_r6(&prepared, dict)?
        } else {
            self.authenticate_owner_legacy(&prepared, dict, file_id)
        };
        let user = if self.revision.is_aes256() {
            self.authenticate_user_r6(&prepared, dict)?
        } else {
            self.authenticate_user_legacy(&pad_password(&prepared), dict, file_id)
        };

        let result = match (user, owner) {
            (Some(key), _) => Some((Role::User, key)),
            (None, Some(key)) => Some((Role::Owner, key)),
            (None, None) => None,
        };

        if let Some((role, key)) = &result {
            debug!("Password accepted as {role} password");
            if self.revision.is_aes256() {
                self.verify_perms(key, dict)?;
            }
        }
        Ok(result)
    }

    /// Algorithm 6
    fn authenticate_user_legacy(
        &self,
        padded_password: &[u8; 32],
        dict: &EncryptionDictionary,
        file_id: &[u8],
    ) -> Option<EncryptionKey> {
        let key = self.compute_encryption_key(
            padded_password,
            &dict.o,
            dict.p,
            file_id,
            dict.encrypt_metadata,
        );
        let expected = self.compute_user_hash(&key, file_id);
        let compared = if self.revision == SecurityHandlerRevision::R2 {
            32
        } else {
            16
        };
        (dict.u.len() >= compared && expected[..compared] == dict.u[..compared]).then_some(key)
    }

    /// Algorithm 7: recover the padded user password from O, then check it
    fn authenticate_owner_legacy(
        &self,
        password: &[u8],
        dict: &EncryptionDictionary,
        file_id: &[u8],
    ) -> Option<EncryptionKey> {
        let rc4_key = self.owner_rc4_key(&pad_password(password));
        let recovered = Zeroizing::new(self.rc4_rounds(&rc4_key, &dict.o, true));
        if recovered.len() < 32 {
            return None;
        }
        let mut user_pad = [0u8; 32];
        user_pad.copy_from_slice(&recovered[..32]);
        let key = self.authenticate_user_legacy(&user_pad, dict, file_id);
        user_pad.zeroize();
        key
    }

    /// Algorithm 11
    fn authenticate_user_r6(
        &self,
        password: &[u8],
        dict: &EncryptionDictionary,
    ) -> Result<Option<EncryptionKey>> {
        let u = &dict.u;
        if u.len() < 48 {
            return Ok(None);
        }
        let hash = self.hash_r6(password, &u[32..40], &[])?;
        if hash[..] != u[..32] {
            return Ok(None);
        }
        let intermediate = self.hash_r6(password, &u[40..48], &[])?;
        let ue = dict.ue.as_deref().ok_or_else(|| {
            PdfError::MalformedDocument("Encrypt dictionary has no UE string".to_string())
        })?;
        unwrap_file_key(&intermediate, ue).map(Some)
    }

    /// Algorithm 12
    fn authenticate_owner_r6(
        &self,
        password: &[u8],
        dict: &EncryptionDictionary,
    ) -> Result<Option<EncryptionKey>> {
        let (o, u) = (&dict.o, &dict.u);
        if o.len() < 48 || u.len() < 48 {
            return Ok(None);
        }
        let hash = self.hash_r6(password, &o[32..40], &u[..48])?;
        if hash[..] != o[..32] {
            return Ok(None);
        }
        let intermediate = self.hash_r6(password, &o[40..48], &u[..48])?;
        let oe = dict.oe.as_deref().ok_or_else(|| {
            PdfError::MalformedDocument("Encrypt dictionary has no OE string".to_string())
        })?;
        unwrap_file_key(&intermediate, oe).map(Some)
    }

    /// Decrypt Perms and compare with P; a mismatch is logged, not fatal
    fn verify_perms(&self, key: &EncryptionKey, dict: &EncryptionDictionary) -> Result<()> {
        let Some(perms) = dict.perms.as_deref().filter(|p| p.len() >= BLOCK_SIZE) else {
            return Ok(());
        };
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&perms[..BLOCK_SIZE]);
        let aes = Aes::new(AesKey::new_256(key.as_bytes())?);
        let decrypted = aes.decrypt_block(&block)?;

        if &decrypted[9..12] != b"adb" {
            warn!("Perms entry does not decrypt to a valid permissions block");
            return Ok(());
        }
        if decrypted[..4] != (dict.p as u32).to_le_bytes() {
            warn!("Perms entry disagrees with P; using P");
        }
        let metadata_flag = if dict.encrypt_metadata { b'T' } else { b'F' };
        if decrypted[8] != metadata_flag {
            warn!("Perms entry disagrees with EncryptMetadata");
        }
        Ok(())
    }

    /// Algorithm 8: U and UE for revision 6
    fn compute_user_entries_r6(
        &self,
        user_password: &str,
        key: &EncryptionKey,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let password = self.prepare_password(user_password);
        let salts = random_salts();
        let (validation_salt, key_salt) = salts.split_at(SALT_LEN);

        let mut u = self.hash_r6(&password, validation_salt, &[])?.to_vec();
        u.extend_from_slice(&salts[..]);

        let intermediate = self.hash_r6(&password, key_salt, &[])?;
        let ue = wrap_file_key(&intermediate, key)?;
        Ok((u, ue))
    }

    /// Algorithm 9: O and OE for revision 6
    fn compute_owner_entries_r6(
        &self,
        owner_password: &str,
        u: &[u8],
        key: &EncryptionKey,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let password = self.prepare_password(owner_password);
        let salts = random_salts();
        let (validation_salt, key_salt) = salts.split_at(SALT_LEN);

        let mut o = self.hash_r6(&password, validation_salt, u)?.to_vec();
        o.extend_from_slice(&salts[..]);

        let intermediate = self.hash_r6(&password, key_salt, u)?;
        let oe = wrap_file_key(&intermediate, key)?;
        Ok((o, oe))
    }

    /// Password hash for revisions 5 (plain SHA-256) and 6 (Algorithm 2.B)
    fn hash_r6(&self, password: &[u8], salt: &[u8], udata: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        let mut k = Zeroizing::new(
            Sha256::new()
                .chain_update(password)
                .chain_update(salt)
                .chain_update(udata)
                .finalize()
                .to_vec(),
        );

        if self.revision == SecurityHandlerRevision::R6 {
            let mut k1 = Zeroizing::new(Vec::with_capacity(
                64 * (password.len() + 64 + udata.len()),
            ));
            for round in 1u32.. {
                k1.clear();
                for _ in 0..64 {
                    k1.extend_from_slice(password);
                    k1.extend_from_slice(&k);
                    k1.extend_from_slice(udata);
                }

                let aes = Aes::new(AesKey::new_128(&k[..16])?);
                let e = Zeroizing::new(aes.encrypt_cbc_no_padding(&k1, &k[16..32])?);

                // The first 16 bytes of E as a big-endian integer, mod 3
                let selector = e[..16].iter().map(|b| u32::from(*b)).sum::<u32>() % 3;
                *k = match selector {
                    0 => Sha256::digest(&e[..]).to_vec(),
                    1 => Sha384::digest(&e[..]).to_vec(),
                    _ => Sha512::digest(&e[..]).to_vec(),
                };

                let last = e.last().copied().map_or(0, u32::from);
                if round >= 64 && last <= round - 32 {
                    break;
                }
            }
        }

        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&k[..32]);
        Ok(out)
    }

    /// RC4 key derived from the padded owner password (Algorithm 3, a to d)
    fn owner_rc4_key(&self, owner_pad: &[u8; 32]) -> Zeroizing<Vec<u8>> {
        let mut hash = md5::compute(owner_pad).0;
        if self.revision >= SecurityHandlerRevision::R3 {
            for _ in 0..50 {
                hash = md5::compute(hash).0;
            }
        }
        let key = Zeroizing::new(hash[..self.key_length].to_vec());
        hash.zeroize();
        key
    }

    /// RC4 under `key`, plus the 19 XOR-keyed passes for revision 3+.
    ///
    /// With `reverse` the passes run from 19 down to 0, undoing the
    /// forward direction.
    fn rc4_rounds(&self, key: &[u8], data: &[u8], reverse: bool) -> Vec<u8> {
        if self.revision == SecurityHandlerRevision::R2 {
            return rc4(key, data);
        }

        let pass = |data: &[u8], i: u8| {
            let round_key: Zeroizing<Vec<u8>> =
                Zeroizing::new(key.iter().map(|b| b ^ i).collect());
            rc4(&round_key, data)
        };

        let mut result = data.to_vec();
        if reverse {
            for i in (0..=19u8).rev() {
                result = pass(&result, i);
            }
        } else {
            for i in 0..=19u8 {
                result = pass(&result, i);
            }
        }
        result
    }
}

/// Pad or truncate password bytes to 32 bytes
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

fn random_salts() -> Zeroizing<[u8; 2 * SALT_LEN]> {
    let mut salts = Zeroizing::new([0u8; 2 * SALT_LEN]);
    rand::thread_rng().fill_bytes(&mut salts[..]);
    salts
}

/// AES-256, no padding, zero IV: encrypt the file key into OE/UE
fn wrap_file_key(intermediate: &[u8; 32], key: &EncryptionKey) -> Result<Vec<u8>> {
    let aes = Aes::new(AesKey::new_256(intermediate)?);
    Ok(aes.encrypt_cbc_no_padding(key.as_bytes(), &[0u8; BLOCK_SIZE])?)
}

fn unwrap_file_key(intermediate: &[u8; 32], wrapped: &[u8]) -> Result<EncryptionKey> {
    let aes = Aes::new(AesKey::new_256(intermediate)?);
    Ok(EncryptionKey::new(
        aes.decrypt_cbc_no_padding(wrapped, &[0u8; BLOCK_SIZE])?,
    ))
}

/// SASLprep'd UTF-8, truncated to 127 bytes (revisions 5 and 6)
fn prepare_utf8_password(password: &str) -> Zeroizing<Vec<u8>> {
    let mut bytes = match stringprep::saslprep(password) {
        Ok(prepared) => prepared.as_bytes().to_vec(),
        Err(err) => {
            debug!("SASLprep rejected password ({err}); using it unnormalized");
            password.as_bytes().to_vec()
        }
    };
    bytes.truncate(MAX_UTF8_PASSWORD);
    Zeroizing::new(bytes)
}

/// PDFDocEncoding bytes (revisions 2 to 4); a password with characters
/// outside PDFDocEncoding is used as raw UTF-8
fn encode_legacy_password(password: &str) -> Zeroizing<Vec<u8>> {
    let encoded: Option<Vec<u8>> = password.chars().map(pdf_doc_byte).collect();
    Zeroizing::new(encoded.unwrap_or_else(|| password.as_bytes().to_vec()))
}

fn pdf_doc_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{2022}' => 0x80,
        '\u{2020}' => 0x81,
        '\u{2021}' => 0x82,
        '\u{2026}' => 0x83,
        '\u{2014}' => 0x84,
        '\u{2013}' => 0x85,
        '\u{0192}' => 0x86,
        '\u{2044}' => 0x87,
        '\u{2039}' => 0x88,
        '\u{203A}' => 0x89,
        '\u{2212}' => 0x8A,
        '\u{2030}' => 0x8B,
        '\u{201E}' => 0x8C,
        '\u{201C}' => 0x8D,
        '\u{201D}' => 0x8E,
        '\u{2018}' => 0x8F,
        '\u{2019}' => 0x90,
        '\u{201A}' => 0x91,
        '\u{2122}' => 0x92,
        '\u{FB01}' => 0x93,
        '\u{FB02}' => 0x94,
        '\u{0141}' => 0x95,
        '\u{0152}' => 0x96,
        '\u{0160}' => 0x97,
        '\u{0178}' => 0x98,
        '\u{017D}' => 0x99,
        '\u{0131}' => 0x9A,
        '\u{0142}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{0161}' => 0x9D,
        '\u{017E}' => 0x9E,
        '\u{20AC}' => 0xA0,
        c => return u8::try_from(u32::from(c)).ok(),
    };
    Some(byte)
}
