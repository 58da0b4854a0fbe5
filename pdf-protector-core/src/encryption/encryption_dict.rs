//! Standard Security Handler encryption dictionary
//!
//! Reading (`decode`/`from_dict`), validation of the V/R/Length
//! combinations and writing (`to_dict`) of the `Encrypt` dictionary
//! (ISO 32000-1 Tables 20, 21 and 25; ISO 32000-2 Table 21).

use crate::document::Document;
use crate::encryption::standard_security::{EncryptionKey, StandardSecurityHandler};
use crate::encryption::Permissions;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use std::fmt;

/// Name of the default crypt filter written for V4/V5 dictionaries
pub const STANDARD_CRYPT_FILTER: &str = "StdCF";

/// Cipher family and strength of a protected document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncryptionAlgorithm {
    /// RC4 with a 40 to 128 bit key (V1/V2, or V4 with `/CFM /V2`)
    Rc4 { key_bits: u32 },
    /// AES-128 in CBC mode (V4, `/CFM /AESV2`)
    Aes128,
    /// AES-256 in CBC mode (V5, `/CFM /AESV3`)
    Aes256,
}

impl EncryptionAlgorithm {
    /// Map a requested key length to the algorithm written for it.
    ///
    /// 40 selects RC4-40 (R2); 48 to 120 in steps of 8 select RC4 (R3);
    /// 128 selects AES-128 (R4) or RC4-128 (R3) when AES is not wanted;
    /// 256 selects AES-256 (R6).
    pub fn for_key_length(bits: u32, prefer_aes: bool) -> Result<Self> {
        match bits {
            128 if prefer_aes => Ok(Self::Aes128),
            256 => Ok(Self::Aes256),
            40..=128 if bits % 8 == 0 => Ok(Self::Rc4 { key_bits: bits }),
            _ => Err(PdfError::encryption_failed(format!(
                "key length {bits} is not supported (use 40 to 128 in steps of 8, or 256)"
            ))),
        }
    }

    pub fn key_bits(&self) -> u32 {
        match self {
            Self::Rc4 { key_bits } => *key_bits,
            Self::Aes128 => 128,
            Self::Aes256 => 256,
        }
    }

    /// `(V, R)` written for this algorithm
    pub fn version_and_revision(&self) -> (u32, u32) {
        match self {
            Self::Rc4 { key_bits: 40 } => (1, 2),
            Self::Rc4 { .. } => (2, 3),
            Self::Aes128 => (4, 4),
            Self::Aes256 => (5, 6),
        }
    }

    /// Lowest header version that can carry this algorithm
    pub fn minimum_pdf_version(&self) -> &'static str {
        match self {
            Self::Rc4 { key_bits: 40 } => "1.3",
            Self::Rc4 { .. } => "1.4",
            Self::Aes128 => "1.6",
            Self::Aes256 => "2.0",
        }
    }

    fn crypt_filter_method(&self) -> CryptFilterMethod {
        match self {
            Self::Rc4 { .. } => CryptFilterMethod::V2,
            Self::Aes128 => CryptFilterMethod::AESV2,
            Self::Aes256 => CryptFilterMethod::AESV3,
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rc4 { key_bits } => write!(f, "RC4-{key_bits}"),
            Self::Aes128 => write!(f, "AES-128"),
            Self::Aes256 => write!(f, "AES-256"),
        }
    }
}

/// Crypt filter method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptFilterMethod {
    /// No encryption (the Identity filter)
    None,
    /// RC4 encryption
    V2,
    /// AES-128 encryption
    AESV2,
    /// AES-256 encryption
    AESV3,
}

impl CryptFilterMethod {
    /// Get PDF name
    pub fn pdf_name(&self) -> &'static str {
        match self {
            CryptFilterMethod::None => "None",
            CryptFilterMethod::V2 => "V2",
            CryptFilterMethod::AESV2 => "AESV2",
            CryptFilterMethod::AESV3 => "AESV3",
        }
    }

    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(CryptFilterMethod::None),
            "V2" => Some(CryptFilterMethod::V2),
            "AESV2" => Some(CryptFilterMethod::AESV2),
            "AESV3" => Some(CryptFilterMethod::AESV3),
            _ => None,
        }
    }
}

/// Decoded `Encrypt` dictionary of the Standard Security Handler
#[derive(Clone, PartialEq)]
pub struct EncryptionDictionary {
    pub filter: String,
    pub sub_filter: Option<String>,
    /// Algorithm version `V`
    pub v: u32,
    /// Handler revision `R`
    pub r: u32,
    /// Key length in bits
    pub length: u32,
    pub o: Vec<u8>,
    pub u: Vec<u8>,
    pub oe: Option<Vec<u8>>,
    pub ue: Option<Vec<u8>>,
    pub perms: Option<Vec<u8>>,
    /// Raw `P` value
    pub p: i32,
    pub encrypt_metadata: bool,
    pub stream_filter: CryptFilterMethod,
    pub string_filter: CryptFilterMethod,
}

impl fmt::Debug for EncryptionDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Password hashes are left out of debug output
        f.debug_struct("EncryptionDictionary")
            .field("filter", &self.filter)
            .field("v", &self.v)
            .field("r", &self.r)
            .field("length", &self.length)
            .field("p", &self.p)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .field("stream_filter", &self.stream_filter)
            .field("string_filter", &self.string_filter)
            .finish_non_exhaustive()
    }
}

impl EncryptionDictionary {
    /// Read the document's encryption dictionary; `None` when the trailer
    /// has no `Encrypt` entry.
    pub fn decode(document: &Document) -> Result<Option<Self>> {
        let entry = match document.trailer.get("Encrypt") {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let dict = match document.resolve(entry) {
            Object::Dictionary(dict) => dict,
            other => {
                return Err(PdfError::MalformedDocument(format!(
                    "Encrypt entry is a {}, expected a dictionary",
                    other.type_name()
                )))
            }
        };
        Self::from_dict(&resolve_entries(document, dict)).map(Some)
    }

    /// Decode and validate a dictionary whose entries are direct objects
    pub fn from_dict(dict: &Dictionary) -> Result<Self> {
        let filter = dict
            .get_name("Filter")
            .ok_or_else(|| malformed("Encrypt dictionary has no Filter name"))?;
        if filter != "Standard" {
            return Err(PdfError::UnsupportedSecurityHandler(format!(
                "security handler /{filter}"
            )));
        }
        let sub_filter = dict.get_name("SubFilter").map(str::to_string);

        let v = match dict.get("V") {
            None => 0,
            Some(Object::Integer(v)) => *v,
            Some(other) => {
                return Err(malformed(format!("V must be an integer, found {}", other.type_name())))
            }
        };
        if !matches!(v, 1 | 2 | 4 | 5) {
            return Err(PdfError::UnsupportedSecurityHandler(format!(
                "encryption algorithm V {v}"
            )));
        }
        let v = v as u32;

        let r = dict
            .get_integer("R")
            .ok_or_else(|| malformed("Encrypt dictionary has no integer R"))?;
        if !(2..=6).contains(&r) {
            return Err(PdfError::UnsupportedSecurityHandler(format!(
                "Standard security handler revision {r}"
            )));
        }
        let r = r as u32;

        let length = match dict.get("Length") {
            None => None,
            Some(Object::Integer(n)) if *n > 0 => Some(
                u32::try_from(*n).map_err(|_| malformed(format!("Length {n} out of range")))?,
            ),
            Some(other) => {
                return Err(malformed(format!(
                    "Length must be a positive integer, found {}",
                    other.type_name()
                )))
            }
        };

        let p = dict
            .get_integer("P")
            .ok_or_else(|| malformed("Encrypt dictionary has no integer P"))?;
        // P is a 32-bit field; some writers store it unsigned
        let p = p as u32 as i32;

        let encrypt_metadata = match dict.get("EncryptMetadata") {
            None => true,
            Some(Object::Boolean(b)) => *b,
            Some(other) => {
                return Err(malformed(format!(
                    "EncryptMetadata must be a boolean, found {}",
                    other.type_name()
                )))
            }
        };

        let (length, stream_filter, string_filter) = match v {
            1 => {
                if length.is_some_and(|n| n != 40) {
                    return Err(malformed("V 1 requires a 40-bit key"));
                }
                if !matches!(r, 2 | 3) {
                    return Err(malformed(format!("V 1 cannot be used with R {r}")));
                }
                (40, CryptFilterMethod::V2, CryptFilterMethod::V2)
            }
            2 => {
                let length = length.unwrap_or(40);
                if !(40..=128).contains(&length) || length % 8 != 0 {
                    return Err(malformed(format!(
                        "V 2 key length must be 40 to 128 bits in steps of 8, found {length}"
                    )));
                }
                match r {
                    2 if length != 40 => {
                        return Err(malformed("R 2 only supports 40-bit keys"));
                    }
                    2 | 3 => {}
                    _ => return Err(malformed(format!("V 2 cannot be used with R {r}"))),
                }
                (length, CryptFilterMethod::V2, CryptFilterMethod::V2)
            }
            4 => {
                if r != 4 {
                    return Err(malformed(format!("V 4 requires R 4, found R {r}")));
                }
                if length.is_some_and(|n| n != 128) {
                    return Err(malformed("V 4 requires a 128-bit key"));
                }
                let stream = crypt_filter_for(dict, "StmF")?;
                let string = crypt_filter_for(dict, "StrF")?;
                for method in [stream, string] {
                    if method == CryptFilterMethod::AESV3 {
                        return Err(malformed("AESV3 crypt filters require V 5"));
                    }
                }
                (128, stream, string)
            }
            _ => {
                if !matches!(r, 5 | 6) {
                    return Err(malformed(format!("V 5 requires R 5 or 6, found R {r}")));
                }
                if length.is_some_and(|n| n != 256) {
                    return Err(malformed("V 5 requires a 256-bit key"));
                }
                let stream = crypt_filter_for(dict, "StmF")?;
                let string = crypt_filter_for(dict, "StrF")?;
                for method in [stream, string] {
                    if !matches!(method, CryptFilterMethod::AESV3 | CryptFilterMethod::None) {
                        return Err(malformed(format!(
                            "V 5 requires AESV3 crypt filters, found {}",
                            method.pdf_name()
                        )));
                    }
                }
                (256, stream, string)
            }
        };

        let hash_len = if r <= 4 { 32 } else { 48 };
        let o = password_entry(dict, "O", hash_len)?;
        let u = password_entry(dict, "U", hash_len)?;

        let (oe, ue, perms) = if r >= 5 {
            (
                Some(exact_entry(dict, "OE", 32)?),
                Some(exact_entry(dict, "UE", 32)?),
                match dict.get_string("Perms") {
                    Some(perms) if perms.len() >= 16 => Some(perms[..16].to_vec()),
                    Some(_) => return Err(malformed("Perms must be 16 bytes")),
                    None if r == 6 => return Err(malformed("R 6 requires a Perms entry")),
                    None => None,
                },
            )
        } else {
            (None, None, None)
        };

        Ok(Self {
            filter: filter.to_string(),
            sub_filter,
            v,
            r,
            length,
            o,
            u,
            oe,
            ue,
            perms,
            p,
            encrypt_metadata,
            stream_filter,
            string_filter,
        })
    }

    /// Build a fully populated dictionary for a new protection.
    ///
    /// The owner password falls back to the user password when absent or
    /// empty. Returns the file key the document must be encrypted with.
    pub fn encode(
        permissions: Permissions,
        user_password: &str,
        owner_password: Option<&str>,
        algorithm: EncryptionAlgorithm,
        encrypt_metadata: bool,
        file_id: &[u8],
    ) -> Result<(Self, EncryptionKey)> {
        StandardSecurityHandler::for_algorithm(algorithm).build_dictionary(
            permissions,
            user_password,
            owner_password,
            encrypt_metadata,
            file_id,
        )
    }

    /// Dictionary skeleton for `algorithm`; hash entries are left empty
    pub(crate) fn skeleton(
        algorithm: EncryptionAlgorithm,
        permissions: Permissions,
        encrypt_metadata: bool,
    ) -> Self {
        let (v, r) = algorithm.version_and_revision();
        let method = algorithm.crypt_filter_method();
        Self {
            filter: "Standard".to_string(),
            sub_filter: None,
            v,
            r,
            length: algorithm.key_bits(),
            o: Vec::new(),
            u: Vec::new(),
            oe: None,
            ue: None,
            perms: None,
            p: permissions.to_p_value(),
            // Only V4 and later can leave metadata in the clear
            encrypt_metadata: encrypt_metadata || v < 4,
            stream_filter: method,
            string_filter: method,
        }
    }

    /// User access permissions from `P`
    pub fn permissions(&self) -> Permissions {
        Permissions::from_p_value(i64::from(self.p))
    }

    /// File key length in bytes
    pub fn key_length_bytes(&self) -> usize {
        (self.length / 8) as usize
    }

    /// Algorithm protecting the document's streams
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        let method = match self.stream_filter {
            CryptFilterMethod::None => self.string_filter,
            method => method,
        };
        match method {
            CryptFilterMethod::AESV2 => EncryptionAlgorithm::Aes128,
            CryptFilterMethod::AESV3 => EncryptionAlgorithm::Aes256,
            CryptFilterMethod::V2 | CryptFilterMethod::None if self.v >= 5 => {
                EncryptionAlgorithm::Aes256
            }
            CryptFilterMethod::V2 | CryptFilterMethod::None => EncryptionAlgorithm::Rc4 {
                key_bits: self.length,
            },
        }
    }

    /// Write the PDF dictionary
    pub fn to_dict(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(self.filter.clone()));
        if let Some(sub_filter) = &self.sub_filter {
            dict.set("SubFilter", Object::Name(sub_filter.clone()));
        }
        dict.set("V", i64::from(self.v));
        dict.set("R", i64::from(self.r));
        dict.set("Length", i64::from(self.length));
        dict.set("O", self.o.clone());
        dict.set("U", self.u.clone());
        dict.set("P", i64::from(self.p));

        if self.v >= 4 {
            let mut crypt_filters = Dictionary::new();
            crypt_filters.set(STANDARD_CRYPT_FILTER, self.crypt_filter_dict());
            dict.set("CF", crypt_filters);
            dict.set("StmF", Object::Name(filter_name(self.stream_filter).to_string()));
            dict.set("StrF", Object::Name(filter_name(self.string_filter).to_string()));
            dict.set("EncryptMetadata", self.encrypt_metadata);
        }

        if let Some(oe) = &self.oe {
            dict.set("OE", oe.clone());
        }
        if let Some(ue) = &self.ue {
            dict.set("UE", ue.clone());
        }
        if let Some(perms) = &self.perms {
            dict.set("Perms", perms.clone());
        }
        dict
    }

    fn crypt_filter_dict(&self) -> Dictionary {
        let method = match self.stream_filter {
            CryptFilterMethod::None => self.string_filter,
            method => method,
        };
        let mut filter = Dictionary::new();
        filter.set("Type", Object::Name("CryptFilter".to_string()));
        filter.set("CFM", Object::Name(method.pdf_name().to_string()));
        filter.set("AuthEvent", Object::Name("DocOpen".to_string()));
        // Crypt filter lengths are in bytes
        filter.set("Length", (self.length / 8) as i64);
        filter
    }
}

fn filter_name(method: CryptFilterMethod) -> &'static str {
    match method {
        CryptFilterMethod::None => "Identity",
        _ => STANDARD_CRYPT_FILTER,
    }
}

fn malformed(message: impl Into<String>) -> PdfError {
    PdfError::MalformedDocument(message.into())
}

/// Method of the crypt filter named by `StmF`/`StrF`
fn crypt_filter_for(dict: &Dictionary, key: &str) -> Result<CryptFilterMethod> {
    let name = match dict.get(key) {
        None => return Ok(CryptFilterMethod::None),
        Some(Object::Name(name)) => name.as_str(),
        Some(other) => {
            return Err(malformed(format!(
                "{key} must be a name, found {}",
                other.type_name()
            )))
        }
    };
    if name == "Identity" {
        return Ok(CryptFilterMethod::None);
    }

    let filter = dict
        .get_dict("CF")
        .and_then(|cf| cf.get_dict(name))
        .ok_or_else(|| malformed(format!("{key} names crypt filter /{name} which is not in CF")))?;

    match filter.get_name("CFM") {
        None => Ok(CryptFilterMethod::None),
        Some(cfm) => CryptFilterMethod::from_pdf_name(cfm).ok_or_else(|| {
            PdfError::UnsupportedSecurityHandler(format!("crypt filter method /{cfm}"))
        }),
    }
}

/// `O`/`U`: at least `len` bytes; trailing extra bytes are ignored
fn password_entry(dict: &Dictionary, key: &str, len: usize) -> Result<Vec<u8>> {
    match dict.get_string(key) {
        Some(bytes) if bytes.len() >= len => Ok(bytes[..len].to_vec()),
        Some(bytes) => Err(malformed(format!(
            "{key} must be at least {len} bytes, found {}",
            bytes.len()
        ))),
        None => Err(malformed(format!("Encrypt dictionary has no {key} string"))),
    }
}

fn exact_entry(dict: &Dictionary, key: &str, len: usize) -> Result<Vec<u8>> {
    match dict.get_string(key) {
        Some(bytes) if bytes.len() == len => Ok(bytes.to_vec()),
        Some(bytes) => Err(malformed(format!(
            "{key} must be {len} bytes, found {}",
            bytes.len()
        ))),
        None => Err(malformed(format!("Encrypt dictionary has no {key} string"))),
    }
}

/// Copy of `dict` with indirect entries (and the `CF` sub-dictionaries)
/// resolved
fn resolve_entries(document: &Document, dict: &Dictionary) -> Dictionary {
    dict.iter()
        .map(|(key, value)| {
            let resolved = match document.resolve(value) {
                Object::Dictionary(inner) => Object::Dictionary(resolve_entries(document, inner)),
                other => other.clone(),
            };
            (key.clone(), resolved)
        })
        .collect()
}
