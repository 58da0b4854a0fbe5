//! Object encryption/decryption for PDF documents
//!
//! Per-object keys (ISO 32000-1 Algorithm 1, ISO 32000-2 Algorithm 1.A)
//! and the walk that applies them to every string and stream of a
//! [`Document`].

use crate::document::Document;
use crate::encryption::aes::{generate_iv, Aes, AesKey, BLOCK_SIZE};
use crate::encryption::encryption_dict::{CryptFilterMethod, EncryptionDictionary};
use crate::encryption::rc4::rc4;
use crate::encryption::standard_security::EncryptionKey;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use tracing::debug;
use zeroize::Zeroizing;

/// Whether [`transform`] encrypts or decrypts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherDirection {
    Encrypt,
    Decrypt,
}

/// Key for one object.
///
/// RC4 and AES-128 hash the file key with the low three bytes of the
/// object number and low two bytes of the generation (plus `sAlT` for
/// AES), truncated to `min(n + 5, 16)` bytes. AES-256 uses the file key
/// as is.
pub fn object_key(
    file_key: &EncryptionKey,
    id: ObjectId,
    method: CryptFilterMethod,
) -> Zeroizing<Vec<u8>> {
    if method == CryptFilterMethod::AESV3 {
        return Zeroizing::new(file_key.as_bytes().to_vec());
    }

    let mut input = Zeroizing::new(Vec::with_capacity(file_key.len() + 9));
    input.extend_from_slice(file_key.as_bytes());
    input.extend_from_slice(&id.number().to_le_bytes()[..3]);
    input.extend_from_slice(&id.generation().to_le_bytes());
    if method == CryptFilterMethod::AESV2 {
        input.extend_from_slice(b"sAlT");
    }

    let hash = md5::compute(&input[..]).0;
    let len = (file_key.len() + 5).min(16);
    Zeroizing::new(hash[..len].to_vec())
}

/// Encrypt or decrypt the bytes of one string or stream.
///
/// AES output is a random 16-byte IV followed by PKCS#7 padded
/// ciphertext. An empty AES input decrypts to an empty result.
pub fn transform(
    id: ObjectId,
    file_key: &EncryptionKey,
    method: CryptFilterMethod,
    direction: CipherDirection,
    data: &[u8],
) -> Result<Vec<u8>> {
    match method {
        CryptFilterMethod::None => Ok(data.to_vec()),
        CryptFilterMethod::V2 => Ok(rc4(&object_key(file_key, id, method), data)),
        CryptFilterMethod::AESV2 | CryptFilterMethod::AESV3 => {
            let key = object_key(file_key, id, method);
            let aes_key = if method == CryptFilterMethod::AESV2 {
                AesKey::new_128(&key)?
            } else {
                AesKey::new_256(&key)?
            };
            let aes = Aes::new(aes_key);

            match direction {
                CipherDirection::Encrypt => {
                    let iv = generate_iv();
                    let mut out = Vec::with_capacity(BLOCK_SIZE + data.len() + BLOCK_SIZE);
                    out.extend_from_slice(&iv);
                    out.extend_from_slice(&aes.encrypt_cbc(data, &iv)?);
                    Ok(out)
                }
                CipherDirection::Decrypt => {
                    if data.is_empty() {
                        return Ok(Vec::new());
                    }
                    if data.len() < BLOCK_SIZE {
                        return Err(PdfError::MalformedDocument(format!(
                            "encrypted data of object {id} is shorter than an AES block"
                        )));
                    }
                    let (iv, ciphertext) = data.split_at(BLOCK_SIZE);
                    if ciphertext.is_empty() {
                        return Ok(Vec::new());
                    }
                    aes.decrypt_cbc(ciphertext, iv).map_err(|err| {
                        PdfError::MalformedDocument(format!(
                            "cannot decrypt object {id}: {err}"
                        ))
                    })
                }
            }
        }
    }
}

/// Applies a file key to every string and stream of a document
pub struct ObjectEncryptor {
    key: EncryptionKey,
    stream_method: CryptFilterMethod,
    string_method: CryptFilterMethod,
    encrypt_metadata: bool,
    /// The encryption dictionary itself is never encrypted
    encryption_dict_id: Option<ObjectId>,
}

#[derive(Debug, Default)]
struct WalkStats {
    strings: usize,
    streams: usize,
    skipped_streams: usize,
}

impl ObjectEncryptor {
    pub fn new(
        key: EncryptionKey,
        dict: &EncryptionDictionary,
        encryption_dict_id: Option<ObjectId>,
    ) -> Self {
        Self {
            key,
            stream_method: dict.stream_filter,
            string_method: dict.string_filter,
            encrypt_metadata: dict.encrypt_metadata,
            encryption_dict_id,
        }
    }

    pub fn encrypt_document(&self, document: &mut Document) -> Result<()> {
        self.apply(document, CipherDirection::Encrypt)
    }

    pub fn decrypt_document(&self, document: &mut Document) -> Result<()> {
        self.apply(document, CipherDirection::Decrypt)
    }

    /// Encrypt or decrypt a single object in place
    pub fn transform_object(
        &self,
        id: ObjectId,
        object: &mut Object,
        direction: CipherDirection,
    ) -> Result<()> {
        let mut stats = WalkStats::default();
        self.walk(id, object, direction, &mut stats)
    }

    fn apply(&self, document: &mut Document, direction: CipherDirection) -> Result<()> {
        let mut stats = WalkStats::default();
        for (id, object) in document.objects.iter_mut() {
            if Some(*id) == self.encryption_dict_id {
                continue;
            }
            self.walk(*id, object, direction, &mut stats)?;
        }
        debug!(
            "{:?}ed {} strings and {} streams ({} streams left in the clear)",
            direction, stats.strings, stats.streams, stats.skipped_streams
        );
        Ok(())
    }

    fn walk(
        &self,
        id: ObjectId,
        object: &mut Object,
        direction: CipherDirection,
        stats: &mut WalkStats,
    ) -> Result<()> {
        match object {
            Object::String(bytes) => {
                *bytes = transform(id, &self.key, self.string_method, direction, bytes)?;
                stats.strings += 1;
            }
            Object::Array(items) => {
                for item in items {
                    self.walk(id, item, direction, stats)?;
                }
            }
            Object::Dictionary(dict) => self.walk_dictionary(id, dict, direction, stats)?,
            Object::Stream(stream) => {
                if self.leaves_stream_in_clear(stream) {
                    stats.skipped_streams += 1;
                } else {
                    let data =
                        transform(id, &self.key, self.stream_method, direction, stream.data())?;
                    stream.set_data(data);
                    stats.streams += 1;
                }
                self.walk_dictionary(id, stream.dictionary_mut(), direction, stats)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn walk_dictionary(
        &self,
        id: ObjectId,
        dict: &mut Dictionary,
        direction: CipherDirection,
        stats: &mut WalkStats,
    ) -> Result<()> {
        // Signature values are excluded so the signed byte ranges stay valid
        let is_signature = dict.get_type() == Some("Sig") || dict.contains_key("ByteRange");
        for (key, value) in dict.iter_mut() {
            if is_signature && key == "Contents" {
                continue;
            }
            self.walk(id, value, direction, stats)?;
        }
        Ok(())
    }

    fn leaves_stream_in_clear(&self, stream: &Stream) -> bool {
        if stream.is_type("XRef") {
            return true;
        }
        if !self.encrypt_metadata && stream.is_type("Metadata") {
            return true;
        }
        stream.filters().first() == Some(&"Crypt") && uses_identity_crypt_filter(stream)
    }
}

/// `/Filter /Crypt` whose parameters name the Identity filter (the default)
fn uses_identity_crypt_filter(stream: &Stream) -> bool {
    let dict = stream.dictionary();
    let params = dict.get("DecodeParms").or_else(|| dict.get("DP"));
    let params = match params {
        Some(Object::Array(items)) => items.first(),
        other => other,
    };
    match params.and_then(Object::as_dict).and_then(|p| p.get_name("Name")) {
        None | Some("Identity") => true,
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::encryption_dict::EncryptionAlgorithm;
    use crate::encryption::Permissions;
    use pretty_assertions::assert_eq;

    fn key(len: usize) -> EncryptionKey {
        EncryptionKey::new((1..=len as u8).collect())
    }

    fn dictionary(algorithm: EncryptionAlgorithm, encrypt_metadata: bool) -> EncryptionDictionary {
        EncryptionDictionary::skeleton(algorithm, Permissions::default_policy(), encrypt_metadata)
    }

    #[test]
    fn test_object_key_lengths() {
        let id = ObjectId::new(12, 0);
        assert_eq!(object_key(&key(5), id, CryptFilterMethod::V2).len(), 10);
        assert_eq!(object_key(&key(16), id, CryptFilterMethod::V2).len(), 16);
        assert_eq!(object_key(&key(16), id, CryptFilterMethod::AESV2).len(), 16);
        assert_eq!(object_key(&key(32), id, CryptFilterMethod::AESV3).len(), 32);
    }

    #[test]
    fn test_rc4_40_known_answer() {
        let file_key = EncryptionKey::new(hex::decode("7d3aba88db").unwrap());
        let id = ObjectId::new(12, 0);
        assert_eq!(
            &object_key(&file_key, id, CryptFilterMethod::V2)[..],
            &hex::decode("65497cab40472ae4f612").unwrap()[..]
        );
        let encrypted = transform(
            id,
            &file_key,
            CryptFilterMethod::V2,
            CipherDirection::Encrypt,
            b"Hello",
        )
        .unwrap();
        assert_eq!(encrypted, hex::decode("586eb217c5").unwrap());
    }

    #[test]
    fn test_distinct_objects_get_distinct_keys() {
        let file_key = key(16);
        for method in [CryptFilterMethod::V2, CryptFilterMethod::AESV2] {
            let a = object_key(&file_key, ObjectId::new(1, 0), method);
            let b = object_key(&file_key, ObjectId::new(2, 0), method);
            let c = object_key(&file_key, ObjectId::new(1, 1), method);
            assert_ne!(a, b);
            assert_ne!(a, c);
        }
        assert_ne!(
            object_key(&file_key, ObjectId::new(1, 0), CryptFilterMethod::V2),
            object_key(&file_key, ObjectId::new(1, 0), CryptFilterMethod::AESV2)
        );
    }

    #[test]
    fn test_transform_round_trip_all_methods() {
        let id = ObjectId::new(7, 2);
        let plain = b"BT /F1 12 Tf (secret) Tj ET".to_vec();
        for (method, file_key) in [
            (CryptFilterMethod::V2, key(5)),
            (CryptFilterMethod::V2, key(16)),
            (CryptFilterMethod::AESV2, key(16)),
            (CryptFilterMethod::AESV3, key(32)),
        ] {
            let encrypted =
                transform(id, &file_key, method, CipherDirection::Encrypt, &plain).unwrap();
            assert_ne!(encrypted, plain);
            let decrypted =
                transform(id, &file_key, method, CipherDirection::Decrypt, &encrypted).unwrap();
            assert_eq!(decrypted, plain, "{method:?}");
        }
    }

    #[test]
    fn test_aes_output_layout() {
        let encrypted = transform(
            ObjectId::new(1, 0),
            &key(16),
            CryptFilterMethod::AESV2,
            CipherDirection::Encrypt,
            b"",
        )
        .unwrap();
        // IV plus one block of padding
        assert_eq!(encrypted.len(), 32);

        let again = transform(
            ObjectId::new(1, 0),
            &key(16),
            CryptFilterMethod::AESV2,
            CipherDirection::Encrypt,
            b"",
        )
        .unwrap();
        assert_ne!(encrypted[..16], again[..16]);
    }

    #[test]
    fn test_aes_decrypt_edge_cases() {
        let id = ObjectId::new(3, 0);
        let file_key = key(16);
        let decrypt = |data: &[u8]| {
            transform(id, &file_key, CryptFilterMethod::AESV2, CipherDirection::Decrypt, data)
        };
        assert_eq!(decrypt(b"").unwrap(), Vec::<u8>::new());
        match decrypt(&[0u8; 7]) {
            Err(PdfError::MalformedDocument(msg)) => assert!(msg.contains("3 0 R")),
            other => panic!("expected malformed document, got {other:?}"),
        }
        assert!(matches!(
            decrypt(&[0u8; 40]),
            Err(PdfError::MalformedDocument(_))
        ));
    }

    fn sample_document() -> Document {
        let mut document = Document::new("1.7");

        let mut info = Dictionary::new();
        info.set("Title", b"Quarterly report".to_vec());
        info.set("Keywords", vec![Object::String(b"a".to_vec()), Object::Integer(3)]);
        document.objects.insert(ObjectId::new(1, 0), info.into());

        let mut content = Dictionary::new();
        content.set("Length", 5i64);
        document.objects.insert(
            ObjectId::new(2, 0),
            Stream::new(content, b"q Q\n".to_vec()).into(),
        );

        let mut metadata = Dictionary::new();
        metadata.set("Type", Object::Name("Metadata".to_string()));
        metadata.set("Subtype", Object::Name("XML".to_string()));
        document.objects.insert(
            ObjectId::new(3, 0),
            Stream::new(metadata, b"<x:xmpmeta/>".to_vec()).into(),
        );

        let mut signature = Dictionary::new();
        signature.set("Type", Object::Name("Sig".to_string()));
        signature.set("Contents", vec![0xABu8; 8]);
        signature.set("Reason", b"approved".to_vec());
        document.objects.insert(ObjectId::new(4, 0), signature.into());

        let mut identity = Dictionary::new();
        identity.set("Filter", Object::Name("Crypt".to_string()));
        document.objects.insert(
            ObjectId::new(5, 0),
            Stream::new(identity, b"plain".to_vec()).into(),
        );

        let mut encrypt = Dictionary::new();
        encrypt.set("O", vec![1u8; 32]);
        document.objects.insert(ObjectId::new(6, 0), encrypt.into());

        document
            .trailer
            .set("ID", vec![Object::String(vec![9u8; 16]), Object::String(vec![9u8; 16])]);
        document
    }

    fn string_at<'a>(document: &'a Document, number: u32, key: &str) -> &'a [u8] {
        document
            .get(ObjectId::new(number, 0))
            .and_then(Object::as_dict)
            .and_then(|d| d.get_string(key))
            .unwrap()
    }

    fn stream_data(document: &Document, number: u32) -> &[u8] {
        document
            .get(ObjectId::new(number, 0))
            .and_then(Object::as_stream)
            .unwrap()
            .data()
    }

    #[test]
    fn test_document_walk_skips_and_round_trips() {
        for (algorithm, key_len) in [
            (EncryptionAlgorithm::Rc4 { key_bits: 128 }, 16),
            (EncryptionAlgorithm::Aes128, 16),
            (EncryptionAlgorithm::Aes256, 32),
        ] {
            let original = sample_document();
            let mut document = original.clone();
            let encryptor = ObjectEncryptor::new(
                key(key_len),
                &dictionary(algorithm, false),
                Some(ObjectId::new(6, 0)),
            );

            encryptor.encrypt_document(&mut document).unwrap();
            assert_ne!(string_at(&document, 1, "Title"), b"Quarterly report");
            assert_ne!(stream_data(&document, 2), b"q Q\n");
            // EncryptMetadata false only applies to crypt-filter (V4/V5) dictionaries
            if matches!(algorithm, EncryptionAlgorithm::Rc4 { .. }) {
                assert_ne!(stream_data(&document, 3), b"<x:xmpmeta/>", "{algorithm}");
            } else {
                assert_eq!(stream_data(&document, 3), b"<x:xmpmeta/>", "{algorithm}");
            }
            assert_eq!(string_at(&document, 4, "Contents"), &[0xABu8; 8][..]);
            assert_ne!(string_at(&document, 4, "Reason"), b"approved");
            assert_eq!(stream_data(&document, 5), b"plain");
            assert_eq!(string_at(&document, 6, "O"), &[1u8; 32][..]);
            assert_eq!(document.trailer, original.trailer);

            encryptor.decrypt_document(&mut document).unwrap();
            assert_eq!(document, original, "{algorithm}");
        }
    }

    #[test]
    fn test_metadata_encrypted_when_requested() {
        let mut document = sample_document();
        let encryptor = ObjectEncryptor::new(
            key(16),
            &dictionary(EncryptionAlgorithm::Aes128, true),
            None,
        );
        encryptor.encrypt_document(&mut document).unwrap();
        assert_ne!(stream_data(&document, 3), b"<x:xmpmeta/>");
    }

    #[test]
    fn test_xref_streams_stay_clear() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name("XRef".to_string()));
        let mut object: Object = Stream::new(dict, vec![1, 2, 3]).into();
        let encryptor = ObjectEncryptor::new(
            key(16),
            &dictionary(EncryptionAlgorithm::Rc4 { key_bits: 128 }, true),
            None,
        );
        encryptor
            .transform_object(ObjectId::new(9, 0), &mut object, CipherDirection::Encrypt)
            .unwrap();
        assert_eq!(object.as_stream().unwrap().data(), &[1, 2, 3]);
    }
}
