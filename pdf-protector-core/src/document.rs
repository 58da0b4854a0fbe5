//! In-memory PDF document
//!
//! A flat map of indirect objects plus the effective trailer. This is the
//! unit the cipher engine walks and the writer serialises; there is no
//! page model.

use crate::objects::{Dictionary, Object, ObjectId};
use crate::parser::object_stream::ObjectStream;
use crate::parser::{ParseError, ParseOptions, ParseResult};
use std::collections::{BTreeMap, BTreeSet};

/// Location of an object packed in an object stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedLocation {
    pub stream_number: u32,
    pub index: u32,
}

static NULL: Object = Object::Null;

/// Reference chains longer than this are treated as broken
const MAX_REFERENCE_CHAIN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Header version, e.g. `1.7`
    pub version: String,
    pub objects: BTreeMap<ObjectId, Object>,
    /// Effective trailer (document-level keys only)
    pub trailer: Dictionary,
    /// Objects still packed in object streams, by object number
    compressed: BTreeMap<u32, CompressedLocation>,
}

impl Document {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            objects: BTreeMap::new(),
            trailer: Dictionary::new(),
            compressed: BTreeMap::new(),
        }
    }

    pub(crate) fn set_compressed(&mut self, compressed: BTreeMap<u32, CompressedLocation>) {
        self.compressed = compressed;
    }

    /// Whether some objects still wait for their object stream to be read
    pub fn has_packed_objects(&self) -> bool {
        !self.compressed.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Follow references until a direct object; missing targets read as null
    pub fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(id) => match self.objects.get(id) {
                    Some(target) => current = target,
                    None => return &NULL,
                },
                _ => return current,
            }
        }
        &NULL
    }

    /// Trailer entry with references resolved
    pub fn trailer_entry(&self, key: &str) -> Option<&Object> {
        self.trailer.get(key).map(|object| self.resolve(object))
    }

    /// Structural test only: a trailer `Encrypt` entry is present
    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    /// Object id of an indirect encryption dictionary
    pub fn encryption_dictionary_id(&self) -> Option<ObjectId> {
        self.trailer.get_reference("Encrypt")
    }

    /// First element of the trailer `ID` array
    pub fn file_id(&self) -> Option<&[u8]> {
        match self.trailer_entry("ID") {
            Some(Object::Array(items)) => items
                .first()
                .map(|item| self.resolve(item))
                .and_then(Object::as_string),
            _ => None,
        }
    }

    /// Highest object number in use, including packed objects
    pub fn max_object_number(&self) -> u32 {
        let direct = self.objects.keys().map(ObjectId::number).max().unwrap_or(0);
        let packed = self.compressed.keys().copied().max().unwrap_or(0);
        direct.max(packed)
    }

    /// Store `object` under the next free object number
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = ObjectId::new(self.max_object_number() + 1, 0);
        self.objects.insert(id, object.into());
        id
    }

    /// Unpack every pending object stream into the object map and drop the
    /// container streams.
    ///
    /// Stream data must already be plaintext.
    pub fn expand_object_streams(&mut self, options: &ParseOptions) -> ParseResult<()> {
        if self.compressed.is_empty() {
            return Ok(());
        }

        let stream_numbers: BTreeSet<u32> = self
            .compressed
            .values()
            .map(|location| location.stream_number)
            .collect();

        let mut unpacked = BTreeMap::new();
        for stream_number in &stream_numbers {
            let id = ObjectId::new(*stream_number, 0);
            let stream = match self.objects.get(&id) {
                Some(Object::Stream(stream)) => stream,
                _ if options.strict_mode => {
                    return Err(ParseError::SyntaxError {
                        position: 0,
                        message: format!("Object stream {} is missing", id),
                    })
                }
                _ => {
                    tracing::warn!("Object stream {} is missing, its objects are dropped", id);
                    continue;
                }
            };
            let parsed = ObjectStream::parse(stream, options)?;
            unpacked.insert(*stream_number, parsed);
        }

        let compressed = std::mem::take(&mut self.compressed);
        for (number, location) in compressed {
            let id = ObjectId::new(number, 0);
            // A direct definition from a newer section takes precedence
            if self.objects.contains_key(&id) {
                continue;
            }
            let object = unpacked
                .get(&location.stream_number)
                .and_then(|stream| stream.get(location.index as usize, number));
            match object {
                Some(object) => {
                    self.objects.insert(id, object.clone());
                }
                None if options.strict_mode => {
                    return Err(ParseError::SyntaxError {
                        position: 0,
                        message: format!(
                            "Object {} not found in object stream {}",
                            number, location.stream_number
                        ),
                    })
                }
                None => tracing::warn!(
                    "Object {} not found in object stream {}",
                    number,
                    location.stream_number
                ),
            }
        }

        for stream_number in stream_numbers {
            self.objects.remove(&ObjectId::new(stream_number, 0));
        }
        tracing::debug!("Expanded object streams, {} objects", self.objects.len());
        Ok(())
    }

    /// Drop cross-reference streams; a rewritten file uses a classic table
    pub(crate) fn remove_xref_streams(&mut self) {
        self.objects.retain(|_, object| {
            !matches!(object, Object::Stream(stream) if stream.is_type("XRef"))
        });
    }

    /// References whose target is neither loaded nor packed
    pub fn dangling_references(&self) -> BTreeSet<ObjectId> {
        let mut dangling = BTreeSet::new();
        let mut visit = |id: ObjectId| {
            let packed = id.generation() == 0 && self.compressed.contains_key(&id.number());
            if !self.objects.contains_key(&id) && !packed {
                dangling.insert(id);
            }
        };
        for object in self.objects.values() {
            for_each_reference(object, &mut visit);
        }
        for (_, value) in self.trailer.iter() {
            for_each_reference(value, &mut visit);
        }
        dangling
    }

    /// Replace dangling references with null, as ISO 32000 reads them
    pub fn replace_dangling_references(&mut self) -> usize {
        let dangling = self.dangling_references();
        if dangling.is_empty() {
            return 0;
        }
        for object in self.objects.values_mut() {
            nullify_references(object, &dangling);
        }
        for value in self.trailer.values_mut() {
            nullify_references(value, &dangling);
        }
        dangling.len()
    }
}

fn for_each_reference<F: FnMut(ObjectId)>(object: &Object, visit: &mut F) {
    match object {
        Object::Reference(id) => visit(*id),
        Object::Array(items) => items.iter().for_each(|item| for_each_reference(item, visit)),
        Object::Dictionary(dict) => dict
            .iter()
            .for_each(|(_, value)| for_each_reference(value, visit)),
        Object::Stream(stream) => stream
            .dictionary()
            .iter()
            .for_each(|(_, value)| for_each_reference(value, visit)),
        _ => {}
    }
}

fn nullify_references(object: &mut Object, dangling: &BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) if dangling.contains(id) => *object = Object::Null,
        Object::Array(items) => items
            .iter_mut()
            .for_each(|item| nullify_references(item, dangling)),
        Object::Dictionary(dict) => dict
            .values_mut()
            .for_each(|value| nullify_references(value, dangling)),
        Object::Stream(stream) => stream
            .dictionary_mut()
            .values_mut()
            .for_each(|value| nullify_references(value, dangling)),
        _ => {}
    }
}
