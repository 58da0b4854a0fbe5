//! Trailer chain handling
//!
//! Each cross-reference section carries its own trailer (or xref stream
//! dictionary). The effective trailer takes every key from the newest
//! section that defines it.

use crate::objects::{Dictionary, Object};

/// Keys that describe the document rather than one xref section
pub const DOCUMENT_TRAILER_KEYS: [&str; 5] = ["Root", "Info", "ID", "Encrypt", "Size"];

/// Trailers of a `Prev` chain, newest first
#[derive(Debug, Clone, Default)]
pub struct TrailerChain {
    sections: Vec<Dictionary>,
}

impl TrailerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the trailer of the next older section
    pub fn push_older(&mut self, trailer: Dictionary) {
        self.sections.push(trailer);
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Merged trailer restricted to document-level keys.
    ///
    /// Section bookkeeping (`Prev`, `XRefStm`, `W`, `Index`, filters, ...)
    /// is dropped: a rewritten file gets its own.
    pub fn effective(&self) -> Dictionary {
        let mut merged = Dictionary::new();
        for key in DOCUMENT_TRAILER_KEYS {
            if let Some(value) = self.sections.iter().find_map(|t| t.get(key)) {
                merged.set(key, value.clone());
            }
        }
        merged
    }
}

/// Offset of the previous section, if the trailer names one
pub fn prev_offset(trailer: &Dictionary) -> Option<usize> {
    match trailer.get("Prev") {
        Some(Object::Integer(n)) if *n >= 0 => Some(*n as usize),
        // Some writers emit the offset as a real
        Some(Object::Real(r)) if *r >= 0.0 => Some(*r as usize),
        _ => None,
    }
}

/// Offset of the hybrid-reference xref stream, if any
pub fn xref_stm_offset(trailer: &Dictionary) -> Option<usize> {
    trailer
        .get_integer("XRefStm")
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectId;

    #[test]
    fn test_newest_value_wins_and_older_keys_are_inherited() {
        let mut newest = Dictionary::new();
        newest.set("Size", 12i64);
        newest.set("Root", ObjectId::new(1, 0));
        newest.set("Prev", 400i64);

        let mut oldest = Dictionary::new();
        oldest.set("Size", 8i64);
        oldest.set("Root", ObjectId::new(1, 0));
        oldest.set("Encrypt", ObjectId::new(7, 0));
        oldest.set("ID", Object::Array(vec![]));

        let mut chain = TrailerChain::new();
        chain.push_older(newest);
        chain.push_older(oldest);

        let effective = chain.effective();
        assert_eq!(effective.get_integer("Size"), Some(12));
        assert_eq!(effective.get_reference("Encrypt"), Some(ObjectId::new(7, 0)));
        assert!(effective.contains_key("ID"));
        assert!(!effective.contains_key("Prev"));
    }

    #[test]
    fn test_xref_stream_bookkeeping_is_dropped() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name("XRef".to_string()));
        dict.set("W", Object::Array(vec![]));
        dict.set("Filter", Object::Name("FlateDecode".to_string()));
        dict.set("Root", ObjectId::new(2, 0));

        let mut chain = TrailerChain::new();
        chain.push_older(dict);
        let effective = chain.effective();
        assert_eq!(effective.len(), 1);
        assert!(effective.contains_key("Root"));
    }

    #[test]
    fn test_prev_and_xref_stm_offsets() {
        let mut dict = Dictionary::new();
        assert_eq!(prev_offset(&dict), None);
        dict.set("Prev", 120i64);
        dict.set("XRefStm", 300i64);
        assert_eq!(prev_offset(&dict), Some(120));
        assert_eq!(xref_stm_offset(&dict), Some(300));
        dict.set("Prev", -1i64);
        assert_eq!(prev_offset(&dict), None);
    }
}
