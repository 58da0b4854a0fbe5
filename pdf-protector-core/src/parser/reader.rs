//! High-level PDF Reader API
//!
//! Turns a byte buffer into a [`Document`]: header, cross-reference chain,
//! effective trailer and every in-use object.

use super::lexer::{find_bytes, is_delimiter, is_whitespace, rfind_bytes, Lexer, Token};
use super::objects::{parse_dictionary, parse_indirect_object, parse_object};
use super::trailer::{prev_offset, xref_stm_offset, TrailerChain};
use super::xref::{parse_xref_table, XRefEntry, XRefTable};
use super::xref_stream::parse_xref_stream;
use super::{ParseError, ParseOptions, ParseResult};
use crate::document::{CompressedLocation, Document};
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};

/// `%PDF-` must start within this many bytes
const HEADER_SEARCH_WINDOW: usize = 1024;
/// `startxref` must appear within this many bytes of the end
const STARTXREF_SEARCH_WINDOW: usize = 2048;

/// High-level PDF reader over an in-memory buffer
pub struct PdfReader<'a> {
    data: &'a [u8],
    options: ParseOptions,
}

impl<'a> PdfReader<'a> {
    /// Create a reader, rejecting inputs above the configured size ceiling
    pub fn new(data: &'a [u8], options: ParseOptions) -> ParseResult<Self> {
        if data.len() > options.max_document_size {
            return Err(ParseError::DocumentTooLarge {
                size: data.len(),
                limit: options.max_document_size,
            });
        }
        Ok(Self { data, options })
    }

    /// Get parsing options
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Version from the `%PDF-x.y` header
    pub fn version(&self) -> ParseResult<String> {
        let window = &self.data[..self.data.len().min(HEADER_SEARCH_WINDOW)];
        let start = find_bytes(window, b"%PDF-", 0).ok_or(ParseError::InvalidHeader)? + 5;
        let version: String = self.data[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .map(|b| *b as char)
            .collect();
        if version.is_empty() {
            return Err(ParseError::InvalidHeader);
        }
        Ok(version)
    }

    /// Effective trailer only: the detection path.
    ///
    /// Falls back to scanning for the last trailer dictionary (or xref
    /// stream dictionary) when the cross-reference data is unreadable.
    pub fn read_trailer(&self) -> ParseResult<Dictionary> {
        self.version()?;
        match self.read_xref_chain() {
            Ok((_, trailer)) => Ok(trailer),
            Err(e) => {
                tracing::warn!("Cross-reference data unreadable ({}), scanning for trailer", e);
                self.scan_trailer().ok_or_else(|| {
                    ParseError::InvalidTrailer(format!("no trailer found after: {e}"))
                })
            }
        }
    }

    /// Read the whole document.
    ///
    /// Object streams are expanded right away for unencrypted files; for
    /// encrypted files they stay packed until their data is decrypted.
    pub fn read_document(&self) -> ParseResult<Document> {
        let version = self.version()?;

        let (xref, trailer) = match self.read_xref_chain() {
            Ok(found) => found,
            Err(e) if !self.options.strict_mode => {
                tracing::warn!("Cross-reference data unreadable ({}), rebuilding", e);
                self.rebuild_xref()?
            }
            Err(e) => return Err(e),
        };
        tracing::debug!("Cross-reference table has {} entries", xref.len());

        let mut document = Document::new(version);
        document.trailer = trailer;
        let mut compressed = BTreeMap::new();
        let mut relocations: Option<XRefTable> = None;

        for (number, entry) in xref.iter() {
            match *entry {
                XRefEntry::Free => {}
                XRefEntry::Compressed {
                    stream_number,
                    index,
                } => {
                    compressed.insert(
                        number,
                        CompressedLocation {
                            stream_number,
                            index,
                        },
                    );
                }
                XRefEntry::InUse { offset, generation } => {
                    if number == 0 {
                        continue;
                    }
                    let expected = ObjectId::new(number, generation);
                    match self.load_object(&xref, expected, offset) {
                        Ok(object) => {
                            document.objects.insert(expected, object);
                        }
                        Err(e) if self.options.strict_mode => return Err(e),
                        Err(e) => {
                            let table = relocations.get_or_insert_with(|| self.scan_objects());
                            match self.relocate_object(table, &xref, expected) {
                                Some(object) => {
                                    tracing::warn!("Object {} relocated after: {}", expected, e);
                                    document.objects.insert(expected, object);
                                }
                                None => tracing::warn!("Skipping object {}: {}", expected, e),
                            }
                        }
                    }
                }
            }
        }

        document.set_compressed(compressed);
        document.remove_xref_streams();

        if !document.is_encrypted() {
            document.expand_object_streams(&self.options)?;
        }

        self.check_references(&mut document)?;

        if !document.trailer.contains_key("Root") {
            if self.options.strict_mode {
                return Err(ParseError::MissingKey("Root".to_string()));
            }
            if let Some(root) = find_catalog(&document) {
                tracing::warn!("Trailer has no Root, using catalog {}", root);
                document.trailer.set("Root", root);
            }
        }

        tracing::debug!("Read document with {} objects", document.objects.len());
        Ok(document)
    }

    fn check_references(&self, document: &mut Document) -> ParseResult<()> {
        let dangling = document.dangling_references();
        if let Some(first) = dangling.iter().next() {
            if self.options.strict_mode {
                return Err(ParseError::InvalidReference(
                    first.number(),
                    first.generation(),
                ));
            }
            tracing::warn!("{} dangling references read as null", dangling.len());
            document.replace_dangling_references();
        }
        Ok(())
    }

    /// Offset stored after the last `startxref`
    fn find_startxref(&self) -> ParseResult<usize> {
        let tail_start = self.data.len().saturating_sub(STARTXREF_SEARCH_WINDOW);
        let tail = &self.data[tail_start..];
        let keyword = rfind_bytes(tail, b"startxref")
            .ok_or_else(|| ParseError::InvalidXRef("startxref not found".to_string()))?;

        let mut lexer = Lexer::at(self.data, tail_start + keyword);
        lexer.expect(Token::StartXRef)?;
        match lexer.next_token()? {
            Token::Integer(offset) if offset >= 0 && (offset as usize) < self.data.len() => {
                Ok(offset as usize)
            }
            other => Err(ParseError::InvalidXRef(format!(
                "startxref points at {}",
                other.describe()
            ))),
        }
    }

    /// Merge every section of the `Prev` chain, newest first
    fn read_xref_chain(&self) -> ParseResult<(XRefTable, Dictionary)> {
        let mut table = XRefTable::new();
        let mut chain = TrailerChain::new();
        let mut visited = HashSet::new();
        let mut next = Some(self.find_startxref()?);

        while let Some(offset) = next {
            if !visited.insert(offset) {
                return Err(ParseError::CircularReference(format!(
                    "xref section at offset {offset} is reached twice"
                )));
            }
            if visited.len() > self.options.max_xref_sections {
                return Err(ParseError::InvalidXRef(format!(
                    "more than {} cross-reference sections",
                    self.options.max_xref_sections
                )));
            }

            let (section, trailer) = self.read_xref_section(offset)?;
            table.merge_older(section);
            next = prev_offset(&trailer);
            chain.push_older(trailer);
        }

        tracing::debug!("Read {} cross-reference sections", chain.len());
        Ok((table, chain.effective()))
    }

    /// One section: a classic table (plus its hybrid `XRefStm`) or an xref
    /// stream
    fn read_xref_section(&self, offset: usize) -> ParseResult<(XRefTable, Dictionary)> {
        let mut lexer = Lexer::at(self.data, offset);
        if lexer.peek_token()? == Token::XRef {
            let (mut table, trailer) = parse_xref_table(&mut lexer, &self.options)?;
            if let Some(stm_offset) = xref_stm_offset(&trailer) {
                match self.read_xref_stream_at(stm_offset) {
                    Ok((stream_table, _)) => table.merge_older(stream_table),
                    Err(e) if self.options.strict_mode => return Err(e),
                    Err(e) => tracing::warn!("Ignoring unreadable XRefStm: {}", e),
                }
            }
            Ok((table, trailer))
        } else {
            self.read_xref_stream_at(offset)
        }
    }

    fn read_xref_stream_at(&self, offset: usize) -> ParseResult<(XRefTable, Dictionary)> {
        let mut lexer = Lexer::at(self.data, offset);
        let (_, object) = parse_indirect_object(&mut lexer, &self.options, |_| None)?;
        match object {
            Object::Stream(stream) => {
                let table = parse_xref_stream(&stream)?;
                let (dict, _) = stream.into_parts();
                Ok((table, dict))
            }
            other => Err(ParseError::InvalidXRef(format!(
                "expected xref stream at offset {offset}, found {}",
                other.type_name()
            ))),
        }
    }

    fn load_object(&self, xref: &XRefTable, expected: ObjectId, offset: usize) -> ParseResult<Object> {
        if offset >= self.data.len() {
            return Err(ParseError::InvalidXRef(format!(
                "object {} points past the end of the file",
                expected
            )));
        }
        let mut lexer = Lexer::at(self.data, offset);
        let (id, object) = parse_indirect_object(&mut lexer, &self.options, |length_id| {
            self.resolve_length(xref, length_id)
        })?;
        if id != expected {
            return Err(ParseError::InvalidXRef(format!(
                "offset {offset} holds object {}, expected {}",
                id, expected
            )));
        }
        Ok(object)
    }

    /// Integer value of an indirect `Length`
    fn resolve_length(&self, xref: &XRefTable, id: ObjectId) -> Option<i64> {
        match xref.get(id.number()) {
            Some(XRefEntry::InUse { offset, generation }) if *generation == id.generation() => {
                let mut lexer = Lexer::at(self.data, *offset);
                match parse_indirect_object(&mut lexer, &self.options, |_| None) {
                    Ok((_, Object::Integer(n))) => Some(n),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn relocate_object(
        &self,
        scanned: &XRefTable,
        xref: &XRefTable,
        expected: ObjectId,
    ) -> Option<Object> {
        match scanned.get(expected.number()) {
            Some(XRefEntry::InUse { offset, generation }) if *generation == expected.generation() => {
                self.load_object(xref, expected, *offset).ok()
            }
            _ => None,
        }
    }

    /// Locate every `N G obj` header; later definitions win
    fn scan_objects(&self) -> XRefTable {
        let mut found = BTreeMap::new();
        let mut from = 0;
        while let Some(pos) = find_bytes(self.data, b"obj", from) {
            from = pos + 3;
            if self.data.get(pos + 3).is_some_and(|b| b.is_ascii_alphanumeric()) {
                continue;
            }
            if let Some((start, number, generation)) = object_header_before(self.data, pos) {
                found.insert(number, (start, generation));
            }
        }

        let mut table = XRefTable::new();
        for (number, (offset, generation)) in found {
            table.add_if_absent(number, XRefEntry::InUse { offset, generation });
        }
        table
    }

    /// Lenient recovery: rebuild the xref from object headers
    fn rebuild_xref(&self) -> ParseResult<(XRefTable, Dictionary)> {
        let table = self.scan_objects();
        if table.is_empty() {
            return Err(ParseError::InvalidXRef(
                "no objects found while rebuilding".to_string(),
            ));
        }
        let trailer = self.scan_trailer().unwrap_or_default();
        tracing::debug!("Rebuilt cross-reference table with {} objects", table.len());
        Ok((table, trailer))
    }

    /// The last trailer dictionary or xref stream dictionary in the file
    fn scan_trailer(&self) -> Option<Dictionary> {
        let classic = rfind_bytes(self.data, b"trailer").and_then(|pos| {
            let mut lexer = Lexer::at(self.data, pos);
            lexer.expect(Token::Trailer).ok()?;
            parse_dictionary(&mut lexer, &self.options)
                .ok()
                .map(|dict| (pos, dict))
        });

        let stream = self.scan_xref_stream_dictionary();

        let best = match (classic, stream) {
            (Some(c), Some(s)) => Some(if s.0 > c.0 { s } else { c }),
            (c, s) => c.or(s),
        };
        best.map(|(_, dict)| {
            let mut chain = TrailerChain::new();
            chain.push_older(dict);
            chain.effective()
        })
    }

    fn scan_xref_stream_dictionary(&self) -> Option<(usize, Dictionary)> {
        let scanned = self.scan_objects();
        let mut candidates: Vec<usize> = scanned
            .iter()
            .filter_map(|(_, entry)| match entry {
                XRefEntry::InUse { offset, .. } => Some(*offset),
                _ => None,
            })
            .collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        candidates.into_iter().find_map(|offset| {
            let mut lexer = Lexer::at(self.data, offset);
            for _ in 0..3 {
                lexer.next_token().ok()?;
            }
            match parse_object(&mut lexer, &self.options) {
                Ok(Object::Dictionary(dict)) if dict.get_type() == Some("XRef") => {
                    Some((offset, dict))
                }
                _ => None,
            }
        })
    }
}

/// Parse `N G ` backwards from the `obj` keyword at `keyword`
fn object_header_before(data: &[u8], keyword: usize) -> Option<(usize, u32, u16)> {
    let mut pos = keyword;
    let skip_ws = |mut p: usize| {
        while p > 0 && is_whitespace(data[p - 1]) {
            p -= 1;
        }
        p
    };
    let digits_start = |mut p: usize| {
        while p > 0 && data[p - 1].is_ascii_digit() {
            p -= 1;
        }
        p
    };

    let gen_end = skip_ws(pos);
    if gen_end == pos {
        return None;
    }
    let gen_start = digits_start(gen_end);
    if gen_start == gen_end {
        return None;
    }
    pos = skip_ws(gen_start);
    if pos == gen_start {
        return None;
    }
    let num_start = digits_start(pos);
    if num_start == pos {
        return None;
    }
    if num_start > 0 && !is_whitespace(data[num_start - 1]) && !is_delimiter(data[num_start - 1]) {
        return None;
    }

    let number = std::str::from_utf8(&data[num_start..pos]).ok()?.parse().ok()?;
    let generation = std::str::from_utf8(&data[gen_start..gen_end])
        .ok()?
        .parse()
        .ok()?;
    Some((num_start, number, generation))
}

fn find_catalog(document: &Document) -> Option<ObjectId> {
    document
        .objects
        .iter()
        .find(|(_, object)| {
            matches!(object, Object::Dictionary(dict) if dict.get_type() == Some("Catalog"))
        })
        .map(|(id, _)| *id)
}
