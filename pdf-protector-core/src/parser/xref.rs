//! Cross-reference tables
//!
//! Classic `xref` sections (ISO 32000-1 Section 7.5.4) and the merged view
//! of every section in a `Prev` chain.

use super::lexer::{Lexer, Token};
use super::objects::parse_dictionary;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::Dictionary;
use std::collections::BTreeMap;

/// Where an object lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free,
    /// Byte offset of `N G obj`
    InUse { offset: usize, generation: u16 },
    /// Index inside an object stream
    Compressed { stream_number: u32, index: u32 },
}

/// Merged cross-reference data, newest section first-come
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
}

impl XRefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry unless a newer section already defined this object.
    ///
    /// Sections must be merged newest to oldest.
    pub fn add_if_absent(&mut self, number: u32, entry: XRefEntry) {
        self.entries.entry(number).or_insert(entry);
    }

    /// Merge another section; entries already present win
    pub fn merge_older(&mut self, older: XRefTable) {
        for (number, entry) in older.entries {
            self.add_if_absent(number, entry);
        }
    }

    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> {
        self.entries.iter().map(|(n, e)| (*n, e))
    }

    /// Highest object number with an entry, plus one
    pub fn size(&self) -> u32 {
        self.entries
            .keys()
            .next_back()
            .map(|n| n.saturating_add(1))
            .unwrap_or(0)
    }
}

/// Parse a classic `xref` section and the trailer dictionary that follows
pub fn parse_xref_table(
    lexer: &mut Lexer<'_>,
    options: &ParseOptions,
) -> ParseResult<(XRefTable, Dictionary)> {
    lexer.expect(Token::XRef)?;
    let mut table = XRefTable::new();

    loop {
        let position = lexer.position();
        match lexer.next_token()? {
            Token::Trailer => break,
            Token::Integer(first) => {
                let count = match lexer.next_token()? {
                    Token::Integer(count) if count >= 0 => count,
                    other => {
                        return Err(ParseError::InvalidXRef(format!(
                            "subsection header at {position} has count {}",
                            other.describe()
                        )))
                    }
                };
                let first = u32::try_from(first).map_err(|_| {
                    ParseError::InvalidXRef(format!("negative subsection start {first}"))
                })?;
                for i in 0..count as u32 {
                    let number = first.checked_add(i).ok_or_else(|| {
                        ParseError::InvalidXRef("object number overflow".to_string())
                    })?;
                    let entry = parse_entry(lexer)?;
                    // Within one section the first definition counts
                    table.add_if_absent(number, entry);
                }
            }
            other => {
                return Err(ParseError::InvalidXRef(format!(
                    "expected subsection or trailer at {position}, found {}",
                    other.describe()
                )))
            }
        }
    }

    let trailer = parse_dictionary(lexer, options)
        .map_err(|e| ParseError::InvalidTrailer(e.to_string()))?;
    Ok((table, trailer))
}

fn parse_entry(lexer: &mut Lexer<'_>) -> ParseResult<XRefEntry> {
    let position = lexer.position();
    match (lexer.next_token()?, lexer.next_token()?, lexer.next_token()?) {
        (Token::Integer(offset), Token::Integer(generation), Token::Keyword(kind)) => {
            match kind.as_str() {
                "n" => Ok(XRefEntry::InUse {
                    offset: usize::try_from(offset).map_err(|_| {
                        ParseError::InvalidXRef(format!("negative offset at {position}"))
                    })?,
                    generation: u16::try_from(generation).map_err(|_| {
                        ParseError::InvalidXRef(format!("generation out of range at {position}"))
                    })?,
                }),
                "f" => Ok(XRefEntry::Free),
                other => Err(ParseError::InvalidXRef(format!(
                    "entry type '{other}' at {position}"
                ))),
            }
        }
        _ => Err(ParseError::InvalidXRef(format!(
            "malformed entry at {position}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_xref_table_with_trailer() {
        let input = b"xref\n0 3\n0000000000 65535 f \n0000000017 00000 n \n0000000081 00002 n \ntrailer\n<</Size 3/Root 1 0 R>>";
        let (table, trailer) =
            parse_xref_table(&mut Lexer::new(input), &ParseOptions::default()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some(&XRefEntry::Free));
        assert_eq!(
            table.get(1),
            Some(&XRefEntry::InUse {
                offset: 17,
                generation: 0
            })
        );
        assert_eq!(
            table.get(2),
            Some(&XRefEntry::InUse {
                offset: 81,
                generation: 2
            })
        );
        assert_eq!(trailer.get_integer("Size"), Some(3));
        assert_eq!(table.size(), 3);
    }

    #[test]
    fn test_multiple_subsections() {
        let input = b"xref\n0 1\n0000000000 65535 f\r\n5 2\n0000000100 00000 n\r\n0000000200 00000 n\r\ntrailer<<>>";
        let (table, _) =
            parse_xref_table(&mut Lexer::new(input), &ParseOptions::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.get(5).is_some());
        assert!(table.get(6).is_some());
        assert!(table.get(1).is_none());
    }

    #[test]
    fn test_newer_entries_win_on_merge() {
        let mut newest = XRefTable::new();
        newest.add_if_absent(
            1,
            XRefEntry::InUse {
                offset: 500,
                generation: 0,
            },
        );
        let mut older = XRefTable::new();
        older.add_if_absent(
            1,
            XRefEntry::InUse {
                offset: 10,
                generation: 0,
            },
        );
        older.add_if_absent(2, XRefEntry::Free);

        newest.merge_older(older);
        assert_eq!(
            newest.get(1),
            Some(&XRefEntry::InUse {
                offset: 500,
                generation: 0
            })
        );
        assert_eq!(newest.get(2), Some(&XRefEntry::Free));
    }

    #[test]
    fn test_bad_entry_type_is_rejected() {
        let input = b"xref\n0 1\n0000000000 65535 x \ntrailer<<>>";
        assert!(matches!(
            parse_xref_table(&mut Lexer::new(input), &ParseOptions::default()),
            Err(ParseError::InvalidXRef(_))
        ));
    }

    #[test]
    fn test_missing_trailer_is_rejected() {
        let input = b"xref\n0 1\n0000000000 65535 f \n";
        assert!(parse_xref_table(&mut Lexer::new(input), &ParseOptions::default()).is_err());
    }
}
