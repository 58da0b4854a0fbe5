//! Cross-reference streams (ISO 32000-1 Section 7.5.8)

use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseResult};
use crate::objects::{Object, Stream};

/// Decode the entries of a `/Type /XRef` stream
pub fn parse_xref_stream(stream: &Stream) -> ParseResult<XRefTable> {
    let dict = stream.dictionary();
    if !stream.is_type("XRef") {
        return Err(ParseError::InvalidXRef(
            "stream at startxref is not a cross-reference stream".to_string(),
        ));
    }

    let widths = field_widths(dict.get_array("W"))?;
    let size = dict
        .get_integer("Size")
        .ok_or_else(|| ParseError::MissingKey("Size".to_string()))?;

    let subsections: Vec<(i64, i64)> = match dict.get_array("Index") {
        Some(index) => {
            if index.len() % 2 != 0 {
                return Err(ParseError::InvalidXRef(
                    "Index array has an odd number of elements".to_string(),
                ));
            }
            index
                .chunks(2)
                .map(|pair| match (&pair[0], &pair[1]) {
                    (Object::Integer(first), Object::Integer(count)) => Ok((*first, *count)),
                    _ => Err(ParseError::InvalidXRef(
                        "Index array must hold integers".to_string(),
                    )),
                })
                .collect::<ParseResult<_>>()?
        }
        None => vec![(0, size)],
    };

    let data = stream.decoded_data()?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(ParseError::InvalidXRef("W entries are all zero".to_string()));
    }

    let mut rows = data.chunks_exact(row_len);
    let mut table = XRefTable::new();

    for (first, count) in subsections {
        if first < 0 || count < 0 {
            return Err(ParseError::InvalidXRef(format!(
                "negative Index subsection {first} {count}"
            )));
        }
        for i in 0..count {
            let row = rows.next().ok_or_else(|| {
                ParseError::InvalidXRef("stream data ends before the last entry".to_string())
            })?;
            let number = u32::try_from(first + i)
                .map_err(|_| ParseError::InvalidXRef("object number overflow".to_string()))?;

            let (type_field, rest) = row.split_at(widths[0]);
            let (field2, field3) = rest.split_at(widths[1]);
            // A zero-width type field means type 1
            let kind = if widths[0] == 0 {
                1
            } else {
                read_field(type_field)
            };
            let entry = match kind {
                0 => XRefEntry::Free,
                1 => XRefEntry::InUse {
                    offset: read_field(field2) as usize,
                    generation: if widths[2] == 0 {
                        0
                    } else {
                        read_field(field3) as u16
                    },
                },
                2 => XRefEntry::Compressed {
                    stream_number: read_field(field2) as u32,
                    index: read_field(field3) as u32,
                },
                other => {
                    tracing::debug!("Ignoring xref stream entry of unknown type {}", other);
                    continue;
                }
            };
            table.add_if_absent(number, entry);
        }
    }

    Ok(table)
}

fn field_widths(w: Option<&Vec<Object>>) -> ParseResult<[usize; 3]> {
    let w = w.ok_or_else(|| ParseError::MissingKey("W".to_string()))?;
    if w.len() != 3 {
        return Err(ParseError::InvalidXRef(format!(
            "W must have 3 elements, found {}",
            w.len()
        )));
    }
    let mut widths = [0usize; 3];
    for (slot, value) in widths.iter_mut().zip(w) {
        *slot = match value {
            Object::Integer(n) if (0..=8).contains(n) => *n as usize,
            _ => {
                return Err(ParseError::InvalidXRef(
                    "W entries must be integers between 0 and 8".to_string(),
                ))
            }
        };
    }
    Ok(widths)
}

/// Big-endian unsigned field
fn read_field(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}
