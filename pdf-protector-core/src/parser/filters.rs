//! PDF Stream Filters
//!
//! Decoding needed to read cross-reference and object streams
//! (ISO 32000-1 Section 7.4). Other streams are carried through untouched,
//! so only the filters those two stream types use in practice are here.

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, Stream};

#[cfg(feature = "compression")]
use flate2::read::ZlibDecoder;
#[cfg(feature = "compression")]
use std::io::Read;

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,

    /// Crypt filter; only the Identity filter decodes without a key
    Crypt,
}

impl Filter {
    /// Parse filter from name, including the abbreviated inline forms
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }
}

/// Decode a stream's data through its filter chain
pub fn decode_stream(stream: &Stream) -> ParseResult<Vec<u8>> {
    let dict = stream.dictionary();
    let names: Vec<&str> = match dict.get("Filter") {
        None => return Ok(stream.data().to_vec()),
        Some(Object::Name(_)) | Some(Object::Array(_)) => stream.filters(),
        Some(other) => {
            return Err(ParseError::StreamDecodeError(format!(
                "Invalid Filter type: {}",
                other.type_name()
            )))
        }
    };

    let params = decode_params(dict, names.len());
    let mut result = stream.data().to_vec();
    for (index, name) in names.iter().enumerate() {
        let filter = Filter::from_name(name)
            .ok_or_else(|| ParseError::StreamDecodeError(format!("Unsupported filter: {name}")))?;
        result = apply_filter(&result, filter, params.get(index).copied().flatten())?;
    }
    Ok(result)
}

/// `DecodeParms` aligned with the filter list
fn decode_params(dict: &Dictionary, count: usize) -> Vec<Option<&Dictionary>> {
    match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(Object::Dictionary(params)) => {
            let mut all = vec![None; count];
            if let Some(first) = all.first_mut() {
                *first = Some(params);
            }
            all
        }
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| match item {
                Object::Dictionary(params) => Some(params),
                _ => None,
            })
            .collect(),
        _ => vec![None; count],
    }
}

fn apply_filter(data: &[u8], filter: Filter, params: Option<&Dictionary>) -> ParseResult<Vec<u8>> {
    match filter {
        Filter::FlateDecode => {
            let inflated = decode_flate(data)?;
            match params {
                Some(params) => apply_predictor(inflated, params),
                None => Ok(inflated),
            }
        }
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::Crypt => match params.and_then(|p| p.get_name("Name")) {
            None | Some("Identity") => Ok(data.to_vec()),
            Some(name) => Err(ParseError::StreamDecodeError(format!(
                "Crypt filter {name} cannot be decoded here"
            ))),
        },
    }
}

/// Decode FlateDecode (zlib/deflate) compressed data
#[cfg(feature = "compression")]
fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| ParseError::StreamDecodeError(format!("Flate decode error: {e}")))?;
    Ok(result)
}

#[cfg(not(feature = "compression"))]
fn decode_flate(_data: &[u8]) -> ParseResult<Vec<u8>> {
    Err(ParseError::StreamDecodeError(
        "FlateDecode requires 'compression' feature".to_string(),
    ))
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &ch in data {
        if ch == b'>' {
            break;
        }
        if super::lexer::is_whitespace(ch) {
            continue;
        }
        let value = hex_digit_value(ch).ok_or_else(|| {
            ParseError::StreamDecodeError(format!("Invalid hex digit: {}", ch as char))
        })?;
        match high.take() {
            Some(h) => result.push((h << 4) | value),
            None => high = Some(value),
        }
    }
    if let Some(h) = high {
        result.push(h << 4);
    }
    Ok(result)
}

fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

/// Undo a PNG (10..=15) or TIFF (2) predictor
fn apply_predictor(data: Vec<u8>, params: &Dictionary) -> ParseResult<Vec<u8>> {
    let predictor = params.get_integer("Predictor").unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }

    let param = |key: &str, default: i64| -> ParseResult<usize> {
        let value = params.get_integer(key).unwrap_or(default).max(1);
        usize::try_from(value).map_err(|_| {
            ParseError::StreamDecodeError(format!("Predictor parameter {key} out of range: {value}"))
        })
    };
    let colors = param("Colors", 1)?;
    let bits = param("BitsPerComponent", 8)?;
    let columns = param("Columns", 1)?;

    let overflow = || ParseError::StreamDecodeError("Predictor row size overflows".to_string());
    let bits_per_pixel = colors.checked_mul(bits).ok_or_else(overflow)?;
    let bytes_per_pixel = bits_per_pixel.div_ceil(8).max(1);
    let row_len = bits_per_pixel
        .checked_mul(columns)
        .ok_or_else(overflow)?
        .div_ceil(8);
    if data.is_empty() {
        return Ok(data);
    }
    if row_len > data.len() {
        return Err(ParseError::StreamDecodeError(format!(
            "Predictor row of {row_len} bytes exceeds {} bytes of data",
            data.len()
        )));
    }

    match predictor {
        2 => {
            if bits != 8 {
                return Err(ParseError::StreamDecodeError(format!(
                    "TIFF predictor with {bits} bits per component is not supported"
                )));
            }
            let mut out = data;
            for row in out.chunks_mut(row_len) {
                for i in bytes_per_pixel..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
                }
            }
            Ok(out)
        }
        10..=15 => decode_png_rows(&data, row_len, bytes_per_pixel),
        other => Err(ParseError::StreamDecodeError(format!(
            "Unsupported predictor: {other}"
        ))),
    }
}

fn decode_png_rows(data: &[u8], row_len: usize, bpp: usize) -> ParseResult<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&kind, encoded) = chunk
            .split_first()
            .ok_or_else(|| ParseError::StreamDecodeError("Empty predictor row".to_string()))?;
        let mut row = encoded.to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            row[i] = match kind {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(ParseError::StreamDecodeError(format!(
                        "Invalid PNG row filter: {other}"
                    )))
                }
            };
        }

        out.extend_from_slice(&row);
        previous = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_with(filter: Object, data: &[u8]) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Filter", filter);
        Stream::new(dict, data.to_vec())
    }

    #[test]
    fn test_decode_stream_no_filter() {
        let stream = Stream::new(Dictionary::new(), b"raw".to_vec());
        assert_eq!(decode_stream(&stream).unwrap(), b"raw");
    }

    #[test]
    fn test_ascii_hex_decode() {
        let stream = stream_with(Object::Name("ASCIIHexDecode".into()), b"48 65 6C6C 6F>");
        assert_eq!(decode_stream(&stream).unwrap(), b"Hello");
        assert_eq!(decode_ascii_hex(b"7").unwrap(), vec![0x70]);
        assert!(decode_ascii_hex(b"XY").is_err());
    }

    #[test]
    fn test_unknown_filter_is_error() {
        let stream = stream_with(Object::Name("JBIG2Decode".into()), b"");
        assert!(matches!(
            decode_stream(&stream),
            Err(ParseError::StreamDecodeError(_))
        ));
    }

    #[test]
    fn test_identity_crypt_filter_passes_through() {
        let stream = stream_with(Object::Name("Crypt".into()), b"data");
        assert_eq!(decode_stream(&stream).unwrap(), b"data");
    }

    #[test]
    fn test_png_up_predictor() {
        // Two rows of three columns, "Up" filter on the second
        let data = vec![0, 1, 2, 3, 2, 1, 1, 1];
        let mut params = Dictionary::new();
        params.set("Predictor", 12i64);
        params.set("Columns", 3i64);
        let decoded = apply_predictor(data, &params).unwrap();
        assert_eq!(decoded, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_png_sub_and_paeth_rows() {
        let mut params = Dictionary::new();
        params.set("Predictor", 15i64);
        params.set("Columns", 2i64);
        let decoded = apply_predictor(vec![1, 5, 1, 4, 0, 0], &params).unwrap();
        assert_eq!(decoded, vec![5, 6, 5, 6]);
    }

    #[test]
    fn test_invalid_png_row_type() {
        let mut params = Dictionary::new();
        params.set("Predictor", 12i64);
        params.set("Columns", 1i64);
        assert!(apply_predictor(vec![9, 0], &params).is_err());
    }

    #[test]
    fn test_predictor_rejects_oversized_rows() {
        let mut params = Dictionary::new();
        params.set("Predictor", 12i64);
        params.set("Columns", 4_611_686_018_427_387_904i64);
        assert!(matches!(
            apply_predictor(vec![0, 1, 2, 3], &params),
            Err(ParseError::StreamDecodeError(_))
        ));

        params.set("Columns", 5i64);
        assert!(matches!(
            apply_predictor(vec![0, 1, 2], &params),
            Err(ParseError::StreamDecodeError(_))
        ));

        params.set("Predictor", 2i64);
        params.set("Colors", i64::MAX);
        params.set("BitsPerComponent", i64::MAX);
        assert!(matches!(
            apply_predictor(vec![0, 1, 2], &params),
            Err(ParseError::StreamDecodeError(_))
        ));
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_flate_decode_with_predictor() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let rows = [2u8, 0, 1, 2, 1, 1];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&rows).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name("FlateDecode".into()));
        let mut params = Dictionary::new();
        params.set("Predictor", 12i64);
        params.set("Columns", 2i64);
        dict.set("DecodeParms", params);
        let stream = Stream::new(dict, compressed);

        assert_eq!(decode_stream(&stream).unwrap(), vec![0, 1, 1, 2]);
    }

    #[cfg(not(feature = "compression"))]
    #[test]
    fn test_flate_decode_not_supported() {
        assert!(decode_flate(b"compressed data").is_err());
    }
}
