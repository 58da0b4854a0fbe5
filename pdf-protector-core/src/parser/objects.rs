//! PDF object parser
//!
//! Builds [`Object`] values from lexer tokens. Indirect references
//! (`N G R`) are recognised by two-token lookahead after an integer.

use super::lexer::{Lexer, Token};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Parse one direct object at the lexer's position
pub fn parse_object(lexer: &mut Lexer<'_>, options: &ParseOptions) -> ParseResult<Object> {
    parse_object_at_depth(lexer, options, 0)
}

fn parse_object_at_depth(
    lexer: &mut Lexer<'_>,
    options: &ParseOptions,
    depth: usize,
) -> ParseResult<Object> {
    if depth > options.max_nesting_depth {
        return Err(ParseError::NestingTooDeep {
            limit: options.max_nesting_depth,
        });
    }

    let position = lexer.position();
    let token = lexer.next_token()?;
    match token {
        Token::Null => Ok(Object::Null),
        Token::Boolean(b) => Ok(Object::Boolean(b)),
        Token::Real(r) => Ok(Object::Real(r)),
        Token::String(s) => Ok(Object::String(s)),
        Token::Name(n) => Ok(Object::Name(n)),
        Token::Integer(number) => parse_integer_or_reference(lexer, number),
        Token::ArrayStart => {
            let mut items = Vec::new();
            loop {
                match lexer.next_token()? {
                    Token::ArrayEnd => break,
                    Token::Eof => {
                        return Err(ParseError::SyntaxError {
                            position,
                            message: "Unterminated array".to_string(),
                        })
                    }
                    token => {
                        lexer.push_token(token);
                        items.push(parse_object_at_depth(lexer, options, depth + 1)?);
                    }
                }
            }
            Ok(Object::Array(items))
        }
        Token::DictStart => Ok(Object::Dictionary(parse_dictionary_body(
            lexer, options, depth,
        )?)),
        other => Err(ParseError::UnexpectedToken {
            position,
            expected: "object".to_string(),
            found: other.describe(),
        }),
    }
}

fn parse_integer_or_reference(lexer: &mut Lexer<'_>, number: i64) -> ParseResult<Object> {
    let second = lexer.next_token()?;
    if let Token::Integer(generation) = second {
        let third = lexer.next_token()?;
        if third == Token::Keyword("R".to_string()) {
            return match (u32::try_from(number), u16::try_from(generation)) {
                (Ok(n), Ok(g)) => Ok(Object::Reference(ObjectId::new(n, g))),
                _ => Err(ParseError::SyntaxError {
                    position: lexer.position(),
                    message: format!("Invalid object reference {number} {generation} R"),
                }),
            };
        }
        lexer.push_token(third);
    }
    lexer.push_token(second);
    Ok(Object::Integer(number))
}

/// Parse dictionary entries after `<<` up to and including `>>`
fn parse_dictionary_body(
    lexer: &mut Lexer<'_>,
    options: &ParseOptions,
    depth: usize,
) -> ParseResult<Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let position = lexer.position();
        match lexer.next_token()? {
            Token::DictEnd => break,
            Token::Name(key) => {
                let value = parse_object_at_depth(lexer, options, depth + 1)?;
                // A null value is equivalent to an absent entry
                if !value.is_null() {
                    dict.set(key, value);
                }
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    position,
                    expected: "dictionary key".to_string(),
                    found: other.describe(),
                })
            }
        }
    }
    Ok(dict)
}

/// Parse a dictionary that must start at the lexer's position
pub fn parse_dictionary(lexer: &mut Lexer<'_>, options: &ParseOptions) -> ParseResult<Dictionary> {
    let position = lexer.position();
    match parse_object(lexer, options)? {
        Object::Dictionary(dict) => Ok(dict),
        other => Err(ParseError::UnexpectedToken {
            position,
            expected: "dictionary".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

/// How a stream's `Length` entry resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLength {
    Known(usize),
    /// Indirect length that could not be read; the data end is found by
    /// scanning for `endstream`
    Unknown,
}

/// Parse `N G obj <object> endobj` at the lexer's position.
///
/// `resolve_length` is consulted when a stream's `Length` is an indirect
/// reference.
pub fn parse_indirect_object<F>(
    lexer: &mut Lexer<'_>,
    options: &ParseOptions,
    mut resolve_length: F,
) -> ParseResult<(ObjectId, Object)>
where
    F: FnMut(ObjectId) -> Option<i64>,
{
    let position = lexer.position();
    let id = match (lexer.next_token()?, lexer.next_token()?, lexer.next_token()?) {
        (Token::Integer(n), Token::Integer(g), Token::Obj) => {
            match (u32::try_from(n), u16::try_from(g)) {
                (Ok(n), Ok(g)) => ObjectId::new(n, g),
                _ => {
                    return Err(ParseError::SyntaxError {
                        position,
                        message: format!("Invalid object header {n} {g} obj"),
                    })
                }
            }
        }
        (a, b, c) => {
            return Err(ParseError::UnexpectedToken {
                position,
                expected: "object header".to_string(),
                found: format!("{} {} {}", a.describe(), b.describe(), c.describe()),
            })
        }
    };

    let object = parse_object(lexer, options)?;

    let object = match object {
        Object::Dictionary(dict) => match lexer.next_token()? {
            Token::Stream => {
                let length = match dict.get("Length") {
                    Some(Object::Integer(n)) if *n >= 0 => StreamLength::Known(*n as usize),
                    Some(Object::Reference(length_id)) => match resolve_length(*length_id) {
                        Some(n) if n >= 0 => StreamLength::Known(n as usize),
                        _ => StreamLength::Unknown,
                    },
                    _ => StreamLength::Unknown,
                };
                let data = read_stream_data(lexer, options, id, length)?;
                Object::Stream(Stream::new(dict, data))
            }
            token => {
                lexer.push_token(token);
                Object::Dictionary(dict)
            }
        },
        other => other,
    };

    match lexer.next_token()? {
        Token::EndObj => {}
        token if options.strict_mode => {
            return Err(ParseError::UnexpectedToken {
                position: lexer.position(),
                expected: "endobj".to_string(),
                found: token.describe(),
            })
        }
        token => {
            tracing::warn!("Object {} is missing endobj", id);
            lexer.push_token(token);
        }
    }

    Ok((id, object))
}

/// Read stream data after the `stream` keyword.
fn read_stream_data(
    lexer: &mut Lexer<'_>,
    options: &ParseOptions,
    id: ObjectId,
    length: StreamLength,
) -> ParseResult<Vec<u8>> {
    lexer.read_stream_eol();
    let start = lexer.position();

    if let StreamLength::Known(length) = length {
        if let Ok(bytes) = lexer.read_bytes(length) {
            let data = bytes.to_vec();
            if matches!(lexer.next_token(), Ok(Token::EndStream)) {
                return Ok(data);
            }
        }
        if !options.lenient_streams {
            return Err(ParseError::SyntaxError {
                position: start,
                message: format!(
                    "Stream of object {} is truncated or its Length ({length}) is wrong",
                    id
                ),
            });
        }
        tracing::warn!(
            "Stream of object {} does not end after {} bytes, scanning for endstream",
            id,
            length
        );
    }

    lexer.seek(start);
    let end = lexer
        .find_ahead(b"endstream")
        .ok_or_else(|| ParseError::SyntaxError {
            position: start,
            message: format!("Stream of object {} has no endstream", id),
        })?;

    // The EOL before endstream is not part of the data
    let mut data_end = end;
    if data_end > start && lexer.data()[data_end - 1] == b'\n' {
        data_end -= 1;
    }
    if data_end > start && lexer.data()[data_end - 1] == b'\r' {
        data_end -= 1;
    }

    let data = lexer.data()[start..data_end].to_vec();
    lexer.seek(end);
    lexer.expect(Token::EndStream)?;
    Ok(data)
}
