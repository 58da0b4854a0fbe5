//! Object streams (ISO 32000-1 Section 7.5.7)

use super::lexer::{Lexer, Token};
use super::objects::parse_object;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Object, Stream};

/// Objects unpacked from one `/Type /ObjStm` stream
#[derive(Debug, Clone, Default)]
pub struct ObjectStream {
    /// `(object number, object)` in stream order
    pub objects: Vec<(u32, Object)>,
}

impl ObjectStream {
    /// Decode and parse an object stream whose data is already plaintext
    pub fn parse(stream: &Stream, options: &ParseOptions) -> ParseResult<Self> {
        if !stream.is_type("ObjStm") {
            return Err(ParseError::SyntaxError {
                position: 0,
                message: "Not an object stream".to_string(),
            });
        }

        let dict = stream.dictionary();
        let count = dict
            .get_integer("N")
            .filter(|n| *n >= 0)
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))? as usize;
        let first = dict
            .get_integer("First")
            .filter(|n| *n >= 0)
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))? as usize;

        let data = stream.decoded_data()?;
        let mut lexer = Lexer::new(&data);

        // Every header entry takes at least two bytes of data
        let mut header = Vec::with_capacity(count.min(data.len() / 2));
        for _ in 0..count {
            match (lexer.next_token()?, lexer.next_token()?) {
                (Token::Integer(number), Token::Integer(offset))
                    if number >= 0 && offset >= 0 =>
                {
                    let number = u32::try_from(number).map_err(|_| ParseError::SyntaxError {
                        position: lexer.position(),
                        message: format!("Object number {number} out of range"),
                    })?;
                    header.push((number, offset as usize));
                }
                _ => {
                    return Err(ParseError::SyntaxError {
                        position: lexer.position(),
                        message: "Malformed object stream header".to_string(),
                    })
                }
            }
        }

        let mut objects = Vec::with_capacity(header.len());
        for (number, offset) in header {
            let position = first.checked_add(offset).filter(|p| *p <= data.len()).ok_or_else(
                || ParseError::SyntaxError {
                    position: offset,
                    message: format!("Object {number} lies outside its object stream"),
                },
            )?;
            lexer.seek(position);
            let object = parse_object(&mut lexer, options)?;
            objects.push((number, object));
        }

        Ok(Self { objects })
    }

    /// Object at `index`, checking that its number matches
    pub fn get(&self, index: usize, number: u32) -> Option<&Object> {
        self.objects
            .get(index)
            .filter(|(n, _)| *n == number)
            .map(|(_, object)| object)
            .or_else(|| {
                self.objects
                    .iter()
                    .find(|(n, _)| *n == number)
                    .map(|(_, object)| object)
            })
    }
}
