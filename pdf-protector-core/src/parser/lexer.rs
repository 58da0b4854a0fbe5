//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. Works on an
//! in-memory buffer so callers can jump to xref offsets freely.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal), raw bytes
    String(Vec<u8>),

    /// Name object without the slash, `#xx` escapes resolved
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// Xref keyword
    XRef,

    /// Trailer keyword
    Trailer,

    /// StartXRef keyword
    StartXRef,

    /// Null object
    Null,

    /// Any other bare word (`R`, `n`, `f`, ...)
    Keyword(String),

    /// Comment (usually ignored)
    Comment(Vec<u8>),

    /// End of input
    Eof,
}

impl Token {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Boolean(b) => b.to_string(),
            Token::Integer(i) => i.to_string(),
            Token::Real(r) => r.to_string(),
            Token::String(_) => "string".to_string(),
            Token::Name(n) => format!("/{n}"),
            Token::ArrayStart => "[".to_string(),
            Token::ArrayEnd => "]".to_string(),
            Token::DictStart => "<<".to_string(),
            Token::DictEnd => ">>".to_string(),
            Token::Stream => "stream".to_string(),
            Token::EndStream => "endstream".to_string(),
            Token::Obj => "obj".to_string(),
            Token::EndObj => "endobj".to_string(),
            Token::XRef => "xref".to_string(),
            Token::Trailer => "trailer".to_string(),
            Token::StartXRef => "startxref".to_string(),
            Token::Null => "null".to_string(),
            Token::Keyword(k) => k.clone(),
            Token::Comment(_) => "comment".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// PDF whitespace characters (ISO 32000-1 Table 1)
pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// PDF delimiter characters (ISO 32000-1 Table 2)
pub fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Position of `needle` in `haystack` at or after `from`.
pub fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Position of the last `needle` in `haystack`.
pub fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// PDF Lexer over an in-memory buffer
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    token_buffer: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            token_buffer: Vec::new(),
        }
    }

    /// Create a lexer positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            position: offset.min(data.len()),
            token_buffer: Vec::new(),
        }
    }

    /// The whole input buffer
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current byte position. Pushed-back tokens are not accounted for.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Jump to `offset`, dropping any pushed-back tokens
    pub fn seek(&mut self, offset: usize) {
        self.position = offset.min(self.data.len());
        self.token_buffer.clear();
    }

    /// Push a token back; tokens are returned in LIFO order
    pub fn push_token(&mut self, token: Token) {
        self.token_buffer.push(token);
    }

    /// Get the next token, skipping comments
    pub fn next_token(&mut self) -> ParseResult<Token> {
        loop {
            match self.next_raw_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let token = self.next_token()?;
        self.push_token(token.clone());
        Ok(token)
    }

    /// Get the next token, including comments
    pub fn next_raw_token(&mut self) -> ParseResult<Token> {
        if let Some(token) = self.token_buffer.pop() {
            return Ok(token);
        }

        self.skip_whitespace();

        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.position += 1;
                if self.peek_char() == Some(b'>') {
                    self.position += 1;
                    Ok(Token::DictEnd)
                } else {
                    Err(self.syntax_error("Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if is_delimiter(ch) => {
                Err(self.syntax_error(format!("Unexpected delimiter: {}", ch as char)))
            }
            _ => Ok(self.read_keyword()),
        }
    }

    /// Expect a specific token
    pub fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let position = self.position;
        let token = self.next_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                position,
                expected: expected.describe(),
                found: token.describe(),
            })
        }
    }

    /// Skip PDF whitespace, returning the number of bytes skipped
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.position += 1;
            } else {
                break;
            }
        }
        self.position - start
    }

    /// Consume the end-of-line that follows the `stream` keyword.
    ///
    /// ISO 32000 requires CRLF or LF; a lone CR is accepted as well since
    /// many writers emit it.
    pub fn read_stream_eol(&mut self) {
        while self.peek_char() == Some(b' ') {
            self.position += 1;
        }
        match self.peek_char() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_char() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    /// Read exactly `n` raw bytes
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                self.syntax_error(format!(
                    "Unexpected end of input reading {n} bytes ({} available)",
                    self.data.len() - self.position
                ))
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Position of the next occurrence of `sequence` from the current
    /// position, without moving
    pub fn find_ahead(&self, sequence: &[u8]) -> Option<usize> {
        find_bytes(self.data, sequence, self.position)
    }

    fn peek_char(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn consume_char(&mut self) -> Option<u8> {
        let ch = self.peek_char();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::SyntaxError {
            position: self.position,
            message: message.into(),
        }
    }

    fn read_comment(&mut self) -> Token {
        self.position += 1;
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.position += 1;
        }
        Token::Comment(self.data[start..self.position].to_vec())
    }

    fn read_name(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut name = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;

            if ch == b'#' {
                let hex = self
                    .data
                    .get(self.position..self.position + 2)
                    .and_then(|digits| std::str::from_utf8(digits).ok())
                    .and_then(|digits| u8::from_str_radix(digits, 16).ok());
                match hex {
                    Some(value) => {
                        name.push(value);
                        self.position += 2;
                    }
                    // A bare '#' is kept literally, as PDF 1.1 writers did
                    None => name.push(b'#'),
                }
            } else {
                name.push(ch);
            }
        }

        Ok(Token::Name(String::from_utf8_lossy(&name).into_owned()))
    }

    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.position += 1;
        let mut string = Vec::new();
        let mut depth = 1usize;

        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated string"))?;

            match ch {
                b'\\' => {
                    let escaped = self
                        .consume_char()
                        .ok_or_else(|| self.syntax_error("Unterminated string escape"))?;
                    match escaped {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(0x08),
                        b'f' => string.push(0x0C),
                        b'(' | b')' | b'\\' => string.push(escaped),
                        b'0'..=b'7' => {
                            let mut value = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.peek_char() {
                                    Some(digit @ b'0'..=b'7') => {
                                        value = value * 8 + u32::from(digit - b'0');
                                        self.position += 1;
                                    }
                                    _ => break,
                                }
                            }
                            string.push((value & 0xFF) as u8);
                        }
                        // Line continuation
                        b'\r' => {
                            if self.peek_char() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        // Unknown escapes drop the backslash
                        other => string.push(other),
                    }
                }
                b'(' => {
                    depth += 1;
                    string.push(ch);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    string.push(ch);
                }
                // Unescaped end-of-line markers read as a single LF
                b'\r' => {
                    if self.peek_char() == Some(b'\n') {
                        self.position += 1;
                    }
                    string.push(b'\n');
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.position += 1;
        if self.peek_char() == Some(b'<') {
            self.position += 1;
            return Ok(Token::DictStart);
        }

        let mut nibbles = Vec::new();
        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated hex string"))?;
            match ch {
                b'>' => break,
                _ if is_whitespace(ch) => continue,
                b'0'..=b'9' => nibbles.push(ch - b'0'),
                b'a'..=b'f' => nibbles.push(ch - b'a' + 10),
                b'A'..=b'F' => nibbles.push(ch - b'A' + 10),
                _ => {
                    return Err(self.syntax_error(format!(
                        "Invalid character in hex string: {}",
                        ch as char
                    )))
                }
            }
        }

        // An odd final digit is followed by an implied 0
        if nibbles.len() % 2 == 1 {
            nibbles.push(0);
        }

        let bytes = nibbles
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect();
        Ok(Token::String(bytes))
    }

    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        if matches!(self.peek_char(), Some(b'+' | b'-')) {
            self.position += 1;
        }
        let mut has_dot = false;
        let mut has_digit = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' => has_digit = true,
                b'.' if !has_dot => has_dot = true,
                _ => break,
            }
            self.position += 1;
        }

        let text = std::str::from_utf8(&self.data[start..self.position])
            .map_err(|_| self.syntax_error("Invalid number"))?;

        if !has_digit {
            // "+", "-" and "." alone read as zero, like most viewers do
            return Ok(if has_dot {
                Token::Real(0.0)
            } else {
                Token::Integer(0)
            });
        }

        if has_dot {
            let normalized = if text.ends_with('.') {
                format!("{text}0")
            } else {
                text.to_string()
            };
            normalized
                .parse::<f64>()
                .map(Token::Real)
                .map_err(|_| self.syntax_error(format!("Invalid real number: {text}")))
        } else {
            match text.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(value)),
                // Out-of-range integers degrade to reals
                Err(_) => text
                    .parse::<f64>()
                    .map(Token::Real)
                    .map_err(|_| self.syntax_error(format!("Invalid integer: {text}"))),
            }
        }
    }

    fn read_keyword(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;
        }
        let word = &self.data[start..self.position];
        match word {
            b"true" => Token::Boolean(true),
            b"false" => Token::Boolean(false),
            b"null" => Token::Null,
            b"obj" => Token::Obj,
            b"endobj" => Token::EndObj,
            b"stream" => Token::Stream,
            b"endstream" => Token::EndStream,
            b"xref" => Token::XRef,
            b"trailer" => Token::Trailer,
            b"startxref" => Token::StartXRef,
            other => Token::Keyword(String::from_utf8_lossy(other).into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn test_lexer_basic_tokens() {
        assert_eq!(
            tokens(b"true false null 123 -456 2.5 .5 4. /Name"),
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
                Token::Integer(123),
                Token::Integer(-456),
                Token::Real(2.5),
                Token::Real(0.5),
                Token::Real(4.0),
                Token::Name("Name".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_keywords() {
        assert_eq!(
            tokens(b"1 0 obj endobj stream endstream xref trailer startxref R f n"),
            vec![
                Token::Integer(1),
                Token::Integer(0),
                Token::Obj,
                Token::EndObj,
                Token::Stream,
                Token::EndStream,
                Token::XRef,
                Token::Trailer,
                Token::StartXRef,
                Token::Keyword("R".to_string()),
                Token::Keyword("f".to_string()),
                Token::Keyword("n".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_dictionaries_and_arrays() {
        assert_eq!(
            tokens(b"<</Kids[1 2]>>"),
            vec![
                Token::DictStart,
                Token::Name("Kids".to_string()),
                Token::ArrayStart,
                Token::Integer(1),
                Token::Integer(2),
                Token::ArrayEnd,
                Token::DictEnd,
            ]
        );
    }

    #[test]
    fn test_lexer_string_literal_escapes() {
        assert_eq!(
            tokens(br"(a\nb\(c\)\\\101\0)"),
            vec![Token::String(b"a\nb(c)\\A\0".to_vec())]
        );
        assert_eq!(
            tokens(b"(nested (parens) ok)"),
            vec![Token::String(b"nested (parens) ok".to_vec())]
        );
        assert_eq!(
            tokens(b"(line\\\r\ncontinued)"),
            vec![Token::String(b"linecontinued".to_vec())]
        );
        assert_eq!(
            tokens(b"(cr\r\nlf)"),
            vec![Token::String(b"cr\nlf".to_vec())]
        );
    }

    #[test]
    fn test_lexer_hexadecimal_strings() {
        assert_eq!(
            tokens(b"<48656C6C6F> <4 8 6> <>"),
            vec![
                Token::String(b"Hello".to_vec()),
                Token::String(vec![0x48, 0x60]),
                Token::String(Vec::new()),
            ]
        );
    }

    #[test]
    fn test_lexer_binary_string_bytes_survive() {
        assert_eq!(
            tokens(b"<FF00fe>"),
            vec![Token::String(vec![0xFF, 0x00, 0xFE])]
        );
    }

    #[test]
    fn test_lexer_names_with_hex_escapes() {
        assert_eq!(
            tokens(b"/A#20B /Adobe#2EPubSec /#"),
            vec![
                Token::Name("A B".to_string()),
                Token::Name("Adobe.PubSec".to_string()),
                Token::Name("#".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_comments_are_skipped() {
        assert_eq!(
            tokens(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n42"),
            vec![Token::Integer(42)]
        );
        let mut lexer = Lexer::new(b"%comment\n1");
        assert_eq!(
            lexer.next_raw_token().unwrap(),
            Token::Comment(b"comment".to_vec())
        );
    }

    #[test]
    fn test_lexer_push_back_is_lifo() {
        let mut lexer = Lexer::new(b"1 2 3");
        let a = lexer.next_token().unwrap();
        let b = lexer.next_token().unwrap();
        lexer.push_token(b);
        lexer.push_token(a);
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(1));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(2));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(3));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_lexer_unterminated_string_is_error() {
        let mut lexer = Lexer::new(b"(never closed");
        assert!(matches!(
            lexer.next_token(),
            Err(ParseError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_lexer_invalid_hex_is_error() {
        let mut lexer = Lexer::new(b"<12G4>");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_read_bytes_and_stream_eol() {
        let mut lexer = Lexer::new(b"stream\r\nABCDE\nendstream");
        assert_eq!(lexer.next_token().unwrap(), Token::Stream);
        lexer.read_stream_eol();
        assert_eq!(lexer.read_bytes(5).unwrap(), b"ABCDE");
        assert_eq!(lexer.next_token().unwrap(), Token::EndStream);
        assert!(lexer.read_bytes(1).is_err());
    }

    #[test]
    fn test_find_helpers() {
        let data = b"abc startxref 10 startxref 20";
        assert_eq!(find_bytes(data, b"startxref", 0), Some(4));
        assert_eq!(rfind_bytes(data, b"startxref"), Some(17));
        assert_eq!(find_bytes(data, b"missing", 0), None);
    }

    #[test]
    fn test_integer_overflow_degrades_to_real() {
        assert!(matches!(
            tokens(b"99999999999999999999").as_slice(),
            [Token::Real(_)]
        ));
    }
}
