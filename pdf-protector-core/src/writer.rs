//! Serialises a [`Document`] as a single-revision file with a classic
//! cross-reference table.

use crate::document::Document;
use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{debug, warn};

pub struct PdfWriter<W: Write> {
    writer: W,
    xref_positions: BTreeMap<u32, (u16, u64)>,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self {
            writer,
            xref_positions: BTreeMap::new(),
            current_position: 0,
        }
    }

    pub fn write_document(&mut self, document: &Document) -> Result<()> {
        self.write_header(&document.version)?;

        for (id, object) in &document.objects {
            if self.xref_positions.contains_key(&id.number()) {
                warn!("Object {id} shares its number with an earlier generation; skipped");
                continue;
            }
            self.write_object(*id, object)?;
        }

        let xref_position = self.current_position;
        self.write_xref()?;
        self.write_trailer(&document.trailer, xref_position)?;
        self.writer.flush()?;

        debug!(
            "Wrote {} objects, {} bytes",
            self.xref_positions.len(),
            self.current_position
        );
        Ok(())
    }

    /// Consume the writer, returning the underlying sink
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self, version: &str) -> Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<()> {
        self.xref_positions
            .insert(id.number(), (id.generation(), self.current_position));

        let header = format!("{} {} obj\n", id.number(), id.generation());
        self.write_bytes(header.as_bytes())?;

        self.write_object_value(object)?;

        self.write_bytes(b"\nendobj\n")?;
        Ok(())
    }

    fn write_object_value(&mut self, object: &Object) -> Result<()> {
        match object {
            Object::Null => self.write_bytes(b"null")?,
            Object::Boolean(b) => self.write_bytes(if *b { b"true" } else { b"false" })?,
            Object::Integer(i) => self.write_bytes(i.to_string().as_bytes())?,
            Object::Real(f) => self.write_bytes(format_real(*f).as_bytes())?,
            Object::String(s) => self.write_bytes(&encode_string(s))?,
            Object::Name(n) => self.write_bytes(encode_name(n).as_bytes())?,
            Object::Array(arr) => {
                self.write_bytes(b"[")?;
                for (i, obj) in arr.iter().enumerate() {
                    if i > 0 {
                        self.write_bytes(b" ")?;
                    }
                    self.write_object_value(obj)?;
                }
                self.write_bytes(b"]")?;
            }
            Object::Dictionary(dict) => self.write_dictionary(dict)?,
            Object::Stream(stream) => {
                let mut dict = stream.dictionary().clone();
                dict.set("Length", stream.data().len() as i64);
                self.write_dictionary(&dict)?;
                self.write_bytes(b"\nstream\n")?;
                self.write_bytes(stream.data())?;
                self.write_bytes(b"\nendstream")?;
            }
            Object::Reference(id) => {
                let ref_str = format!("{} {} R", id.number(), id.generation());
                self.write_bytes(ref_str.as_bytes())?;
            }
        }
        Ok(())
    }

    fn write_dictionary(&mut self, dict: &Dictionary) -> Result<()> {
        self.write_bytes(b"<<")?;
        for (key, value) in dict.iter() {
            self.write_bytes(b"\n")?;
            self.write_bytes(encode_name(key).as_bytes())?;
            self.write_bytes(b" ")?;
            self.write_object_value(value)?;
        }
        self.write_bytes(b"\n>>")?;
        Ok(())
    }

    fn write_xref(&mut self) -> Result<()> {
        self.write_bytes(b"xref\n")?;

        let max_obj_num = self.xref_positions.keys().max().copied().unwrap_or(0);

        // One subsection from 0 to max; gaps are written as free entries
        self.write_bytes(format!("0 {}\n", max_obj_num + 1).as_bytes())?;
        self.write_bytes(b"0000000000 65535 f \n")?;

        for obj_num in 1..=max_obj_num {
            let entry = match self.xref_positions.get(&obj_num) {
                Some((generation, position)) => format!("{position:010} {generation:05} n \n"),
                None => "0000000000 00000 f \n".to_string(),
            };
            self.write_bytes(entry.as_bytes())?;
        }

        Ok(())
    }

    fn write_trailer(&mut self, document_trailer: &Dictionary, xref_position: u64) -> Result<()> {
        let max_obj_num = self.xref_positions.keys().max().copied().unwrap_or(0);

        let mut trailer = document_trailer.clone();
        trailer.set("Size", i64::from(max_obj_num) + 1);

        self.write_bytes(b"trailer\n")?;
        self.write_dictionary(&trailer)?;
        self.write_bytes(b"\nstartxref\n")?;
        self.write_bytes(xref_position.to_string().as_bytes())?;
        self.write_bytes(b"\n%%EOF\n")?;

        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

/// Serialise `document` into a fresh buffer
pub fn write_to_vec(document: &Document) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new_with_writer(Vec::new());
    writer.write_document(document)?;
    Ok(writer.into_inner())
}

fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Literal string when the bytes are printable text, hex otherwise
fn encode_string(bytes: &[u8]) -> Vec<u8> {
    let printable = bytes
        .iter()
        .all(|&b| (0x20..0x7F).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'));

    if !printable {
        let mut out = Vec::with_capacity(bytes.len() * 2 + 2);
        out.push(b'<');
        for b in bytes {
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        }
        out.push(b'>');
        return out;
    }

    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            // A raw CR would be read back as LF
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(b),
        }
    }
    out.push(b')');
    out
}

fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    out.push('/');
    for &b in name.as_bytes() {
        let regular = (0x21..=0x7E).contains(&b)
            && !matches!(
                b,
                b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%'
            );
        if regular {
            out.push(b as char);
        } else {
            out.push_str(&format!("#{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Stream;
    use crate::parser::{ParseOptions, PdfReader};
    use pretty_assertions::assert_eq;

    fn sample_document() -> Document {
        let mut document = Document::new("1.5");
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name("Catalog".to_string()));
        catalog.set("Pages", ObjectId::new(2, 0));
        document.objects.insert(ObjectId::new(1, 0), catalog.into());

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name("Pages".to_string()));
        pages.set("Kids", Vec::<Object>::new());
        pages.set("Count", 0i64);
        document.objects.insert(ObjectId::new(2, 0), pages.into());

        let mut content = Dictionary::new();
        content.set("Length", 999i64);
        document.objects.insert(
            ObjectId::new(4, 0),
            Stream::new(content, b"\x00\x01endstream\xFF".to_vec()).into(),
        );

        let mut info = Dictionary::new();
        info.set("Title", b"A (nested) title\\".to_vec());
        info.set("Blob", vec![0u8, 0xFF, 0x10]);
        info.set("Ratio", 0.25f64);
        document.objects.insert(ObjectId::new(5, 3), info.into());

        document.trailer.set("Root", ObjectId::new(1, 0));
        document.trailer.set("Info", ObjectId::new(5, 3));
        document
    }

    #[test]
    fn test_write_header() {
        let mut buffer = Vec::new();
        let mut writer = PdfWriter::new_with_writer(&mut buffer);

        writer.write_header("1.7").unwrap();

        assert!(buffer.starts_with(b"%PDF-1.7\n"));
        assert_eq!(buffer.len(), 15);
        assert_eq!(buffer[9], b'%');
        assert_eq!(buffer[14], b'\n');
    }

    #[test]
    fn test_written_document_reads_back() {
        let original = sample_document();
        let bytes = write_to_vec(&original).unwrap();

        let reader = PdfReader::new(&bytes, ParseOptions::strict()).unwrap();
        let document = reader.read_document().unwrap();

        assert_eq!(document.version, "1.5");
        assert_eq!(document.objects.len(), original.objects.len());
        assert_eq!(
            document.get(ObjectId::new(1, 0)),
            original.get(ObjectId::new(1, 0))
        );
        assert_eq!(
            document.get(ObjectId::new(5, 3)),
            original.get(ObjectId::new(5, 3))
        );
        let stream = document
            .get(ObjectId::new(4, 0))
            .and_then(Object::as_stream)
            .unwrap();
        assert_eq!(stream.data(), b"\x00\x01endstream\xFF");
        assert_eq!(stream.dictionary().get_integer("Length"), Some(12));
        assert_eq!(document.trailer.get_integer("Size"), Some(6));
    }

    #[test]
    fn test_xref_table_layout() {
        let bytes = write_to_vec(&sample_document()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("xref\n0 6\n0000000000 65535 f \n"));
        // Object 3 is a gap
        assert!(text.contains("0000000000 00000 f \n"));
        assert!(text.contains(" 00003 n \n"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_encode_string() {
        assert_eq!(encode_string(b"plain"), b"(plain)");
        assert_eq!(encode_string(b"a(b)c\\"), b"(a\\(b\\)c\\\\)");
        assert_eq!(encode_string(b"line\rbreak"), b"(line\\rbreak)");
        assert_eq!(encode_string(&[0x00, 0xAB]), b"<00AB>");
        assert_eq!(encode_string(b""), b"()");
    }

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("Type"), "/Type");
        assert_eq!(encode_name("A B"), "/A#20B");
        assert_eq!(encode_name("x#y"), "/x#23y");
        assert_eq!(encode_name("caf\u{e9}"), "/caf#C3#A9");
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(0.25), "0.25");
        assert_eq!(format_real(10.0), "10");
        assert_eq!(format_real(-0.0), "0");
        assert_eq!(format_real(-1.5), "-1.5");
    }
}
