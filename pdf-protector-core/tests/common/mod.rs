//! In-memory PDF fixtures for integration tests
//!
//! Every builder computes real byte offsets, so the output parses under
//! the strict reader.

#![allow(dead_code)]

/// Indirect object body (without the `n g obj` wrapper)
pub struct Obj {
    pub number: u32,
    pub body: Vec<u8>,
}

impl Obj {
    pub fn new(number: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            number,
            body: body.into(),
        }
    }

    pub fn stream(number: u32, dict_entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {dict_entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        Self { number, body }
    }
}

pub const PAGE_TEXT: &[u8] = b"BT /F1 24 Tf 72 720 Td (Hello, protected world) Tj ET";

/// Catalog, page tree, one page, its content stream, a font and an Info
/// dictionary
pub fn one_page_objects() -> Vec<Obj> {
    vec![
        Obj::new(1, "<< /Type /Catalog /Pages 2 0 R >>"),
        Obj::new(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
        Obj::new(
            3,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>",
        ),
        Obj::stream(4, "", PAGE_TEXT),
        Obj::new(5, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
        Obj::new(
            6,
            "<< /Title (Quarterly \\(draft\\) report) /Author <4A616E65> /Producer (fixtures) >>",
        ),
    ]
}

fn push_objects(out: &mut Vec<u8>, objects: &[Obj]) -> Vec<(u32, usize)> {
    let mut offsets = Vec::new();
    for obj in objects {
        offsets.push((obj.number, out.len()));
        out.extend_from_slice(format!("{} 0 obj\n", obj.number).as_bytes());
        out.extend_from_slice(&obj.body);
        out.extend_from_slice(b"\nendobj\n");
    }
    offsets
}

/// Classic xref section with one subsection per contiguous run
fn push_xref_table(out: &mut Vec<u8>, offsets: &[(u32, usize)], include_zero: bool) -> usize {
    let start = out.len();
    let mut entries: Vec<(u32, Option<usize>)> = offsets.iter().map(|(n, o)| (*n, Some(*o))).collect();
    if include_zero {
        entries.push((0, None));
    }
    entries.sort_by_key(|(n, _)| *n);

    out.extend_from_slice(b"xref\n");
    let mut i = 0;
    while i < entries.len() {
        let mut j = i + 1;
        while j < entries.len() && entries[j].0 == entries[j - 1].0 + 1 {
            j += 1;
        }
        out.extend_from_slice(format!("{} {}\n", entries[i].0, j - i).as_bytes());
        for (_, offset) in &entries[i..j] {
            match offset {
                Some(offset) => out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }
        i = j;
    }
    start
}

fn push_trailer(out: &mut Vec<u8>, size: u32, extra: &str, xref_offset: usize) {
    out.extend_from_slice(format!("trailer\n<< /Size {size} {extra} >>\n").as_bytes());
    out.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
}

fn header(version: &str) -> Vec<u8> {
    let mut out = format!("%PDF-{version}\n").into_bytes();
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
    out
}

fn max_number(objects: &[Obj]) -> u32 {
    objects.iter().map(|o| o.number).max().unwrap_or(0)
}

/// Single-section file with a classic xref table
pub fn classic_pdf(version: &str, objects: &[Obj], trailer_extra: &str) -> Vec<u8> {
    let mut out = header(version);
    let offsets = push_objects(&mut out, objects);
    let xref = push_xref_table(&mut out, &offsets, true);
    push_trailer(&mut out, max_number(objects) + 1, trailer_extra, xref);
    out
}

/// The standard one-page document
pub fn one_page_pdf() -> Vec<u8> {
    classic_pdf("1.4", &one_page_objects(), "/Root 1 0 R /Info 6 0 R")
}

/// One-page document plus an incremental update that replaces the Info
/// dictionary and adds an unreferenced stream
pub fn incrementally_updated_pdf() -> Vec<u8> {
    let mut out = one_page_pdf();
    let base_xref = last_startxref(&out);

    let update = [
        Obj::new(6, "<< /Title (Final report) /Producer (fixtures) >>"),
        Obj::stream(7, "", b"% appended content"),
    ];
    let offsets = push_objects(&mut out, &update);
    let xref = push_xref_table(&mut out, &offsets, false);
    push_trailer(
        &mut out,
        8,
        &format!("/Root 1 0 R /Info 6 0 R /Prev {base_xref}"),
        xref,
    );
    out
}

/// File whose cross-reference data is an uncompressed xref stream
/// (`W [1 4 2]`); `packed` objects live in an object stream
pub fn xref_stream_pdf(version: &str, objects: &[Obj], packed: &[Obj], trailer_extra: &str) -> Vec<u8> {
    let mut out = header(version);
    let mut all = Vec::new();
    let offsets = push_objects(&mut out, objects);

    let objstm_number = max_number(objects).max(max_number(packed)) + 1;
    let mut locations = Vec::new();
    if !packed.is_empty() {
        let stream = object_stream(objstm_number, packed);
        let objstm_offsets = push_objects(&mut out, std::slice::from_ref(&stream));
        all.extend(objstm_offsets.iter().map(|(n, o)| (*n, 1u8, *o as u32, 0u16)));
        for (index, obj) in packed.iter().enumerate() {
            locations.push((obj.number, 2u8, objstm_number, index as u16));
        }
    }
    all.extend(offsets.iter().map(|(n, o)| (*n, 1u8, *o as u32, 0u16)));
    all.extend(locations);

    let xref_number = objstm_number + 1;
    let xref_offset = out.len();
    all.push((xref_number, 1, xref_offset as u32, 0));
    all.sort_by_key(|e| e.0);

    let size = xref_number + 1;
    let mut data = Vec::new();
    for number in 0..size {
        match all.iter().find(|e| e.0 == number) {
            Some((_, kind, field2, field3)) => {
                data.push(*kind);
                data.extend_from_slice(&field2.to_be_bytes());
                data.extend_from_slice(&field3.to_be_bytes());
            }
            None => {
                data.push(0);
                data.extend_from_slice(&0u32.to_be_bytes());
                data.extend_from_slice(&(if number == 0 { 65535u16 } else { 0 }).to_be_bytes());
            }
        }
    }

    let xref = Obj::stream(
        xref_number,
        &format!("/Type /XRef /Size {size} /W [1 4 2] {trailer_extra}"),
        &data,
    );
    push_objects(&mut out, std::slice::from_ref(&xref));
    out.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
    out
}

/// The one-page document with the page tree and font packed in an object
/// stream
pub fn object_stream_pdf() -> Vec<u8> {
    let objects = one_page_objects();
    let (packed, direct): (Vec<Obj>, Vec<Obj>) = objects
        .into_iter()
        .partition(|o| o.number == 2 || o.number == 5);
    xref_stream_pdf("1.5", &direct, &packed, "/Root 1 0 R /Info 6 0 R")
}

/// Object stream holding `objects` (bodies must not be streams)
pub fn object_stream(number: u32, objects: &[Obj]) -> Obj {
    let mut header = String::new();
    let mut body = Vec::new();
    for obj in objects {
        header.push_str(&format!("{} {} ", obj.number, body.len()));
        body.extend_from_slice(&obj.body);
        body.push(b'\n');
    }
    let first = header.len();
    let mut data = header.into_bytes();
    data.extend_from_slice(&body);
    Obj::stream(
        number,
        &format!("/Type /ObjStm /N {} /First {first}", objects.len()),
        &data,
    )
}

fn last_startxref(data: &[u8]) -> usize {
    let text = String::from_utf8_lossy(data);
    let pos = text.rfind("startxref").expect("fixture has startxref");
    text[pos + "startxref".len()..]
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .expect("fixture startxref offset")
}

/// Whether `needle` occurs in `haystack`
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
