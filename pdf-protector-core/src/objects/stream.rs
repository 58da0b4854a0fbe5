use crate::objects::{Dictionary, Object};

/// Stream dictionary plus its raw (possibly encoded, possibly encrypted)
/// data.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dictionary: Dictionary,
    data: Vec<u8>,
}

impl Stream {
    pub fn new(dictionary: Dictionary, data: Vec<u8>) -> Self {
        Self { dictionary, data }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the data; `Length` is refreshed when the stream is written.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    pub fn into_parts(self) -> (Dictionary, Vec<u8>) {
        (self.dictionary, self.data)
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.dictionary.get_type() == Some(name)
    }

    /// Names listed in `/Filter`, in application order.
    pub fn filters(&self) -> Vec<&str> {
        match self.dictionary.get("Filter") {
            Some(Object::Name(name)) => vec![name.as_str()],
            Some(Object::Array(items)) => items.iter().filter_map(Object::as_name).collect(),
            _ => Vec::new(),
        }
    }

    /// Decode the data through the stream's filters.
    pub fn decoded_data(&self) -> crate::parser::ParseResult<Vec<u8>> {
        crate::parser::filters::decode_stream(self)
    }
}
