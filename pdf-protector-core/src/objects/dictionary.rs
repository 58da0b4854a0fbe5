use crate::objects::{Object, ObjectId};
use std::collections::BTreeMap;

/// PDF dictionary keyed by name (without the leading slash).
///
/// Ordered so that a rewritten document serialises deterministically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: BTreeMap<String, Object>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Object>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Object)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Object)> {
        self.entries.iter_mut()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.entries.values_mut()
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Object::as_name)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Object::as_bool)
    }

    pub fn get_string(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_string)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Object>> {
        self.get(key).and_then(Object::as_array)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(|obj| match obj {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        })
    }

    pub fn get_reference(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(Object::as_reference)
    }

    /// `/Type` value, if any.
    pub fn get_type(&self) -> Option<&str> {
        self.get_name("Type")
    }
}

impl FromIterator<(String, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, Object)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Dictionary {
    type Item = (String, Object);
    type IntoIter = std::collections::btree_map::IntoIter<String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name("Catalog".to_string()));
        dict.set("Count", 3i64);
        dict.set("EncryptMetadata", false);
        dict.set("ID", vec![0x01u8, 0x02]);
        dict.set("Pages", ObjectId::new(2, 0));

        assert_eq!(dict.get_type(), Some("Catalog"));
        assert_eq!(dict.get_integer("Count"), Some(3));
        assert_eq!(dict.get_bool("EncryptMetadata"), Some(false));
        assert_eq!(dict.get_string("ID"), Some(&[1u8, 2][..]));
        assert_eq!(dict.get_reference("Pages"), Some(ObjectId::new(2, 0)));
        assert_eq!(dict.get_name("Count"), None);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut dict = Dictionary::new();
        dict.set("Size", 4i64);
        dict.set("Root", ObjectId::new(1, 0));
        dict.set("Info", ObjectId::new(3, 0));

        let keys: Vec<&str> = dict.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Info", "Root", "Size"]);
    }

    #[test]
    fn test_remove_and_contains() {
        let mut dict = Dictionary::new();
        dict.set("Encrypt", ObjectId::new(9, 0));
        assert!(dict.contains_key("Encrypt"));
        assert!(dict.remove("Encrypt").is_some());
        assert!(!dict.contains_key("Encrypt"));
        assert!(dict.is_empty());
    }
}
