// AMF0 ordered object

use super::AMF0Value;

/// AMF0 object with chronological property ordering
///
/// Property order is part of the wire format and must survive a
/// decode/encode round trip, so properties are kept as an ordered
/// sequence instead of a map.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct AMF0Object {
    entries: Vec<(String, AMF0Value)>,
}

impl AMF0Object {
    /// Creates an empty object
    pub fn new() -> AMF0Object {
        AMF0Object {
            entries: Vec::new(),
        }
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the object has no properties
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets a property. An existing property keeps its position,
    /// a new one is appended.
    pub fn set<K: Into<String>>(&mut self, name: K, value: AMF0Value) {
        let name = name.into();

        for entry in self.entries.iter_mut() {
            if entry.0 == name {
                entry.1 = value;
                return;
            }
        }

        self.entries.push((name, value));
    }

    /// Builder-style property setter
    pub fn with<K: Into<String>>(mut self, name: K, value: AMF0Value) -> AMF0Object {
        self.set(name, value);
        self
    }

    /// Gets a property value
    pub fn get(&self, name: &str) -> Option<&AMF0Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Removes a property, returning its value
    pub fn remove(&mut self, name: &str) -> Option<AMF0Value> {
        let index = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates properties in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AMF0Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Property names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, AMF0Value)> for AMF0Object {
    fn from_iter<T: IntoIterator<Item = (K, AMF0Value)>>(iter: T) -> AMF0Object {
        let mut object = AMF0Object::new();

        for (name, value) in iter {
            object.set(name, value);
        }

        object
    }
}

// Tests
