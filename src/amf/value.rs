// AMF0 value

use super::AMF0Object;

pub const AMF0_TYPE_NUMBER: u8 = 0x00;
pub const AMF0_TYPE_BOOL: u8 = 0x01;
pub const AMF0_TYPE_STRING: u8 = 0x02;
pub const AMF0_TYPE_OBJECT: u8 = 0x03;
pub const AMF0_TYPE_NULL: u8 = 0x05;
pub const AMF0_TYPE_UNDEFINED: u8 = 0x06;
pub const AMF0_TYPE_REF: u8 = 0x07;
pub const AMF0_TYPE_ARRAY: u8 = 0x08;
pub const AMF0_TYPE_STRICT_ARRAY: u8 = 0x0A;
pub const AMF0_TYPE_DATE: u8 = 0x0B;
pub const AMF0_TYPE_LONG_STRING: u8 = 0x0C;
pub const AMF0_TYPE_UNSUPPORTED: u8 = 0x0D;
pub const AMF0_TYPE_XML_DOC: u8 = 0x0F;
pub const AMF0_TYPE_TYPED_OBJ: u8 = 0x10;

pub const AMF0_OBJECT_TERM_CODE: u8 = 0x09;

/// AMF0 compatible value
///
/// Short and long strings share the String variant; the encoder picks
/// the long-string marker for strings over 65535 bytes.
#[derive(Clone, Debug, PartialEq)]
pub enum AMF0Value {
    Number {
        value: f64,
    },
    Bool {
        value: bool,
    },
    String {
        value: String,
    },
    Object {
        properties: AMF0Object,
    },
    Null,
    Undefined,
    Ref {
        index: u16,
    },
    EcmaArray {
        items: AMF0Object,
    },
    StrictArray {
        items: Vec<AMF0Value>,
    },
    Date {
        timestamp: f64,
    },
    XmlDocument {
        content: String,
    },
}

impl AMF0Value {
    /// Returns true if the value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, AMF0Value::Undefined)
    }

    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AMF0Value::Null)
    }

    /// Returns the value as boolean
    pub fn get_bool(&self) -> bool {
        match self {
            AMF0Value::Bool { value } => *value,
            AMF0Value::Number { value } => *value != 0.0,
            _ => false,
        }
    }

    /// Returns the value as integer
    pub fn get_integer(&self) -> i64 {
        match self {
            AMF0Value::Number { value } => *value as i64,
            AMF0Value::Ref { index } => *index as i64,
            AMF0Value::Date { timestamp } => *timestamp as i64,
            _ => 0,
        }
    }

    /// Returns the value as float
    pub fn get_float(&self) -> f64 {
        match self {
            AMF0Value::Number { value } => *value,
            AMF0Value::Ref { index } => *index as f64,
            AMF0Value::Date { timestamp } => *timestamp,
            _ => 0.0,
        }
    }

    /// Returns the value as string
    pub fn get_string(&self) -> &str {
        match self {
            AMF0Value::String { value } => value.as_str(),
            AMF0Value::XmlDocument { content } => content.as_str(),
            _ => "",
        }
    }

    /// Returns the value as object
    pub fn get_object(&self) -> Option<&AMF0Object> {
        match self {
            AMF0Value::Object { properties } => Some(properties),
            AMF0Value::EcmaArray { items } => Some(items),
            _ => None,
        }
    }

    /// Gets the value of a property (for objects)
    pub fn get_object_property(&self, property_name: &str) -> Option<&AMF0Value> {
        self.get_object().and_then(|o| o.get(property_name))
    }

    /// Returns the value as array
    pub fn get_array(&self) -> Option<&Vec<AMF0Value>> {
        match self {
            AMF0Value::StrictArray { items } => Some(items),
            _ => None,
        }
    }

    /// Gets an element of the array, given its index
    pub fn get_array_element(&self, index: usize) -> Option<&AMF0Value> {
        self.get_array().and_then(|a| a.get(index))
    }

    /// Shorthand for a string value
    pub fn string<S: Into<String>>(value: S) -> AMF0Value {
        AMF0Value::String {
            value: value.into(),
        }
    }

    /// Shorthand for a number value
    pub fn number(value: f64) -> AMF0Value {
        AMF0Value::Number { value }
    }

    /// Shorthand for an object value
    pub fn object(properties: AMF0Object) -> AMF0Value {
        AMF0Value::Object { properties }
    }
}
