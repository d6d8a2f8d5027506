// AMF0 decoder

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::vecbuf::VecBuf;

use super::{
    AMF0Object, AMF0Value, AMF0_OBJECT_TERM_CODE, AMF0_TYPE_ARRAY, AMF0_TYPE_BOOL, AMF0_TYPE_DATE,
    AMF0_TYPE_LONG_STRING, AMF0_TYPE_NULL, AMF0_TYPE_NUMBER, AMF0_TYPE_OBJECT, AMF0_TYPE_REF,
    AMF0_TYPE_STRICT_ARRAY, AMF0_TYPE_STRING, AMF0_TYPE_TYPED_OBJ, AMF0_TYPE_UNDEFINED,
    AMF0_TYPE_UNSUPPORTED, AMF0_TYPE_XML_DOC,
};

/// AMF0 decoding error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AMF0DecodeError {
    #[error("incomplete encoded data")]
    Incomplete,

    #[error("unsupported marker 0x{0:02x}")]
    UnsupportedMarker(u8),

    #[error("missing object end marker")]
    MissingObjectEnd,

    #[error("invalid string encoding")]
    InvalidString,

    #[error("typed objects unsupported")]
    TypedObjectsUnsupported,

    #[error("unsupported value")]
    UnsupportedValue,
}

fn read_bytes(data: &mut VecBuf, n: usize) -> Result<bytes::Bytes, AMF0DecodeError> {
    data.read(n).map_err(|_| AMF0DecodeError::Incomplete)
}

fn decode_marker(data: &mut VecBuf) -> Result<u8, AMF0DecodeError> {
    Ok(read_bytes(data, 1)?[0])
}

fn decode_number(data: &mut VecBuf) -> Result<f64, AMF0DecodeError> {
    Ok(BigEndian::read_f64(&read_bytes(data, 8)?))
}

fn decode_boolean(data: &mut VecBuf) -> Result<bool, AMF0DecodeError> {
    Ok(read_bytes(data, 1)?[0] != 0)
}

fn decode_utf8(raw: bytes::Bytes) -> Result<String, AMF0DecodeError> {
    String::from_utf8(raw.to_vec()).map_err(|_| AMF0DecodeError::InvalidString)
}

fn decode_string(data: &mut VecBuf) -> Result<String, AMF0DecodeError> {
    let length = BigEndian::read_u16(&read_bytes(data, 2)?) as usize;
    decode_utf8(read_bytes(data, length)?)
}

fn decode_long_string(data: &mut VecBuf) -> Result<String, AMF0DecodeError> {
    let length = BigEndian::read_u32(&read_bytes(data, 4)?) as usize;
    decode_utf8(read_bytes(data, length)?)
}

fn decode_object_like(data: &mut VecBuf) -> Result<AMF0Object, AMF0DecodeError> {
    let mut object = AMF0Object::new();

    loop {
        let name = decode_string(data)?;

        if name.is_empty() {
            if decode_marker(data)? != AMF0_OBJECT_TERM_CODE {
                return Err(AMF0DecodeError::MissingObjectEnd);
            }
            break;
        }

        let value = decode_single(data)?;
        object.set(name, value);
    }

    Ok(object)
}

fn decode_strict_array(data: &mut VecBuf) -> Result<Vec<AMF0Value>, AMF0DecodeError> {
    let length = BigEndian::read_u32(&read_bytes(data, 4)?) as usize;

    let mut items = Vec::with_capacity(length.min(1024));

    for _ in 0..length {
        items.push(decode_single(data)?);
    }

    Ok(items)
}

fn decode_date(data: &mut VecBuf) -> Result<f64, AMF0DecodeError> {
    let raw = read_bytes(data, 10)?;
    let milliseconds = BigEndian::read_f64(&raw[0..8]);

    // timezone offset (last 2 bytes) is ignored
    Ok(milliseconds)
}

fn decode_single(data: &mut VecBuf) -> Result<AMF0Value, AMF0DecodeError> {
    let marker = decode_marker(data)?;

    match marker {
        AMF0_TYPE_NUMBER => Ok(AMF0Value::Number {
            value: decode_number(data)?,
        }),
        AMF0_TYPE_BOOL => Ok(AMF0Value::Bool {
            value: decode_boolean(data)?,
        }),
        AMF0_TYPE_STRING => Ok(AMF0Value::String {
            value: decode_string(data)?,
        }),
        AMF0_TYPE_OBJECT => Ok(AMF0Value::Object {
            properties: decode_object_like(data)?,
        }),
        AMF0_TYPE_NULL => Ok(AMF0Value::Null),
        AMF0_TYPE_UNDEFINED => Ok(AMF0Value::Undefined),
        AMF0_TYPE_REF => Ok(AMF0Value::Ref {
            index: BigEndian::read_u16(&read_bytes(data, 2)?),
        }),
        AMF0_TYPE_ARRAY => {
            // the element count is advisory, the array is terminated
            // like an object
            let _ = read_bytes(data, 4)?;
            Ok(AMF0Value::EcmaArray {
                items: decode_object_like(data)?,
            })
        }
        AMF0_TYPE_STRICT_ARRAY => Ok(AMF0Value::StrictArray {
            items: decode_strict_array(data)?,
        }),
        AMF0_TYPE_DATE => Ok(AMF0Value::Date {
            timestamp: decode_date(data)?,
        }),
        AMF0_TYPE_LONG_STRING => Ok(AMF0Value::String {
            value: decode_long_string(data)?,
        }),
        AMF0_TYPE_XML_DOC => Ok(AMF0Value::XmlDocument {
            content: decode_long_string(data)?,
        }),
        AMF0_TYPE_TYPED_OBJ => Err(AMF0DecodeError::TypedObjectsUnsupported),
        AMF0_TYPE_UNSUPPORTED => Err(AMF0DecodeError::UnsupportedValue),
        _ => Err(AMF0DecodeError::UnsupportedMarker(marker)),
    }
}

/// Decodes an AMF0-encoded buffer into a sequence of values,
/// consuming all remaining bytes
pub fn decode(data: &mut VecBuf) -> Result<Vec<AMF0Value>, AMF0DecodeError> {
    let mut values = Vec::new();

    while !data.is_empty() {
        values.push(decode_single(data)?);
    }

    Ok(values)
}

/// Decodes a single value from an AMF0-encoded buffer
pub fn decode_one(data: &mut VecBuf) -> Result<AMF0Value, AMF0DecodeError> {
    decode_single(data)
}

/// Decodes a single FLV data variable: a short-string name followed
/// by one value
pub fn decode_variable(data: &mut VecBuf) -> Result<(String, AMF0Value), AMF0DecodeError> {
    let name = decode_string(data)?;
    let value = decode_single(data)?;
    Ok((name, value))
}
