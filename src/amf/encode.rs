// AMF0 encoder

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::vecbuf::VecBuf;

use super::{
    AMF0Object, AMF0Value, AMF0_OBJECT_TERM_CODE, AMF0_TYPE_ARRAY, AMF0_TYPE_BOOL, AMF0_TYPE_DATE,
    AMF0_TYPE_LONG_STRING, AMF0_TYPE_NULL, AMF0_TYPE_NUMBER, AMF0_TYPE_OBJECT, AMF0_TYPE_REF,
    AMF0_TYPE_STRICT_ARRAY, AMF0_TYPE_STRING, AMF0_TYPE_UNDEFINED, AMF0_TYPE_XML_DOC,
};

/// AMF0 encoding error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AMF0EncodeError {
    #[error("variable name too long")]
    NameTooLong,

    #[error("sequence too long")]
    SequenceTooLong,
}

fn encode_number(out: &mut Vec<u8>, value: f64) {
    let mut buf = [0u8; 8];
    BigEndian::write_f64(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn encode_string_payload(out: &mut Vec<u8>, value: &str) {
    // the marker decides between the 16 and 32 bit length forms
    let raw = value.as_bytes();

    if raw.len() > 0xffff {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, raw.len() as u32);
        out.extend_from_slice(&buf);
    } else {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, raw.len() as u16);
        out.extend_from_slice(&buf);
    }

    out.extend_from_slice(raw);
}

fn encode_property_name(out: &mut Vec<u8>, name: &str) -> Result<(), AMF0EncodeError> {
    let raw = name.as_bytes();

    if raw.len() > 0xffff {
        return Err(AMF0EncodeError::NameTooLong);
    }

    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, raw.len() as u16);
    out.extend_from_slice(&buf);
    out.extend_from_slice(raw);

    Ok(())
}

fn encode_object_like_content(
    out: &mut Vec<u8>,
    object: &AMF0Object,
) -> Result<(), AMF0EncodeError> {
    for (name, value) in object.iter() {
        encode_property_name(out, name)?;
        encode_single(out, value)?;
    }

    out.extend_from_slice(&[0x00, 0x00, AMF0_OBJECT_TERM_CODE]);

    Ok(())
}

fn encode_single(out: &mut Vec<u8>, value: &AMF0Value) -> Result<(), AMF0EncodeError> {
    match value {
        AMF0Value::Number { value } => {
            out.push(AMF0_TYPE_NUMBER);
            encode_number(out, *value);
        }
        AMF0Value::Bool { value } => {
            out.push(AMF0_TYPE_BOOL);
            out.push(if *value { 0x01 } else { 0x00 });
        }
        AMF0Value::String { value } => {
            if value.len() > 0xffff {
                out.push(AMF0_TYPE_LONG_STRING);
            } else {
                out.push(AMF0_TYPE_STRING);
            }
            encode_string_payload(out, value);
        }
        AMF0Value::Object { properties } => {
            out.push(AMF0_TYPE_OBJECT);
            encode_object_like_content(out, properties)?;
        }
        AMF0Value::Null => out.push(AMF0_TYPE_NULL),
        AMF0Value::Undefined => out.push(AMF0_TYPE_UNDEFINED),
        AMF0Value::Ref { index } => {
            out.push(AMF0_TYPE_REF);
            let mut buf = [0u8; 2];
            BigEndian::write_u16(&mut buf, *index);
            out.extend_from_slice(&buf);
        }
        AMF0Value::EcmaArray { items } => {
            out.push(AMF0_TYPE_ARRAY);
            let mut buf = [0u8; 4];
            BigEndian::write_u32(&mut buf, items.len() as u32);
            out.extend_from_slice(&buf);
            encode_object_like_content(out, items)?;
        }
        AMF0Value::StrictArray { items } => {
            if items.len() > 0xffffffff {
                return Err(AMF0EncodeError::SequenceTooLong);
            }
            out.push(AMF0_TYPE_STRICT_ARRAY);
            let mut buf = [0u8; 4];
            BigEndian::write_u32(&mut buf, items.len() as u32);
            out.extend_from_slice(&buf);
            for item in items {
                encode_single(out, item)?;
            }
        }
        AMF0Value::Date { timestamp } => {
            out.push(AMF0_TYPE_DATE);
            encode_number(out, *timestamp);
            // timezone is always written as 0
            out.extend_from_slice(&[0x00, 0x00]);
        }
        AMF0Value::XmlDocument { content } => {
            out.push(AMF0_TYPE_XML_DOC);
            let raw = content.as_bytes();
            let mut buf = [0u8; 4];
            BigEndian::write_u32(&mut buf, raw.len() as u32);
            out.extend_from_slice(&buf);
            out.extend_from_slice(raw);
        }
    }

    Ok(())
}

/// Encodes the given values using AMF0
pub fn encode(values: &[AMF0Value]) -> Result<VecBuf, AMF0EncodeError> {
    let mut out = Vec::new();

    for value in values {
        encode_single(&mut out, value)?;
    }

    Ok(VecBuf::from(out))
}

/// Encodes a name and a value into an FLV data variable
pub fn encode_variable(name: &str, value: &AMF0Value) -> Result<VecBuf, AMF0EncodeError> {
    let mut out = Vec::new();

    encode_property_name(&mut out, name)?;
    encode_single(&mut out, value)?;

    Ok(VecBuf::from(out))
}

// Tests

#[cfg(test)]
mod tests {
    use super::super::{decode, decode_one, decode_variable, AMF0DecodeError};
    use super::*;

    fn roundtrip(values: &[AMF0Value]) {
        let mut encoded = encode(values).unwrap();
        let decoded = decode(&mut encoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_roundtrip_scalars() {
        roundtrip(&[
            AMF0Value::Number { value: 0.0 },
            AMF0Value::Number { value: -12.75 },
            AMF0Value::Bool { value: true },
            AMF0Value::Bool { value: false },
            AMF0Value::String {
                value: "connect".to_string(),
            },
            AMF0Value::String {
                value: "".to_string(),
            },
            AMF0Value::Null,
            AMF0Value::Undefined,
            AMF0Value::Ref { index: 7 },
            AMF0Value::Date { timestamp: 1e12 },
            AMF0Value::XmlDocument {
                content: "<a/>".to_string(),
            },
        ]);
    }

    #[test]
    fn test_roundtrip_nested() {
        let inner = AMF0Object::new()
            .with("deep", AMF0Value::string("value"))
            .with("n", AMF0Value::number(4.0));

        roundtrip(&[
            AMF0Value::Object {
                properties: AMF0Object::new()
                    .with("app", AMF0Value::string("live"))
                    .with("inner", AMF0Value::Object { properties: inner }),
            },
            AMF0Value::StrictArray {
                items: vec![
                    AMF0Value::Null,
                    AMF0Value::StrictArray { items: vec![] },
                    AMF0Value::string("x"),
                ],
            },
            AMF0Value::EcmaArray {
                items: AMF0Object::new().with("k", AMF0Value::number(1.0)),
            },
            AMF0Value::Object {
                properties: AMF0Object::new(),
            },
        ]);
    }

    #[test]
    fn test_roundtrip_long_string() {
        let long = "x".repeat(70000);

        let mut encoded = encode(&[AMF0Value::string(long.clone())]).unwrap();

        // long-string marker with a 32-bit length
        assert_eq!(encoded.peek(1).unwrap()[0], AMF0_TYPE_LONG_STRING);

        let decoded = decode(&mut encoded).unwrap();
        assert_eq!(decoded, vec![AMF0Value::string(long)]);
    }

    #[test]
    fn test_object_field_order_preserved() {
        let object = AMF0Object::new()
            .with("b", AMF0Value::number(1.0))
            .with("a", AMF0Value::number(2.0))
            .with("c", AMF0Value::number(3.0));

        let mut encoded = encode(&[AMF0Value::Object {
            properties: object,
        }])
        .unwrap();

        let decoded = decode_one(&mut encoded).unwrap();

        let keys: Vec<&str> = decoded.get_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_byte_exact_command() {
        // "connect", 1.0 as seen on the wire
        let expected: Vec<u8> = vec![
            0x02, 0x00, 0x07, b'c', b'o', b'n', b'n', b'e', b'c', b't', 0x00, 0x3f, 0xf0, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let encoded = encode(&[AMF0Value::string("connect"), AMF0Value::number(1.0)]).unwrap();

        assert_eq!(encoded.to_vec(), expected);

        let mut data = VecBuf::from(expected);
        let decoded = decode(&mut data).unwrap();

        assert_eq!(
            decoded,
            vec![AMF0Value::string("connect"), AMF0Value::number(1.0)]
        );
    }

    #[test]
    fn test_decode_one_leaves_rest() {
        let mut encoded =
            encode(&[AMF0Value::number(1.0), AMF0Value::number(2.0)]).unwrap();

        assert_eq!(decode_one(&mut encoded).unwrap(), AMF0Value::number(1.0));
        assert_eq!(encoded.len(), 9);
    }

    #[test]
    fn test_decode_variable() {
        let mut encoded = encode_variable("duration", &AMF0Value::number(0.0)).unwrap();

        let (name, value) = decode_variable(&mut encoded).unwrap();

        assert_eq!(name, "duration");
        assert_eq!(value, AMF0Value::number(0.0));
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_decode_errors() {
        // truncated number
        let mut data = VecBuf::from(vec![0x00, 0x3f, 0xf0]);
        assert_eq!(decode(&mut data), Err(AMF0DecodeError::Incomplete));

        // unknown marker
        let mut data = VecBuf::from(vec![0x42]);
        assert_eq!(
            decode(&mut data),
            Err(AMF0DecodeError::UnsupportedMarker(0x42))
        );

        // typed object
        let mut data = VecBuf::from(vec![0x10]);
        assert_eq!(
            decode(&mut data),
            Err(AMF0DecodeError::TypedObjectsUnsupported)
        );

        // unsupported marker
        let mut data = VecBuf::from(vec![0x0D]);
        assert_eq!(decode(&mut data), Err(AMF0DecodeError::UnsupportedValue));
    }

    #[test]
    fn test_nonzero_boolean_decodes_true() {
        let mut data = VecBuf::from(vec![AMF0_TYPE_BOOL, 0x05]);

        assert_eq!(
            decode_one(&mut data).unwrap(),
            AMF0Value::Bool { value: true }
        );
    }
}
