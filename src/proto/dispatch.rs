// Message dispatch

use crate::amf::{decode, AMF0DecodeError, AMF0Value};
use crate::chunks::{ChunkHeader, RTMP_TYPE_AUDIO, RTMP_TYPE_DATA, RTMP_TYPE_INVOKE, RTMP_TYPE_VIDEO};
use crate::vecbuf::VecBuf;

/// A demuxed message routed by type
#[derive(Debug, Clone)]
pub enum ProtocolMessage {
    /// AMF0 command (type 20)
    Command {
        ts: u32,
        ms_id: u32,
        args: Vec<AMF0Value>,
    },

    /// AMF0 metadata (type 18)
    Meta {
        ts: u32,
        ms_id: u32,
        args: Vec<AMF0Value>,
    },

    /// Audio or video payload
    Data {
        msg_type: u32,
        ts: u32,
        ms_id: u32,
        body: VecBuf,
    },

    /// Anything else
    Unknown { header: ChunkHeader, body: VecBuf },
}

/// Routes a complete message by its type, AMF-decoding command and
/// metadata payloads
///
/// A failed AMF decode leaves the message unroutable; the session
/// terminates the connection on it.
pub fn dispatch_message(
    header: ChunkHeader,
    mut body: VecBuf,
) -> Result<ProtocolMessage, AMF0DecodeError> {
    match header.msg_type {
        RTMP_TYPE_AUDIO | RTMP_TYPE_VIDEO => Ok(ProtocolMessage::Data {
            msg_type: header.msg_type,
            ts: header.abs_time,
            ms_id: header.ms_id,
            body,
        }),
        RTMP_TYPE_DATA => Ok(ProtocolMessage::Meta {
            ts: header.abs_time,
            ms_id: header.ms_id,
            args: decode(&mut body)?,
        }),
        RTMP_TYPE_INVOKE => Ok(ProtocolMessage::Command {
            ts: header.abs_time,
            ms_id: header.ms_id,
            args: decode(&mut body)?,
        }),
        _ => Ok(ProtocolMessage::Unknown { header, body }),
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::encode;

    #[test]
    fn test_dispatch_data() {
        let header = ChunkHeader::full(3, 0, 7, RTMP_TYPE_AUDIO, 1);
        let body = VecBuf::from(b"laalala".as_slice());

        match dispatch_message(header, body).unwrap() {
            ProtocolMessage::Data {
                msg_type,
                ts,
                ms_id,
                body,
            } => {
                assert_eq!(msg_type, RTMP_TYPE_AUDIO);
                assert_eq!(ts, 0);
                assert_eq!(ms_id, 1);
                assert_eq!(body.to_vec(), b"laalala");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_command() {
        let body = encode(&[
            AMF0Value::string("onStatus"),
            AMF0Value::number(0.0),
            AMF0Value::Null,
        ])
        .unwrap();

        let header = ChunkHeader::full(3, 0, body.len(), RTMP_TYPE_INVOKE, 1);

        match dispatch_message(header, body).unwrap() {
            ProtocolMessage::Command { ts, ms_id, args } => {
                assert_eq!(ts, 0);
                assert_eq!(ms_id, 1);
                assert_eq!(
                    args,
                    vec![
                        AMF0Value::string("onStatus"),
                        AMF0Value::number(0.0),
                        AMF0Value::Null
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_meta() {
        let body = encode(&[AMF0Value::string("onMetaData")]).unwrap();
        let header = ChunkHeader::full(3, 0, body.len(), RTMP_TYPE_DATA, 1);

        assert!(matches!(
            dispatch_message(header, body).unwrap(),
            ProtocolMessage::Meta { .. }
        ));
    }

    #[test]
    fn test_dispatch_unknown() {
        let header = ChunkHeader::full(3, 0, 4, 99, 1);
        let body = VecBuf::from(vec![0u8; 4]);

        assert!(matches!(
            dispatch_message(header, body).unwrap(),
            ProtocolMessage::Unknown { .. }
        ));
    }

    #[test]
    fn test_dispatch_bad_amf_fails() {
        let header = ChunkHeader::full(3, 0, 1, RTMP_TYPE_INVOKE, 1);
        let body = VecBuf::from(vec![0x42u8]);

        assert!(dispatch_message(header, body).is_err());
    }
}
