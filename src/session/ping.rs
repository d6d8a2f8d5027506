// Ping handling

use byteorder::{BigEndian, ByteOrder};

use crate::chunks::{RTMP_TYPE_EVENT, STREAM_PONG};
use crate::vecbuf::VecBuf;

use super::context::SessionContext;

/// Answers a user-control Ping with a Pong echoing the timestamp
pub fn send_pong(ctx: &SessionContext, timestamp: u32) {
    let mut body = [0u8; 6];
    BigEndian::write_u16(&mut body[0..2], STREAM_PONG);
    BigEndian::write_u32(&mut body[2..6], timestamp);

    ctx.send_message(0, RTMP_TYPE_EVENT, 0, VecBuf::from(body.to_vec()));
}
