// receiveAudio / receiveVideo commands

use crate::amf::AMF0Value;
use crate::chunks::{RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO};
use crate::session::context::SessionContext;

use super::check_connected;

/// Routes a receiveAudio/receiveVideo request to the stream's mute
/// callback: (null, do_receive)
pub async fn handle_receive(
    ctx: &mut SessionContext,
    ts: u32,
    ms_id: u32,
    _transaction_id: f64,
    args: &[AMF0Value],
    video: bool,
) -> bool {
    if !check_connected(ctx) {
        return false;
    }

    let do_receive = args
        .iter()
        .find(|v| !v.is_null())
        .map(|v| v.get_bool())
        .unwrap_or(true);

    let msg_type = if video {
        RTMP_TYPE_VIDEO
    } else {
        RTMP_TYPE_AUDIO
    };

    if let Some(route) = ctx.routes.mute_route(ms_id) {
        route(ts, msg_type, do_receive);
    }

    true
}
