// Media and metadata message handling

use crate::amf::AMF0Value;
use crate::log_info;
use crate::vecbuf::VecBuf;

use super::context::SessionContext;

/// Routes an audio/video payload to the stream's data callback
///
/// Without a route the payload is dropped; a data message before
/// connect terminates the session.
pub fn handle_data_message(
    ctx: &mut SessionContext,
    msg_type: u32,
    ts: u32,
    ms_id: u32,
    body: VecBuf,
) -> bool {
    if let Some(route) = ctx.routes.data_route(ms_id) {
        route(ts, msg_type, body);
        return true;
    }

    if !ctx.connected {
        let logger = &ctx.logger;
        log_info!(logger, "Data before connect, dropping connection");
        return false;
    }

    true
}

/// Routes a metadata message to the stream's meta callback
pub fn handle_meta_message(
    ctx: &mut SessionContext,
    ts: u32,
    ms_id: u32,
    args: Vec<AMF0Value>,
) -> bool {
    if let Some(route) = ctx.routes.meta_route(ms_id) {
        route(ts, &args);
        return true;
    }

    if !ctx.connected {
        let logger = &ctx.logger;
        log_info!(logger, "Metadata before connect, dropping connection");
        return false;
    }

    true
}
