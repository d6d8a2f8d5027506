// deleteStream command

use crate::amf::AMF0Value;
use crate::log_info;
use crate::session::context::SessionContext;

use super::check_connected;

/// Tears down a message stream: stops its controller, clears its
/// routes and frees the id
pub fn close_netstream(ctx: &mut SessionContext, stream_id: u32) {
    if let Some(controller) = ctx.controllers.remove(&stream_id) {
        controller.stop();
    }

    ctx.routes.clear_stream(stream_id);
    ctx.streams.del_stream(stream_id);
}

/// Handles deleteStream: (null, stream id)
pub async fn handle_delete_stream(
    ctx: &mut SessionContext,
    _ts: u32,
    _ms_id: u32,
    _transaction_id: f64,
    args: &[AMF0Value],
) -> bool {
    if !check_connected(ctx) {
        return false;
    }

    let stream_id = match args.iter().find(|v| !v.is_null()) {
        Some(value) => value.get_integer() as u32,
        None => return true,
    };

    let logger = &ctx.logger;
    log_info!(logger, format!("Deleting message stream: {}", stream_id));

    close_netstream(ctx, stream_id);

    true
}
