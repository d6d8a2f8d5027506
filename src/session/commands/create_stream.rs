// createStream command

use crate::amf::AMF0Value;
use crate::log_info;
use crate::session::context::SessionContext;

use super::{check_connected, reply_result};

/// Allocates a new message stream and returns its id
pub async fn handle_create_stream(
    ctx: &mut SessionContext,
    _ts: u32,
    ms_id: u32,
    transaction_id: f64,
    _args: &[AMF0Value],
) -> bool {
    if !check_connected(ctx) {
        return false;
    }

    let nstream = ctx.streams.make_stream(&ctx.muxer);

    // buffer-length user-control events for this stream update the
    // client-reported buffer length
    let route_stream = nstream.clone();
    ctx.routes.set_buffer_route(
        nstream.id(),
        Some(Box::new(move |_ts, length| {
            route_stream.set_buffer_length(length);
        })),
    );

    let logger = &ctx.logger;
    log_info!(logger, format!("Created message stream: {}", nstream.id()));

    reply_result(
        ctx,
        ms_id,
        transaction_id,
        &[AMF0Value::Null, AMF0Value::number(nstream.id() as f64)],
    );

    true
}
