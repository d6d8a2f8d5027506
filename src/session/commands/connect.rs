// Connect command

use byteorder::{BigEndian, ByteOrder};

use crate::amf::AMF0Value;
use crate::chunks::{
    RTMP_TYPE_EVENT, RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
};
use crate::log_info;
use crate::proto::{CallResultError, DEFAULT_WINDOW_SIZE};
use crate::session::context::SessionContext;
use crate::vecbuf::VecBuf;

use super::finish_call;

/// Handles the connect command
///
/// Resolves the requested app path, invokes the app's connect hook
/// and, on success, sends the canned window-size / bandwidth /
/// StreamBegin sequence followed by the `_result`.
pub async fn handle_connect(
    ctx: &mut SessionContext,
    _ts: u32,
    ms_id: u32,
    transaction_id: f64,
    args: &[AMF0Value],
) -> bool {
    let logger = ctx.logger.clone();

    let cmd_obj = match args.first().and_then(|v| v.get_object()) {
        Some(object) => object.clone(),
        None => {
            return finish_call(
                ctx,
                ms_id,
                transaction_id,
                Err(CallResultError::invalid_app("no app path given").into()),
            );
        }
    };

    let app_path = match cmd_obj.get("app") {
        Some(AMF0Value::String { value }) => value.clone(),
        _ => {
            return finish_call(
                ctx,
                ms_id,
                transaction_id,
                Err(CallResultError::invalid_app("no app path given").into()),
            );
        }
    };

    let mut app = match ctx.resolver.resolve(&app_path) {
        Some(app) => app,
        None => {
            return finish_call(
                ctx,
                ms_id,
                transaction_id,
                Err(CallResultError::invalid_app("app not found").into()),
            );
        }
    };

    let opts = &args[1..];
    let result = app.connect(ctx, &cmd_obj, opts).await;

    match result {
        Ok(values) => {
            ctx.app = Some(app);
            ctx.connected = true;

            log_info!(logger, format!("Connected to app: {}", app_path));

            send_connect_preamble(ctx);

            finish_call(ctx, ms_id, transaction_id, Ok(values))
        }
        Err(error) => finish_call(ctx, ms_id, transaction_id, Err(error)),
    }
}

// Window size, peer bandwidth (limit type 2) and StreamBegin(0)
fn send_connect_preamble(ctx: &SessionContext) {
    let mut window = [0u8; 4];
    BigEndian::write_u32(&mut window, DEFAULT_WINDOW_SIZE);

    ctx.send_message(
        0,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
        0,
        VecBuf::from(window.to_vec()),
    );

    let mut bandwidth = [0u8; 5];
    BigEndian::write_u32(&mut bandwidth[0..4], DEFAULT_WINDOW_SIZE);
    bandwidth[4] = 2;

    ctx.send_message(
        0,
        RTMP_TYPE_SET_PEER_BANDWIDTH,
        0,
        VecBuf::from(bandwidth.to_vec()),
    );

    // user control StreamBegin, stream id 0
    ctx.send_message(0, RTMP_TYPE_EVENT, 0, VecBuf::from(vec![0u8; 6]));
}
