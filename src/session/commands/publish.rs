// Publish command

use crate::amf::AMF0Value;
use crate::proto::CallResultError;
use crate::session::context::SessionContext;

use super::{check_connected, finish_call};

/// Delegates a publish request to the app
pub async fn handle_publish(
    ctx: &mut SessionContext,
    _ts: u32,
    ms_id: u32,
    transaction_id: f64,
    args: &[AMF0Value],
) -> bool {
    if !check_connected(ctx) {
        return false;
    }

    let nstream = match ctx.streams.get_stream(ms_id) {
        Some(nstream) => nstream,
        None => {
            return finish_call(
                ctx,
                ms_id,
                transaction_id,
                Err(CallResultError::failed(format!("invalid stream {}", ms_id)).into()),
            );
        }
    };

    let mut app = match ctx.app.take() {
        Some(app) => app,
        None => return false,
    };

    // the leading null before the stream name is dropped
    let publish_args = if args.first().map(|v| v.is_null()).unwrap_or(false) {
        &args[1..]
    } else {
        args
    };

    let result = app.publish(ctx, nstream, publish_args).await;
    ctx.app = Some(app);

    finish_call(ctx, ms_id, transaction_id, result)
}
