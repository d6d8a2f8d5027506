// Command message handling

use crate::amf::AMF0Value;
use crate::proto::{CallFailure, CallResultError};
use crate::{log_debug, log_info, log_warning};

use super::commands;
use super::context::SessionContext;

/// Handles a decoded COMMAND message
///
/// Returns false when the session must terminate.
pub async fn handle_command_message(
    ctx: &mut SessionContext,
    ts: u32,
    ms_id: u32,
    args: Vec<AMF0Value>,
) -> bool {
    let logger = ctx.logger.clone();

    let mut iter = args.into_iter();

    let name = match iter.next() {
        Some(AMF0Value::String { value }) => value,
        _ => {
            log_warning!(logger, "Command without a name, dropping connection");
            return false;
        }
    };

    // 0 means no reply expected
    let transaction_id = match iter.next() {
        Some(value) => value.get_float(),
        None => 0.0,
    };

    let rest: Vec<AMF0Value> = iter.collect();

    log_debug!(
        logger,
        format!("Command received: {} (trans: {})", name, transaction_id)
    );

    match name.as_str() {
        "_result" => {
            if !ctx
                .calls
                .complete(ms_id, transaction_id as u64, Ok(rest))
            {
                log_warning!(
                    logger,
                    format!("Unexpected call result (trans: {})", transaction_id)
                );
            }
            true
        }
        "_error" => {
            if !ctx.calls.complete(
                ms_id,
                transaction_id as u64,
                Err(CallFailure::CommandResultError { args: rest }),
            ) {
                log_warning!(
                    logger,
                    format!("Unexpected call error (trans: {})", transaction_id)
                );
            }
            true
        }
        "onStatus" => {
            // payload: (transaction id ignored, null, info object)
            let info = rest.get(1).cloned().unwrap_or(AMF0Value::Null);

            if !ctx.statuses.dispatch(ms_id, &info) {
                log_debug!(logger, "onStatus event with no waiter");
            }
            true
        }
        "connect" => commands::handle_connect(ctx, ts, ms_id, transaction_id, &rest).await,
        "createStream" => {
            commands::handle_create_stream(ctx, ts, ms_id, transaction_id, &rest).await
        }
        "deleteStream" => {
            commands::handle_delete_stream(ctx, ts, ms_id, transaction_id, &rest).await
        }
        "closeStream" => commands::handle_close_stream(ctx, ts, ms_id, transaction_id, &rest).await,
        "play" => commands::handle_play(ctx, ts, ms_id, transaction_id, &rest).await,
        "publish" => commands::handle_publish(ctx, ts, ms_id, transaction_id, &rest).await,
        "receiveAudio" => {
            commands::handle_receive(ctx, ts, ms_id, transaction_id, &rest, false).await
        }
        "receiveVideo" => {
            commands::handle_receive(ctx, ts, ms_id, transaction_id, &rest, true).await
        }
        "FCPublish" | "FCUnpublish" | "releaseStream" => {
            // encoder compatibility commands, accepted silently
            log_debug!(logger, format!("Ignoring command: {}", name));
            true
        }
        _ => unknown_remote_call(ctx, &name, ts, ms_id, transaction_id, &rest).await,
    }
}

// Commands the protocol does not know are offered to the app with
// their target NetStream; without a taker they are silently ignored
async fn unknown_remote_call(
    ctx: &mut SessionContext,
    name: &str,
    ts: u32,
    ms_id: u32,
    transaction_id: f64,
    args: &[AMF0Value],
) -> bool {
    let logger = ctx.logger.clone();

    if !ctx.connected {
        log_info!(logger, "Command before connect, dropping connection");
        return false;
    }

    if ms_id == 0 {
        log_warning!(logger, format!("Unknown method called: {}", name));
        return true;
    }

    let nstream = match ctx.streams.get_stream(ms_id) {
        Some(nstream) => nstream,
        None => {
            ctx.send_error(
                ms_id,
                transaction_id,
                &CallResultError::failed(format!("invalid stream {}", ms_id)),
            );
            return true;
        }
    };

    let mut app = match ctx.app.take() {
        Some(app) => app,
        None => return true,
    };

    let result = app.remote_call(ctx, name, ts, nstream, args).await;
    ctx.app = Some(app);

    commands::finish_call(ctx, ms_id, transaction_id, result)
}

// Tests
