// Server command handlers

mod close_stream;
mod connect;
mod create_stream;
mod delete_stream;
mod play;
mod publish;
mod receive;

pub use close_stream::*;
pub use connect::*;
pub use create_stream::*;
pub use delete_stream::*;
pub use play::*;
pub use publish::*;
pub use receive::*;

use crate::amf::AMF0Value;
use crate::proto::CallError;
use crate::{log_debug, log_info};

use super::context::SessionContext;

/// Terminates the session when connect has not happened yet
pub(crate) fn check_connected(ctx: &SessionContext) -> bool {
    if !ctx.connected {
        let logger = &ctx.logger;
        log_info!(logger, "Command before connect, dropping connection");
        return false;
    }

    true
}

/// Sends the `_result` reply when one is expected
pub(crate) fn reply_result(
    ctx: &SessionContext,
    ms_id: u32,
    transaction_id: f64,
    values: &[AMF0Value],
) {
    if transaction_id != 0.0 {
        ctx.send_result(ms_id, transaction_id, values);
    }
}

/// Completes a dispatched call the way the handler decided
///
/// Results go out as `_result` (when a reply is expected), aborted
/// calls stay silent, call errors go out as `_error`; a fatal error
/// terminates the session.
pub(crate) fn finish_call(
    ctx: &mut SessionContext,
    ms_id: u32,
    transaction_id: f64,
    result: Result<Vec<AMF0Value>, CallError>,
) -> bool {
    match result {
        Ok(values) => {
            reply_result(ctx, ms_id, transaction_id, &values);
            true
        }
        Err(CallError::Aborted(reason)) => {
            let logger = &ctx.logger;
            log_debug!(logger, format!("Remote call aborted: {}", reason));
            true
        }
        Err(CallError::Result(error)) => {
            ctx.send_error(ms_id, transaction_id, &error);

            if error.fatal {
                let logger = &ctx.logger;
                log_info!(logger, format!("Fatal call error: {}", error));
                return false;
            }

            true
        }
    }
}
