// Session cleanup

use crate::log_debug;

use super::context::SessionContext;

/// Releases everything a session holds when the connection goes away
///
/// Pending calls and status waiters fail with the disconnect reason,
/// controllers stop, NetStreams close with their routes, and the app
/// gets its connectionLost notification (releasing any live stream
/// groups it opened).
pub fn do_session_cleanup(ctx: &mut SessionContext, reason: &str) {
    let logger = ctx.logger.clone();
    log_debug!(logger, format!("Session cleanup: {}", reason));

    ctx.calls.cancel_all(reason);
    ctx.statuses.cancel_all(reason);

    for (_, controller) in ctx.controllers.drain() {
        controller.stop();
    }

    for nstream in ctx.streams.streams() {
        ctx.routes.clear_stream(nstream.id());
    }
    ctx.streams.clear();

    if let Some(mut app) = ctx.app.take() {
        app.connection_lost(ctx);
    }

    ctx.connected = false;
}
