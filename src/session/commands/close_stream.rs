// closeStream command

use crate::amf::AMF0Value;
use crate::session::context::SessionContext;

use super::check_connected;

/// Stops the controller attached to the command's own stream; the
/// NetStream itself stays usable
pub async fn handle_close_stream(
    ctx: &mut SessionContext,
    _ts: u32,
    ms_id: u32,
    _transaction_id: f64,
    _args: &[AMF0Value],
) -> bool {
    if !check_connected(ctx) {
        return false;
    }

    if let Some(controller) = ctx.controllers.remove(&ms_id) {
        controller.stop();
    }

    true
}
