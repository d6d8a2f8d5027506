// App objects and routing

use async_trait::async_trait;

use crate::amf::{AMF0Object, AMF0Value};
use crate::proto::CallError;
use crate::session::SessionContext;
use crate::utils::parse_normalized_app;

use super::NetStream;

/// Application behavior behind connect / play / publish
///
/// One app object is instantiated per connected session. Handlers
/// return the values to send in the `_result` reply, raise
/// `CallError::Result` to send an `_error` reply (closing the
/// connection when fatal), or `CallError::Aborted` to stay silent.
#[async_trait]
pub trait RtmpApp: Send {
    /// Handles the connect request; the returned values become the
    /// `_result` payload
    async fn connect(
        &mut self,
        session: &mut SessionContext,
        cmd_obj: &AMF0Object,
        opts: &[AMF0Value],
    ) -> Result<Vec<AMF0Value>, CallError>;

    /// Handles a play request on the given NetStream
    async fn play(
        &mut self,
        session: &mut SessionContext,
        nstream: NetStream,
        args: &[AMF0Value],
    ) -> Result<Vec<AMF0Value>, CallError>;

    /// Handles a publish request on the given NetStream
    async fn publish(
        &mut self,
        session: &mut SessionContext,
        nstream: NetStream,
        args: &[AMF0Value],
    ) -> Result<Vec<AMF0Value>, CallError>;

    /// Hook for commands the protocol does not know, dispatched with
    /// the target NetStream. The default silently ignores the call.
    async fn remote_call(
        &mut self,
        _session: &mut SessionContext,
        name: &str,
        _ts: u32,
        _nstream: NetStream,
        _args: &[AMF0Value],
    ) -> Result<Vec<AMF0Value>, CallError> {
        Err(CallError::Aborted(format!("unknown command {:?}", name)))
    }

    /// Called once when the connection goes away
    fn connection_lost(&mut self, _session: &mut SessionContext) {}
}

/// Creates a fresh app object for a new session
pub type AppFactory = Box<dyn Fn() -> Box<dyn RtmpApp> + Send + Sync>;

/// Resolves requested app paths to app factories
///
/// Paths are matched on the app base (query stripped); unmatched
/// paths fall back to the default factory when one is registered.
#[derive(Default)]
pub struct AppResolver {
    routes: Vec<(String, AppFactory)>,
    default_factory: Option<AppFactory>,
}

impl AppResolver {
    pub fn new() -> AppResolver {
        AppResolver::default()
    }

    /// Registers a factory for an exact app path
    pub fn register<P: Into<String>>(&mut self, path: P, factory: AppFactory) {
        self.routes.push((path.into(), factory));
    }

    /// Registers the fallback factory
    pub fn register_default(&mut self, factory: AppFactory) {
        self.default_factory = Some(factory);
    }

    /// Instantiates the app serving the given path
    pub fn resolve(&self, app_path: &str) -> Option<Box<dyn RtmpApp>> {
        let normalized = parse_normalized_app(app_path);

        for (path, factory) in self.routes.iter() {
            if *path == normalized.app_base || *path == normalized.normalized {
                return Some(factory());
            }
        }

        self.default_factory.as_ref().map(|factory| factory())
    }
}
