// Built-in live publish/play app

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::amf::{AMF0Object, AMF0Value};
use crate::controllers::{Player, Recorder};
use crate::log_info;
use crate::proto::{CallError, CallResultError};
use crate::session::{SessionContext, StreamController};
use crate::store::{StoreError, StreamGroup};

use super::{
    NetStream, RtmpApp, STATUS_CONNECT_SUCCESS,
};

fn lock<T>(value: &Arc<Mutex<T>>) -> std::sync::MutexGuard<'_, T> {
    value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Live publish/play application over the in-memory store
///
/// `publish` opens a live stream group and records into it; `play`
/// attaches a player to an existing group. Groups published by this
/// session are released when the connection goes away.
#[derive(Default)]
pub struct LiveApp {
    published: Vec<StreamGroup>,
}

impl LiveApp {
    pub fn new() -> LiveApp {
        LiveApp::default()
    }
}

#[async_trait]
impl RtmpApp for LiveApp {
    async fn connect(
        &mut self,
        session: &mut SessionContext,
        cmd_obj: &AMF0Object,
        _opts: &[AMF0Value],
    ) -> Result<Vec<AMF0Value>, CallError> {
        let logger = session.logger.clone();
        log_info!(
            logger,
            format!(
                "App connect: {}",
                cmd_obj
                    .get("app")
                    .map(|v| v.get_string().to_string())
                    .unwrap_or_default()
            )
        );

        let info = AMF0Object::new()
            .with("level", AMF0Value::string("status"))
            .with("code", AMF0Value::string(STATUS_CONNECT_SUCCESS))
            .with("description", AMF0Value::string("Connection succeeded."));

        Ok(vec![AMF0Value::Null, AMF0Value::object(info)])
    }

    async fn play(
        &mut self,
        session: &mut SessionContext,
        nstream: NetStream,
        args: &[AMF0Value],
    ) -> Result<Vec<AMF0Value>, CallError> {
        let stream_name = match args.first() {
            Some(AMF0Value::String { value }) => value.clone(),
            _ => return Err(CallResultError::play_failed("missing stream name").into()),
        };

        // only live: start defaults to -2, everything else is not
        // supported
        let start = match args.get(1) {
            Some(value) => value.get_float(),
            None => -2.0,
        };

        if start != -2.0 {
            return Err(CallResultError::play_failed("only live streams supported").into());
        }

        let group = session
            .store
            .open_read(None, &stream_name)
            .map_err(|e| match e {
                StoreError::StreamNotFound(name) => {
                    CallResultError::play_not_found(format!("unknown stream {}", name))
                }
                other => CallResultError::play_failed(other.to_string()),
            })?;

        let player = Arc::new(Mutex::new(Player::new(group, nstream.clone())));

        let mute_player = player.clone();
        session.routes.set_mute_route(
            nstream.id(),
            Some(Box::new(move |_ts, msg_type, do_send| {
                lock(&mute_player).on_mute(msg_type, do_send);
            })),
        );

        lock(&player).start()?;

        session
            .controllers
            .insert(nstream.id(), StreamController::Player(player));

        let logger = session.logger.clone();
        log_info!(logger, format!("Playing stream: {}", stream_name));

        Ok(vec![AMF0Value::Null])
    }

    async fn publish(
        &mut self,
        session: &mut SessionContext,
        nstream: NetStream,
        args: &[AMF0Value],
    ) -> Result<Vec<AMF0Value>, CallError> {
        let stream_name = match args.first() {
            Some(AMF0Value::String { value }) => value.clone(),
            _ => return Err(CallResultError::failed("missing stream name").into()),
        };

        let group = session
            .store
            .open_live(None, &stream_name)
            .map_err(|e| match e {
                StoreError::StreamExists(name) => CallResultError::publish_bad_name(format!(
                    "stream {} is already being published",
                    name
                )),
                other => CallResultError::failed(other.to_string()),
            })?;

        let recorder = Arc::new(Mutex::new(Recorder::new(group.clone(), nstream.clone())));

        let data_recorder = recorder.clone();
        session.routes.set_data_route(
            nstream.id(),
            Some(Box::new(move |ts, msg_type, data| {
                lock(&data_recorder).on_data(ts, msg_type, data);
            })),
        );

        let meta_recorder = recorder.clone();
        session.routes.set_meta_route(
            nstream.id(),
            Some(Box::new(move |ts, args| {
                lock(&meta_recorder).on_meta(ts, args);
            })),
        );

        lock(&recorder).start()?;

        session
            .controllers
            .insert(nstream.id(), StreamController::Recorder(recorder));

        self.published.push(group);

        let logger = session.logger.clone();
        log_info!(logger, format!("Publishing stream: {}", stream_name));

        Ok(vec![AMF0Value::Null])
    }

    fn connection_lost(&mut self, session: &mut SessionContext) {
        for group in self.published.drain(..) {
            session.store.close(&group);
        }
    }
}
