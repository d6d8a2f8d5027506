// Session context

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::amf::{encode, AMF0Value};
use crate::chunks::{Muxer, RTMP_TYPE_INVOKE};
use crate::controllers::{Player, Recorder};
use crate::log::Logger;
use crate::log_error;
use crate::proto::{CallResultError, CallTable, PendingCall, StatusWaiter, StatusWaiters};
use crate::server::{AppResolver, NetStreamManager, RtmpApp, RtmpServerConfiguration};
use crate::store::StreamStore;
use crate::utils::{ms_time_wrapped, session_time};
use crate::vecbuf::VecBuf;

/// Route for audio/video payloads: (ts, message type, body)
pub type DataRoute = Box<dyn FnMut(u32, u32, VecBuf) + Send>;

/// Route for metadata messages: (ts, decoded values)
pub type MetaRoute = Box<dyn FnMut(u32, &[AMF0Value]) + Send>;

/// Route for receiveAudio/receiveVideo: (ts, message type, do_receive)
pub type MuteRoute = Box<dyn FnMut(u32, u32, bool) + Send>;

/// Route for buffer-length user-control events: (ts, length)
pub type BufferRoute = Box<dyn FnMut(u32, u32) + Send>;

/// Per-NetStream message routing callbacks
#[derive(Default)]
pub struct RouteTable {
    data: HashMap<u32, DataRoute>,
    meta: HashMap<u32, MetaRoute>,
    mute: HashMap<u32, MuteRoute>,
    buffer: HashMap<u32, BufferRoute>,
}

impl RouteTable {
    pub fn set_data_route(&mut self, ms_id: u32, route: Option<DataRoute>) {
        match route {
            Some(route) => self.data.insert(ms_id, route),
            None => self.data.remove(&ms_id),
        };
    }

    pub fn set_meta_route(&mut self, ms_id: u32, route: Option<MetaRoute>) {
        match route {
            Some(route) => self.meta.insert(ms_id, route),
            None => self.meta.remove(&ms_id),
        };
    }

    pub fn set_mute_route(&mut self, ms_id: u32, route: Option<MuteRoute>) {
        match route {
            Some(route) => self.mute.insert(ms_id, route),
            None => self.mute.remove(&ms_id),
        };
    }

    pub fn set_buffer_route(&mut self, ms_id: u32, route: Option<BufferRoute>) {
        match route {
            Some(route) => self.buffer.insert(ms_id, route),
            None => self.buffer.remove(&ms_id),
        };
    }

    pub fn data_route(&mut self, ms_id: u32) -> Option<&mut DataRoute> {
        self.data.get_mut(&ms_id)
    }

    pub fn meta_route(&mut self, ms_id: u32) -> Option<&mut MetaRoute> {
        self.meta.get_mut(&ms_id)
    }

    pub fn mute_route(&mut self, ms_id: u32) -> Option<&mut MuteRoute> {
        self.mute.get_mut(&ms_id)
    }

    pub fn buffer_route(&mut self, ms_id: u32) -> Option<&mut BufferRoute> {
        self.buffer.get_mut(&ms_id)
    }

    /// Drops every route of the given stream
    pub fn clear_stream(&mut self, ms_id: u32) {
        self.data.remove(&ms_id);
        self.meta.remove(&ms_id);
        self.mute.remove(&ms_id);
        self.buffer.remove(&ms_id);
    }
}

/// Controller attached to a NetStream
pub enum StreamController {
    Player(Arc<Mutex<Player>>),
    Recorder(Arc<Mutex<Recorder>>),
}

impl StreamController {
    pub fn stop(&self) {
        match self {
            StreamController::Player(player) => player
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .stop(),
            StreamController::Recorder(recorder) => recorder
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .stop(),
        }
    }
}

/// Everything one server session owns
pub struct SessionContext {
    /// Session ID
    pub session_id: u64,

    /// Session logger
    pub logger: Arc<Logger>,

    /// Server configuration
    pub config: Arc<RtmpServerConfiguration>,

    /// Session start time
    pub epoch: Instant,

    /// Outgoing message serializer
    pub muxer: Arc<Mutex<Muxer>>,

    /// Shared stream store
    pub store: Arc<StreamStore>,

    /// App path routing
    pub resolver: Arc<AppResolver>,

    /// Pending remote calls
    pub calls: CallTable,

    /// Pending onStatus waiters
    pub statuses: StatusWaiters,

    /// NetStream table
    pub streams: NetStreamManager,

    /// Per-NetStream message routes
    pub routes: RouteTable,

    /// Controllers attached to NetStreams, by stream id
    pub controllers: HashMap<u32, StreamController>,

    /// The app object, instantiated by connect
    pub app: Option<Box<dyn RtmpApp>>,

    /// True after a successful connect
    pub connected: bool,
}

impl SessionContext {
    pub fn new(
        session_id: u64,
        logger: Arc<Logger>,
        config: Arc<RtmpServerConfiguration>,
        store: Arc<StreamStore>,
        resolver: Arc<AppResolver>,
        muxer: Arc<Mutex<Muxer>>,
    ) -> SessionContext {
        SessionContext {
            session_id,
            logger,
            config,
            epoch: Instant::now(),
            muxer,
            store,
            resolver,
            calls: CallTable::new(),
            statuses: StatusWaiters::new(),
            streams: NetStreamManager::new(),
            routes: RouteTable::default(),
            controllers: HashMap::new(),
            app: None,
            connected: false,
        }
    }

    fn lock_muxer(&self) -> MutexGuard<'_, Muxer> {
        self.muxer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Milliseconds since session start, wrapped to the timestamp
    /// range
    pub fn session_time_ms(&self) -> u32 {
        ms_time_wrapped(session_time(self.epoch))
    }

    /// Queues a message for sending
    pub fn send_message(&self, time: u32, msg_type: u32, ms_id: u32, body: VecBuf) {
        self.lock_muxer().send_message(time, msg_type, ms_id, body, false);
    }

    /// AMF-encodes and sends a command at the current session time
    pub fn send_command_values(&self, ms_id: u32, values: &[AMF0Value]) {
        let body = match encode(values) {
            Ok(body) => body,
            Err(e) => {
                let logger = &self.logger;
                log_error!(logger, format!("Could not encode command: {}", e));
                return;
            }
        };

        self.send_message(self.session_time_ms(), RTMP_TYPE_INVOKE, ms_id, body);
    }

    /// Sends a `_result` reply
    pub fn send_result(&self, ms_id: u32, transaction_id: f64, values: &[AMF0Value]) {
        let mut reply = vec![
            AMF0Value::string("_result"),
            AMF0Value::number(transaction_id),
        ];
        reply.extend_from_slice(values);

        self.send_command_values(ms_id, &reply);
    }

    /// Sends an `_error` reply built from a call error
    pub fn send_error(&self, ms_id: u32, transaction_id: f64, error: &CallResultError) {
        self.send_command_values(
            ms_id,
            &[
                AMF0Value::string("_error"),
                AMF0Value::number(transaction_id),
                AMF0Value::Null,
                AMF0Value::object(error.info_object()),
            ],
        );
    }

    /// Invokes a remote method, returning the pending-result handle
    pub fn call_remote(&mut self, ms_id: u32, cmd: &str, args: &[AMF0Value]) -> PendingCall {
        let call = self.calls.register(ms_id);

        let mut values = vec![
            AMF0Value::string(cmd),
            AMF0Value::number(call.transaction_id() as f64),
        ];
        values.extend_from_slice(args);

        self.send_command_values(ms_id, &values);

        call
    }

    /// Invokes a remote method without expecting a reply
    pub fn signal_remote(&self, ms_id: u32, cmd: &str, args: &[AMF0Value]) {
        let mut values = vec![AMF0Value::string(cmd), AMF0Value::number(0.0)];
        values.extend_from_slice(args);

        self.send_command_values(ms_id, &values);
    }

    /// Registers an onStatus waiter
    pub fn wait_status(&mut self, ms_id: u32, code: Option<String>) -> StatusWaiter {
        self.statuses.wait_status(ms_id, code)
    }
}
