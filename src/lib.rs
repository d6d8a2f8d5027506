// RTMP core library
//
// Layered protocol state machines turning a byte stream into dispatched
// typed messages and back: handshake, chunk demuxer/muxer, message and
// command dispatch, plus an in-memory live stream store and the
// player/recorder controllers bridging the two.

pub mod amf;
pub mod chunks;
pub mod controllers;
pub mod handshake;
pub mod log;
pub mod proto;
pub mod server;
pub mod session;
pub mod store;
pub mod utils;
pub mod vecbuf;
