// NetStream <-> stream group controllers

mod player;
mod policy;
mod recorder;
mod writer;

pub use player::*;
pub use policy::*;
pub use recorder::*;
pub use writer::*;

// Params' stream types
pub const TYPE_VIDEO: &str = "video/x-flv-tag-video";
pub const TYPE_AUDIO: &str = "audio/x-flv-tag-audio";
