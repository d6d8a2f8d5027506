// Status codes

pub const STATUS_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
pub const STATUS_CONNECT_FAILED: &str = "NetConnection.Connect.Failed";
pub const STATUS_CONNECT_INVALID_APP: &str = "NetConnection.Connect.InvalidApp";

pub const STATUS_PUBLISH_START: &str = "NetStream.Publish.Start";
pub const STATUS_PUBLISH_BAD_NAME: &str = "NetStream.Publish.BadName";
pub const STATUS_UNPUBLISH_SUCCESS: &str = "NetStream.Unpublish.Success";

pub const STATUS_PLAY_START: &str = "NetStream.Play.Start";
pub const STATUS_PLAY_RESET: &str = "NetStream.Play.Reset";
pub const STATUS_PLAY_STREAM_NOT_FOUND: &str = "NetStream.Play.StreamNotFound";
pub const STATUS_PLAY_FAILED: &str = "NetStream.Play.Failed";

pub const STATUS_FAILED: &str = "NetStream.Failed";
pub const STATUS_DATA_START: &str = "NetStream.Data.Start";
