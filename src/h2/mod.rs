//! HTTP/2 frame codec, settings negotiation, stream lifecycle, and the
//! connection state machine tying them together (RFC 7540).

pub mod connection;
pub mod error;
pub mod frame;
pub mod settings;
pub mod stream;

pub use connection::{Connection, ConnectionState, H2Event, Role};
pub use error::{ErrorCode, H2Error};
pub use frame::{frame_type, flags, is_h2c_preface, FrameHeader, CONNECTION_PREFACE};
pub use settings::{settings_id, Settings, UNBOUNDED};
pub use stream::{Stream, StreamLifecycle, StreamManager, MAX_HEADER_BLOCK_SIZE};
