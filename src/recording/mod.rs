//! Raw stream recording and offline replay
//!
//! Recording persists the byte stream exactly as received, so a recorded
//! session stays decodable by the same frame decoder that handled it live.
//! [`Recorder`] is the live-side tap; [`RecordingReader`] replays a finished
//! recording offline.

pub mod reader;
pub mod writer;

pub use reader::RecordingReader;
pub use writer::Recorder;
