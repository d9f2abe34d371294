//! Download streaming.
//!
//! The download route resolves a link through the info route, plans an
//! ffmpeg invocation, and pipes the transcoder's stdout into the response.
//!
//! - [`resolve`] - HTTP client for the info route
//! - [`transcode`] - transcoder process ownership and body streaming
//! - [`gate`] - one-shot latch deciding which event concluded a request
//! - [`disposition`] - attachment header values

pub mod disposition;
pub mod gate;
pub mod resolve;
pub mod transcode;

pub use gate::{FinalizeSource, ResponseGate};
pub use resolve::InfoClient;
pub use transcode::{TranscodeError, TranscodeJob};
