//! HTTP request handlers.

pub mod chunked;
pub mod cleanup;
pub mod common;
pub mod stream;
pub mod tracks;
pub mod transcription;
pub mod uploads;

pub use chunked::*;
pub use cleanup::*;
pub use common::*;
pub use stream::*;
pub use tracks::*;
pub use transcription::*;
pub use uploads::*;
