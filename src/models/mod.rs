pub mod alignment;
pub mod timed_line;
pub mod transcription;

pub use alignment::*;
pub use timed_line::*;
pub use transcription::*;
