pub mod content_align;
pub mod position_align;
pub mod segment_build;
pub mod sequence_align;

pub use content_align::*;
pub use position_align::*;
pub use segment_build::*;
pub use sequence_align::*;
