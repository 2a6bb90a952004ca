pub mod line_filter;
pub mod normalize;
pub mod similarity;

pub use line_filter::*;
pub use normalize::*;
pub use similarity::*;
