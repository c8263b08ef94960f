//! Data preprocessing building blocks.

pub mod box_remap;
pub mod center_crop;
pub mod feature_dropout;

pub use box_remap::*;
pub use center_crop::*;
pub use feature_dropout::*;
