//! `BrickWall`: the orchestration layer tying a bounding box, a grid,
//! and a collection of bricks together into one pipeline-friendly value.

pub mod downsample;
pub mod labelmap;
pub mod wall;

pub use downsample::{downsample_brick, DownsampleMethod};
pub use labelmap::{relabel_brick, LabelMapper};
pub use wall::{BrickWall, PersistedWall};
