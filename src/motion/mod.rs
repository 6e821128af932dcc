// Motion compensation.
//
// - `config`:  Search profiles (coarse stride, threshold, attempt budget)
// - `vectors`: The ordered 441-entry candidate table
// - `store`:   Bordered frame buffers, work buffer, block partition
// - `matcher`: Per-block vector search, generic over pixel width
// - `delta`:   Vector array and XOR payload encode/decode

pub mod config;
pub mod delta;
pub mod matcher;
pub mod store;
pub mod vectors;

pub use config::{MAX_SEARCH_RADIUS, SearchConfig, config_for_name};
pub use delta::{BlockVector, DeltaStats};
pub use matcher::{BlockMatch, BlockMatcher, Pixel, mismatch};
pub use store::{BORDER, Block, FrameStore, MAX_DIMENSION, check_dimensions, max_work_size, tile_blocks};
pub use vectors::{VECTOR_COUNT, VectorTable};
