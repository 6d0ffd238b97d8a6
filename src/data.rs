pub mod batch;
pub mod mode;

pub use batch::{Batch, FilePattern};
pub use mode::resolve_data_path;
