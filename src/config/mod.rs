pub mod tool;
pub mod wrapper;

pub use tool::{load_tool_config, VectorStatsConfig};
pub use wrapper::{load_wrapper_config, WrapperConfig};
