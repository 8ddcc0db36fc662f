pub mod cache;
pub mod infer;

pub use cache::cache_clear_command;
pub use infer::infer_command;
