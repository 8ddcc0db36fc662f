pub mod hash;
pub mod targets_cache;

pub use hash::hash_for_create_nodes;
pub use targets_cache::{TargetMap, TargetsCache, TargetsStaging};
