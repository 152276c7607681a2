pub mod lru_cache;

pub use lru_cache::*;
