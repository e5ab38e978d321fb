pub mod chunk_cache;
pub mod db;
pub mod types;
