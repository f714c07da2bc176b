//! QueueStore implementations.
//!
//! - **RedisStore**: production store over a `bb8` connection pool
//! - **InMemoryStore**: process-local store with fault injection, for tests and demos

pub mod memory_store;
pub mod redis_store;

pub use self::memory_store::InMemoryStore;
pub use self::redis_store::RedisStore;
