//! Infrastructure layer - Storage, configuration and id generation

pub mod config;
pub mod database;
pub mod id_generator;

pub use config::ServerConfig;
pub use database::{InMemoryAllocationStore, SeaOrmAllocationStore};
pub use id_generator::TimestampSheetIdGenerator;
