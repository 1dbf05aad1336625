pub mod command_log;
pub mod config;
pub mod error;
pub mod slot_store;
pub mod storage;
pub mod text_generator;
