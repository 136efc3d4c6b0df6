pub mod archive;
pub mod cleanup;
pub mod config;
pub mod http;
pub mod index;
pub mod metadata;
pub mod mirror;
pub mod package;
pub mod progress;
pub mod runtime;
pub mod store;
pub mod traversal;
