// Library exports for the forum backend
// This allows integration tests and the binary to share the same modules

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod reactions;
pub mod repository;
pub mod routes;
pub mod state;
