pub mod handler;
pub mod models;
pub mod progress;
pub(crate) mod repository;
pub mod service;
