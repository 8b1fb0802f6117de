pub mod handler;
pub mod models;
pub(crate) mod repository;
pub mod schedule;
pub mod service;
