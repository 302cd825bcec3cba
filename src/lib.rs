pub mod app;
pub mod config;
pub mod lookup;
pub mod models;
pub mod render;
pub mod trailer_api;
