pub mod alerts;
pub mod auth;
pub mod config_editor;
pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod polling;
pub mod store;
pub mod web_interface;
