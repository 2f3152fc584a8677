pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod models;
pub mod ownership;
pub mod services;

pub use config::Config;
