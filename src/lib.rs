pub mod api;
pub mod config;
pub mod database;
pub mod drip;
pub mod error;
pub mod logger;
pub mod model;
pub mod notifier;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod time;
