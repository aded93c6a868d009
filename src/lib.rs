pub mod auth;
pub mod client;
pub mod common;
pub mod config;
pub mod error;
pub mod identity;
pub mod links;
pub mod session;
pub mod storage;
pub mod ui;
