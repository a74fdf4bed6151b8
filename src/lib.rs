// Library for the binary and tests to access modules

pub mod aggregator;
pub mod api_client;
pub mod config;
pub mod connection;
pub mod engine;
pub mod history;
pub mod models;
pub mod poller;
pub mod protocol;
pub mod selector;
pub mod version;
