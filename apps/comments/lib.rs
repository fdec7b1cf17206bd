pub mod buckets;
pub mod comments_api;
pub mod config;
pub mod dedup;
pub mod models;
pub mod pipeline;
pub mod sentiment;
pub mod server;
pub mod store;
pub mod timeline;
