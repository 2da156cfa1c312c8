#![forbid(unsafe_code)]

pub mod bot;
pub mod catalog;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod notify;
pub mod objects;
pub mod sink;
pub mod store;
pub mod telegram;
pub mod web;
