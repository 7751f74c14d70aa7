//! HTTP surface of the strength prediction service

pub mod api;
pub mod config;
