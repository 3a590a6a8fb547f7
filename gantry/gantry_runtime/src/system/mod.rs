//! System-level runtime services.

pub mod config;
