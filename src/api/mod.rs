//! HTTP handlers

pub mod webhook;

pub use webhook::handle_webhook;
