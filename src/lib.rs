//! Reese stylist server - captions outfit photos and returns fashion advice
//!
//! Accepts a base64 photo and an occasion, asks an image-captioning model to
//! describe the outfit, then picks canned advice from an occasion rule table.

pub mod advice;
pub mod ai;
pub mod app;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod server;

pub use error::{Error, Result};
