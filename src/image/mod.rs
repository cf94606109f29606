//! Image upload decoding
//!
//! Turns the base64 (or data-URL) payload posted by clients into normalized
//! RGB PNG bytes that can be handed to a caption provider.

pub mod decoder;

pub use decoder::{DecodedImage, ImageDecoder};
