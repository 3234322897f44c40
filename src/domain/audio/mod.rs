//! Audio resources - clip resolution and WAV decoding

pub mod library;
pub mod wav;

pub use library::ClipLibrary;
pub use wav::{WavError, WavFile, WavFormat};
