//! Interface layer - the console surface used by the binary

pub mod console;

pub use console::{Console, ConsoleCommand};
