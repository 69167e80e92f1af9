//! Concrete collaborators for the console runner.

pub mod console;
pub mod speaker;

pub use console::{ConsoleFeed, ConsoleRecognizers, ConsoleWake};
pub use speaker::CommandSpeaker;
