pub mod capture;
pub mod processing;
pub mod wav;

pub use capture::MicRecorder;
