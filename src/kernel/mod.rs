//! Session orchestration: the state graph, mic ownership, cancellation and
//! the driver loop that ties router, planner, gate and devices together.

pub mod cancel;
pub mod command;
pub mod context;
pub mod devices;
pub mod event;
pub mod orchestrator;
pub mod presence;
pub mod telemetry;

pub use devices::{Recognizer, RecognizerFactory, SampleRecorder, SpeechSynthesizer, WakeListener};
pub use event::{SessionEvent, SessionNotice};
pub use orchestrator::{Devices, SessionHandle, SessionOrchestrator};
pub use presence::{SessionGraph, SessionState, SessionTrigger};
