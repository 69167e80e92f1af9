pub mod audio;
pub mod config;
pub mod drivers;
pub mod error;
pub mod intent;
pub mod kernel;
pub mod planner;
pub mod services;
pub mod tools;
pub mod voice_auth;

pub use config::Settings;
pub use intent::IntentRouter;
pub use kernel::{SessionHandle, SessionOrchestrator};
pub use planner::PlannerFallback;
pub use voice_auth::VerificationGate;
