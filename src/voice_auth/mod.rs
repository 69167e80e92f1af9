//! Speaker verification: MFCC summary features, a standardising scaler and a
//! logistic classifier trained against synthetic noise.

pub mod features;
pub mod gate;
pub mod model;

pub use gate::{enroll, verify, VerificationGate, Verdict};
pub use model::VoiceProfile;
