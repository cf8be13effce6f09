pub mod crash_probability;
pub mod evt;
pub mod hmm;
pub mod regime;
pub use crash_probability::{CrashProbabilityModel, CrashScore};
pub use evt::{EvtModel, GpdFit};
pub use hmm::GaussianHmm;
pub use regime::{Regime, RegimeEstimate, RegimeMethod, RegimeModel, RegimeProbs};
