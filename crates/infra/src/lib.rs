//! Shared mutable gateway state: sessions, the global pause flag, per-tool
//! rate windows and the evidence timeline.

pub mod evidence;
pub mod evidence_log;
pub mod pause;
pub mod rate_limiter;
pub mod session_registry;

pub use evidence::{
    EvidenceEntry, EvidenceError, EvidenceExport, EvidenceFormat, EvidenceMetadata, EvidencePack,
    EvidenceRecorder, EvidenceSink,
};
pub use evidence_log::ChainedEvidenceLog;
pub use pause::{GlobalPauseState, PauseController};
pub use rate_limiter::{RateLimitConfig, RateLimiter, RateWindow};
pub use session_registry::{Session, SessionRegistry};
