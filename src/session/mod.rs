pub mod machine;
pub mod phase;

pub use machine::{StudySession, StudySnapshot};
pub use phase::StudyPhase;
