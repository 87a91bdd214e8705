pub mod machine;
pub mod session;
pub mod state;

pub use machine::{StudyEffect, StudyEnvironment, StudyMachine, StudyTimer, TimerTicket};
pub use session::{GuidedStudy, SessionOptions, Timer, TimerRequest};
pub use state::{SectionKey, StudyMode, StudyPhase, StudyState, StudyTimings};
