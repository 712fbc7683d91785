pub mod cache;
pub mod feedback;
pub mod registry;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod timer;

pub use session::{QuizSession, QuizSettings, SessionDeps, SessionSnapshot, SessionState};
