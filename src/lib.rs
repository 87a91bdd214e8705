pub mod api;
pub mod document;
pub mod error;
pub mod questions;
pub mod quiz;
pub mod render;
pub mod study;

// Convenience re-exports
pub use api::SupabaseClient;
pub use document::{Document, NodeKey, Section};
pub use error::{Result, StudyError};
pub use questions::{Answer, Question, QuestionDraft, QuestionStore, QuestionType, SectionQuestions};
pub use quiz::{QuizGate, QuizSummary};
pub use render::{DecoratorAssociation, RenderedDocument, VisibilityProjector};
pub use study::{GuidedStudy, StudyMachine, StudyMode, StudyState};
