pub mod client;
pub mod queries;
pub mod types;

pub use client::SupabaseClient;
pub use types::{DocumentRow, QuestionRow};
