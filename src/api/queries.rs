//! PostgREST filter parameters for the tables the app reads and writes.

pub const DOCUMENTS: &str = "documents";
pub const QUESTIONS: &str = "questions";

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

pub fn document_by_id(id: &str) -> Vec<(&'static str, String)> {
    vec![("id", eq(id)), ("select", "*".into())]
}

pub fn questions_for_document(document_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("document_id", eq(document_id)),
        ("order", "section_index.asc,position.asc".into()),
    ]
}

pub fn section_questions(document_id: &str, section_index: usize) -> Vec<(&'static str, String)> {
    vec![
        ("document_id", eq(document_id)),
        ("section_index", eq(section_index)),
    ]
}
