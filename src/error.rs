use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document error: {0}")]
    Document(String),
    #[error("No valid questions to save for section {section}")]
    NoValidQuestions { section: usize },
    #[error("Quiz for section {section} is already closed")]
    QuizClosed { section: usize },
    #[error("Quiz is showing feedback; wait for the next question")]
    QuizAwaitingAdvance,
}

pub type Result<T> = std::result::Result<T, StudyError>;

/// Structured error data for the message channel
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorInfo {
    Api { status: u16, body: String },
    Network(String),
    Load(String),
    Save(String),
}

impl ErrorInfo {
    pub fn from_study_error(e: &StudyError) -> Self {
        match e {
            StudyError::Api { status, message } => ErrorInfo::Api {
                status: *status,
                body: message.clone(),
            },
            StudyError::Http(_) => ErrorInfo::Network(e.to_string()),
            StudyError::NoValidQuestions { .. } => ErrorInfo::Save(e.to_string()),
            _ => ErrorInfo::Load(e.to_string()),
        }
    }
}

/// Ready-to-render error popup data
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPopup {
    pub title: String,
    pub message: String,
    pub hint: String,
}

impl ErrorPopup {
    pub fn from_error_info(info: &ErrorInfo) -> Self {
        match info {
            ErrorInfo::Api { status, body } => Self::from_api(*status, body),
            ErrorInfo::Network(msg) => Self {
                title: "Network Error".into(),
                message: truncate(msg, 80),
                hint: "Check your internet connection".into(),
            },
            ErrorInfo::Load(msg) => Self {
                title: "Load Failed".into(),
                message: truncate(msg, 80),
                hint: "Check the [source] paths in config.toml".into(),
            },
            ErrorInfo::Save(msg) => Self {
                title: "Nothing Saved".into(),
                message: truncate(msg, 80),
                hint: "Fill in every question before saving".into(),
            },
        }
    }

    fn from_api(status: u16, body: &str) -> Self {
        let extracted_message = extract_json_message(body);

        match status {
            429 => Self {
                title: "Rate Limited".into(),
                message: extracted_message.unwrap_or_else(|| "Too many requests".into()),
                hint: "Wait a moment and try again".into(),
            },
            401 => Self {
                title: "Unauthorized".into(),
                message: "Invalid API key".into(),
                hint: "Check supabase.anon_key in config.toml".into(),
            },
            404 => Self {
                title: "Not Found".into(),
                message: extracted_message.unwrap_or_else(|| "Document not found".into()),
                hint: "Check source.document_id in config.toml".into(),
            },
            500 => Self {
                title: "Server Error".into(),
                message: "The backend returned an error".into(),
                hint: "Try again later".into(),
            },
            _ => Self {
                title: format!("API Error ({})", status),
                message: extracted_message.unwrap_or_else(|| truncate(body, 200)),
                hint: "Try again later".into(),
            },
        }
    }
}

fn extract_json_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(String::from))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
