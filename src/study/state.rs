use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Global study preference. Only guided mode reveals sections one by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    #[default]
    Guided,
    Manual,
}

impl StudyMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Guided => Self::Manual,
            Self::Manual => Self::Guided,
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guided => f.write_str("guided"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// Completion key of a section, displayed as `section-{index}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionKey(pub usize);

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section-{}", self.0)
    }
}

impl Serialize for SectionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum StudyPhase {
    Disabled,
    Active { section: usize },
    QuizPending { section: usize },
    Completing,
}

/// Snapshot published on every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyState {
    pub phase: StudyPhase,
    pub enabled: bool,
    pub current_section_index: usize,
    pub completed_sections: BTreeSet<SectionKey>,
    pub pending_quiz_section_index: Option<usize>,
    pub show_quiz_modal: bool,
    pub show_completion_toast: bool,
    pub total_sections: usize,
}

impl StudyState {
    /// Section to project, or `None` when everything should be visible.
    pub fn visible_section(&self) -> Option<usize> {
        self.enabled.then_some(self.current_section_index)
    }

    pub fn is_completed(&self, section: usize) -> bool {
        self.completed_sections.contains(&SectionKey(section))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyTimings {
    /// Completion to full content reveal.
    pub reveal_delay: Duration,
    /// Completion toast auto-dismiss.
    pub toast_duration: Duration,
    /// Completion to progress reset.
    pub reset_delay: Duration,
    pub quiz_feedback_delay: Duration,
    /// Wait for decorator nodes to mount before associating them.
    pub settle_delay: Duration,
}

impl Default for StudyTimings {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::from_millis(1500),
            toast_duration: Duration::from_millis(4000),
            reset_delay: Duration::from_millis(5000),
            quiz_feedback_delay: Duration::from_millis(2000),
            settle_delay: Duration::from_millis(200),
        }
    }
}
