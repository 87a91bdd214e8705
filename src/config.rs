use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use guided_study::render::DecoratorAssociation;
use guided_study::study::{SessionOptions, StudyMode, StudyTimings};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub keybindings: KeybindingsConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the document and its questions come from. A local file wins over
/// the backend when both are set.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StudyConfig {
    #[serde(default)]
    pub mode: StudyMode,
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    #[serde(default)]
    pub decorator_association: DecoratorAssociation,
    #[serde(default = "default_reveal_delay")]
    pub reveal_delay_ms: u64,
    #[serde(default = "default_toast_duration")]
    pub toast_duration_ms: u64,
    #[serde(default = "default_reset_delay")]
    pub reset_delay_ms: u64,
    #[serde(default = "default_quiz_feedback_delay")]
    pub quiz_feedback_delay_ms: u64,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Ticks (250ms each) between document reloads; 0 disables reloading.
    #[serde(default = "default_reload_interval")]
    pub reload_interval_ticks: u32,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            mode: StudyMode::default(),
            read_only: default_read_only(),
            decorator_association: DecoratorAssociation::default(),
            reveal_delay_ms: default_reveal_delay(),
            toast_duration_ms: default_toast_duration(),
            reset_delay_ms: default_reset_delay(),
            quiz_feedback_delay_ms: default_quiz_feedback_delay(),
            settle_delay_ms: default_settle_delay(),
            reload_interval_ticks: default_reload_interval(),
        }
    }
}

impl StudyConfig {
    pub fn timings(&self) -> StudyTimings {
        StudyTimings {
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
            toast_duration: Duration::from_millis(self.toast_duration_ms),
            reset_delay: Duration::from_millis(self.reset_delay_ms),
            quiz_feedback_delay: Duration::from_millis(self.quiz_feedback_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            read_only: self.read_only,
            mode: self.mode,
            association: self.decorator_association,
            timings: self.timings(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeybindingsConfig {
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default)]
    pub bindings: HashMap<String, String>,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            bindings: HashMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_read_only() -> bool {
    true
}

fn default_reveal_delay() -> u64 {
    1500
}

fn default_toast_duration() -> u64 {
    4000
}

fn default_reset_delay() -> u64 {
    5000
}

fn default_quiz_feedback_delay() -> u64 {
    2000
}

fn default_settle_delay() -> u64 {
    200
}

fn default_reload_interval() -> u32 {
    20
}

fn default_preset() -> String {
    "vim".into()
}

impl AppConfig {
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::defaults()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("STUDY_").split("__"))
            .extract()
            .map_err(|e| StudyError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.document.is_none() && self.source.document_id.is_none() {
            return Err(StudyError::Config(
                "source.document or source.document_id is required".into(),
            ));
        }
        if self.source.document.is_none() {
            if self.supabase.url.is_empty() {
                return Err(StudyError::Config(
                    "supabase.url is required when loading source.document_id".into(),
                ));
            }
            if self.supabase.anon_key.is_empty() {
                return Err(StudyError::Config(
                    "supabase.anon_key is required (set in config or STUDY_SUPABASE__ANON_KEY env var)"
                        .into(),
                ));
            }
        }
        if self.study.reset_delay_ms < self.study.reveal_delay_ms {
            return Err(StudyError::Config(
                "study.reset_delay_ms must not be shorter than study.reveal_delay_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(|xdg| PathBuf::from(xdg).join("guided-study"))
            .or_else(|| {
                directories::BaseDirs::new()
                    .map(|dirs| dirs.home_dir().join(".config").join("guided-study"))
            })
    }

    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = r#"log_level = "info"  # or set RUST_LOG

[source]
document = "notes/biology.json"      # Lexical editor state
# questions = "notes/biology.questions.json"
# document_id = "uuid-of-a-stored-document"  # load from Supabase instead

[supabase]
url = ""        # https://<project>.supabase.co
anon_key = ""   # or set STUDY_SUPABASE__ANON_KEY env var

[study]
mode = "guided"  # guided | manual
read_only = true
decorator_association = "containment"  # containment | positional
reveal_delay_ms = 1500
toast_duration_ms = 4000
reset_delay_ms = 5000
quiz_feedback_delay_ms = 2000
settle_delay_ms = 200
reload_interval_ticks = 20

[keybindings]
preset = "vim"  # vim | emacs | vscode

# Override specific keys:
# [keybindings.bindings]
# quit = "Ctrl+q"
# mark_complete = "Enter"
"#;

        std::fs::write(path, content)?;
        Ok(())
    }

    fn defaults() -> Self {
        Self {
            source: SourceConfig::default(),
            supabase: SupabaseConfig::default(),
            study: StudyConfig::default(),
            keybindings: KeybindingsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_valid_config_from_toml() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
log_level = "debug"

[source]
document = "doc.json"
questions = "questions.json"

[study]
mode = "manual"
read_only = false
decorator_association = "positional"

[keybindings]
preset = "emacs"
"#,
        );

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.source.document, Some(PathBuf::from("doc.json")));
        assert_eq!(config.source.questions, Some(PathBuf::from("questions.json")));
        assert_eq!(config.study.mode, StudyMode::Manual);
        assert!(!config.study.read_only);
        assert_eq!(
            config.study.decorator_association,
            DecoratorAssociation::Positional
        );
        assert_eq!(config.keybindings.preset, "emacs");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn defaults_apply_for_missing_optional_fields() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[source]
document = "doc.json"
"#,
        );

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.study.mode, StudyMode::Guided);
        assert!(config.study.read_only);
        assert_eq!(config.study.timings(), StudyTimings::default());
        assert_eq!(config.study.reload_interval_ticks, 20);
        assert_eq!(config.keybindings.preset, "vim");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn validate_fails_without_source() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "[study]\nmode = \"guided\"\n");

        let msg = AppConfig::load_from_path(&path).unwrap_err().to_string();
        assert!(msg.contains("source.document"));
    }

    #[test]
    fn backend_source_requires_supabase_credentials() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[source]
document_id = "doc-1"

[supabase]
url = "https://abc.supabase.co"
"#,
        );

        let msg = AppConfig::load_from_path(&path).unwrap_err().to_string();
        assert!(msg.contains("anon_key"));
    }

    #[test]
    fn backend_source_loads_with_credentials() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[source]
document_id = "doc-1"

[supabase]
url = "https://abc.supabase.co"
anon_key = "anon"
"#,
        );

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.source.document_id.as_deref(), Some("doc-1"));
    }

    #[test]
    fn reset_must_follow_reveal() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[source]
document = "doc.json"

[study]
reveal_delay_ms = 3000
reset_delay_ms = 1000
"#,
        );

        let msg = AppConfig::load_from_path(&path).unwrap_err().to_string();
        assert!(msg.contains("reset_delay_ms"));
    }

    #[test]
    fn custom_timings_flow_into_session_options() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[source]
document = "doc.json"

[study]
reveal_delay_ms = 100
settle_delay_ms = 10
"#,
        );

        let options = AppConfig::load_from_path(&path)
            .unwrap()
            .study
            .session_options();
        assert_eq!(options.timings.reveal_delay, Duration::from_millis(100));
        assert_eq!(options.timings.settle_delay, Duration::from_millis(10));
        assert_eq!(options.timings.reset_delay, Duration::from_millis(5000));
    }

    #[test]
    fn write_default_creates_loadable_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("subdir").join("config.toml");

        AppConfig::write_default(&path).unwrap();

        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("guided"));
        assert!(content.contains("vim"));
        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.study.reveal_delay_ms, 1500);
    }

    #[test]
    fn keybinding_overrides_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[source]
document = "doc.json"

[keybindings.bindings]
quit = "Ctrl+q"
mark_complete = "Enter"
"#,
        );

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.keybindings.bindings.get("quit").unwrap(), "Ctrl+q");
        assert_eq!(
            config.keybindings.bindings.get("mark_complete").unwrap(),
            "Enter"
        );
    }

    #[test]
    fn config_dir_returns_some() {
        let dir = AppConfig::config_dir();
        assert!(dir.is_some());
    }
}
