use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::questions::QuestionLookup;

use super::state::{SectionKey, StudyMode, StudyPhase, StudyState, StudyTimings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyTimer {
    /// End study mode so the whole document shows again.
    RevealContent,
    DismissToast,
    /// Clear progress after a finished session.
    ResetProgress,
}

/// A delayed callback, valid only for the session generation it was
/// issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub timer: StudyTimer,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyEffect {
    OpenQuiz { section: usize },
    CloseQuiz,
    /// Visible section changed; run the visibility projection again.
    Reproject,
    Schedule { ticket: TimerTicket, after: Duration },
    CancelTimers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyEnvironment {
    pub read_only: bool,
    pub mode: StudyMode,
    pub total_sections: usize,
}

pub struct StudyMachine {
    phase: StudyPhase,
    current: usize,
    completed: BTreeSet<SectionKey>,
    show_toast: bool,
    generation: u64,
    env: StudyEnvironment,
    timings: StudyTimings,
    tx: watch::Sender<StudyState>,
}

impl StudyMachine {
    pub fn new(env: StudyEnvironment, timings: StudyTimings) -> Self {
        let mut machine = Self {
            phase: StudyPhase::Disabled,
            current: 0,
            completed: BTreeSet::new(),
            show_toast: false,
            generation: 0,
            env,
            timings,
            tx: watch::channel(StudyState {
                phase: StudyPhase::Disabled,
                enabled: false,
                current_section_index: 0,
                completed_sections: BTreeSet::new(),
                pending_quiz_section_index: None,
                show_quiz_modal: false,
                show_completion_toast: false,
                total_sections: env.total_sections,
            })
            .0,
        };
        machine.publish();
        machine
    }

    pub fn state(&self) -> StudyState {
        let pending = match self.phase {
            StudyPhase::QuizPending { section } => Some(section),
            _ => None,
        };
        StudyState {
            phase: self.phase,
            enabled: self.is_enabled(),
            current_section_index: self.current,
            completed_sections: self.completed.clone(),
            pending_quiz_section_index: pending,
            show_quiz_modal: pending.is_some(),
            show_completion_toast: self.show_toast,
            total_sections: self.env.total_sections,
        }
    }

    /// Every reader observes the same published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StudyState> {
        self.tx.subscribe()
    }

    #[cfg(test)]
    fn environment(&self) -> StudyEnvironment {
        self.env
    }

    pub fn is_enabled(&self) -> bool {
        self.phase != StudyPhase::Disabled
    }

    fn conditions_hold(&self) -> bool {
        self.env.read_only && self.env.mode == StudyMode::Guided
    }

    /// Whether toggling on would succeed right now.
    pub fn can_enable(&self) -> bool {
        self.conditions_hold() && self.env.total_sections > 0
    }

    fn publish(&mut self) {
        let state = self.state();
        self.tx.send_replace(state);
    }

    fn commit(&mut self, effects: Vec<StudyEffect>) -> Vec<StudyEffect> {
        self.publish();
        effects
    }

    pub fn toggle(&mut self) -> Vec<StudyEffect> {
        if self.is_enabled() {
            let effects = self.force_reset("toggled off");
            return self.commit(effects);
        }
        if !self.can_enable() {
            debug!(
                read_only = self.env.read_only,
                mode = %self.env.mode,
                total_sections = self.env.total_sections,
                "Study mode toggle ignored"
            );
            return Vec::new();
        }
        self.generation += 1;
        self.phase = StudyPhase::Active { section: 0 };
        self.current = 0;
        self.completed.clear();
        self.show_toast = false;
        info!(
            generation = self.generation,
            total_sections = self.env.total_sections,
            "Study mode enabled"
        );
        self.commit(vec![StudyEffect::CancelTimers, StudyEffect::Reproject])
    }

    pub fn set_read_only(&mut self, read_only: bool) -> Vec<StudyEffect> {
        self.env.read_only = read_only;
        let effects = self.enforce_conditions();
        self.commit(effects)
    }

    pub fn set_mode(&mut self, mode: StudyMode) -> Vec<StudyEffect> {
        self.env.mode = mode;
        let effects = self.enforce_conditions();
        self.commit(effects)
    }

    fn enforce_conditions(&mut self) -> Vec<StudyEffect> {
        if self.conditions_hold() || !self.has_progress() {
            return Vec::new();
        }
        self.force_reset("read-only or guided mode left")
    }

    fn has_progress(&self) -> bool {
        self.is_enabled() || self.show_toast || !self.completed.is_empty() || self.current != 0
    }

    /// Document structure changed. Out-of-range positions are clamped to the
    /// last section; zero sections ends the session.
    pub fn set_total_sections(&mut self, total: usize) -> Vec<StudyEffect> {
        self.env.total_sections = total;
        if !self.is_enabled() {
            return self.commit(Vec::new());
        }
        if total == 0 {
            let effects = self.force_reset("document has no sections");
            return self.commit(effects);
        }

        let last = total - 1;
        let mut effects = Vec::new();
        match self.phase {
            StudyPhase::Active { section } if section > last => {
                self.phase = StudyPhase::Active { section: last };
                effects.push(StudyEffect::Reproject);
            }
            StudyPhase::QuizPending { section } if section > last => {
                debug!(section, total, "Pending quiz section no longer exists");
                self.phase = StudyPhase::Active { section: last };
                effects.push(StudyEffect::CloseQuiz);
                effects.push(StudyEffect::Reproject);
            }
            _ => {}
        }
        if self.current > last {
            self.current = last;
            if !effects.contains(&StudyEffect::Reproject) {
                effects.push(StudyEffect::Reproject);
            }
        }
        self.commit(effects)
    }

    /// Mark the visible section as done. Anything but the current section
    /// of an active session is ignored.
    pub fn mark_section_complete(
        &mut self,
        section: usize,
        questions: &impl QuestionLookup,
    ) -> Vec<StudyEffect> {
        let StudyPhase::Active { section: current } = self.phase else {
            debug!(section, phase = ?self.phase, "Mark complete ignored");
            return Vec::new();
        };
        if section != current {
            debug!(section, current, "Mark complete ignored for non-current section");
            return Vec::new();
        }

        self.completed.insert(SectionKey(section));
        info!(section, "Section completed");
        let effects = if questions.has_questions(section) {
            self.phase = StudyPhase::QuizPending { section };
            vec![StudyEffect::OpenQuiz { section }]
        } else {
            self.advance_or_complete(section)
        };
        self.commit(effects)
    }

    pub fn next_section(&mut self) -> Vec<StudyEffect> {
        match self.phase {
            StudyPhase::Active { section } if section + 1 < self.env.total_sections => {
                self.phase = StudyPhase::Active {
                    section: section + 1,
                };
                self.current = section + 1;
                debug!(section = self.current, "Moved to next section");
                self.commit(vec![StudyEffect::Reproject])
            }
            _ => Vec::new(),
        }
    }

    pub fn quiz_completed(&mut self) -> Vec<StudyEffect> {
        self.leave_quiz("completed")
    }

    pub fn quiz_skipped(&mut self) -> Vec<StudyEffect> {
        self.leave_quiz("skipped")
    }

    fn leave_quiz(&mut self, how: &'static str) -> Vec<StudyEffect> {
        let StudyPhase::QuizPending { section } = self.phase else {
            debug!(how, "No quiz pending");
            return Vec::new();
        };
        debug!(section, how, "Quiz closed");
        let mut effects = vec![StudyEffect::CloseQuiz];
        effects.extend(self.advance_or_complete(section));
        self.commit(effects)
    }

    fn advance_or_complete(&mut self, section: usize) -> Vec<StudyEffect> {
        if section + 1 < self.env.total_sections {
            self.phase = StudyPhase::Active {
                section: section + 1,
            };
            self.current = section + 1;
            vec![StudyEffect::Reproject]
        } else {
            self.begin_completion()
        }
    }

    fn begin_completion(&mut self) -> Vec<StudyEffect> {
        if self.phase == StudyPhase::Completing {
            return Vec::new();
        }
        self.generation += 1;
        self.phase = StudyPhase::Completing;
        self.show_toast = true;
        info!(
            generation = self.generation,
            completed = self.completed.len(),
            "Study session finished"
        );
        let generation = self.generation;
        let schedule = |timer, after| StudyEffect::Schedule {
            ticket: TimerTicket { timer, generation },
            after,
        };
        vec![
            schedule(StudyTimer::RevealContent, self.timings.reveal_delay),
            schedule(StudyTimer::DismissToast, self.timings.toast_duration),
            schedule(StudyTimer::ResetProgress, self.timings.reset_delay),
        ]
    }

    pub fn fire(&mut self, ticket: TimerTicket) -> Vec<StudyEffect> {
        if ticket.generation != self.generation {
            debug!(
                timer = ?ticket.timer,
                ticket = ticket.generation,
                current = self.generation,
                "Stale timer ignored"
            );
            return Vec::new();
        }
        let effects = match ticket.timer {
            StudyTimer::RevealContent => {
                if self.phase == StudyPhase::Completing {
                    self.phase = StudyPhase::Disabled;
                    info!("Study mode ended; content revealed");
                    vec![StudyEffect::Reproject]
                } else {
                    Vec::new()
                }
            }
            StudyTimer::DismissToast => {
                self.show_toast = false;
                Vec::new()
            }
            StudyTimer::ResetProgress => {
                let mut effects = Vec::new();
                if self.phase == StudyPhase::Completing {
                    self.phase = StudyPhase::Disabled;
                    effects.push(StudyEffect::Reproject);
                }
                self.completed.clear();
                self.current = 0;
                self.show_toast = false;
                debug!("Study progress reset");
                effects
            }
        };
        self.commit(effects)
    }

    fn force_reset(&mut self, reason: &'static str) -> Vec<StudyEffect> {
        let had_quiz = matches!(self.phase, StudyPhase::QuizPending { .. });
        self.generation += 1;
        self.phase = StudyPhase::Disabled;
        self.current = 0;
        self.completed.clear();
        self.show_toast = false;
        info!(reason, generation = self.generation, "Study mode disabled");
        let mut effects = vec![StudyEffect::CancelTimers];
        if had_quiz {
            effects.push(StudyEffect::CloseQuiz);
        }
        effects.push(StudyEffect::Reproject);
        effects
    }
}
