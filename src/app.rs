//! Application state and its transitions.
//!
//! The interactive session owns one [`AppState`] and feeds it [`Event`]s;
//! [`update`] returns the next state plus the [`Effect`]s the driver must
//! carry out. Nothing in here touches the filesystem or the terminal.

use std::path::PathBuf;
use std::time::Duration;

use crate::form::{FormState, Overlay};

pub const TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Exporting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NameInput(String),
    LevelSelected(String),
    Reset,
    DownloadRequested,
    ExportSucceeded(PathBuf),
    ExportFailed(String),
    ToastExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RefreshPreview,
    StartExport { name: String, level: String },
    ScheduleToastDismiss(Duration),
    ShowAlert(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub form: FormState,
    pub levels: Vec<String>,
    pub phase: Phase,
    pub toast: Option<String>,
}

/// What the status line shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub overlay: Overlay,
    pub char_count: usize,
    pub max_length: usize,
    pub level: String,
    pub export_enabled: bool,
    pub busy: bool,
    pub toast: Option<String>,
}

impl AppState {
    pub fn new(levels: Vec<String>, level: impl Into<String>, max_length: usize) -> Self {
        Self {
            form: FormState::new(level, max_length),
            levels,
            phase: Phase::Idle,
            toast: None,
        }
    }

    pub fn view(&self, placeholder: &str) -> View {
        View {
            overlay: self.form.overlay(placeholder),
            char_count: self.form.char_count(),
            max_length: self.form.max_length(),
            level: self.form.level().to_string(),
            export_enabled: self.form.export_enabled(),
            busy: self.phase == Phase::Exporting,
            toast: self.toast.clone(),
        }
    }
}

pub fn update(mut state: AppState, event: Event) -> (AppState, Vec<Effect>) {
    let effects = match event {
        Event::NameInput(raw) => {
            state.form.set_input(&raw);
            vec![Effect::RefreshPreview]
        }
        Event::LevelSelected(level) => {
            if state.levels.contains(&level) {
                state.form.set_level(level);
                vec![Effect::RefreshPreview]
            } else {
                vec![Effect::ShowAlert(format!(
                    "Unknown level '{}'. Available: {}",
                    level,
                    state.levels.join(", ")
                ))]
            }
        }
        Event::Reset => {
            state.form.reset();
            vec![Effect::RefreshPreview]
        }
        Event::DownloadRequested => {
            if !state.form.export_enabled() {
                Vec::new()
            } else if state.phase == Phase::Exporting {
                log::warn!("An export is already running; ignoring the new request");
                Vec::new()
            } else {
                state.phase = Phase::Exporting;
                vec![Effect::StartExport {
                    name: state.form.name().to_string(),
                    level: state.form.level().to_string(),
                }]
            }
        }
        Event::ExportSucceeded(path) => {
            state.phase = Phase::Idle;
            state.toast = Some(format!("Diploma saved: {}", path.display()));
            vec![Effect::ScheduleToastDismiss(TOAST_DURATION)]
        }
        Event::ExportFailed(message) => {
            state.phase = Phase::Idle;
            vec![Effect::ShowAlert(format!(
                "Could not generate the PDF. Please try again.\n\nError: {}",
                message
            ))]
        }
        Event::ToastExpired => {
            state.toast = None;
            Vec::new()
        }
    };
    (state, effects)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACEHOLDER: &str = "Nombre del Alumno";

    fn state() -> AppState {
        AppState::new(
            vec!["kinder".to_string(), "primaria".to_string()],
            "primaria",
            60,
        )
    }

    fn apply(state: AppState, events: impl IntoIterator<Item = Event>) -> (AppState, Vec<Effect>) {
        let mut state = state;
        let mut last = Vec::new();
        for event in events {
            let (next, effects) = update(state, event);
            state = next;
            last = effects;
        }
        (state, last)
    }

    #[test]
    fn test_name_input_title_cases_and_refreshes() {
        let (state, effects) = update(state(), Event::NameInput("josé ángel".to_string()));
        assert_eq!(state.form.name(), "José Ángel");
        assert_eq!(effects, vec![Effect::RefreshPreview]);

        let view = state.view(PLACEHOLDER);
        assert_eq!(view.char_count, 10);
        assert!(view.export_enabled);
        assert!(!view.overlay.is_placeholder);
    }

    #[test]
    fn test_reset_restores_initial_view() {
        let (state, effects) = apply(
            state(),
            [
                Event::NameInput("luis".to_string()),
                Event::LevelSelected("kinder".to_string()),
                Event::Reset,
            ],
        );
        assert_eq!(effects, vec![Effect::RefreshPreview]);

        let view = state.view(PLACEHOLDER);
        assert_eq!(view.char_count, 0);
        assert_eq!(view.overlay.text, PLACEHOLDER);
        assert!(view.overlay.is_placeholder);
        assert!(!view.export_enabled);
        assert_eq!(view.level, "kinder");
    }

    #[test]
    fn test_unknown_level_alerts_and_keeps_selection() {
        let (state, effects) = update(state(), Event::LevelSelected("universidad".to_string()));
        assert_eq!(state.form.level(), "primaria");
        assert!(matches!(effects.as_slice(), [Effect::ShowAlert(msg)] if msg.contains("universidad")));
    }

    #[test]
    fn test_download_with_empty_name_is_ignored() {
        let (state, effects) = apply(state(), [Event::NameInput("   ".to_string()), Event::DownloadRequested]);
        assert!(effects.is_empty());
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn test_download_starts_export() {
        let (state, effects) = apply(state(), [Event::NameInput(" ana ".to_string()), Event::DownloadRequested]);
        assert_eq!(state.phase, Phase::Exporting);
        assert_eq!(
            effects,
            vec![Effect::StartExport { name: "Ana".to_string(), level: "primaria".to_string() }]
        );
        assert!(state.view(PLACEHOLDER).busy);
    }

    #[test]
    fn test_second_download_while_exporting_is_ignored() {
        let (state, effects) = apply(
            state(),
            [Event::NameInput("ana".to_string()), Event::DownloadRequested, Event::DownloadRequested],
        );
        assert!(effects.is_empty());
        assert_eq!(state.phase, Phase::Exporting);
    }

    #[test]
    fn test_success_shows_toast_then_expires() {
        let (state, effects) = apply(
            state(),
            [
                Event::NameInput("ana".to_string()),
                Event::DownloadRequested,
                Event::ExportSucceeded(PathBuf::from("Diploma_Ana.pdf")),
            ],
        );
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(effects, vec![Effect::ScheduleToastDismiss(TOAST_DURATION)]);
        assert_eq!(state.toast.as_deref(), Some("Diploma saved: Diploma_Ana.pdf"));

        let (state, effects) = update(state, Event::ToastExpired);
        assert!(effects.is_empty());
        assert_eq!(state.toast, None);
    }

    #[test]
    fn test_failure_alerts_and_returns_to_idle() {
        let (state, effects) = apply(
            state(),
            [
                Event::NameInput("ana".to_string()),
                Event::DownloadRequested,
                Event::ExportFailed("disk full".to_string()),
            ],
        );
        assert_eq!(state.phase, Phase::Idle);
        assert!(matches!(effects.as_slice(), [Effect::ShowAlert(msg)] if msg.ends_with("Error: disk full")));
        assert!(state.view(PLACEHOLDER).export_enabled);
    }

    #[test]
    fn test_export_enabled_iff_trimmed_name_non_empty() {
        let mut current = state();
        for input in ["", " ", "a", " \t ", "Ana María"] {
            let (next, _) = update(current, Event::NameInput(input.to_string()));
            assert_eq!(next.view(PLACEHOLDER).export_enabled, !input.trim().is_empty(), "{:?}", input);
            current = next;
        }
    }
}
