//! Interactive session: input lines become [`Event`]s, [`Effect`]s become
//! exports, preview renders and console feedback.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::app::{update, AppState, Effect, Event, View};
use crate::config::Settings;
use crate::export::Exporter;
use crate::fit::Typeface;
use crate::render::{render_preview, AssetCache};

const HELP: &str = "\
Type a name to put it on the diploma. Commands:
  :level <id>   choose the diploma background
  :levels       list the available levels
  :download     write the PDF
  :reset        clear the name
  :status       show the current state
  :help         show this help
  :quit         leave";

/// Side effects the session needs from the outside world
pub trait Backend {
    fn export(&mut self, name: &str, level: &str) -> Result<PathBuf>;

    fn refresh_preview(&mut self, state: &AppState) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Name(String),
    Level(String),
    Levels,
    Download,
    Reset,
    Status,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let Some(rest) = line.trim_end_matches(['\r', '\n']).strip_prefix(':') else {
        return Command::Name(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let mut parts = rest.trim().splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("").to_lowercase();
    let argument = parts.next().map(str::trim).unwrap_or("");
    match command.as_str() {
        "level" | "l" if !argument.is_empty() => Command::Level(argument.to_string()),
        "levels" => Command::Levels,
        "download" | "d" => Command::Download,
        "reset" | "r" => Command::Reset,
        "status" | "s" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => Command::Unknown(rest.trim().to_string()),
    }
}

pub struct Session<B: Backend> {
    state: AppState,
    backend: B,
    placeholder: String,
    toast_deadline: Option<Instant>,
}

impl<B: Backend> Session<B> {
    pub fn new(state: AppState, backend: B, placeholder: impl Into<String>) -> Self {
        Self {
            state,
            backend,
            placeholder: placeholder.into(),
            toast_deadline: None,
        }
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "{}", HELP)?;
        self.dispatch(Event::Reset, out)?;

        for line in input.lines() {
            let line = line.context("Failed to read input")?;
            self.expire_toast(out)?;

            match parse_command(&line) {
                Command::Name(name) => self.dispatch(Event::NameInput(name), out)?,
                Command::Level(level) => self.dispatch(Event::LevelSelected(level), out)?,
                Command::Download => {
                    if !self.state.form.export_enabled() {
                        writeln!(out, "Type a name first; the download is disabled.")?;
                    }
                    self.dispatch(Event::DownloadRequested, out)?;
                }
                Command::Reset => self.dispatch(Event::Reset, out)?,
                Command::Levels => writeln!(out, "Levels: {}", self.state.levels.join(", "))?,
                Command::Status => writeln!(out, "{}", status_line(&self.state.view(&self.placeholder)))?,
                Command::Help => writeln!(out, "{}", HELP)?,
                Command::Quit => break,
                Command::Unknown(command) => writeln!(out, "Unknown command ':{}', try :help", command)?,
            }
        }
        Ok(())
    }

    fn expire_toast<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.toast_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.toast_deadline = None;
            self.dispatch(Event::ToastExpired, out)?;
        }
        Ok(())
    }

    /// Apply an event and every effect it causes, including follow-up events
    pub fn dispatch<W: Write>(&mut self, event: Event, out: &mut W) -> Result<()> {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let (next, effects) = update(self.state.clone(), event);
            self.state = next;

            for effect in effects {
                match effect {
                    Effect::RefreshPreview => {
                        if let Err(e) = self.backend.refresh_preview(&self.state) {
                            writeln!(out, "Error: {:#}", e)?;
                        }
                        writeln!(out, "{}", status_line(&self.state.view(&self.placeholder)))?;
                    }
                    Effect::StartExport { name, level } => {
                        writeln!(out, "Generating PDF for {}...", name)?;
                        let outcome = match self.backend.export(&name, &level) {
                            Ok(path) => Event::ExportSucceeded(path),
                            Err(e) => Event::ExportFailed(format!("{:#}", e)),
                        };
                        queue.push_back(outcome);
                    }
                    Effect::ScheduleToastDismiss(duration) => {
                        self.toast_deadline = Some(Instant::now() + duration);
                        if let Some(toast) = &self.state.toast {
                            writeln!(out, "✓ {}", toast)?;
                        }
                    }
                    Effect::ShowAlert(message) => writeln!(out, "Error: {}", message)?,
                }
            }
        }
        Ok(())
    }
}

pub fn status_line(view: &View) -> String {
    let name = if view.overlay.is_placeholder {
        format!("({})", view.overlay.text)
    } else {
        view.overlay.text.clone()
    };
    let action = if view.busy {
        "exporting..."
    } else if view.export_enabled {
        "ready, :download to save"
    } else {
        "type a name to enable download"
    };
    let mut line = format!("[{}] {} {}/{} | {}", view.level, name, view.char_count, view.max_length, action);
    if let Some(toast) = &view.toast {
        line.push_str(" | ✓ ");
        line.push_str(toast);
    }
    line
}

/// Backend writing real PDFs and, optionally, a preview PNG after every change
pub struct LiveBackend<'a, F: Typeface + ?Sized> {
    exporter: Exporter<'a, F>,
    assets: &'a AssetCache,
    face: &'a F,
    settings: &'a Settings,
    preview: Option<(PathBuf, u32)>,
}

impl<'a, F: Typeface + ?Sized> LiveBackend<'a, F> {
    pub fn new(
        exporter: Exporter<'a, F>,
        assets: &'a AssetCache,
        face: &'a F,
        settings: &'a Settings,
        preview: Option<(PathBuf, u32)>,
    ) -> Self {
        Self { exporter, assets, face, settings, preview }
    }
}

impl<F: Typeface + ?Sized> Backend for LiveBackend<'_, F> {
    fn export(&mut self, name: &str, level: &str) -> Result<PathBuf> {
        let report = self.exporter.export(name, level)?;
        log::info!(
            "{} bytes, {}x{} px, name at {}px",
            report.bytes,
            report.width,
            report.height,
            report.font_size
        );
        Ok(report.path)
    }

    fn refresh_preview(&mut self, state: &AppState) -> Result<()> {
        let Some((path, width)) = &self.preview else {
            return Ok(());
        };
        write_preview(self.assets, self.face, self.settings, state, path, *width)
    }
}

/// Render the state's overlay at preview size and save it as PNG
pub fn write_preview<F: Typeface + ?Sized>(
    assets: &AssetCache,
    face: &F,
    settings: &Settings,
    state: &AppState,
    path: &Path,
    width: u32,
) -> Result<()> {
    let background = assets.get(state.form.level())?;
    let (canvas, layout) = render_preview(background, &state.form, &settings.text, &settings.layout, face, width);
    let canvas = DynamicImage::ImageRgba8(canvas);
    // JPEG has no alpha channel
    let saved = match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => canvas.to_rgb8().save(path),
        _ => canvas.save(path),
    };
    saved.with_context(|| format!("Failed to save preview {:?}", path))?;
    log::debug!("preview written to {:?} (name at {}px)", path, layout.font_size);
    Ok(())
}
