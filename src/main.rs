mod app;
mod config;
mod error;
mod export;
mod fit;
mod form;
mod pdf;
mod render;
mod session;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};

use app::AppState;
use config::{load_roster, load_settings, Settings};
use export::Exporter;
use fit::Typeface;
use form::FormState;
use render::{load_name_font, AssetCache, NameFont};
use session::{LiveBackend, Session};

/// Put a student's name on a diploma background and export it as PDF.
#[derive(Parser, Debug)]
#[command(name = "diploma_print")]
#[command(about = "Put a student's name on a diploma background and export it as PDF.", long_about = None)]
struct Args {
    /// Directory holding settings.json and the background images
    #[arg(short, long, default_value = ".")]
    target_dir: PathBuf,

    /// Settings file (default: <target-dir>/settings.json, optional)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Where PDFs are written (default: <target-dir>)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Font file to use instead of the configured families
    #[arg(long)]
    font: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export one diploma
    Render {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        level: Option<String>,
    },
    /// Write a preview PNG; without a name the placeholder is shown
    Preview {
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long)]
        level: Option<String>,
        #[arg(long, default_value = "preview.png")]
        output: PathBuf,
        #[arg(short, long, default_value_t = 1000)]
        width: u32,
    },
    /// Export one diploma per row of a CSV with `name` and optional `level` columns
    Batch {
        #[arg(short, long)]
        roster: PathBuf,
    },
    /// List the configured diploma levels
    Levels,
    /// Type names and commands on stdin
    Interactive {
        /// Re-render this PNG after every change
        #[arg(long)]
        preview: Option<PathBuf>,
        #[arg(short, long, default_value_t = 1000)]
        width: u32,
    },
}

fn load_or_default_settings(target_dir: &Path, settings_path: Option<&Path>) -> Result<Settings> {
    let default_path = target_dir.join("settings.json");
    match settings_path {
        Some(path) => load_settings(path),
        None if default_path.exists() => {
            log::info!("Loading configuration from {:?}...", default_path);
            load_settings(&default_path)
        }
        None => {
            log::info!("No settings.json in {:?}, using defaults", target_dir);
            let mut settings = Settings::default();
            settings.resolve_paths(target_dir);
            Ok(settings)
        }
    }
}

fn pick_level(settings: &Settings, level: Option<String>) -> Result<String> {
    match level {
        Some(level) => Ok(level),
        None => settings.default_level(),
    }
}

/// Backgrounds and the name font, loaded only by commands that draw
struct Resources {
    assets: AssetCache,
    face: NameFont,
}

impl Resources {
    fn load(settings: &Settings, font: Option<&Path>) -> Result<Self> {
        let assets = AssetCache::preload(&settings.levels, settings.output.max_width)?;
        if assets.is_empty() {
            return Err(anyhow!("No diploma levels configured"));
        }
        let face = load_name_font(&settings.font, font)?;
        log::info!(
            "Using font '{}', {} backgrounds ready: {}",
            face.family(),
            assets.len(),
            assets.levels().collect::<Vec<_>>().join(", ")
        );
        Ok(Self { assets, face })
    }

    fn exporter<'a>(&'a self, settings: &'a Settings, out_dir: &Path) -> Exporter<'a, NameFont> {
        Exporter::new(&self.assets, &self.face, settings, out_dir)
    }
}

fn list_levels(settings: &Settings) {
    let default = settings.default_level().ok();
    for (id, path) in &settings.levels {
        let marker = if default.as_deref() == Some(id.as_str()) { " (default)" } else { "" };
        println!("{}{}\t{}", id, marker, path.display());
    }
}

fn run(args: Args) -> Result<()> {
    let target_dir = args.target_dir;
    if !target_dir.is_dir() {
        return Err(anyhow!("Target directory not found: {:?}", target_dir));
    }

    let settings = load_or_default_settings(&target_dir, args.settings.as_deref())?;
    let out_dir = args.out_dir.unwrap_or_else(|| target_dir.clone());
    let font = args.font.as_deref();

    match args.command {
        Command::Levels => list_levels(&settings),
        Command::Render { name, level } => {
            let level = pick_level(&settings, level)?;
            let resources = Resources::load(&settings, font)?;
            let mut form = FormState::new(level, settings.text.max_length);
            form.set_input(&name);
            let report = resources.exporter(&settings, &out_dir).export(form.name(), form.level())?;
            println!("Diploma saved: {}", report.path.display());
        }
        Command::Preview { name, level, output, width } => {
            let level = pick_level(&settings, level)?;
            let resources = Resources::load(&settings, font)?;
            let mut state = AppState::new(settings.level_ids(), level, settings.text.max_length);
            state.form.set_input(&name);
            session::write_preview(&resources.assets, &resources.face, &settings, &state, &output, width)?;
            println!("Preview saved: {}", output.display());
        }
        Command::Batch { roster } => {
            let entries = load_roster(&roster)?;
            log::info!("Found {} rows in {:?}", entries.len(), roster);
            let resources = Resources::load(&settings, font)?;
            let summary = resources
                .exporter(&settings, &out_dir)
                .export_roster(&entries, &settings.default_level()?);
            for report in &summary.written {
                println!("Diploma saved: {}", report.path.display());
            }
            if !summary.failed.is_empty() {
                for (name, e) in &summary.failed {
                    eprintln!("Failed: {:?}: {:#}", name, e);
                }
                return Err(anyhow!(
                    "{} of {} diplomas could not be generated",
                    summary.failed.len(),
                    entries.len()
                ));
            }
        }
        Command::Interactive { preview, width } => {
            let state = AppState::new(settings.level_ids(), settings.default_level()?, settings.text.max_length);
            let resources = Resources::load(&settings, font)?;
            let backend = LiveBackend::new(
                resources.exporter(&settings, &out_dir),
                &resources.assets,
                &resources.face,
                &settings,
                preview.map(|p| (p, width)),
            );
            let mut session = Session::new(state, backend, settings.text.placeholder.clone());
            session.run(io::stdin().lock(), &mut io::stdout())?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
