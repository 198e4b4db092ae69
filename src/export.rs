//! Export pipeline: compose the diploma, wrap it in a PDF page and write
//! `Diploma_<Name>.pdf` without ever leaving a partial file behind.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::{RosterEntry, Settings};
use crate::error::DiplomaError;
use crate::fit::Typeface;
use crate::form::{diploma_filename, FormState};
use crate::pdf::{create_diploma_pdf, pdf_bytes};
use crate::render::{compose_diploma, AssetCache};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub font_size: u32,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Outcome of a roster run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: Vec<ExportReport>,
    pub failed: Vec<(String, anyhow::Error)>,
}

pub struct Exporter<'a, F: Typeface + ?Sized> {
    assets: &'a AssetCache,
    face: &'a F,
    settings: &'a Settings,
    out_dir: PathBuf,
}

impl<'a, F: Typeface + ?Sized> Exporter<'a, F> {
    pub fn new(assets: &'a AssetCache, face: &'a F, settings: &'a Settings, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets,
            face,
            settings,
            out_dir: out_dir.into(),
        }
    }

    /// Export `name` (already title-cased) on the `level` background
    pub fn export(&self, name: &str, level: &str) -> Result<ExportReport> {
        self.export_as(name, level, &diploma_filename(name))
    }

    fn export_as(&self, name: &str, level: &str, file_name: &str) -> Result<ExportReport> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DiplomaError::EmptyName.into());
        }
        let missing = self.face.missing_glyphs(name);
        if !missing.is_empty() {
            log::warn!("'{}' has no glyphs for {:?}", self.face.family(), missing);
            return Err(DiplomaError::MissingGlyphs {
                family: self.face.family().to_string(),
                missing: missing.into_iter().collect(),
            }
            .into());
        }
        let background = self.assets.get(level)?;

        log::info!("Generating diploma for '{}' on '{}'...", name, level);
        let (raster, layout) = compose_diploma(
            background,
            name,
            &self.settings.text,
            &self.settings.layout,
            self.face,
        );

        let mut doc = create_diploma_pdf(&raster, name, &self.settings.page, &self.settings.output)
            .with_context(|| format!("Failed to build the PDF for '{}'", name))?;
        let bytes = pdf_bytes(&mut doc)?;
        let path = write_atomically(&self.out_dir, file_name, &bytes)?;

        Ok(ExportReport {
            path,
            font_size: layout.font_size,
            width: raster.width(),
            height: raster.height(),
            bytes: bytes.len(),
        })
    }

    /// Export every roster row; a failing row does not stop the others
    pub fn export_roster(&self, entries: &[RosterEntry], default_level: &str) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut used_names: HashMap<String, usize> = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            let mut form = FormState::new(
                entry.level.as_deref().unwrap_or(default_level),
                self.settings.text.max_length,
            );
            form.set_input(&entry.name);
            log::info!("Roster {}/{}: {}", i + 1, entries.len(), form.name());

            let file_name = unique_file_name(&diploma_filename(form.name()), &mut used_names);
            match self.export_as(form.name(), form.level(), &file_name) {
                Ok(report) => summary.written.push(report),
                Err(e) => {
                    log::warn!("Skipping roster row {} ({:?}): {:#}", i + 1, entry.name, e);
                    summary.failed.push((entry.name.clone(), e));
                }
            }
        }
        summary
    }
}

/// `Diploma_Ana.pdf`, then `Diploma_Ana_2.pdf`, `Diploma_Ana_3.pdf`, ...
fn unique_file_name(file_name: &str, used: &mut HashMap<String, usize>) -> String {
    let count = used.entry(file_name.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        file_name.to_string()
    } else {
        let stem = file_name.strip_suffix(".pdf").unwrap_or(file_name);
        format!("{}_{}.pdf", stem, count)
    }
}

/// Write through a temporary file in `dir` and rename it into place
fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    let target = dir.join(file_name);

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {:?}", dir))?;
    tmp.write_all(bytes)
        .with_context(|| format!("Failed to write {:?}", target))?;
    tmp.as_file().sync_all()?;
    // PersistError owns the temp file; drop it here so nothing is left behind
    tmp.persist(&target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move the PDF into {:?}", target))?;
    Ok(target)
}
