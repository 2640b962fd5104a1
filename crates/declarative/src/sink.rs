//! Output sinks for encoded documents.
//!
//! File sinks only touch the disk when content changes, log a unified diff
//! of what changed, and remove generated `.tf` files the current export no
//! longer produces. Files without the generated header are never removed.

use crate::document::{Document, MAIN_FILE};
use crate::error::{Error, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "# Code generated by stackform. DO NOT EDIT.";

/// Extension of configuration files.
const TF_EXTENSION: &str = "tf";

/// Where an encoded document goes.
pub enum Sink {
    /// One file at an explicit path
    File(PathBuf),
    /// `main.tf` inside a directory
    Directory(PathBuf),
    /// One file per block role inside a directory
    SplitDirectory(PathBuf),
    /// Any writer; the document is written without a header
    Writer(Box<dyn Write + Send>),
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Directory(path) => f.debug_tuple("Directory").field(path).finish(),
            Self::SplitDirectory(path) => f.debug_tuple("SplitDirectory").field(path).finish(),
            Self::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// What an export did on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Every file the document occupies
    pub files: Vec<PathBuf>,
    /// Files whose content was (re)written
    pub changed: Vec<PathBuf>,
    /// Stale generated files that were deleted
    pub removed: Vec<PathBuf>,
}

impl ExportReport {
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

impl Sink {
    /// Write the document.
    pub fn write(&mut self, document: &Document) -> Result<ExportReport> {
        match self {
            Self::File(path) => {
                let mut report = ExportReport::default();
                write_file(path, &document.to_hcl()?, &mut report)?;
                Ok(report)
            }
            Self::Directory(dir) => {
                let mut report = ExportReport::default();
                write_file(&dir.join(MAIN_FILE), &document.to_hcl()?, &mut report)?;
                remove_stale(dir, &mut report)?;
                Ok(report)
            }
            Self::SplitDirectory(dir) => {
                let mut report = ExportReport::default();
                for (name, content) in document.files()? {
                    write_file(&dir.join(name), &content, &mut report)?;
                }
                remove_stale(dir, &mut report)?;
                Ok(report)
            }
            Self::Writer(writer) => {
                let text = document.to_hcl()?;
                writer.write_all(text.as_bytes()).map_err(Error::Write)?;
                writer.flush().map_err(Error::Write)?;
                Ok(ExportReport::default())
            }
        }
    }
}

fn with_header(content: &str) -> String {
    format!("{GENERATED_HEADER}\n\n{content}")
}

/// Write `content` under the generated header unless the file already holds
/// exactly that.
fn write_file(path: &Path, content: &str, report: &mut ExportReport) -> Result<()> {
    let content = with_header(content);
    report.files.push(path.to_path_buf());

    let existing = match fs::read_to_string(path) {
        Ok(existing) => Some(existing),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(path, e)),
    };
    if existing.as_deref() == Some(content.as_str()) {
        debug!("Unchanged: {}", path.display());
        return Ok(());
    }

    if let Some(existing) = &existing {
        log_diff(path, existing, &content);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, &content).map_err(|e| Error::io(path, e))?;
    info!("Wrote {}", path.display());
    report.changed.push(path.to_path_buf());
    Ok(())
}

fn log_diff(path: &Path, old: &str, new: &str) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let diff = similar::TextDiff::from_lines(old, new);
    let label = path.display().to_string();
    debug!(
        "Changes to {label}:\n{}",
        diff.unified_diff().header(&label, &label)
    );
}

/// Delete generated `.tf` files in `dir` that are not part of `report`.
fn remove_stale(dir: &Path, report: &mut ExportReport) -> Result<()> {
    let current: HashSet<&Path> = report.files.iter().map(PathBuf::as_path).collect();
    let mut stale = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(TF_EXTENSION)
            || current.contains(path)
        {
            continue;
        }
        if is_generated(path) {
            stale.push(path.to_path_buf());
        }
    }

    for path in stale {
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        info!("Removed stale {}", path.display());
        report.removed.push(path);
    }
    Ok(())
}

fn is_generated(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| content.starts_with(GENERATED_HEADER))
        .unwrap_or(false)
}
