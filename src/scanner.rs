//! # Directory Scanner
//!
//! Walks a wallpaper directory, finds image files by content (not by
//! extension), and catalogues the ones the database does not know yet:
//!
//! ```text
//! entry → canonical path → sniff → known? → extract features → classify → INSERT
//! ```
//!
//! One scan is one transaction. Problems with a single file (unreadable,
//! corrupt, duplicate) are logged and skipped; only database failures and
//! unresolvable paths abort the scan.

use crate::classifier::Classifier;
use crate::db;
use crate::features::FeatureExtractor;
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use rusqlite::Connection;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Directory name used by image viewers for thumbnail caches. Never scanned.
pub const THUMBNAIL_DIR: &str = ".thumbs";

/// What a scan did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Newly catalogued wallpapers.
    pub found: usize,
    /// Images that were already in the catalog.
    pub known: usize,
    /// Images that could not be read, decoded, classified or stored.
    pub failed: usize,
    /// Entries that could not be turned into a usable path.
    pub skipped: usize,
}

/// Whether the file content looks like an image (`image/*` MIME type).
///
/// # Errors
///
/// Fails if the file cannot be read.
pub fn is_image(path: &Path) -> io::Result<bool> {
    Ok(infer::get_from_path(path)?.is_some_and(|kind| kind.mime_type().starts_with("image/")))
}

/// Catalogues new wallpapers using the given feature extractor and classifier.
pub struct Scanner<'a> {
    extractor: &'a dyn FeatureExtractor,
    classifier: &'a dyn Classifier,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(extractor: &'a dyn FeatureExtractor, classifier: &'a dyn Classifier) -> Self {
        Self { extractor, classifier }
    }

    /// Scan `base` (and its subdirectories when `recursive`) for new images.
    ///
    /// An unreadable `base` is reported and yields an empty report.
    ///
    /// # Errors
    ///
    /// Fails on database errors and on paths that cannot be canonicalized for
    /// reasons other than a dangling link. Everything committed before the
    /// failure is rolled back.
    pub fn scan(&self, conn: &mut Connection, base: &Path, recursive: bool) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        if let Err(err) = fs::read_dir(base) {
            warn!("Cannot read directory {}: {err}", base.display());
            return Ok(report);
        }

        let tx = conn.transaction().context("Cannot start scan transaction")?;

        let walker = WalkDir::new(base)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir() && entry.file_name() == THUMBNAIL_DIR)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {err}");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            self.visit(&tx, entry.path(), &mut report)?;
        }

        tx.commit().context("Commiting scan transaction failed")?;

        info!(
            "Scanned {}: {} new, {} known, {} failed, {} skipped",
            base.display(),
            report.found,
            report.known,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    fn visit(&self, conn: &Connection, path: &Path, report: &mut ScanReport) -> Result<()> {
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping dangling link {}", path.display());
                report.skipped += 1;
                return Ok(());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Cannot resolve {}", path.display()));
            }
        };

        if !canonical.is_file() {
            return Ok(());
        }

        match is_image(&canonical) {
            Ok(true) => {}
            Ok(false) => {
                trace!("Not an image: {}", canonical.display());
                return Ok(());
            }
            Err(err) => {
                warn!("Cannot read {}: {err}", canonical.display());
                report.failed += 1;
                return Ok(());
            }
        }

        let Some(path_str) = canonical.to_str() else {
            warn!("Skipping {}: path is not valid UTF-8", canonical.display());
            report.skipped += 1;
            return Ok(());
        };

        if db::exists(conn, path_str)? {
            report.known += 1;
            return Ok(());
        }

        let features = match self.extractor.extract(&canonical) {
            Ok(features) => features,
            Err(err) => {
                warn!("{err}");
                report.failed += 1;
                return Ok(());
            }
        };

        let brightness = match self.classifier.classify(features) {
            Ok(brightness) => brightness,
            Err(err) => {
                warn!("Cannot classify {path_str}: {err:#}");
                report.failed += 1;
                return Ok(());
            }
        };

        match db::insert(conn, path_str, features, Some(brightness)) {
            Ok(_) => {
                report.found += 1;
                debug!("Found {path_str} ({brightness})");
            }
            Err(err) => {
                warn!("{err:#}");
                report.failed += 1;
            }
        }
        Ok(())
    }
}
