//! # Selection Engine
//!
//! Hands out wallpapers for one `(directory, brightness)` pair.
//!
//! The first draw samples up to `sample_limit` matching candidates from the
//! catalog in random order. Later draws walk that list with a cursor and wrap
//! around when it runs out, so every candidate is shown once before any is
//! shown again. The list is never re-queried during a run.
//!
//! [`Selector::next_wallpaper`] adds repeat avoidance on top: it skips the
//! wallpaper currently on screen and removes catalog rows whose file has
//! disappeared.

use crate::brightness::Brightness;
use crate::db;
use anyhow::Result;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// How often the current wallpaper may be drawn again before giving up.
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Upper bound for the number of candidates sampled per run.
pub const DEFAULT_SAMPLE_LIMIT: usize = 1000;

/// Outcome of asking for the next wallpaper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Show this file.
    Wallpaper(PathBuf),
    /// Nothing in the catalog matches the directory and brightness.
    NoCandidates,
    /// Only the current wallpaper kept coming up.
    Exhausted { retries: u32 },
}

/// Cycles through a random sample of matching candidates.
#[derive(Debug)]
pub struct Selector {
    base: String,
    brightness: Option<Brightness>,
    sample_limit: usize,
    retry_limit: u32,
    ids: Vec<i64>,
    cursor: usize,
    populated: bool,
    rng: StdRng,
}

impl Selector {
    /// Selector for wallpapers below `base` (empty for the whole catalog)
    /// with the given brightness (`None` for any).
    #[must_use]
    pub fn new(base: impl Into<String>, brightness: Option<Brightness>) -> Self {
        Self {
            base: base.into(),
            brightness,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            retry_limit: DEFAULT_RETRY_LIMIT,
            ids: Vec::new(),
            cursor: 0,
            populated: false,
            rng: StdRng::from_entropy(),
        }
    }

    #[must_use]
    pub fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = sample_limit;
        self
    }

    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit.max(1);
        self
    }

    /// Use a fixed random generator, e.g. a seeded one in tests.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.brightness
    }

    /// Number of candidates left in the current sample.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn populate(&mut self, conn: &Connection) -> Result<()> {
        self.ids = db::sample_by_brightness(
            conn,
            &self.base,
            self.brightness,
            self.sample_limit,
            &mut self.rng,
        )?;
        self.cursor = 0;
        self.populated = true;
        if self.ids.is_empty() {
            debug!("No wallpapers below {:?} match", self.base);
        }
        Ok(())
    }

    /// Next candidate id and path in the cycle, or `None` when the sample is
    /// empty. Rows that vanished from the catalog are dropped on the way.
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub fn draw(&mut self, conn: &Connection) -> Result<Option<(i64, String)>> {
        if !self.populated {
            self.populate(conn)?;
        }

        while !self.ids.is_empty() {
            if self.cursor >= self.ids.len() {
                debug!("Seen all {} wallpapers, starting over", self.ids.len());
                self.cursor = 0;
            }
            let id = self.ids[self.cursor];
            self.cursor += 1;

            match db::resolve_path(conn, id)? {
                Some(path) => return Ok(Some((id, path))),
                None => self.forget(id),
            }
        }
        Ok(None)
    }

    /// Drop a candidate from the sample, keeping the cursor on the element
    /// that would have come next.
    pub fn forget(&mut self, id: i64) {
        if let Some(pos) = self.ids.iter().position(|&other| other == id) {
            self.ids.remove(pos);
            if pos < self.cursor {
                self.cursor -= 1;
            }
        }
    }

    /// Next wallpaper that exists on disk and is not `current`.
    ///
    /// Candidates whose file is gone are deleted from the catalog and do not
    /// count as a retry. Drawing `current` again does, and after
    /// `retry_limit` of those the selector gives up with
    /// [`Selection::Exhausted`].
    ///
    /// # Errors
    ///
    /// Fails on database errors.
    pub fn next_wallpaper(&mut self, conn: &Connection, current: Option<&Path>) -> Result<Selection> {
        let mut retries = 0;

        loop {
            let Some((id, path)) = self.draw(conn)? else {
                return Ok(Selection::NoCandidates);
            };
            let path = PathBuf::from(path);

            if !path.exists() {
                warn!("{} no longer exists, removing it from the database", path.display());
                if let Some(path_str) = path.to_str() {
                    db::delete(conn, path_str)?;
                }
                self.forget(id);
                continue;
            }

            if current == Some(path.as_path()) {
                retries += 1;
                debug!("Drew the current wallpaper again ({retries}/{})", self.retry_limit);
                if retries >= self.retry_limit {
                    return Ok(Selection::Exhausted { retries });
                }
                continue;
            }

            return Ok(Selection::Wallpaper(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Features;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db::create_schema(&mut conn).unwrap();
        conn
    }

    /// Creates `names` as empty files in a fresh directory and catalogues them.
    fn catalogue(conn: &Connection, names: &[(&str, Brightness)]) -> (TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap().to_string();
        for (name, brightness) in names {
            let path = dir.path().join(name);
            fs::write(&path, b"").unwrap();
            let features = Features { kurtosis: 0.0, lightness: 0.5 };
            db::insert(conn, path.to_str().unwrap(), features, Some(*brightness)).unwrap();
        }
        (dir, base)
    }

    fn selector(base: &str, brightness: Option<Brightness>) -> Selector {
        Selector::new(base, brightness).with_rng(StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_cycle_visits_each_candidate_once() -> Result<()> {
        let conn = catalog();
        let (_dir, base) = catalogue(
            &conn,
            &[
                ("1.jpg", Brightness::Day),
                ("2.jpg", Brightness::Day),
                ("3.jpg", Brightness::Day),
                ("4.jpg", Brightness::Day),
            ],
        );
        let mut sel = selector(&base, Some(Brightness::Day));

        let first_cycle: Vec<String> =
            (0..4).map(|_| sel.draw(&conn).unwrap().unwrap().1).collect();
        let distinct: HashSet<&String> = first_cycle.iter().collect();
        assert_eq!(distinct.len(), 4);

        let second_cycle: Vec<String> =
            (0..4).map(|_| sel.draw(&conn).unwrap().unwrap().1).collect();
        assert_eq!(first_cycle, second_cycle, "cycle restarts without resampling");
        Ok(())
    }

    #[test]
    fn test_brightness_filter() -> Result<()> {
        let conn = catalog();
        let (_dir, base) = catalogue(
            &conn,
            &[("night.jpg", Brightness::Night), ("day.jpg", Brightness::Day)],
        );

        let mut sel = selector(&base, Some(Brightness::Night));
        for _ in 0..3 {
            let (_, path) = sel.draw(&conn)?.unwrap();
            assert!(path.ends_with("night.jpg"));
        }

        let mut any = selector(&base, None);
        let both: HashSet<String> = (0..2).map(|_| any.draw(&conn).unwrap().unwrap().1).collect();
        assert_eq!(both.len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_sample_means_no_candidates() -> Result<()> {
        let conn = catalog();
        let (_dir, base) = catalogue(&conn, &[("night.jpg", Brightness::Night)]);

        let mut sel = selector(&base, Some(Brightness::Day));
        assert_eq!(sel.next_wallpaper(&conn, None)?, Selection::NoCandidates);
        assert_eq!(sel.next_wallpaper(&conn, None)?, Selection::NoCandidates);
        assert!(sel.is_empty());
        Ok(())
    }

    #[test]
    fn test_other_directory_is_not_sampled() -> Result<()> {
        let conn = catalog();
        let (_dir, _base) = catalogue(&conn, &[("a.jpg", Brightness::Day)]);
        let mut sel = selector("/nonexistent/wallpapers", None);
        assert_eq!(sel.next_wallpaper(&conn, None)?, Selection::NoCandidates);
        Ok(())
    }

    #[test]
    fn test_single_current_candidate_exhausts_after_retry_limit() -> Result<()> {
        let conn = catalog();
        let (dir, base) = catalogue(&conn, &[("only.jpg", Brightness::Day)]);
        let current = dir.path().join("only.jpg");

        let mut sel = selector(&base, None);
        assert_eq!(
            sel.next_wallpaper(&conn, Some(&current))?,
            Selection::Exhausted { retries: DEFAULT_RETRY_LIMIT }
        );

        let mut sel = selector(&base, None).with_retry_limit(3);
        assert_eq!(sel.next_wallpaper(&conn, Some(&current))?, Selection::Exhausted { retries: 3 });
        Ok(())
    }

    #[test]
    fn test_current_wallpaper_is_skipped() -> Result<()> {
        let conn = catalog();
        let (dir, base) = catalogue(&conn, &[("a.jpg", Brightness::Day), ("b.jpg", Brightness::Day)]);
        let current = dir.path().join("a.jpg");

        let mut sel = selector(&base, None);
        for _ in 0..5 {
            assert_eq!(
                sel.next_wallpaper(&conn, Some(&current))?,
                Selection::Wallpaper(dir.path().join("b.jpg"))
            );
        }
        Ok(())
    }

    #[test]
    fn test_missing_file_is_removed_without_counting_as_retry() -> Result<()> {
        let conn = catalog();
        let (dir, base) = catalogue(
            &conn,
            &[
                ("gone-1.jpg", Brightness::Day),
                ("gone-2.jpg", Brightness::Day),
                ("gone-3.jpg", Brightness::Day),
                ("gone-4.jpg", Brightness::Day),
                ("gone-5.jpg", Brightness::Day),
                ("gone-6.jpg", Brightness::Day),
                ("kept.jpg", Brightness::Day),
            ],
        );
        for n in 1..=6 {
            fs::remove_file(dir.path().join(format!("gone-{n}.jpg")))?;
        }

        // More missing files than the retry budget, yet the survivor is found.
        let mut sel = selector(&base, None).with_retry_limit(2);
        assert_eq!(
            sel.next_wallpaper(&conn, None)?,
            Selection::Wallpaper(dir.path().join("kept.jpg"))
        );
        // Files drawn so far are gone from the catalog; the rest go on the next draws.
        for _ in 0..3 {
            sel.next_wallpaper(&conn, None)?;
        }
        assert_eq!(db::count(&conn)?, 1);
        assert_eq!(sel.len(), 1);
        Ok(())
    }

    #[test]
    fn test_rows_deleted_elsewhere_are_dropped() -> Result<()> {
        let conn = catalog();
        let (dir, base) = catalogue(&conn, &[("a.jpg", Brightness::Day), ("b.jpg", Brightness::Day)]);
        let mut sel = selector(&base, None);
        sel.draw(&conn)?;

        db::delete(&conn, dir.path().join("a.jpg").to_str().unwrap())?;
        for _ in 0..3 {
            let (_, path) = sel.draw(&conn)?.unwrap();
            assert!(path.ends_with("b.jpg"));
        }
        assert_eq!(sel.len(), 1);
        Ok(())
    }

    #[test]
    fn test_forget_keeps_cursor_position() -> Result<()> {
        let conn = catalog();
        let (_dir, base) = catalogue(
            &conn,
            &[("a.jpg", Brightness::Day), ("b.jpg", Brightness::Day), ("c.jpg", Brightness::Day)],
        );
        let mut sel = selector(&base, None);

        let (first, _) = sel.draw(&conn)?.unwrap();
        let (second, _) = sel.draw(&conn)?.unwrap();
        let (third, _) = sel.draw(&conn)?.unwrap();
        sel.forget(first);

        assert_eq!(sel.draw(&conn)?.unwrap().0, second);
        assert_eq!(sel.draw(&conn)?.unwrap().0, third);
        Ok(())
    }
}
