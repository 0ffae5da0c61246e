//! # Candidate Store
//!
//! `SQLite` catalog of wallpaper candidates. Two tables:
//!
//! - `wallpapers`: one row per known image (`path` is unique and indexed)
//!   with its kurtosis, lightness and brightness bucket.
//! - `info`: name/value metadata, holding the catalog format `version`.
//!
//! Rows are written by the scanner, read by the selection engine, and removed
//! by the delete command or when selection finds the file gone.

use crate::brightness::Brightness;
use crate::features::Features;
use anyhow::{bail, Context, Result};
use log::{debug, info, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, MAIN_SEPARATOR};

/// Format version written into new catalogs. Catalogs carrying any other
/// version are refused.
pub const CATALOG_VERSION: &str = "0.3";

/// A wallpaper as stored in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: i64,
    pub path: String,
    pub kurtosis: Option<f64>,
    pub lightness: Option<f64>,
    pub brightness: Option<Brightness>,
}

/// Open a connection to the catalog file. Creates an empty file if needed.
pub fn connect(db_path: &Path) -> Result<Connection> {
    Connection::open(db_path)
        .with_context(|| format!("Cannot open wallpaper database at {}", db_path.display()))
}

/// Open the catalog, creating the schema when the file is new and refusing
/// catalogs written with a different format version.
///
/// # Errors
///
/// Fails if the file cannot be opened, the schema cannot be created, or the
/// catalog version does not match [`CATALOG_VERSION`].
pub fn open_catalog(db_path: &Path) -> Result<Connection> {
    let fresh = !db_path.exists();
    let mut conn = connect(db_path)?;

    if fresh {
        info!("Creating new wallpaper database at {}", db_path.display());
        create_schema(&mut conn)?;
        return Ok(conn);
    }

    match catalog_version(&conn)? {
        Some(version) if version == CATALOG_VERSION => {
            debug!("Opened wallpaper database {} (version {version})", db_path.display());
            Ok(conn)
        }
        Some(version) => bail!(
            "Wallpaper database {} has version {version}, expected {CATALOG_VERSION}. \
             Remove it and scan your wallpapers again.",
            db_path.display()
        ),
        None => bail!("Wallpaper database {} has no version record", db_path.display()),
    }
}

/// Create both tables and record the format version. Meant to run once, on a
/// new database: fails if either table already exists.
pub fn create_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "CREATE TABLE wallpapers (
            id          INTEGER PRIMARY KEY,
            path        TEXT    NOT NULL UNIQUE,
            kurtosis    REAL,
            lightness   REAL,
            brightness  INTEGER CHECK (brightness IN (0, 1, 2))
        )",
        (),
    )
    .context("Failed to CREATE wallpapers TABLE")?;

    tx.execute(
        "CREATE TABLE info (
            id      INTEGER PRIMARY KEY,
            name    TEXT NOT NULL,
            value   TEXT NOT NULL
        )",
        (),
    )
    .context("Failed to CREATE info TABLE")?;

    tx.execute(
        "INSERT INTO info (name, value) VALUES ('version', ?1)",
        [CATALOG_VERSION],
    )
    .context("Failed to record catalog version")?;

    tx.commit().context("Commiting schema transaction failed")?;
    Ok(())
}

/// Format version recorded at creation time.
pub fn catalog_version(conn: &Connection) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM info WHERE name = 'version' ORDER BY id LIMIT 1",
        [],
        |row| row.get(0),
    )
    .optional()
    .context("Cannot read catalog version. Is this a nextwall database?")
}

/// Whether a candidate with exactly this path is catalogued.
pub fn exists(conn: &Connection, path: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM wallpapers WHERE path = ?1")?;
    stmt.exists([path])
        .with_context(|| format!("Failed to look up {path}"))
}

/// Add one candidate. Returns the new row id.
///
/// # Errors
///
/// Fails when `path` is already catalogued or the write fails. Nothing is
/// stored in that case.
pub fn insert(
    conn: &Connection,
    path: &str,
    features: Features,
    brightness: Option<Brightness>,
) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO wallpapers (path, kurtosis, lightness, brightness) VALUES (?1, ?2, ?3, ?4)",
    )?;
    stmt.execute(params![
        path,
        features.kurtosis,
        features.lightness,
        brightness.map(Brightness::index)
    ])
    .with_context(|| format!("Failed to INSERT {path} INTO wallpapers"))?;

    let id = conn.last_insert_rowid();
    trace!("Inserted wallpaper {id}: {path}");
    Ok(id)
}

/// Turn a base directory into the prefix its files' paths start with.
fn directory_prefix(base: &str) -> String {
    if base.is_empty() || base.ends_with(MAIN_SEPARATOR) {
        base.to_string()
    } else {
        format!("{base}{MAIN_SEPARATOR}")
    }
}

/// Up to `limit` ids of candidates below `base` matching `brightness`
/// (`None` matches every bucket), in shuffled order.
///
/// `base` is compared literally; an empty `base` matches everything.
pub fn sample_by_brightness<R: Rng + ?Sized>(
    conn: &Connection,
    base: &str,
    brightness: Option<Brightness>,
    limit: usize,
    rng: &mut R,
) -> Result<Vec<i64>> {
    let prefix = directory_prefix(base);
    let mut stmt = conn
        .prepare(
            "SELECT id FROM wallpapers
             WHERE substr(path, 1, length(?1)) = ?1
               AND (?2 IS NULL OR brightness = ?2)",
        )
        .context("Invalid SQL statement when sampling wallpapers")?;

    let rows = stmt
        .query_map(params![prefix, brightness.map(Brightness::index)], |row| row.get(0))
        .context("Cannot query wallpaper ids")?;

    let mut ids: Vec<i64> = Vec::new();
    for id in rows {
        ids.push(id.context("Queried wallpaper id unwrap failed")?);
    }

    ids.shuffle(rng);
    ids.truncate(limit);
    debug!(
        "Sampled {} wallpapers below {prefix:?} with brightness {}",
        ids.len(),
        brightness.map_or_else(|| "any".to_string(), |b| b.to_string())
    );
    Ok(ids)
}

/// Path of the candidate with this id, or `None` if it has been deleted.
pub fn resolve_path(conn: &Connection, id: i64) -> Result<Option<String>> {
    conn.query_row("SELECT path FROM wallpapers WHERE id = ?1", [id], |row| row.get(0))
        .optional()
        .with_context(|| format!("Failed to query wallpaper {id}"))
}

/// Full row for a path.
pub fn get_candidate(conn: &Connection, path: &str) -> Result<Option<Candidate>> {
    conn.query_row(
        "SELECT id, path, kurtosis, lightness, brightness FROM wallpapers WHERE path = ?1",
        [path],
        |row| {
            let brightness: Option<i64> = row.get(4)?;
            Ok(Candidate {
                id: row.get(0)?,
                path: row.get(1)?,
                kurtosis: row.get(2)?,
                lightness: row.get(3)?,
                brightness: brightness.and_then(Brightness::from_index),
            })
        },
    )
    .optional()
    .with_context(|| format!("Failed to query wallpaper {path}"))
}

/// Remove the candidate with this path. Removing an unknown path is not an
/// error; the return value tells whether a row went away.
pub fn delete(conn: &Connection, path: &str) -> Result<bool> {
    let removed = conn
        .execute("DELETE FROM wallpapers WHERE path = ?1", [path])
        .with_context(|| format!("Failed to DELETE {path} FROM wallpapers"))?;
    if removed > 0 {
        debug!("Removed {path} from the wallpaper database");
    }
    Ok(removed > 0)
}

/// Number of catalogued wallpapers.
pub fn count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM wallpapers", [], |row| row.get(0))
        .context("Could not count database entries")?;
    Ok(usize::try_from(n).unwrap_or(0))
}

/// Number of wallpapers per brightness bucket, unclassified (`None`) first.
pub fn count_by_brightness(conn: &Connection) -> Result<Vec<(Option<Brightness>, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT brightness, COUNT(*) FROM wallpapers GROUP BY brightness ORDER BY brightness",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let bucket: Option<i64> = row.get(0)?;
            let n: i64 = row.get(1)?;
            Ok((bucket.and_then(Brightness::from_index), usize::try_from(n).unwrap_or(0)))
        })
        .context("Cannot count wallpapers per brightness")?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn catalog() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        create_schema(&mut conn).unwrap();
        conn
    }

    fn features(lightness: f64) -> Features {
        Features { kurtosis: 0.5, lightness }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_create_schema_records_version() -> Result<()> {
        let conn = catalog();
        assert_eq!(catalog_version(&conn)?.as_deref(), Some(CATALOG_VERSION));
        assert_eq!(count(&conn)?, 0);
        Ok(())
    }

    #[test]
    fn test_create_schema_twice_fails() {
        let mut conn = catalog();
        assert!(create_schema(&mut conn).is_err());
    }

    #[test]
    fn test_insert_and_exists() -> Result<()> {
        let conn = catalog();
        assert!(!exists(&conn, "/walls/a.jpg")?);

        insert(&conn, "/walls/a.jpg", features(0.4), Some(Brightness::Twilight))?;
        assert!(exists(&conn, "/walls/a.jpg")?);
        assert!(!exists(&conn, "/walls/a.jpeg")?);

        let row = get_candidate(&conn, "/walls/a.jpg")?.unwrap();
        assert_eq!(row.brightness, Some(Brightness::Twilight));
        assert_eq!(row.lightness, Some(0.4));
        Ok(())
    }

    #[test]
    fn test_duplicate_insert_is_rejected() -> Result<()> {
        let conn = catalog();
        insert(&conn, "/walls/a.jpg", features(0.1), Some(Brightness::Night))?;
        assert!(insert(&conn, "/walls/a.jpg", features(0.9), Some(Brightness::Day)).is_err());

        assert_eq!(count(&conn)?, 1);
        let row = get_candidate(&conn, "/walls/a.jpg")?.unwrap();
        assert_eq!(row.brightness, Some(Brightness::Night));
        Ok(())
    }

    #[test]
    fn test_unclassified_rows_are_allowed() -> Result<()> {
        let conn = catalog();
        insert(&conn, "/walls/x.png", features(0.3), None)?;
        assert_eq!(get_candidate(&conn, "/walls/x.png")?.unwrap().brightness, None);
        assert_eq!(count_by_brightness(&conn)?, vec![(None, 1)]);
        Ok(())
    }

    #[test]
    fn test_delete_is_idempotent() -> Result<()> {
        let conn = catalog();
        insert(&conn, "/walls/a.jpg", features(0.1), Some(Brightness::Night))?;
        assert!(delete(&conn, "/walls/a.jpg")?);
        assert!(!delete(&conn, "/walls/a.jpg")?);
        assert!(!delete(&conn, "/never/there.jpg")?);
        assert!(!exists(&conn, "/walls/a.jpg")?);
        Ok(())
    }

    #[test]
    fn test_resolve_path() -> Result<()> {
        let conn = catalog();
        let id = insert(&conn, "/walls/a.jpg", features(0.1), Some(Brightness::Night))?;
        assert_eq!(resolve_path(&conn, id)?.as_deref(), Some("/walls/a.jpg"));

        delete(&conn, "/walls/a.jpg")?;
        assert_eq!(resolve_path(&conn, id)?, None);
        Ok(())
    }

    #[test]
    fn test_sample_filters_by_prefix_and_brightness() -> Result<()> {
        let conn = catalog();
        let day1 = insert(&conn, "/walls/day1.jpg", features(0.9), Some(Brightness::Day))?;
        let day2 = insert(&conn, "/walls/sub/day2.jpg", features(0.8), Some(Brightness::Day))?;
        insert(&conn, "/walls/night.jpg", features(0.1), Some(Brightness::Night))?;
        insert(&conn, "/wallsextra/day3.jpg", features(0.9), Some(Brightness::Day))?;
        insert(&conn, "/other/day4.jpg", features(0.9), Some(Brightness::Day))?;

        let ids: HashSet<i64> =
            sample_by_brightness(&conn, "/walls", Some(Brightness::Day), 100, &mut rng())?
                .into_iter()
                .collect();
        assert_eq!(ids, HashSet::from([day1, day2]));

        let any = sample_by_brightness(&conn, "/walls/", None, 100, &mut rng())?;
        assert_eq!(any.len(), 3);

        let everything = sample_by_brightness(&conn, "", None, 100, &mut rng())?;
        assert_eq!(everything.len(), 5);
        Ok(())
    }

    #[test]
    fn test_sample_prefix_is_literal() -> Result<()> {
        let conn = catalog();
        insert(&conn, "/walls_100%/a.jpg", features(0.9), Some(Brightness::Day))?;
        insert(&conn, "/wallsX100X/b.jpg", features(0.9), Some(Brightness::Day))?;

        let ids = sample_by_brightness(&conn, "/walls_100%", None, 100, &mut rng())?;
        assert_eq!(ids.len(), 1);
        Ok(())
    }

    #[test]
    fn test_sample_respects_limit_and_shuffles() -> Result<()> {
        let conn = catalog();
        for i in 0..50 {
            insert(&conn, &format!("/walls/{i:02}.jpg"), features(0.5), Some(Brightness::Twilight))?;
        }

        let limited = sample_by_brightness(&conn, "/walls", None, 10, &mut rng())?;
        assert_eq!(limited.len(), 10);
        assert_eq!(limited.iter().collect::<HashSet<_>>().len(), 10);

        let full = sample_by_brightness(&conn, "/walls", None, 1000, &mut rng())?;
        let mut sorted = full.clone();
        sorted.sort_unstable();
        assert_eq!(sorted.len(), 50);
        assert_ne!(full, sorted, "sample should not come back in insertion order");
        Ok(())
    }

    #[test]
    fn test_count_by_brightness() -> Result<()> {
        let conn = catalog();
        insert(&conn, "/w/a.jpg", features(0.1), Some(Brightness::Night))?;
        insert(&conn, "/w/b.jpg", features(0.1), Some(Brightness::Night))?;
        insert(&conn, "/w/c.jpg", features(0.9), Some(Brightness::Day))?;

        assert_eq!(
            count_by_brightness(&conn)?,
            vec![(Some(Brightness::Night), 2), (Some(Brightness::Day), 1)]
        );
        Ok(())
    }

    #[test]
    fn test_open_catalog_creates_and_reopens() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nextwall.db");

        {
            let conn = open_catalog(&path)?;
            insert(&conn, "/w/a.jpg", features(0.1), Some(Brightness::Night))?;
        }

        let conn = open_catalog(&path)?;
        assert!(exists(&conn, "/w/a.jpg")?);
        Ok(())
    }

    #[test]
    fn test_open_catalog_rejects_other_versions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("old.db");
        {
            let mut conn = connect(&path)?;
            create_schema(&mut conn)?;
            conn.execute("UPDATE info SET value = '0.2' WHERE name = 'version'", [])?;
        }

        let err = open_catalog(&path).unwrap_err();
        assert!(err.to_string().contains("version 0.2"));
        Ok(())
    }

    #[test]
    fn test_open_catalog_rejects_foreign_database() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("foreign.db");
        connect(&path)?.execute("CREATE TABLE songs (id INTEGER PRIMARY KEY)", [])?;

        assert!(open_catalog(&path).is_err());
        Ok(())
    }
}
