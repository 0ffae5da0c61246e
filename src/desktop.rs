//! # Desktop Integration
//!
//! The catalog and selection engine never touch the desktop directly. Anything
//! that reads or changes the wallpaper, opens a file, or moves it to the trash
//! goes through [`Desktop`].
//!
//! [`Gnome`] drives the usual command line tools:
//! - `gsettings` for `org.gnome.desktop.background` (light and dark variants)
//! - `xdg-open` for viewing a wallpaper
//! - `gio trash` for deleting one

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Command;
use url::Url;

const BACKGROUND_SCHEMA: &str = "org.gnome.desktop.background";
const PICTURE_URI: &str = "picture-uri";
const PICTURE_URI_DARK: &str = "picture-uri-dark";

/// What the core needs from the desktop environment.
pub trait Desktop {
    /// Path of the current background image, if it is a local file.
    ///
    /// # Errors
    ///
    /// Fails when the desktop settings cannot be read.
    fn background(&self) -> Result<Option<PathBuf>>;

    /// Make `path` the background image.
    ///
    /// # Errors
    ///
    /// Fails when the setting cannot be written or did not stick.
    fn set_background(&self, path: &Path) -> Result<()>;

    /// Open `path` with the user's default image viewer.
    ///
    /// # Errors
    ///
    /// Fails when no viewer could be launched.
    fn open(&self, path: &Path) -> Result<()>;

    /// Move `path` to the trash.
    ///
    /// # Errors
    ///
    /// Fails when the file could not be removed.
    fn trash(&self, path: &Path) -> Result<()>;
}

/// GNOME (and anything else honouring `org.gnome.desktop.background`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Gnome;

impl Gnome {
    fn get(key: &str) -> Result<String> {
        let output = Command::new("gsettings")
            .args(["get", BACKGROUND_SCHEMA, key])
            .output()
            .context("Failed to execute gsettings. Is GNOME (glib) installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("gsettings get {BACKGROUND_SCHEMA} {key} failed: {}", stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn set(key: &str, value: &str) -> Result<()> {
        let output = Command::new("gsettings")
            .args(["set", BACKGROUND_SCHEMA, key, value])
            .output()
            .context("Failed to execute gsettings. Is GNOME (glib) installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("gsettings set {BACKGROUND_SCHEMA} {key} failed: {}", stderr.trim());
        }
        Ok(())
    }
}

impl Desktop for Gnome {
    fn background(&self) -> Result<Option<PathBuf>> {
        let value = Self::get(PICTURE_URI)?;
        Ok(path_from_setting(&value))
    }

    fn set_background(&self, path: &Path) -> Result<()> {
        let uri = file_uri(path)?;
        Self::set(PICTURE_URI, &uri)?;
        Self::set(PICTURE_URI_DARK, &uri)?;

        let current = self.background()?;
        if current.as_deref() != Some(path) {
            bail!(
                "Background is {} after setting it to {}",
                current.map_or_else(|| "unset".to_string(), |p| p.display().to_string()),
                path.display()
            );
        }
        info!("Background set to {}", path.display());
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<()> {
        debug!("Opening {}", path.display());
        let status = Command::new("xdg-open")
            .arg(path)
            .status()
            .context("Failed to execute xdg-open. Please install xdg-utils")?;
        if !status.success() {
            bail!("xdg-open {} exited with {status}", path.display());
        }
        Ok(())
    }

    fn trash(&self, path: &Path) -> Result<()> {
        let output = Command::new("gio")
            .arg("trash")
            .arg(path)
            .output()
            .context("Failed to execute gio trash")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Cannot move {} to the trash: {}", path.display(), stderr.trim());
        }
        info!("Moved {} to the trash", path.display());
        Ok(())
    }
}

/// `file://` URI for an absolute local path, percent-encoded.
///
/// # Errors
///
/// Fails for relative paths.
pub fn file_uri(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| anyhow!("{} is not an absolute path", path.display()))
}

/// Local path from a gsettings value such as `'file:///usr/share/a%20b.jpg'`.
/// `None` for empty values and non-file URIs.
#[must_use]
pub fn path_from_setting(value: &str) -> Option<PathBuf> {
    let unquoted = value.trim().trim_matches('\'');
    let url = Url::parse(unquoted).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_from_setting() {
        assert_eq!(
            path_from_setting("'file:///usr/share/backgrounds/sky.jpg'\n"),
            Some(PathBuf::from("/usr/share/backgrounds/sky.jpg"))
        );
        assert_eq!(
            path_from_setting("'file:///home/me/My%20Walls/a%2Bb.png'"),
            Some(PathBuf::from("/home/me/My Walls/a+b.png"))
        );
        assert_eq!(path_from_setting("''"), None);
        assert_eq!(path_from_setting("'https://example.com/a.jpg'"), None);
    }

    #[test]
    fn test_malformed_escapes_are_kept() {
        assert_eq!(
            path_from_setting("'file:///tmp/100%'"),
            Some(PathBuf::from("/tmp/100%"))
        );
        assert_eq!(
            path_from_setting("'file:///tmp/%zz.jpg'"),
            Some(PathBuf::from("/tmp/%zz.jpg"))
        );
    }

    #[test]
    fn test_file_uri() {
        assert_eq!(file_uri(Path::new("/tmp/a.jpg")).unwrap(), "file:///tmp/a.jpg");
        assert_eq!(file_uri(Path::new("/walls/a b.jpg")).unwrap(), "file:///walls/a%20b.jpg");
        assert!(file_uri(Path::new("walls/a.jpg")).is_err());
    }

    #[test]
    fn test_uri_round_trip_keeps_escapes_in_file_names() {
        for name in ["/walls/a%20b.jpg", "/walls/a b.jpg", "/walls/100%.png", "/walls/#1 (ß).jpg"] {
            let path = Path::new(name);
            let setting = format!("'{}'", file_uri(path).unwrap());
            assert_eq!(path_from_setting(&setting).as_deref(), Some(path), "{setting}");
        }
    }
}
