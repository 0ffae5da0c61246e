//! # Interactive Controller
//!
//! Line-oriented loop driving the selection engine:
//!
//! | Input        | Action                                              |
//! |--------------|-----------------------------------------------------|
//! | *empty*, `n` | show the next wallpaper                             |
//! | `d`          | trash the current wallpaper (asks first), show next |
//! | `o`          | open the current wallpaper in the image viewer      |
//! | `help`       | list commands                                       |
//! | `q`, EOF     | quit                                                |
//!
//! Bad input and desktop failures are reported and the loop goes on. It only
//! ends on `q`, end of input, a database error, or when no wallpaper matches
//! at all.

use crate::db;
use crate::desktop::Desktop;
use crate::selection::{Selection, Selector};
use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::Connection;
use std::io::{BufRead, Write};
use std::path::PathBuf;

const HELP: &str = "\
Commands:
  <enter>, n   next wallpaper
  d            delete the current wallpaper
  o            open the current wallpaper
  help         show this help
  q            quit";

const PROMPT: &str = "nextwall> ";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Delete,
    Open,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" | "n" => Command::Next,
            "d" => Command::Delete,
            "o" => Command::Open,
            "help" | "h" | "?" => Command::Help,
            "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Interactive session over one catalog, selector and desktop.
pub struct Controller<'a, D: Desktop + ?Sized> {
    conn: &'a Connection,
    desktop: &'a D,
    selector: Selector,
    current: Option<PathBuf>,
}

impl<'a, D: Desktop + ?Sized> Controller<'a, D> {
    pub fn new(conn: &'a Connection, desktop: &'a D, selector: Selector) -> Self {
        Self { conn, desktop, selector, current: None }
    }

    /// Wallpaper last shown by this session (or found on the desktop at start).
    #[must_use]
    pub fn current(&self) -> Option<&PathBuf> {
        self.current.as_ref()
    }

    /// Show a first wallpaper, then handle commands from `input` until the
    /// user quits or input ends.
    ///
    /// # Errors
    ///
    /// Fails on database errors and when `input`/`output` fail.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        self.current = match self.desktop.background() {
            Ok(current) => current,
            Err(err) => {
                warn!("Cannot read the current background: {err:#}");
                None
            }
        };

        if let Flow::Stop = self.next(&mut output)? {
            return Ok(());
        }

        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            let Some(line) = read_line(&mut input)? else {
                writeln!(output)?;
                return Ok(());
            };

            let flow = match Command::parse(&line) {
                Command::Next => self.next(&mut output)?,
                Command::Delete => self.delete(&mut input, &mut output)?,
                Command::Open => {
                    self.open(&mut output)?;
                    Flow::Continue
                }
                Command::Help => {
                    writeln!(output, "{HELP}")?;
                    Flow::Continue
                }
                Command::Quit => Flow::Stop,
                Command::Unknown(other) => {
                    writeln!(output, "Unknown command '{other}'. Type 'help' for a list of commands.")?;
                    Flow::Continue
                }
            };

            if let Flow::Stop = flow {
                return Ok(());
            }
        }
    }

    fn next<W: Write>(&mut self, output: &mut W) -> Result<Flow> {
        match self.selector.next_wallpaper(self.conn, self.current.as_deref())? {
            Selection::Wallpaper(path) => {
                match self.desktop.set_background(&path) {
                    Ok(()) => {
                        writeln!(output, "{}", path.display())?;
                        self.current = Some(path);
                    }
                    Err(err) => writeln!(output, "Cannot set background: {err:#}")?,
                }
                Ok(Flow::Continue)
            }
            Selection::NoCandidates => {
                writeln!(output, "No matching wallpapers found. Try scanning the directory first.")?;
                Ok(Flow::Stop)
            }
            Selection::Exhausted { retries } => {
                debug!("Gave up after {retries} retries");
                writeln!(output, "Not enough distinct wallpapers. Try a different directory.")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn delete<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<Flow> {
        let Some(path) = self.current.clone() else {
            writeln!(output, "No current wallpaper to delete.")?;
            return Ok(Flow::Continue);
        };

        write!(output, "Delete {}? [y/N] ", path.display())?;
        output.flush()?;
        let answer = read_line(input)?.unwrap_or_default();
        if !answer.trim().eq_ignore_ascii_case("y") {
            writeln!(output, "Kept {}", path.display())?;
            return Ok(Flow::Continue);
        }

        if let Err(err) = self.desktop.trash(&path) {
            writeln!(output, "Cannot delete {}: {err:#}", path.display())?;
            return Ok(Flow::Continue);
        }
        if let Some(path_str) = path.to_str() {
            db::delete(self.conn, path_str)
                .with_context(|| format!("Cannot remove {} from the database", path.display()))?;
        }
        writeln!(output, "Deleted {}", path.display())?;

        self.current = None;
        self.next(output)
    }

    fn open<W: Write>(&self, output: &mut W) -> Result<()> {
        match &self.current {
            Some(path) => {
                if let Err(err) = self.desktop.open(path) {
                    writeln!(output, "Cannot open {}: {err:#}", path.display())?;
                }
            }
            None => writeln!(output, "No current wallpaper to open.")?,
        }
        Ok(())
    }
}

/// Next line without its line ending, `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Cannot read from standard input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}
