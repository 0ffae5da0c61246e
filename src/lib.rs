//! Wallpaper rotator that picks backgrounds to match the daylight outside.
//!
//! Core modules:
//! - [`db`] - Wallpaper catalog (SQLite)
//! - [`scanner`] - Finding and cataloguing new wallpapers
//! - [`features`] - Kurtosis and lightness of an image
//! - [`classifier`] - Night/twilight/day classification of features
//! - [`solar`] - Night/twilight/day at a place and time
//! - [`selection`] - Random, repeat-avoiding wallpaper selection
//! - [`controller`] - Interactive browsing loop
//!
//! ### Supporting Modules
//!
//! - [`brightness`] - The three brightness buckets
//! - [`desktop`] - Setting, opening and trashing wallpapers
//! - [`config`] - Configuration and data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use nextwall::classifier::NeuralNet;
//! use nextwall::features::ImageStatistics;
//! use nextwall::scanner::Scanner;
//! use nextwall::selection::{Selection, Selector};
//! use nextwall::{config, db, solar};
//! use std::path::Path;
//!
//! let mut conn = db::open_catalog(&config::get_db_path()?)?;
//! let net = NeuralNet::load(Path::new("data/brightness-net.json"))?;
//! Scanner::new(&ImageStatistics, &net).scan(&mut conn, Path::new("/usr/share/backgrounds"), true)?;
//!
//! let here: solar::Location = "52.37:4.89".parse()?;
//! let brightness = solar::local_brightness(here, &chrono::Local::now());
//! let mut selector = Selector::new("/usr/share/backgrounds", brightness);
//! if let Selection::Wallpaper(path) = selector.next_wallpaper(&conn, None)? {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Brightness
//!
//! Every wallpaper is put in one of three buckets when it is scanned:
//! night (0), twilight (1) or day (2). A small neural network decides, fed
//! with two numbers measured on the image: the kurtosis of its pixel values
//! and the lightness of its average colour.
//!
//! With a location, the same buckets describe the sky: day between sunrise and
//! sunset, twilight until the sun is 6° below the horizon, night after that.
//!
//! ## Error Handling
//!
//! Functions return `anyhow::Result`. Problems with single files during a
//! scan are logged and skipped. Running out of wallpapers is not an error:
//! see [`selection::Selection`].

pub mod brightness;
pub mod classifier;
pub mod cli;
pub mod completion;
pub mod config;
pub mod controller;
pub mod db;
pub mod desktop;
pub mod features;
pub mod scanner;
pub mod selection;
pub mod solar;
