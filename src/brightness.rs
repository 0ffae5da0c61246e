//! Brightness buckets shared by the classifier, the catalog and the solar
//! calculator.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// How bright a wallpaper is, or how bright it is outside.
///
/// The discriminants are the values stored in the `brightness` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Brightness {
    Night = 0,
    Twilight = 1,
    Day = 2,
}

impl Brightness {
    /// All buckets in class-index order.
    pub const ALL: [Brightness; 3] = [Brightness::Night, Brightness::Twilight, Brightness::Day];

    /// Class index as stored in the database.
    #[must_use]
    pub fn index(self) -> i64 {
        self as i64
    }

    /// Inverse of [`Brightness::index`]. `None` for anything outside `0..=2`.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Brightness::Night),
            1 => Some(Brightness::Twilight),
            2 => Some(Brightness::Day),
            _ => None,
        }
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Brightness::Night => "night",
            Brightness::Twilight => "twilight",
            Brightness::Day => "day",
        };
        f.write_str(name)
    }
}

/// Accepts the class index (`0`, `1`, `2`) or the bucket name.
impl FromStr for Brightness {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(index) = s.parse::<i64>() {
            return Self::from_index(index)
                .ok_or_else(|| anyhow!("Incorrect brightness value {index}. Use 0, 1 or 2"));
        }
        match s.to_ascii_lowercase().as_str() {
            "night" => Ok(Brightness::Night),
            "twilight" => Ok(Brightness::Twilight),
            "day" => Ok(Brightness::Day),
            other => Err(anyhow!("Incorrect brightness value '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for b in Brightness::ALL {
            assert_eq!(Brightness::from_index(b.index()), Some(b));
        }
        assert_eq!(Brightness::from_index(3), None);
        assert_eq!(Brightness::from_index(-1), None);
    }

    #[test]
    fn test_parse_accepts_numbers_and_names() {
        assert_eq!("0".parse::<Brightness>().unwrap(), Brightness::Night);
        assert_eq!("2".parse::<Brightness>().unwrap(), Brightness::Day);
        assert_eq!("Twilight".parse::<Brightness>().unwrap(), Brightness::Twilight);
        assert!("5".parse::<Brightness>().is_err());
        assert!("dusk".parse::<Brightness>().is_err());
    }
}
