//! # Solar Brightness Calculator
//!
//! Decides whether it is currently night, twilight or day at a location.
//!
//! Sunrise, sunset and civil twilight come from the `sunrise` crate. Days on
//! which the sun never reaches an altitude are caught first with a
//! declination check, since the crate has no answer for them. Times are UTC
//! hours for the calendar date, shifted by the local UTC offset before
//! comparing them with the clock.
//!
//! | Condition                                  | Result   |
//! |--------------------------------------------|----------|
//! | `sunrise < now < sunset`                   | Day      |
//! | `now < twilight start` or `now > twilight end` | Night |
//! | otherwise                                  | Twilight |
//!
//! When the sun never rises or never sets that day the answer is Night or
//! Day directly. When the sun does rise and set but civil twilight never
//! ends or never begins, the bucket is undetermined.

use crate::brightness::Brightness;
use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc};
use log::debug;
use sunrise::{Coordinates, DawnType, SolarEvent};
use std::fmt;
use std::str::FromStr;

/// Altitude of the sun's centre at sunrise/sunset, allowing for refraction
/// and the upper limb.
const SUNRISE_ALTITUDE: f64 = -0.833;

/// Altitude of the sun's centre at the edges of civil twilight.
const CIVIL_TWILIGHT_ALTITUDE: f64 = -6.0;

/// A point on Earth, in decimal degrees. North and east are positive.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// # Errors
    ///
    /// Fails when a coordinate is out of range or not a number.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            bail!("Latitude {latitude} is outside -90..90");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            bail!("Longitude {longitude} is outside -180..180");
        }
        Ok(Self { latitude, longitude })
    }
}

/// Parses `LAT:LON`, e.g. `52.37:4.89`.
impl FromStr for Location {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((lat, lon)) = s.split_once(':') else {
            bail!("Incorrect location '{s}'. Use LAT:LON, e.g. 52.37:4.89");
        };
        let latitude: f64 = lat.trim().parse().map_err(|_| anyhow::anyhow!("Incorrect latitude '{lat}'"))?;
        let longitude: f64 = lon.trim().parse().map_err(|_| anyhow::anyhow!("Incorrect longitude '{lon}'"))?;
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}:{:.4}", self.latitude, self.longitude)
    }
}

/// When the sun crosses a given altitude on one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crossing {
    /// Rises through the altitude at `rise` and sets at `set` (hours).
    Between { rise: f64, set: f64 },
    /// Stays above the altitude all day.
    AlwaysAbove,
    /// Stays below the altitude all day.
    AlwaysBelow,
}

impl Crossing {
    fn shifted(self, hours: f64) -> Self {
        match self {
            Crossing::Between { rise, set } => Crossing::Between { rise: rise + hours, set: set + hours },
            other => other,
        }
    }
}

/// Sunrise/sunset and civil twilight for one day, all in the same clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarDay {
    pub sun: Crossing,
    pub civil_twilight: Crossing,
}

impl SolarDay {
    /// Solar events for `date` at `location`, in UTC hours. `None` when the
    /// coordinates are out of range.
    #[must_use]
    pub fn utc(date: NaiveDate, location: Location) -> Option<Self> {
        let coordinates = Coordinates::new(location.latitude, location.longitude)?;
        let day = sunrise::SolarDay::new(coordinates, date);
        Some(Self {
            sun: crossing(&day, date, location, SUNRISE_ALTITUDE, SolarEvent::Sunrise, SolarEvent::Sunset),
            civil_twilight: crossing(
                &day,
                date,
                location,
                CIVIL_TWILIGHT_ALTITUDE,
                SolarEvent::Dawn(DawnType::Civil),
                SolarEvent::Dusk(DawnType::Civil),
            ),
        })
    }

    /// The same events moved to a clock `offset_hours` ahead of UTC.
    #[must_use]
    pub fn with_offset(self, offset_hours: f64) -> Self {
        Self {
            sun: self.sun.shifted(offset_hours),
            civil_twilight: self.civil_twilight.shifted(offset_hours),
        }
    }

    /// Bucket for the clock time `hour` (fractional hours since midnight).
    /// `None` when the day's events do not allow a decision.
    #[must_use]
    pub fn brightness_at(&self, hour: f64) -> Option<Brightness> {
        match (self.sun, self.civil_twilight) {
            (Crossing::AlwaysAbove, _) => Some(Brightness::Day),
            (Crossing::AlwaysBelow, _) => Some(Brightness::Night),
            (
                Crossing::Between { rise, set },
                Crossing::Between { rise: dawn, set: dusk },
            ) => {
                if rise < hour && hour < set {
                    Some(Brightness::Day)
                } else if hour < dawn || hour > dusk {
                    Some(Brightness::Night)
                } else {
                    Some(Brightness::Twilight)
                }
            }
            (Crossing::Between { .. }, _) => None,
        }
    }
}

/// Bucket for the moment `now` at `location`, using `now`'s UTC offset as the
/// local clock. `None` means undetermined.
pub fn local_brightness<Tz: TimeZone>(location: Location, now: &DateTime<Tz>) -> Option<Brightness> {
    let offset_hours = f64::from(now.offset().fix().local_minus_utc()) / 3600.0;
    let hour = f64::from(now.hour())
        + f64::from(now.minute()) / 60.0
        + f64::from(now.second()) / 3600.0;

    let day = SolarDay::utc(now.date_naive(), location)?.with_offset(offset_hours);

    if let Crossing::Between { rise, set } = day.sun {
        debug!("Sun rises {}, sets {}", hours_to_hm(rise), hours_to_hm(set));
    }
    match day.civil_twilight {
        Crossing::Between { rise, set } => {
            debug!("Civil twilight starts {}, ends {}", hours_to_hm(rise), hours_to_hm(set));
        }
        Crossing::AlwaysAbove => debug!("Never darker than civil twilight"),
        Crossing::AlwaysBelow => debug!("Never as bright as civil twilight"),
    }

    let brightness = day.brightness_at(hour);
    debug!("Local brightness at {}: {brightness:?}", hours_to_hm(hour));
    brightness
}

/// Format fractional hours as `HH:MM`.
#[must_use]
pub fn hours_to_hm(hours: f64) -> String {
    let total = (hours * 60.0).round() as i64;
    format!("{:02}:{:02}", total.div_euclid(60), total.rem_euclid(60))
}

/// Cosine of the hour angle at which the sun's centre reaches `altitude`.
///
/// Outside `-1..1` the sun never gets there that day: at or above 1 it stays
/// below, at or below -1 it stays above. The declination is the usual cosine
/// approximation, good to about a degree.
fn cos_hour_angle(date: NaiveDate, latitude: f64, altitude: f64) -> f64 {
    let days = f64::from(date.ordinal0()) + 10.0;
    let declination = (-23.44 * (360.0 / 365.0 * days).to_radians().cos()).to_radians();
    let latitude = latitude.to_radians();
    (altitude.to_radians().sin() - latitude.sin() * declination.sin()) / (latitude.cos() * declination.cos())
}

/// Hours from 0h UTC on `date` to `time`.
fn hours_since_midnight(date: NaiveDate, time: DateTime<Utc>) -> f64 {
    (time - date.and_time(NaiveTime::MIN).and_utc()).num_seconds() as f64 / 3600.0
}

/// When the sun passes `altitude` on `date`, with the times of its `rise` and
/// `set` events taken from `day`.
fn crossing(
    day: &sunrise::SolarDay,
    date: NaiveDate,
    location: Location,
    altitude: f64,
    rise: SolarEvent,
    set: SolarEvent,
) -> Crossing {
    let cos_h = cos_hour_angle(date, location.latitude, altitude);
    if cos_h >= 1.0 {
        return Crossing::AlwaysBelow;
    }
    if cos_h <= -1.0 {
        return Crossing::AlwaysAbove;
    }

    let rise = hours_since_midnight(date, day.event_time(rise));
    let set = hours_since_midnight(date, day.event_time(set));
    if (-12.0..36.0).contains(&rise) && rise < set && set - rise < 24.0 {
        Crossing::Between { rise, set }
    } else if cos_h > 0.0 {
        // Within a degree of a polar day or night; trust the sign.
        Crossing::AlwaysBelow
    } else {
        Crossing::AlwaysAbove
    }
}
