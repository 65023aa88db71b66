// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Strike and dip parsing using nom
//!
//! Field data stores orientations either as numbers or as text: plain degrees
//! (`"125"`, `"125°"`), quadrant bearings (`"N15W"`, `"S 30 E"`) or compass
//! points (`"NE"`, `"WSW"`). Everything is resolved once, at parse time, into a
//! normalized azimuth in `[0, 360)`.

use nom::{
    character::complete::{alpha1, char, digit0, digit1, one_of, space0},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// 16-point compass rose, clockwise from north
const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Raw orientation value as delivered by a data provider
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrientationInput {
    Numeric(f64),
    Cardinal(String),
}

impl From<f64> for OrientationInput {
    fn from(value: f64) -> Self {
        OrientationInput::Numeric(value)
    }
}

impl From<&str> for OrientationInput {
    fn from(value: &str) -> Self {
        OrientationInput::Cardinal(value.to_string())
    }
}

impl From<String> for OrientationInput {
    fn from(value: String) -> Self {
        OrientationInput::Cardinal(value)
    }
}

/// Parsed dip: angle from horizontal plus optional dip direction
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dip {
    pub angle: f64,
    pub direction: Option<f64>,
}

/// Wrap any angle into `[0, 360)`
#[inline]
pub fn normalize_azimuth(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Parse decimal number: 15, 15.5, 15., -30
fn decimal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            opt(pair(char('.'), digit0)),
        ))),
        |s: &str| fast_float::parse::<f64, _>(s),
    )(input)
}

/// Parse plain degrees with optional degree sign: 125, 125°
fn plain_degrees(input: &str) -> IResult<&str, f64> {
    terminated(decimal, pair(space0, opt(char('°'))))(input)
}

/// Parse quadrant bearing: N15W, S 30 E, N45.5°E
fn quadrant_bearing(input: &str) -> IResult<&str, (char, f64, char)> {
    tuple((
        one_of("NS"),
        delimited(space0, decimal, pair(space0, opt(char('°')))),
        preceded(space0, one_of("EW")),
    ))(input)
}

/// Parse dip text: 45, 45°, 45NE, 45 SW
fn dip_text(input: &str) -> IResult<&str, (f64, Option<&str>)> {
    pair(plain_degrees, opt(preceded(space0, alpha1)))(input)
}

fn compass_azimuth(name: &str) -> Option<f64> {
    COMPASS_POINTS
        .iter()
        .position(|p| *p == name)
        .map(|i| i as f64 * 22.5)
}

/// Convert a quadrant bearing to azimuth
fn quadrant_to_azimuth(from: char, angle: f64, toward: char) -> f64 {
    match (from, toward) {
        ('N', 'E') => angle,
        ('N', _) => 360.0 - angle,
        (_, 'E') => 180.0 - angle,
        _ => 180.0 + angle,
    }
}

fn parse_bearing_text(raw: &str) -> Result<f64> {
    let text = raw.trim().to_ascii_uppercase();
    if text.is_empty() {
        return Err(Error::orientation(raw, "empty bearing"));
    }

    if let Ok((_, degrees)) = all_consuming(plain_degrees)(text.as_str()) {
        return finite_azimuth(raw, degrees);
    }

    if let Ok((_, (from, angle, toward))) = all_consuming(quadrant_bearing)(text.as_str()) {
        if !(0.0..=90.0).contains(&angle) {
            return Err(Error::orientation(
                raw,
                "quadrant angle must be between 0 and 90",
            ));
        }
        return Ok(normalize_azimuth(quadrant_to_azimuth(from, angle, toward)));
    }

    if let Ok((_, name)) = all_consuming(alpha1::<&str, nom::error::Error<&str>>)(text.as_str()) {
        if let Some(azimuth) = compass_azimuth(name) {
            return Ok(azimuth);
        }
    }

    Err(Error::orientation(raw, "unrecognized bearing"))
}

fn finite_azimuth(raw: &str, degrees: f64) -> Result<f64> {
    if degrees.is_finite() {
        Ok(normalize_azimuth(degrees))
    } else {
        Err(Error::orientation(raw, "bearing is not finite"))
    }
}

/// Resolve a strike (or any bearing) into a normalized azimuth
pub fn parse_azimuth(input: &OrientationInput) -> Result<f64> {
    match input {
        OrientationInput::Numeric(value) => finite_azimuth(&value.to_string(), *value),
        OrientationInput::Cardinal(text) => parse_bearing_text(text),
    }
}

/// Resolve a dip value, optionally carrying a dip direction (`"45NE"`)
pub fn parse_dip(input: &OrientationInput) -> Result<Dip> {
    let (raw, angle, direction) = match input {
        OrientationInput::Numeric(value) => (value.to_string(), *value, None),
        OrientationInput::Cardinal(text) => {
            let upper = text.trim().to_ascii_uppercase();
            let (_, (angle, dir)) = all_consuming(dip_text)(upper.as_str())
                .map_err(|_| Error::orientation(text.as_str(), "unrecognized dip"))?;
            let direction = match dir {
                Some(name) => Some(compass_azimuth(name).ok_or_else(|| {
                    Error::orientation(text.as_str(), "unknown dip direction")
                })?),
                None => None,
            };
            (text.clone(), angle, direction)
        }
    };

    if !angle.is_finite() || !(0.0..=90.0).contains(&angle) {
        return Err(Error::orientation(raw, "dip must be between 0 and 90"));
    }

    Ok(Dip { angle, direction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn azimuth(text: &str) -> f64 {
        parse_azimuth(&OrientationInput::from(text)).unwrap()
    }

    #[test]
    fn test_quadrant_bearings() {
        assert_relative_eq!(azimuth("N15W"), 345.0);
        assert_relative_eq!(azimuth("N45E"), 45.0);
        assert_relative_eq!(azimuth("S30E"), 150.0);
        assert_relative_eq!(azimuth("S30W"), 210.0);
        assert_relative_eq!(azimuth("n 15 w"), 345.0);
        assert_relative_eq!(azimuth("N45.5°E"), 45.5);
    }

    #[test]
    fn test_compass_points() {
        assert_relative_eq!(azimuth("N"), 0.0);
        assert_relative_eq!(azimuth("NE"), 45.0);
        assert_relative_eq!(azimuth("WSW"), 247.5);
        assert_relative_eq!(azimuth(" nnw "), 337.5);
    }

    #[test]
    fn test_numeric_forms() {
        assert_relative_eq!(azimuth("125"), 125.0);
        assert_relative_eq!(azimuth("125°"), 125.0);
        assert_relative_eq!(parse_azimuth(&OrientationInput::Numeric(-30.0)).unwrap(), 330.0);
        assert_relative_eq!(parse_azimuth(&OrientationInput::Numeric(720.0)).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_bearings() {
        assert!(parse_azimuth(&"N95E".into()).is_err());
        assert!(parse_azimuth(&"foo".into()).is_err());
        assert!(parse_azimuth(&"".into()).is_err());
        assert!(parse_azimuth(&f64::NAN.into()).is_err());
    }

    #[test]
    fn test_dip_parsing() {
        let dip = parse_dip(&"45NE".into()).unwrap();
        assert_relative_eq!(dip.angle, 45.0);
        assert_eq!(dip.direction, Some(45.0));

        let dip = parse_dip(&"30 sw".into()).unwrap();
        assert_eq!(dip.direction, Some(225.0));

        let dip = parse_dip(&OrientationInput::Numeric(60.0)).unwrap();
        assert_eq!(dip.direction, None);

        assert!(parse_dip(&OrientationInput::Numeric(95.0)).is_err());
        assert!(parse_dip(&"45XY".into()).is_err());
    }

    #[test]
    fn test_normalize_azimuth() {
        assert_eq!(normalize_azimuth(360.0), 0.0);
        assert_relative_eq!(normalize_azimuth(-90.0), 270.0);
        assert!(normalize_azimuth(-1e-20) < 360.0);
    }
}
