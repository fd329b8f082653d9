// Streusel - SHT31 temperature and humidity check for monitoring systems
//
// Copyright 2024 The streusel developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::sensor::EnvironmentReading;
use std::fmt::{self, Formatter};
use std::str::FromStr;

/// Inclusive numeric range, parsed from `MIN:MAX`, used for warning and
/// critical thresholds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

impl FromStr for Bounds {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once(':')
            .ok_or_else(|| format!("expected a MIN:MAX range, got '{}'", s))?;

        let min: f64 = min.trim().parse().map_err(|_| format!("invalid lower bound '{}'", min))?;
        let max: f64 = max.trim().parse().map_err(|_| format!("invalid upper bound '{}'", max))?;
        if min > max {
            return Err(format!("lower bound {} exceeds upper bound {}", min, max));
        }

        Ok(Bounds { min, max })
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.min, self.max)
    }
}

/// Warning and critical ranges for one measured quantity. An absent range
/// never raises its severity.
#[derive(Copy, Clone, Debug, Default)]
pub struct Thresholds {
    pub warn: Option<Bounds>,
    pub crit: Option<Bounds>,
}

/// Monitoring severities with their conventional plugin exit codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl CheckStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            CheckStatus::Ok => 0,
            CheckStatus::Warning => 1,
            CheckStatus::Critical => 2,
            CheckStatus::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Warning => "WARNING",
            CheckStatus::Critical => "CRITICAL",
            CheckStatus::Unknown => "UNKNOWN",
        }
    }
}

fn severity(value: f64, thresholds: &Thresholds) -> CheckStatus {
    if let Some(crit) = thresholds.crit {
        if !crit.contains(value) {
            return CheckStatus::Critical;
        }
    }

    if let Some(warn) = thresholds.warn {
        if !warn.contains(value) {
            return CheckStatus::Warning;
        }
    }

    CheckStatus::Ok
}

/// Classify a reading against the temperature and humidity thresholds,
/// reporting the worse of the two severities. A sentinel reading (no valid
/// measurement obtained) is always UNKNOWN.
pub fn classify(
    reading: &EnvironmentReading,
    temperature: &Thresholds,
    humidity: &Thresholds,
) -> CheckStatus {
    if !reading.is_available() {
        return CheckStatus::Unknown;
    }

    let t = severity(f64::from(reading.temperature), temperature);
    let h = severity(f64::from(reading.humidity), humidity);

    if t == CheckStatus::Critical || h == CheckStatus::Critical {
        CheckStatus::Critical
    } else if t == CheckStatus::Warning || h == CheckStatus::Warning {
        CheckStatus::Warning
    } else {
        CheckStatus::Ok
    }
}

fn perf_range(bounds: &Option<Bounds>) -> String {
    bounds.map(|b| b.to_string()).unwrap_or_default()
}

/// Render the plugin status line, performance data included, for a reading
/// and its classification.
pub fn render(
    reading: &EnvironmentReading,
    status: CheckStatus,
    temperature: &Thresholds,
    humidity: &Thresholds,
) -> String {
    if status == CheckStatus::Unknown {
        return format!(
            "SHT31 {} - no valid reading could be obtained from the sensor",
            status.label()
        );
    }

    let t = f64::from(reading.temperature);
    let h = f64::from(reading.humidity);

    format!(
        "SHT31 {} - temperature: {:.1} C, humidity: {:.1} %RH | \
         temperature={:.2};{};{} humidity={:.2}%;{};{}",
        status.label(),
        t,
        h,
        t,
        perf_range(&temperature.warn),
        perf_range(&temperature.crit),
        h,
        perf_range(&humidity.warn),
        perf_range(&humidity.crit),
    )
}

#[cfg(test)]
mod test {
    use super::{classify, render, Bounds, CheckStatus, Thresholds};
    use crate::sensor::{EnvironmentReading, Humidity, TemperatureCelsius};

    fn reading(temperature: f64, humidity: f64) -> EnvironmentReading {
        EnvironmentReading {
            temperature: TemperatureCelsius::from(temperature),
            humidity: Humidity::from(humidity),
        }
    }

    #[test]
    fn test_bounds_parse() {
        assert_eq!(Ok(Bounds { min: 18.0, max: 28.0 }), "18:28".parse());
        assert_eq!(Ok(Bounds { min: -5.0, max: 2.5 }), "-5:2.5".parse());
    }

    #[test]
    fn test_bounds_parse_invalid() {
        assert!("18".parse::<Bounds>().is_err());
        assert!("a:b".parse::<Bounds>().is_err());
        assert!("28:18".parse::<Bounds>().is_err());
    }

    #[test]
    fn test_bounds_contains() {
        let b = Bounds { min: 18.0, max: 28.0 };
        assert!(b.contains(18.0));
        assert!(b.contains(28.0));
        assert!(!b.contains(17.9));
        assert!(!b.contains(28.1));
    }

    #[test]
    fn test_classify_unavailable_is_unknown() {
        let status = classify(
            &EnvironmentReading::NOT_AVAILABLE,
            &Thresholds::default(),
            &Thresholds::default(),
        );
        assert_eq!(CheckStatus::Unknown, status);
    }

    #[test]
    fn test_classify_without_thresholds_is_ok() {
        let status = classify(&reading(24.0, 45.0), &Thresholds::default(), &Thresholds::default());
        assert_eq!(CheckStatus::Ok, status);
    }

    #[test]
    fn test_classify_warning() {
        let temperature = Thresholds {
            warn: Some(Bounds { min: 18.0, max: 28.0 }),
            crit: Some(Bounds { min: 15.0, max: 35.0 }),
        };

        let status = classify(&reading(30.0, 45.0), &temperature, &Thresholds::default());
        assert_eq!(CheckStatus::Warning, status);
    }

    #[test]
    fn test_classify_critical_wins_over_warning() {
        let temperature = Thresholds {
            warn: Some(Bounds { min: 18.0, max: 28.0 }),
            crit: None,
        };
        let humidity = Thresholds {
            warn: None,
            crit: Some(Bounds { min: 30.0, max: 70.0 }),
        };

        // Temperature is only a warning but humidity breaches critical.
        let status = classify(&reading(30.0, 80.0), &temperature, &humidity);
        assert_eq!(CheckStatus::Critical, status);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(0, CheckStatus::Ok.exit_code());
        assert_eq!(1, CheckStatus::Warning.exit_code());
        assert_eq!(2, CheckStatus::Critical.exit_code());
        assert_eq!(3, CheckStatus::Unknown.exit_code());
    }

    #[test]
    fn test_render_with_perfdata() {
        let temperature = Thresholds {
            warn: Some(Bounds { min: 18.0, max: 28.0 }),
            crit: Some(Bounds { min: 15.0, max: 35.0 }),
        };

        let line = render(&reading(24.32, 30.67), CheckStatus::Ok, &temperature, &Thresholds::default());
        assert_eq!(
            "SHT31 OK - temperature: 24.3 C, humidity: 30.7 %RH | \
             temperature=24.32;18:28;15:35 humidity=30.67%;;",
            line
        );
    }

    #[test]
    fn test_render_unknown() {
        let line = render(
            &EnvironmentReading::NOT_AVAILABLE,
            CheckStatus::Unknown,
            &Thresholds::default(),
            &Thresholds::default(),
        );

        assert!(line.starts_with("SHT31 UNKNOWN - "));
        // No perfdata for a reading that doesn't exist.
        assert!(!line.contains('|'));
    }
}
