//! Time series for the points a Brick model describes. Queries hand back opaque identifiers
//! (usually UUID literals); a [`TimeseriesStore`] maps each identifier to a CSV file with a
//! timestamp column and a value column. Series can be resampled onto fixed buckets, joined,
//! and checked with the two threshold rules from the Brick tutorial.

use crate::errors::{BrickGraphError, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Directory of `<identifier>.csv` files.
#[derive(Debug, Clone)]
pub struct TimeseriesStore {
    dir: PathBuf,
}

impl TimeseriesStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", id))
    }

    pub fn contains(&self, id: &str) -> bool {
        is_plain_id(id) && self.path_for(id).is_file()
    }

    pub fn load(&self, id: &str) -> Result<TimeSeries> {
        if !is_plain_id(id) {
            return Err(BrickGraphError::TimeSeries {
                origin: id.to_string(),
                message: "identifier must not contain path components".to_string(),
            });
        }
        TimeSeries::from_csv(&self.path_for(id))
    }
}

fn is_plain_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && id != "." && id != ".."
}

/// A named sequence of (timestamp, value) samples, sorted by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    name: String,
    points: Vec<(DateTime<Utc>, f64)>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>, mut points: Vec<(DateTime<Utc>, f64)>) -> Self {
        points.sort_by_key(|(ts, _)| *ts);
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        debug!("Reading time series: {}", path.display());
        let file = File::open(path).map_err(|e| BrickGraphError::TimeSeries {
            origin: path.display().to_string(),
            message: e.to_string(),
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("series")
            .to_string();
        let series = Self::from_reader(&name, file).map_err(|e| match e {
            BrickGraphError::TimeSeries { message, .. } => BrickGraphError::TimeSeries {
                origin: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        info!("Read {} samples from {}", series.len(), path.display());
        Ok(series)
    }

    /// Reads CSV with a header row. Column 0 is the timestamp, column 1 the value; rows with
    /// an empty or NaN value are skipped.
    pub fn from_reader(name: &str, reader: impl Read) -> Result<Self> {
        let bad_row = |line: u64, message: String| BrickGraphError::TimeSeries {
            origin: name.to_string(),
            message: format!("line {}: {}", line, message),
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut points = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| BrickGraphError::TimeSeries {
                origin: name.to_string(),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let (raw_ts, raw_value) = match (record.get(0), record.get(1)) {
                (Some(ts), Some(value)) => (ts, value),
                _ => return Err(bad_row(line, "expected a timestamp and a value".to_string())),
            };
            let timestamp = parse_timestamp(raw_ts)
                .ok_or_else(|| bad_row(line, format!("unrecognized timestamp '{}'", raw_ts)))?;
            if raw_value.is_empty() {
                debug!("Skipping empty value on line {} of {}", line, name);
                continue;
            }
            let value: f64 = raw_value
                .parse()
                .map_err(|_| bad_row(line, format!("'{}' is not a number", raw_value)))?;
            if value.is_nan() {
                debug!("Skipping NaN on line {} of {}", line, name);
                continue;
            }
            points.push((timestamp, value));
        }
        Ok(Self::new(name, points))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Averages the samples in each `interval`-wide bucket. Buckets are aligned to the UNIX
    /// epoch and labelled by their start; buckets without samples are dropped.
    pub fn resample(&self, interval: Duration) -> Result<TimeSeries> {
        let step = interval.num_seconds();
        if step <= 0 {
            return Err(BrickGraphError::TimeSeries {
                origin: self.name.clone(),
                message: format!("resample interval must be positive, got {}s", step),
            });
        }
        let mut buckets: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
        for (ts, value) in &self.points {
            let bucket = ts.timestamp().div_euclid(step) * step;
            let entry = buckets.entry(bucket).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
        let points = buckets
            .into_iter()
            .filter_map(|(bucket, (sum, count))| {
                DateTime::from_timestamp(bucket, 0).map(|ts| (ts, sum / count as f64))
            })
            .collect();
        Ok(TimeSeries::new(self.name.clone(), points))
    }

    /// Inner join on identical timestamps.
    pub fn join(&self, other: &TimeSeries) -> Vec<PairedSample> {
        let theirs: BTreeMap<DateTime<Utc>, f64> = other.points.iter().copied().collect();
        self.points
            .iter()
            .filter_map(|(ts, first)| {
                theirs.get(ts).map(|second| PairedSample {
                    timestamp: *ts,
                    first: *first,
                    second: *second,
                })
            })
            .collect()
    }
}

/// Values of two series at the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedSample {
    pub timestamp: DateTime<Utc>,
    pub first: f64,
    pub second: f64,
}

/// A run of consecutive flagged buckets, `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultEpisode {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buckets: usize,
}

/// Buckets where both the heating and the cooling command exceed `threshold`.
pub fn simultaneous_heating_cooling(
    heating: &TimeSeries,
    cooling: &TimeSeries,
    interval: Duration,
    threshold: f64,
) -> Result<Vec<PairedSample>> {
    let joined = heating.resample(interval)?.join(&cooling.resample(interval)?);
    Ok(joined
        .into_iter()
        .filter(|s| s.first > threshold && s.second > threshold)
        .collect())
}

/// Buckets where the damper position is more than `tolerance` away from its command.
pub fn stuck_damper(
    position: &TimeSeries,
    command: &TimeSeries,
    interval: Duration,
    tolerance: f64,
) -> Result<Vec<PairedSample>> {
    let joined = position.resample(interval)?.join(&command.resample(interval)?);
    Ok(joined
        .into_iter()
        .filter(|s| (s.first - s.second).abs() > tolerance)
        .collect())
}

/// Groups flagged buckets (sorted, `interval` apart when adjacent) into episodes.
///
/// An episode end past the representable range is clamped to the latest representable time.
pub fn episodes(flagged: &[PairedSample], interval: Duration) -> Vec<FaultEpisode> {
    let mut episodes: Vec<FaultEpisode> = Vec::new();
    for sample in flagged {
        let end = sample
            .timestamp
            .checked_add_signed(interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        match episodes.last_mut() {
            Some(current) if current.end == sample.timestamp => {
                current.end = end;
                current.buckets += 1;
            }
            _ => episodes.push(FaultEpisode {
                start: sample.timestamp,
                end,
                buckets: 1,
            }),
        }
    }
    episodes
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM[:SS[.fff]]` (space or `T`, with or without an offset;
/// no offset means UTC), or integer UNIX seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Parses resampling intervals such as `30s`, `15min`, `15T`, `1h` or `2d`.
pub fn parse_interval(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || BrickGraphError::TimeSeries {
        origin: "interval".to_string(),
        message: format!("cannot parse '{}' (try 30s, 15min, 1h, 1d)", raw),
    };
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = raw.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }
    let seconds_per_unit = match unit.trim() {
        "s" | "S" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "T" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "H" | "hr" | "hour" | "hours" => 3600,
        "d" | "D" | "day" | "days" => 86400,
        _ => return Err(invalid()),
    };
    amount
        .checked_mul(seconds_per_unit)
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = ts("2018-01-01T00:15:00Z");
        assert_eq!(ts("2018-01-01 00:15:00"), expected);
        assert_eq!(ts("2018-01-01T00:15:00"), expected);
        assert_eq!(ts("2018-01-01 00:15"), expected);
        assert_eq!(ts("2018-01-01 00:15:00.000"), expected);
        assert_eq!(ts("2018-01-01 01:15:00+01:00"), expected);
        assert_eq!(ts("1514765700"), expected);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_interval("15min").unwrap(), Duration::minutes(15));
        assert_eq!(parse_interval("15T").unwrap(), Duration::minutes(15));
        assert_eq!(parse_interval("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_interval("2d").unwrap(), Duration::days(2));
        assert!(parse_interval("15").is_err());
        assert!(parse_interval("0min").is_err());
        assert!(parse_interval("min").is_err());
        assert!(parse_interval("5 fortnights").is_err());
        assert!(parse_interval("9999999999999999s").is_err());
        assert!(parse_interval("999999999999999999d").is_err());
    }

    #[test]
    fn test_episodes_clamp_end_near_max_time() {
        let last = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        let flagged = vec![PairedSample {
            timestamp: last,
            first: 1.0,
            second: 1.0,
        }];
        let found = episodes(&flagged, Duration::days(2));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, last);
        assert_eq!(found[0].end, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_from_reader_skips_missing_values() {
        let csv = "time,value\n\
                   2018-01-01 00:05:00,2\n\
                   2018-01-01 00:00:00,1\n\
                   2018-01-01 00:10:00,\n\
                   2018-01-01 00:15:00,NaN\n";
        let series = TimeSeries::from_reader("s", csv.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        // sorted on construction
        assert_eq!(series.points()[0], (ts("2018-01-01 00:00:00"), 1.0));
    }

    #[test]
    fn test_from_reader_errors() {
        let csv = "time,value\nnot-a-time,1\n";
        let err = TimeSeries::from_reader("bad", csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);

        let csv = "time,value\n2018-01-01 00:00:00,warm\n";
        assert!(TimeSeries::from_reader("bad", csv.as_bytes()).is_err());

        let csv = "time,value\n2018-01-01 00:00:00\n";
        assert!(TimeSeries::from_reader("bad", csv.as_bytes()).is_err());
    }

    #[test]
    fn test_resample_means() {
        let series = TimeSeries::new(
            "s",
            vec![
                (ts("2018-01-01 00:01:00"), 1.0),
                (ts("2018-01-01 00:07:00"), 3.0),
                (ts("2018-01-01 00:31:00"), 10.0),
            ],
        );
        let resampled = series.resample(Duration::minutes(15)).unwrap();
        assert_eq!(
            resampled.points(),
            &[
                (ts("2018-01-01 00:00:00"), 2.0),
                (ts("2018-01-01 00:30:00"), 10.0)
            ]
        );
        assert!(series.resample(Duration::zero()).is_err());
    }

    #[test]
    fn test_join_and_rules() {
        let interval = Duration::minutes(15);
        let heating = TimeSeries::new(
            "heating",
            vec![
                (ts("2018-01-01 00:00:00"), 0.0),
                (ts("2018-01-01 00:15:00"), 40.0),
                (ts("2018-01-01 00:30:00"), 40.0),
                (ts("2018-01-01 01:00:00"), 40.0),
            ],
        );
        let cooling = TimeSeries::new(
            "cooling",
            vec![
                (ts("2018-01-01 00:00:00"), 30.0),
                (ts("2018-01-01 00:15:00"), 30.0),
                (ts("2018-01-01 00:30:00"), 30.0),
                (ts("2018-01-01 01:00:00"), 30.0),
            ],
        );
        assert_eq!(heating.join(&cooling).len(), 4);
        let flagged = simultaneous_heating_cooling(&heating, &cooling, interval, 5.0).unwrap();
        assert_eq!(flagged.len(), 3);
        let found = episodes(&flagged, interval);
        assert_eq!(
            found,
            vec![
                FaultEpisode {
                    start: ts("2018-01-01 00:15:00"),
                    end: ts("2018-01-01 00:45:00"),
                    buckets: 2,
                },
                FaultEpisode {
                    start: ts("2018-01-01 01:00:00"),
                    end: ts("2018-01-01 01:15:00"),
                    buckets: 1,
                },
            ]
        );

        let stuck = stuck_damper(&heating, &cooling, interval, 15.0).unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].timestamp, ts("2018-01-01 00:00:00"));
    }

    #[test]
    fn test_store_rejects_paths() {
        let store = TimeseriesStore::new("tests/data/timeseries");
        assert!(store.load("../building").is_err());
        assert!(!store.contains("does-not-exist"));
        assert_eq!(
            store.path_for("abc"),
            PathBuf::from("tests/data/timeseries/abc.csv")
        );
    }
}
