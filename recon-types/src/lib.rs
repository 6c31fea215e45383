use derive_more::{Display, Error};
use lazy_regex::regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration};

pub mod ads;
pub mod channel;
pub mod day;
pub mod week;

pub use ads::AdsMetrics;
pub use channel::{AmazonChannel, ShopifyChannel, SkuLineItem};
pub use day::DailyRecord;
pub use week::{Totals, WeekMeta, WeeklyRecord};

static DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Safe numeric read of an externally sourced value.
///
/// `null`, missing, unparsable and non-finite inputs all become `0`, so
/// aggregation never sees `NaN`.
pub fn num(v: &Value) -> f64 {
    let n = match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    };
    finite_or_zero(n)
}

pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

pub fn de_num<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.as_ref().map(num).unwrap_or(0.0))
}

pub fn de_opt_num<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        None | Some(Value::Null) => None,
        Some(v) => Some(num(&v)),
    })
}

pub fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

pub fn de_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn de_lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(v.unwrap_or_default()
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(item) => Some(item),
            Err(err) => {
                log::debug!(
                    "Skipping malformed {} entry: {err}",
                    std::any::type_name::<T>()
                );
                None
            }
        })
        .collect())
}

pub fn normalize_sku(sku: &str) -> String {
    let trimmed = sku.trim();
    regex!(r"(?i)shop$")
        .replace(trimmed, "")
        .trim()
        .to_uppercase()
}

#[derive(Debug, Display, Error)]
pub enum DateKeyError {
    #[error(ignore)]
    #[display("Invalid date key {_0:?}, expected YYYY-MM-DD")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(Date);

impl DayKey {
    pub fn new(date: Date) -> Self {
        Self(date)
    }

    pub fn date(&self) -> Date {
        self.0
    }

    pub fn week_ending_sunday(self) -> Self {
        let offset = 6 - self.0.weekday().number_days_from_monday() as i64;
        self.add_days(offset).unwrap_or(self)
    }

    pub fn add_days(self, days: i64) -> Option<Self> {
        self.0.checked_add(Duration::days(days)).map(Self)
    }

    pub fn days_since(self, earlier: DayKey) -> i64 {
        (self.0 - earlier.0).whole_days()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(DATE_FORMAT) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl FromStr for DayKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DateKeyError::Invalid(s.to_string());
        let trimmed = s.trim();
        let bytes = trimmed.as_bytes();
        // timestamps such as `2024-06-03T00:00:00Z` keep only their date part
        let date_part = match bytes.get(10) {
            None => trimmed,
            Some(b'T' | b' ') if bytes.get(11).is_some_and(u8::is_ascii_digit) => {
                trimmed.get(..10).ok_or_else(invalid)?
            }
            Some(_) => return Err(invalid()),
        };
        Date::parse(date_part, DATE_FORMAT)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub fn week_ending_sunday(date_key: &str) -> Result<String, DateKeyError> {
    let day: DayKey = date_key.parse()?;
    Ok(day.week_ending_sunday().to_string())
}
