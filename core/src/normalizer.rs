//! Raw submission cleanup.
//!
//! Upstream sources (web forms, spreadsheets, chat exports) disagree on
//! field names, casing and accents. Each logical field has an ordered list
//! of alias keys; the first alias with a non-blank value wins. Nothing in
//! here fails: malformed values fall back to "absent" or to a sentinel.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::NormalizerConfig;

/// One raw field value as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Timestamp(DateTime<Utc>),
    Null,
}

impl RawValue {
    fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Timestamp(t) => Some(t.to_rfc3339()),
            RawValue::Null => None,
        }
    }

    fn is_blank(&self) -> bool {
        self.as_text().is_none()
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n.into())
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(t: DateTime<Utc>) -> Self {
        RawValue::Timestamp(t)
    }
}

/// A submission with no fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSubmission {
    fields: BTreeMap<String, RawValue>,
}

impl RawSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First non-blank value whose key matches one of `aliases`,
    /// trying aliases in order.
    fn lookup(&self, aliases: &[String]) -> Option<&RawValue> {
        aliases.iter().find_map(|alias| {
            let wanted = fold_key(alias);
            self.fields
                .iter()
                .find(|(key, value)| fold_key(key) == wanted && !value.is_blank())
                .map(|(_, value)| value)
        })
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawSubmission {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut raw = RawSubmission::new();
        for (k, v) in iter {
            raw.insert(k, v);
        }
        raw
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedComplaint {
    pub customer_name: Option<String>,
    /// Exactly 10 digits when present.
    pub phone: Option<String>,
    /// Never empty.
    pub text: String,
    pub branch_hint: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct Normalizer<'a> {
    config: &'a NormalizerConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a NormalizerConfig) -> Self {
        Self { config }
    }

    /// `now` is substituted when the timestamp is missing or unparseable.
    pub fn normalize(&self, raw: &RawSubmission, now: DateTime<Utc>) -> NormalizedComplaint {
        let max = self.config.max_field_chars;

        let customer_name = raw
            .lookup(&self.config.name_keys)
            .and_then(RawValue::as_text)
            .map(|s| truncate_chars(&s, max));

        let phone = raw
            .lookup(&self.config.phone_keys)
            .and_then(RawValue::as_text)
            .and_then(|s| self.normalize_phone(&s));

        let text = raw
            .lookup(&self.config.text_keys)
            .and_then(RawValue::as_text)
            .map(|s| truncate_chars(&s, max))
            .unwrap_or_else(|| self.config.text_sentinel.clone());

        let branch_hint = raw
            .lookup(&self.config.branch_keys)
            .and_then(RawValue::as_text);

        let created_at = raw
            .lookup(&self.config.timestamp_keys)
            .and_then(parse_raw_timestamp)
            .unwrap_or(now);

        NormalizedComplaint {
            customer_name,
            phone,
            text,
            branch_hint,
            created_at,
        }
    }

    /// Reduce a phone-ish string to a bare 10-digit national number.
    pub fn normalize_phone(&self, value: &str) -> Option<String> {
        let lowered = value.to_lowercase();
        if self
            .config
            .url_markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
        {
            return None;
        }

        let digits = NON_DIGIT.replace_all(value, "");
        let national = match digits.len() {
            10 => digits.into_owned(),
            12 => {
                let code = self
                    .config
                    .country_codes
                    .iter()
                    .find(|code| code.len() == 2 && digits.starts_with(code.as_str()))?;
                digits[code.len()..].to_string()
            }
            _ => return None,
        };

        if self.config.placeholder_phones.iter().any(|p| *p == national) {
            return None;
        }
        Some(national)
    }
}

/// Canonical form for alias comparison: trimmed, lowercased, accents
/// removed, `_` and runs of whitespace collapsed to one space.
pub fn fold_key(key: &str) -> String {
    let unaccented: String = key
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            '_' | '-' => ' ',
            other => other,
        })
        .collect();
    WHITESPACE.replace_all(unaccented.trim(), " ").into_owned()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn parse_raw_timestamp(value: &RawValue) -> Option<DateTime<Utc>> {
    let parsed = match value {
        RawValue::Timestamp(t) => Some(*t),
        RawValue::Text(s) => parse_timestamp(s.trim()),
        RawValue::Number(n) => n.as_i64().and_then(from_epoch),
        RawValue::Null => None,
    };
    // Stored timestamps are RFC 3339, which only has four-digit years.
    parsed.filter(|t| (0..=9999).contains(&t.year()))
}

/// Epoch values at or above 10^12 are milliseconds (spreadsheet and JS
/// exports); smaller ones are seconds.
fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

const EPOCH_MILLIS_THRESHOLD: u64 = 1_000_000_000_000;

static NON_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]+").expect("NON_DIGIT regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE regex"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse the timestamp shapes seen from upstream sources. Naive values
/// are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
        }
    }
    None
}
