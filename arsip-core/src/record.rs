use std::{
    fmt,
    ops::Range,
    sync::atomic::{AtomicI64, Ordering},
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    Time,
};

use crate::error::Error;

/// Cosmetic tilt of a card, in degrees.
pub const ROTATION_RANGE: Range<f64> = -3.0..3.0;

static LAST_ISSUED_ID: AtomicI64 = AtomicI64::new(0);

/// Client-assigned record identity.  Derived from the creation timestamp in
/// milliseconds, and never changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Issue a fresh id for `now`.  Ids issued by this process are strictly
    /// increasing, so two records created within the same millisecond still
    /// get distinct ids.
    pub fn generate(now: OffsetDateTime) -> Self {
        let millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;
        let mut last = LAST_ISSUED_ID.load(Ordering::Relaxed);
        loop {
            let next = millis.max(last + 1);
            match LAST_ISSUED_ID.compare_exchange_weak(
                last,
                next,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => break Self(next.to_string()),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hanging animation class of a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwayVariant {
    #[serde(rename = "sway-slow")]
    Slow,
    #[serde(rename = "sway-medium")]
    Medium,
    #[serde(rename = "sway-fast")]
    Fast,
}

impl SwayVariant {
    pub const ALL: [SwayVariant; 3] = [Self::Slow, Self::Medium, Self::Fast];

    pub fn as_class(self) -> &'static str {
        match self {
            Self::Slow => "sway-slow",
            Self::Medium => "sway-medium",
            Self::Fast => "sway-fast",
        }
    }

    pub fn from_class(class: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_class() == class.trim())
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// A single memory on the board.  The serialized shape is the one kept in the
/// local snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// URL or encoded image payload, opaque to the sync layer.
    #[serde(rename = "imageUrl")]
    pub image_ref: String,
    pub title: String,
    #[serde(rename = "description")]
    pub caption: String,
    /// ISO-8601 creation timestamp.
    #[serde(rename = "date")]
    pub created_at: String,
    #[serde(default)]
    pub rotation: f64,
    #[serde(rename = "swayClass", default, skip_serializing_if = "Option::is_none")]
    pub sway_variant: Option<SwayVariant>,
}

impl Record {
    /// Build a record out of user input.  Identity and the cosmetic fields are
    /// assigned here, exactly once.
    pub fn from_draft(draft: Draft, now: OffsetDateTime, rng: &mut impl Rng) -> Self {
        Self {
            id: RecordId::generate(now),
            image_ref: draft.image_base64,
            title: draft.title,
            caption: draft.caption,
            created_at: format_timestamp(now),
            rotation: rng.random_range(ROTATION_RANGE),
            sway_variant: Some(SwayVariant::random(rng)),
        }
    }

    pub fn created_at_time(&self) -> Option<OffsetDateTime> {
        parse_timestamp(&self.created_at)
    }
}

/// User input for a new record, before the client assigns identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    /// Base64 image content without a `data:` URL header.
    pub image_base64: String,
    pub title: String,
    pub caption: String,
}

impl Draft {
    pub fn validate(&self) -> Result<(), Error> {
        if self.image_base64.trim().is_empty() {
            return Err(Error::InvalidInput("image is required"));
        }
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("title is required"));
        }
        Ok(())
    }
}

/// Order records newest-first.  Records with an unreadable date go last,
/// otherwise the existing order is kept.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by_cached_key(|record| std::cmp::Reverse(record.created_at_time()));
}

/// Format in the same shape as JavaScript's `Date.toISOString()`.
pub fn format_timestamp(time: OffsetDateTime) -> String {
    let utc = time.to_offset(time::UtcOffset::UTC);
    utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
    .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Accepts full RFC 3339 timestamps and bare `YYYY-MM-DD` dates (taken as UTC
/// midnight).
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(time) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(time);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
}
