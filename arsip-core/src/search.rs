use once_cell::sync::Lazy;
use time::{OffsetDateTime, UtcOffset};

use crate::record::Record;

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

static LOCAL_OFFSET: Lazy<UtcOffset> = Lazy::new(|| {
    UtcOffset::current_local_offset().unwrap_or_else(|err| {
        log::warn!("local UTC offset unknown, showing dates in UTC: {}", err);
        UtcOffset::UTC
    })
});

/// Offset of the local time zone, determined on first use.  Some platforms
/// only report it while the process is single-threaded.
pub fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET
}

/// Indonesian long date, e.g. `1 Januari 2023`, in the timestamp's own offset.
pub fn long_date(time: OffsetDateTime) -> String {
    let month = MONTHS[usize::from(u8::from(time.month())) - 1];
    format!("{} {} {}", time.day(), month, time.year())
}

/// Long date of the record as seen in the local time zone.
pub fn record_long_date(record: &Record) -> Option<String> {
    long_date_at(record, local_offset())
}

fn long_date_at(record: &Record, offset: UtcOffset) -> Option<String> {
    record
        .created_at_time()
        .map(|time| long_date(time.to_offset(offset)))
}

/// Case-insensitive substring match against title, caption and long date.
pub fn matches(record: &Record, term: &str) -> bool {
    matches_at(record, &term.to_lowercase(), local_offset())
}

fn matches_at(record: &Record, needle: &str, offset: UtcOffset) -> bool {
    needle.is_empty()
        || record.title.to_lowercase().contains(needle)
        || record.caption.to_lowercase().contains(needle)
        || long_date_at(record, offset).is_some_and(|date| date.to_lowercase().contains(needle))
}

/// Records matching `term`, in their current order.
pub fn filter<'a>(records: &'a [Record], term: &str) -> Vec<&'a Record> {
    filter_at(records, term, local_offset())
}

fn filter_at<'a>(records: &'a [Record], term: &str, offset: UtcOffset) -> Vec<&'a Record> {
    let needle = term.to_lowercase();
    records
        .iter()
        .filter(|record| matches_at(record, &needle, offset))
        .collect()
}
