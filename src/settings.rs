//! Settings supplied by the configuration collaborator.

use time::{Date, Duration, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::history::DEFAULT_PREVIEW_SIZE;

/// The settings the cash page needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// How many days from today the date input starts on, e.g. `-1` for
    /// yesterday. `None` leaves the date input empty.
    pub default_date_offset: Option<i64>,
    /// How many records the history previews.
    pub preview_size: usize,
    /// The canonical name of the local timezone, e.g. "Europe/Moscow". UTC is
    /// used when this is `None` or not a known timezone.
    pub local_timezone: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_date_offset: None,
            preview_size: DEFAULT_PREVIEW_SIZE,
            local_timezone: None,
        }
    }
}

impl Settings {
    /// Today's date in the configured timezone.
    pub fn today(&self) -> Date {
        local_today(self.local_timezone.as_deref())
    }

    /// The date the input form starts on, if an offset is configured.
    pub fn default_input_date(&self) -> Option<Date> {
        default_input_date(self.default_date_offset, self.today())
    }
}

/// Read the configured date offset in days.
///
/// Returns `None` if the setting is absent or is not an integer.
pub fn parse_date_offset(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;

    match raw.trim().parse() {
        Ok(offset) => Some(offset),
        Err(error) => {
            tracing::warn!("ignoring default date offset {raw:?}: {error}");
            None
        }
    }
}

/// `today` moved by `offset` days, `None` if there is no offset or the result
/// is out of range.
pub fn default_input_date(offset: Option<i64>, today: Date) -> Option<Date> {
    today.checked_add(Duration::days(offset?))
}

/// Get the current UTC offset of the timezone `canonical_timezone`.
fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`, or in UTC if it is `None` or unknown.
pub fn local_today(canonical_timezone: Option<&str>) -> Date {
    let offset = match canonical_timezone {
        Some(timezone) => get_local_offset(timezone).unwrap_or_else(|| {
            tracing::warn!("unknown timezone {timezone:?}, using UTC");
            UtcOffset::UTC
        }),
        None => UtcOffset::UTC,
    };

    OffsetDateTime::now_utc().to_offset(offset).date()
}
