//! Request timestamp freshness.
//!
//! Only a signed `x-amz-date` is checked. Requests that sign over the plain
//! `date` header are not skew-checked; that gap is intentional.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use crate::error::AuthError;

/// Format of `x-amz-date` (ISO 8601 basic, always UTC).
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Default maximum age of a request timestamp.
pub const DEFAULT_MAX_SKEW: TimeDelta = TimeDelta::minutes(15);

/// Parse an `x-amz-date` value such as `20130524T000000Z`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTimestamp`] if the value is malformed.
pub fn parse_amz_date(value: &str) -> Result<DateTime<Utc>, AuthError> {
    NaiveDateTime::parse_from_str(value, AMZ_DATE_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|_| AuthError::InvalidTimestamp(value.to_owned()))
}

/// Check that `amz_date` is not older than `max_skew` relative to `now`.
///
/// The bound is inclusive. Timestamps ahead of `now` are accepted.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTimestamp`] for a malformed value and
/// [`AuthError::ClockSkew`] if the timestamp is too old.
///
/// # Examples
///
/// ```
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use s3gate_auth::skew::check_request_time;
///
/// let now = Utc.with_ymd_and_hms(2013, 5, 24, 0, 15, 0).unwrap();
/// assert!(check_request_time("20130524T000000Z", now, TimeDelta::minutes(15)).is_ok());
/// assert!(check_request_time("20130523T235959Z", now, TimeDelta::minutes(15)).is_err());
/// ```
pub fn check_request_time(
    amz_date: &str,
    now: DateTime<Utc>,
    max_skew: TimeDelta,
) -> Result<(), AuthError> {
    let request_time = parse_amz_date(amz_date)?;
    let skew = now - request_time;
    if skew > max_skew {
        return Err(AuthError::ClockSkew {
            skew,
            max: max_skew,
        });
    }
    Ok(())
}
