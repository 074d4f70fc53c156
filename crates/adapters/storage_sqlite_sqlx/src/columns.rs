//! Column codecs shared by the repositories.
//!
//! Identifiers are stored as UUID blobs, timestamps as fixed-width RFC 3339
//! text (see [`to_sortable_string`]) and enums as their snake-case names.

use std::str::FromStr;

use repairdesk_domain::time::{Timestamp, to_sortable_string};

pub(crate) fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

pub(crate) fn timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.to_utc())
        .map_err(decode_error)
}

pub(crate) fn optional_timestamp(value: Option<String>) -> Result<Option<Timestamp>, sqlx::Error> {
    value.as_deref().map(timestamp).transpose()
}

pub(crate) fn stored(ts: Timestamp) -> String {
    to_sortable_string(ts)
}

pub(crate) fn stored_optional(ts: Option<Timestamp>) -> Option<String> {
    ts.map(to_sortable_string)
}

/// Parse an enum stored by its `as_str` name.
pub(crate) fn variant<T>(value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).map_err(decode_error)
}

pub(crate) fn unsigned(value: i64, column: &'static str) -> Result<u32, sqlx::Error> {
    u32::try_from(value).map_err(|_| decode_error(crate::error::StorageError::OutOfRange(column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repairdesk_domain::service::ServiceStatus;
    use repairdesk_domain::time::now;

    #[test]
    fn should_read_back_stored_timestamp() {
        let ts = now();
        let parsed = timestamp(&stored(ts)).unwrap();
        assert_eq!(parsed.timestamp_micros(), ts.timestamp_micros());
    }

    #[test]
    fn should_reject_unknown_variant() {
        assert!(variant::<ServiceStatus>("on_fire").is_err());
        assert_eq!(
            variant::<ServiceStatus>("waiting_parts").unwrap(),
            ServiceStatus::WaitingParts
        );
    }

    #[test]
    fn should_reject_negative_quantity() {
        assert!(unsigned(-1, "quantity").is_err());
        assert_eq!(unsigned(7, "quantity").unwrap(), 7);
    }
}
