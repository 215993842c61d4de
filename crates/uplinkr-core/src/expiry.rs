//! Expiry policy: maps an expiry token and an upload instant to an absolute
//! expiry instant.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Relative time-to-live selected at upload time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryOption {
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "1month")]
    OneMonth,
    #[serde(rename = "never")]
    Never,
}

impl ExpiryOption {
    pub const ALL: [ExpiryOption; 4] = [
        ExpiryOption::OneDay,
        ExpiryOption::SevenDays,
        ExpiryOption::OneMonth,
        ExpiryOption::Never,
    ];

    /// Parse an optional token; a missing or empty token means `never`.
    pub fn parse_optional(token: Option<&str>) -> Result<Self, AppError> {
        match token {
            None => Ok(ExpiryOption::Never),
            Some(t) if t.is_empty() => Ok(ExpiryOption::Never),
            Some(t) => t.parse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryOption::OneDay => "1day",
            ExpiryOption::SevenDays => "7days",
            ExpiryOption::OneMonth => "1month",
            ExpiryOption::Never => "never",
        }
    }

    /// Nominal time-to-live. A month is 30 days.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            ExpiryOption::OneDay => Some(Duration::hours(24)),
            ExpiryOption::SevenDays => Some(Duration::hours(7 * 24)),
            ExpiryOption::OneMonth => Some(Duration::hours(30 * 24)),
            ExpiryOption::Never => None,
        }
    }

    pub fn expires_at(&self, uploaded_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.ttl().map(|ttl| uploaded_at + ttl)
    }
}

impl FromStr for ExpiryOption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1day" => Ok(ExpiryOption::OneDay),
            "7days" => Ok(ExpiryOption::SevenDays),
            "1month" => Ok(ExpiryOption::OneMonth),
            "never" => Ok(ExpiryOption::Never),
            other => Err(AppError::Validation(format!(
                "Invalid expiry option '{}'. Allowed: 1day, 7days, 1month, never",
                other
            ))),
        }
    }
}

impl Display for ExpiryOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn upload_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 28, 12, 30, 0).unwrap()
    }

    #[test]
    fn nominal_durations_are_exact() {
        let t = upload_instant();
        assert_eq!(
            ExpiryOption::OneDay.expires_at(t),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap())
        );
        assert_eq!(
            ExpiryOption::SevenDays.expires_at(t),
            Some(t + Duration::seconds(7 * 24 * 3600))
        );
        assert_eq!(
            ExpiryOption::OneMonth.expires_at(t),
            Some(Utc.with_ymd_and_hms(2024, 3, 29, 12, 30, 0).unwrap())
        );
        assert_eq!(ExpiryOption::Never.expires_at(t), None);
    }

    #[test]
    fn expiry_is_strictly_after_upload() {
        let t = upload_instant();
        for option in ExpiryOption::ALL {
            if let Some(expiry) = option.expires_at(t) {
                assert!(expiry > t, "{} must expire after upload", option);
            }
        }
    }

    #[test]
    fn missing_or_empty_token_means_never() {
        assert_eq!(ExpiryOption::parse_optional(None).unwrap(), ExpiryOption::Never);
        assert_eq!(
            ExpiryOption::parse_optional(Some("")).unwrap(),
            ExpiryOption::Never
        );
    }

    #[test]
    fn unknown_tokens_are_validation_errors() {
        for token in ["2days", "1DAY", " never", "forever"] {
            let err = ExpiryOption::parse_optional(Some(token)).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{}", token);
        }
    }

    #[test]
    fn tokens_round_trip_through_display() {
        for option in ExpiryOption::ALL {
            assert_eq!(option.to_string().parse::<ExpiryOption>().unwrap(), option);
        }
    }
}
