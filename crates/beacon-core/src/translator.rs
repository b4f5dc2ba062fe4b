//! EventTranslator - raw join observation to [`NotificationRecord`]

use chrono::{DateTime, Local, SubsecRound, TimeZone, Utc};

use crate::types::{MemberJoined, NotificationRecord};

/// Long calendar form, e.g. `October 19, 2026`
pub const DATE_FORMAT: &str = "%B %-d, %Y";

/// Twelve-hour clock with seconds, e.g. `03:04:05 PM`
pub const TIME_FORMAT: &str = "%I:%M:%S %p";

/// Stamps join observations with the time and the observing agent's label
#[derive(Debug, Clone)]
pub struct EventTranslator {
    source: String,
}

impl EventTranslator {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Translate using the current local wall-clock time
    pub fn translate(&self, event: &MemberJoined) -> NotificationRecord {
        self.translate_at(event, Local::now())
    }

    /// Translate as if observed at `at`; date and time are rendered in `at`'s zone
    pub fn translate_at<Tz>(&self, event: &MemberJoined, at: DateTime<Tz>) -> NotificationRecord
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        NotificationRecord {
            subject_name: event.username.clone(),
            subject_id: event.user_id.clone(),
            community_name: event.community.name.clone(),
            community_id: event.community.id.clone(),
            date: at.format(DATE_FORMAT).to_string(),
            time: at.format(TIME_FORMAT).to_string(),
            timestamp: at.with_timezone(&Utc).trunc_subsecs(3),
            source: self.source.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Community;
    use crate::CommunityId;

    fn joined() -> MemberJoined {
        MemberJoined {
            user_id: "42".to_string(),
            username: "ferris".to_string(),
            community: Community::new("900", "Rustaceans"),
        }
    }

    #[test]
    fn test_translate_fields() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 15, 4, 5).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let record = EventTranslator::new("Monitor").translate_at(&joined(), at);

        assert_eq!(record.subject_name, "ferris");
        assert_eq!(record.subject_id, "42");
        assert_eq!(record.community_name, "Rustaceans");
        assert_eq!(record.community_id, CommunityId::from("900"));
        assert_eq!(record.date, "October 19, 2026");
        assert_eq!(record.time, "03:04:05 PM");
        assert_eq!(record.source, "Monitor");
    }

    #[test]
    fn test_single_digit_day_and_morning_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 1).unwrap();
        let record = EventTranslator::new("Sender").translate_at(&joined(), at);

        assert_eq!(record.date, "March 7, 2026");
        assert_eq!(record.time, "09:00:01 AM");
    }

    #[test]
    fn test_wire_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 15, 4, 5).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let record = EventTranslator::new("Monitor").translate_at(&joined(), at);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["username"], "ferris");
        assert_eq!(json["userId"], "42");
        assert_eq!(json["guildName"], "Rustaceans");
        assert_eq!(json["guildId"], "900");
        assert_eq!(json["timestamp"], "2026-10-19T15:04:05.123Z");
        assert_eq!(json["source"], "Monitor");
    }
}
