use chrono::{DateTime, Utc};
use chrono_tz::Asia::Ho_Chi_Minh;
use serde::Serialize;

/// Structured context handed to the LLM alongside the literal prefix text,
/// for the two templated summary types (spec.md §4.1 "Context header
/// building"). Field names follow `original_source/app/services/document_generator.py`'s
/// Vietnamese meeting-minutes template placeholders.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MeetingContextHeader {
    pub hh_mm: String,
    pub dd: String,
    pub mm: String,
    pub yyyy: String,
}

impl MeetingContextHeader {
    /// Converts `at` (UTC) to the configured local zone and formats the
    /// fields the templated document needs. Only this path performs a
    /// locale/zone conversion (spec.md §9 "Timezone handling").
    pub fn build(at: DateTime<Utc>) -> Self {
        let local = at.with_timezone(&Ho_Chi_Minh);
        Self {
            hh_mm: local.format("%H:%M").to_string(),
            dd: local.format("%d").to_string(),
            mm: local.format("%m").to_string(),
            yyyy: local.format("%Y").to_string(),
        }
    }

    /// The literal prefix inserted ahead of the source text sent for
    /// summarization (spec.md §4.1).
    pub fn as_prefix(&self) -> String {
        format!(
            "[Thời gian: {} - Ngày {} tháng {} năm {}]\n",
            self.hh_mm, self.dd, self.mm, self.yyyy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn converts_utc_to_ho_chi_minh() {
        // 2026-07-26T03:15:00Z -> 2026-07-26T10:15 +07:00
        let at = Utc.with_ymd_and_hms(2026, 7, 26, 3, 15, 0).unwrap();
        let header = MeetingContextHeader::build(at);
        assert_eq!(header.hh_mm, "10:15");
        assert_eq!(header.dd, "26");
        assert_eq!(header.mm, "07");
        assert_eq!(header.yyyy, "2026");
    }

    #[test]
    fn crosses_midnight_boundary() {
        // 2026-07-26T23:00:00Z -> 2026-07-27T06:00 +07:00
        let at = Utc.with_ymd_and_hms(2026, 7, 26, 23, 0, 0).unwrap();
        let header = MeetingContextHeader::build(at);
        assert_eq!(header.dd, "27");
        assert_eq!(header.hh_mm, "06:00");
    }

    #[test]
    fn prefix_is_nonempty_and_contains_year() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let header = MeetingContextHeader::build(at);
        assert!(header.as_prefix().contains("2026"));
    }
}
