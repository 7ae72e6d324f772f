use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Department;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A request for recognition points awaiting (or past) validation.
///
/// The Pending -> Approved/Rejected transition is terminal; a processed
/// request is never touched again.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PointsRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub category_id: ObjectId,
    #[serde(default)]
    pub points: i64,
    pub status: RequestStatus,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub request_date: DateTime<Utc>,
    /// When the recognized work actually happened. Preferred over
    /// `request_date` for period attribution.
    #[serde(default, with = "crate::dates::option")]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submission_notes: String,
    /// Billability fraction (0-1) for utilization submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_value: Option<f64>,
    #[serde(default)]
    pub created_by: Option<ObjectId>,
    #[serde(default)]
    pub assigned_validator_id: Option<ObjectId>,
    #[serde(default)]
    pub processed_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_department: Option<String>,
    #[serde(default, with = "crate::dates::option")]
    pub response_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_notes: Option<String>,
    #[serde(default)]
    pub is_bonus: bool,
    /// Quarter label (`Q1-2025`) set on milestone-bonus requests so the
    /// once-per-quarter rule is an exact lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_quarter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<ObjectId>,
}

impl PointsRequest {
    /// Attribution date: the event date when recorded, the submission
    /// date otherwise.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.event_date.unwrap_or(self.request_date)
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment_id.is_some()
    }

    pub fn processed_department_tag(&self) -> Option<Department> {
        self.processed_department
            .as_deref()
            .and_then(|d| d.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn request() -> PointsRequest {
        PointsRequest {
            id: ObjectId::new(),
            user_id: ObjectId::new(),
            category_id: ObjectId::new(),
            points: 100,
            status: RequestStatus::Pending,
            request_date: Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap(),
            event_date: None,
            submission_notes: String::new(),
            utilization_value: None,
            created_by: None,
            assigned_validator_id: None,
            processed_by: None,
            processed_department: None,
            response_date: None,
            response_notes: None,
            is_bonus: false,
            bonus_quarter: None,
            attachment_id: None,
        }
    }

    #[test]
    fn event_date_wins_over_request_date() {
        let mut req = request();
        assert_eq!(req.effective_date(), req.request_date);

        let event = Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap();
        req.event_date = Some(event);
        assert_eq!(req.effective_date(), event);
    }
}
