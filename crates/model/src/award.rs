use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::PointsRequest;

/// One entry of the append-only awarded-points ledger.
///
/// Every granted point lands here exactly once: approvals insert in the
/// same transaction that flips the request status, direct awards insert
/// with no `request_id`. `effective_date` is resolved at write time so
/// readers never re-derive attribution dates.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Award {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub category_id: ObjectId,
    pub points: i64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub effective_date: DateTime<Utc>,
    pub awarded_by: ObjectId,
    #[serde(default)]
    pub request_id: Option<ObjectId>,
    #[serde(default)]
    pub is_bonus: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_quarter: Option<String>,
    /// Billability fraction carried over from utilization submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_value: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Award {
    pub fn from_request(request: &PointsRequest, awarded_by: ObjectId, notes: String) -> Award {
        Award {
            id: ObjectId::new(),
            user_id: request.user_id,
            category_id: request.category_id,
            points: request.points,
            effective_date: request.effective_date(),
            awarded_by,
            request_id: Some(request.id),
            is_bonus: request.is_bonus,
            bonus_quarter: request.bonus_quarter.clone(),
            utilization_value: request.utilization_value,
            notes,
            created_at: Utc::now(),
        }
    }

    /// An award that bypassed the request workflow.
    pub fn direct(
        user_id: ObjectId,
        category_id: ObjectId,
        points: i64,
        effective_date: DateTime<Utc>,
        awarded_by: ObjectId,
        notes: String,
    ) -> Award {
        Award {
            id: ObjectId::new(),
            user_id,
            category_id,
            points,
            effective_date,
            awarded_by,
            request_id: None,
            is_bonus: false,
            bonus_quarter: None,
            utilization_value: None,
            notes,
            created_at: Utc::now(),
        }
    }
}
