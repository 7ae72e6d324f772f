use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

/// What the message is about; rendering to subject/body happens in the
/// notify crate.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    RequestApproved {
        employee_name: String,
        category_name: String,
        points: i64,
        event_date: String,
    },
    RequestRejected {
        employee_name: String,
        category_name: String,
        points: i64,
        reason: String,
    },
    BonusAwarded {
        employee_name: String,
        bonus_points: i64,
        quarter: String,
        milestones: String,
        notes: String,
    },
    BonusEligible {
        employee_name: String,
        quarter: String,
        potential_bonus: i64,
    },
}

/// Outbox entry. Written in the same transaction as the data change it
/// announces; a background drain sends it and records the outcome, so a
/// mail outage is visible but can never fail an approval.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub recipient: Recipient,
    pub notice: Notice,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "crate::dates::option")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Notification {
    pub fn new(recipient: Recipient, notice: Notice) -> Notification {
        Notification {
            id: ObjectId::new(),
            recipient,
            notice,
            created_at: Utc::now(),
            sent_at: None,
            attempts: 0,
            last_error: None,
        }
    }
}
