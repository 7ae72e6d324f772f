use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::access::DashboardAccess;

/// Employee grade band; drives quarterly point targets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Grade {
    A1,
    B1,
    B2,
    C1,
    C2,
    D1,
    D2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Role {
    Employee,
    Manager,
    Central,
    #[serde(rename = "HR")]
    Hr,
    #[serde(rename = "PMO")]
    Pmo,
    #[serde(rename = "TA")]
    Ta,
    Marketing,
    Presales,
    #[serde(rename = "DP")]
    Dp,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub department: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub manager_id: Option<ObjectId>,
    #[serde(default)]
    pub dp_id: Option<ObjectId>,
    #[serde(default)]
    pub dashboard_access: DashboardAccess,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime",
        default = "Utc::now"
    )]
    pub created_at: DateTime<Utc>,
}

fn default_is_active() -> bool {
    true
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> User {
        User {
            id: ObjectId::new(),
            name,
            email,
            password_hash: Some(password_hash),
            grade: None,
            department: None,
            role,
            manager_id: None,
            dp_id: None,
            dashboard_access: DashboardAccess::default(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Employees and managers-with-a-manager participate in rewards;
    /// top-level managers are tracked but cannot receive milestone bonuses.
    pub fn can_receive_bonus(&self) -> bool {
        match self.role {
            Role::Employee => true,
            Role::Manager => self.manager_id.is_some(),
            _ => false,
        }
    }

    pub fn is_rewards_participant(&self) -> bool {
        matches!(self.role, Role::Employee | Role::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, manager_id: Option<ObjectId>) -> User {
        let mut u = User::new(
            "A".into(),
            "a@example.com".into(),
            "hash".into(),
            role,
        );
        u.manager_id = manager_id;
        u
    }

    #[test]
    fn employees_can_receive_bonus() {
        assert!(user(Role::Employee, None).can_receive_bonus());
    }

    #[test]
    fn top_level_managers_cannot_receive_bonus() {
        assert!(!user(Role::Manager, None).can_receive_bonus());
        assert!(user(Role::Manager, Some(ObjectId::new())).can_receive_bonus());
    }

    #[test]
    fn grade_parses_from_str() {
        assert_eq!("C1".parse::<Grade>().unwrap(), Grade::C1);
        assert!("Z9".parse::<Grade>().is_err());
    }
}
