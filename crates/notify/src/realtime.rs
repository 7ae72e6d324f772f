use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands as _;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Typed realtime events fanned out over Redis pub/sub for the WebSocket
/// layer. Channel scheme: `user:{role}:{id}` targets one user's dashboard,
/// `role:{role}:updates` a validator pool, `all:leaderboard_update` everyone.
#[derive(Debug, Clone)]
pub enum Event {
    NewRequest {
        data: Value,
        validator_id: Option<String>,
        validator_role: String,
        /// Skip the role-wide fan-out and ping only the assigned validator.
        only_assigned: bool,
    },
    RequestStatusChanged {
        data: Value,
        user_id: String,
        role: String,
    },
    PointsAwarded {
        data: Value,
        user_id: String,
        role: String,
    },
    BonusAwarded {
        data: Value,
        user_id: String,
        role: String,
    },
    LeaderboardUpdate {
        data: Value,
    },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::NewRequest { .. } => "new_request",
            Event::RequestStatusChanged { .. } => "request_status_changed",
            Event::PointsAwarded { .. } => "points_awarded",
            Event::BonusAwarded { .. } => "bonus_points_awarded",
            Event::LeaderboardUpdate { .. } => "leaderboard_update",
        }
    }

    fn data(&self) -> &Value {
        match self {
            Event::NewRequest { data, .. }
            | Event::RequestStatusChanged { data, .. }
            | Event::PointsAwarded { data, .. }
            | Event::BonusAwarded { data, .. }
            | Event::LeaderboardUpdate { data } => data,
        }
    }

    fn channels(&self) -> Vec<String> {
        match self {
            Event::NewRequest {
                validator_id,
                validator_role,
                only_assigned,
                ..
            } => {
                let mut channels = Vec::new();
                if let Some(id) = validator_id {
                    channels.push(format!("user:{validator_role}:{id}"));
                }
                if !only_assigned {
                    channels.push(format!("role:{validator_role}:updates"));
                }
                channels
            }
            Event::RequestStatusChanged { user_id, role, .. } => {
                vec![format!("user:{role}:{user_id}")]
            }
            Event::PointsAwarded { user_id, role, .. }
            | Event::BonusAwarded { user_id, role, .. } => vec![
                format!("user:{role}:{user_id}"),
                "all:leaderboard_update".to_string(),
            ],
            Event::LeaderboardUpdate { .. } => vec!["all:leaderboard_update".to_string()],
        }
    }

    fn target_user(&self) -> Option<&str> {
        match self {
            Event::NewRequest { validator_id, .. } => validator_id.as_deref(),
            Event::RequestStatusChanged { user_id, .. }
            | Event::PointsAwarded { user_id, .. }
            | Event::BonusAwarded { user_id, .. } => Some(user_id),
            Event::LeaderboardUpdate { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct Realtime {
    connection: ConnectionManager,
}

impl Realtime {
    pub async fn connect(url: &str) -> Result<Self, RealtimeError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Realtime { connection })
    }

    pub async fn publish(&self, event: &Event) -> Result<(), RealtimeError> {
        let envelope = json!({
            "event_type": event.event_type(),
            "data": event.data(),
            "timestamp": Utc::now().to_rfc3339(),
            "target_user_id": event.target_user(),
        });
        let payload = envelope.to_string();

        let mut connection = self.connection.clone();
        for channel in event.channels() {
            connection.publish::<_, _, ()>(channel, payload.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_awarded_also_updates_the_leaderboard() {
        let event = Event::PointsAwarded {
            data: json!({}),
            user_id: "abc".into(),
            role: "employee".into(),
        };
        assert_eq!(
            event.channels(),
            vec!["user:employee:abc".to_string(), "all:leaderboard_update".to_string()]
        );
    }

    #[test]
    fn assigned_only_requests_skip_the_role_channel() {
        let event = Event::NewRequest {
            data: json!({}),
            validator_id: Some("v1".into()),
            validator_role: "hr_va".into(),
            only_assigned: true,
        };
        assert_eq!(event.channels(), vec!["user:hr_va:v1".to_string()]);
    }
}
