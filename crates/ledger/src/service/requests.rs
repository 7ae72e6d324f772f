use std::collections::HashMap;
use std::ops::Deref;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use model::category::Department;
use model::errors::RewardsError;
use model::request::{PointsRequest, RequestStatus};
use model::session::Session;
use serde::Serialize;
use storage::categories::CategoryStore;
use storage::requests::RequestStore;
use storage::users::UserStore;

#[derive(Clone)]
pub struct Requests {
    store: RequestStore,
    users: UserStore,
    categories: CategoryStore,
}

/// A pending request decorated for a validator queue.
#[derive(Debug, Serialize)]
pub struct PendingRequestView {
    pub id: String,
    pub employee_name: String,
    pub employee_email: String,
    pub updater_name: String,
    pub category_name: String,
    pub points: i64,
    pub utilization_value: Option<f64>,
    pub notes: String,
    pub request_date: DateTime<Utc>,
    pub event_date: Option<DateTime<Utc>>,
    pub has_attachment: bool,
}

impl Requests {
    pub(crate) fn new(store: RequestStore, users: UserStore, categories: CategoryStore) -> Self {
        Requests {
            store,
            users,
            categories,
        }
    }

    /// Pending queue across every department the caller validates for.
    /// Requests follow the category's CURRENT owner, so work moved between
    /// departments lands in the right queue.
    pub async fn pending_queue(
        &self,
        session: &mut Session,
        departments: &[Department],
    ) -> Result<Vec<PendingRequestView>, RewardsError> {
        let mut category_ids = Vec::new();
        for department in departments {
            for id in self.categories.department_ids(session, *department).await? {
                if !category_ids.contains(&id) {
                    category_ids.push(id);
                }
            }
        }
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }

        let pending = self
            .store
            .pending_for_categories(session, &category_ids)
            .await?;

        let mut views = Vec::with_capacity(pending.len());
        let mut names: HashMap<ObjectId, String> = HashMap::new();
        for request in pending {
            let employee = match self.users.get(session, request.user_id).await? {
                Some(user) => user,
                None => continue,
            };
            let updater_name = match request.created_by {
                Some(id) if id == request.user_id => "Self (Employee)".to_string(),
                Some(id) => match names.get(&id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self
                            .users
                            .get(session, id)
                            .await?
                            .map(|u| u.name)
                            .unwrap_or_else(|| "Unknown".to_string());
                        names.insert(id, name.clone());
                        name
                    }
                },
                None => "Self-Submitted".to_string(),
            };
            let category_name = self
                .categories
                .get(session, request.category_id)
                .await?
                .map(|c| c.name)
                .unwrap_or_else(|| "Unknown".to_string());

            views.push(PendingRequestView {
                id: request.id.to_hex(),
                employee_name: employee.name,
                employee_email: employee.email,
                updater_name,
                category_name,
                points: request.points,
                utilization_value: request.utilization_value,
                notes: request.submission_notes.clone(),
                request_date: request.request_date,
                event_date: request.event_date,
                has_attachment: request.has_attachment(),
            });
        }
        Ok(views)
    }

    pub async fn own_requests(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PointsRequest>, RewardsError> {
        Ok(self.store.for_user(session, user_id, status).await?)
    }
}

impl Deref for Requests {
    type Target = RequestStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
