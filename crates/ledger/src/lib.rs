use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use log::info;
use model::award::Award;
use model::bonus::Ineligibility;
use model::errors::RewardsError;
use model::fiscal::FiscalQuarter;
use model::notification::{Notice, Notification, Recipient};
use model::request::{PointsRequest, RequestStatus};
use model::session::Session;
use model::user::User;
use service::bonuses::Bonuses;
use service::categories::Categories;
use service::export::Export;
use service::requests::Requests;
use service::statistics::Statistics;
use service::users::Users;
use storage::attachments::AttachmentStore;
use storage::notifications::NotificationStore;
use storage::session::Db;
use storage::Storage;
use tx_macro::tx;

pub mod service;

#[derive(Clone)]
pub struct Ledger {
    pub db: Db,
    pub users: Users,
    pub categories: Categories,
    pub requests: Requests,
    pub bonuses: Bonuses,
    pub statistics: Statistics,
    pub export: Export,
    pub notifications: NotificationStore,
    pub attachments: AttachmentStore,
}

impl Ledger {
    pub fn new(storage: Storage) -> Self {
        let users = Users::new(storage.users.clone());
        let categories = Categories::new(storage.categories.clone());
        let requests = Requests::new(
            storage.requests.clone(),
            storage.users.clone(),
            storage.categories.clone(),
        );
        let statistics = Statistics::new(
            storage.users.clone(),
            storage.awards.clone(),
            storage.categories.clone(),
            storage.config.clone(),
        );
        let bonuses = Bonuses::new(
            storage.users.clone(),
            storage.awards.clone(),
            storage.config.clone(),
            statistics.clone(),
        );
        let export = Export::new(
            storage.users.clone(),
            storage.awards.clone(),
            storage.config.clone(),
            statistics.clone(),
            categories.clone(),
        );
        Ledger {
            db: storage.db,
            users,
            categories,
            requests,
            bonuses,
            statistics,
            export,
            notifications: storage.notifications,
            attachments: storage.attachments,
        }
    }

    /// Raise a recognition request on behalf of `input.user_id`.
    pub async fn submit_request(
        &self,
        session: &mut Session,
        input: SubmitRequest,
    ) -> Result<PointsRequest, RewardsError> {
        let employee = self.users.get(session, input.user_id).await?;
        let category = self.categories.resolve(session, input.category_id).await?;

        let mut utilization_value = None;
        let points = if category.is_utilization() {
            let raw = input.utilization_value.ok_or_else(|| {
                RewardsError::InvalidInput("utilization submissions need a billability value".into())
            })?;
            // Accept a 0-1 fraction or a 0-100 percentage; store the fraction.
            let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
            if !(0.0..=1.0).contains(&fraction) || fraction <= 0.0 {
                return Err(RewardsError::InvalidInput(format!(
                    "billability {raw} is out of range"
                )));
            }
            utilization_value = Some(fraction);
            0
        } else {
            let points = if input.points > 0 {
                input.points
            } else {
                category.points_per_unit.for_grade(employee.grade)
            };
            if points <= 0 {
                return Err(RewardsError::InvalidInput(
                    "request must carry a positive point value".into(),
                ));
            }
            points
        };

        let request = PointsRequest {
            id: ObjectId::new(),
            user_id: employee.id,
            category_id: category.id,
            points,
            status: RequestStatus::Pending,
            request_date: Utc::now(),
            event_date: input.event_date,
            submission_notes: input.notes,
            utilization_value,
            created_by: Some(session.actor()),
            assigned_validator_id: input.assigned_validator_id,
            processed_by: None,
            processed_department: None,
            response_date: None,
            response_notes: None,
            is_bonus: category.is_bonus,
            bonus_quarter: None,
            attachment_id: input.attachment_id,
        };
        self.requests.add(session, &request).await?;
        info!(
            "Request {} raised for {} in {}",
            request.id, employee.name, category.name
        );
        Ok(request)
    }

    /// Approve a pending request: the terminal status flip and the ledger
    /// award land in one transaction, together with the outbox entries.
    #[tx]
    pub async fn approve_request(
        &self,
        session: &mut Session,
        request_id: ObjectId,
        validator: &User,
        response_notes: String,
    ) -> Result<(PointsRequest, Award), RewardsError> {
        let mut request = self
            .requests
            .get(session, request_id)
            .await?
            .ok_or(RewardsError::RequestNotFound(request_id))?;
        if !request.is_pending() {
            return Err(RewardsError::RequestAlreadyProcessed(request_id));
        }

        let category = self.categories.resolve(session, request.category_id).await?;
        request.status = RequestStatus::Approved;
        request.response_date = Some(Utc::now());
        request.response_notes = Some(response_notes.clone());
        request.processed_by = Some(validator.id);
        request.processed_department = category.department.clone();
        self.requests.update(session, &request).await?;

        let award = Award::from_request(&request, validator.id, response_notes);
        self.bonuses.awards().add(session, &award).await?;

        let employee = self.users.get(session, request.user_id).await?;
        self.enqueue(
            session,
            &employee,
            Notice::RequestApproved {
                employee_name: employee.name.clone(),
                category_name: category.name.clone(),
                points: request.points,
                event_date: request.effective_date().format("%d-%m-%Y").to_string(),
            },
        )
        .await?;
        if let Some(updater) = self.updater_of(session, &request, &employee).await? {
            self.enqueue(
                session,
                &updater,
                Notice::RequestApproved {
                    employee_name: employee.name.clone(),
                    category_name: category.name.clone(),
                    points: request.points,
                    event_date: request.effective_date().format("%d-%m-%Y").to_string(),
                },
            )
            .await?;
        }

        info!(
            "Request {} approved by {}: {} points to {}",
            request.id, validator.name, request.points, employee.name
        );
        Ok((request, award))
    }

    /// Reject a pending request. The employee is not emailed; the updater
    /// who raised it is.
    #[tx]
    pub async fn reject_request(
        &self,
        session: &mut Session,
        request_id: ObjectId,
        validator: &User,
        response_notes: String,
    ) -> Result<PointsRequest, RewardsError> {
        if response_notes.trim().is_empty() {
            return Err(RewardsError::InvalidInput(
                "rejection needs response notes".into(),
            ));
        }
        let mut request = self
            .requests
            .get(session, request_id)
            .await?
            .ok_or(RewardsError::RequestNotFound(request_id))?;
        if !request.is_pending() {
            return Err(RewardsError::RequestAlreadyProcessed(request_id));
        }

        let category = self.categories.resolve(session, request.category_id).await?;
        request.status = RequestStatus::Rejected;
        request.response_date = Some(Utc::now());
        request.response_notes = Some(response_notes.clone());
        request.processed_by = Some(validator.id);
        request.processed_department = category.department.clone();
        self.requests.update(session, &request).await?;

        let employee = self.users.get(session, request.user_id).await?;
        if let Some(updater) = self.updater_of(session, &request, &employee).await? {
            self.enqueue(
                session,
                &updater,
                Notice::RequestRejected {
                    employee_name: employee.name.clone(),
                    category_name: category.name,
                    points: request.points,
                    reason: response_notes,
                },
            )
            .await?;
        }

        info!("Request {} rejected by {}", request.id, validator.name);
        Ok(request)
    }

    /// Pay a milestone bonus. One bonus per user per fiscal quarter, capped
    /// by the yearly limit; records both the audit request and the ledger
    /// award.
    #[tx]
    pub async fn award_bonus(
        &self,
        session: &mut Session,
        employee_id: ObjectId,
        bonus_points: i64,
        milestones: String,
        notes: String,
        awarded_by: &User,
    ) -> Result<Award, RewardsError> {
        if bonus_points <= 0 {
            return Err(RewardsError::InvalidInput(
                "bonus points must be positive".into(),
            ));
        }
        let employee = self.users.get(session, employee_id).await?;
        if !employee.can_receive_bonus() {
            return Err(RewardsError::InvalidInput(
                "user is not eligible to receive bonuses".into(),
            ));
        }

        let quarter = FiscalQuarter::current();
        let label = quarter.label();
        if self
            .bonuses
            .awards()
            .bonus_in_quarter(session, employee.id, &label)
            .await?
            .is_some()
        {
            return Err(RewardsError::NotEligible(Ineligibility::AlreadyAwarded(
                label,
            )));
        }

        let config = self.bonuses.config(session).await?;
        let earned = self
            .bonuses
            .yearly_bonus_points(session, employee.id, quarter.fiscal_year)
            .await?;
        if earned + bonus_points > config.yearly_bonus_limit {
            return Err(RewardsError::BonusLimitExceeded {
                points: bonus_points,
                limit: config.yearly_bonus_limit,
            });
        }

        let category = self.categories.ensure_bonus_category(session).await?;
        let now = Utc::now();
        let request = PointsRequest {
            id: ObjectId::new(),
            user_id: employee.id,
            category_id: category.id,
            points: bonus_points,
            status: RequestStatus::Approved,
            request_date: now,
            event_date: None,
            submission_notes: String::new(),
            utilization_value: None,
            created_by: Some(awarded_by.id),
            assigned_validator_id: None,
            processed_by: Some(awarded_by.id),
            processed_department: category.department.clone(),
            response_date: Some(now),
            response_notes: Some(format!(
                "Milestone bonuses: {milestones} in {label}. {notes}"
            )),
            is_bonus: true,
            bonus_quarter: Some(label.clone()),
            attachment_id: None,
        };
        self.requests.add(session, &request).await?;

        let award = Award::from_request(&request, awarded_by.id, notes.clone());
        self.bonuses.awards().add(session, &award).await?;

        self.enqueue(
            session,
            &employee,
            Notice::BonusAwarded {
                employee_name: employee.name.clone(),
                bonus_points,
                quarter: label,
                milestones,
                notes,
            },
        )
        .await?;

        info!(
            "Bonus of {} points awarded to {} by {}",
            bonus_points, employee.name, awarded_by.name
        );
        Ok(award)
    }

    /// A legacy-style award that bypasses the request workflow.
    #[tx]
    pub async fn direct_award(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        category_id: ObjectId,
        points: i64,
        effective_date: DateTime<Utc>,
        notes: String,
    ) -> Result<Award, RewardsError> {
        if points <= 0 {
            return Err(RewardsError::InvalidInput(
                "award must carry a positive point value".into(),
            ));
        }
        let employee = self.users.get(session, user_id).await?;
        self.categories.resolve(session, category_id).await?;

        let award = Award::direct(
            employee.id,
            category_id,
            points,
            effective_date,
            session.actor(),
            notes,
        );
        self.bonuses.awards().add(session, &award).await?;
        Ok(award)
    }

    async fn enqueue(
        &self,
        session: &mut Session,
        user: &User,
        notice: Notice,
    ) -> Result<(), RewardsError> {
        let notification = Notification::new(
            Recipient {
                email: user.email.clone(),
                name: user.name.clone(),
            },
            notice,
        );
        self.notifications.add(session, &notification).await?;
        Ok(())
    }

    /// The updater who raised a request, when it was not self-submitted.
    async fn updater_of(
        &self,
        session: &mut Session,
        request: &PointsRequest,
        employee: &User,
    ) -> Result<Option<User>, RewardsError> {
        let updater_id = match request.created_by {
            Some(id) if id != employee.id => id,
            _ => return Ok(None),
        };
        Ok(self.users.find(session, updater_id).await?)
    }

    /// The bonus sum a user already collected in a fiscal year.
    pub async fn yearly_bonus_points(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        fiscal_year: i32,
    ) -> Result<i64, RewardsError> {
        self.bonuses
            .yearly_bonus_points(session, user_id, fiscal_year)
            .await
    }
}

/// Input of [`Ledger::submit_request`].
pub struct SubmitRequest {
    pub user_id: ObjectId,
    pub category_id: ObjectId,
    /// Explicit point value; 0 lets the category's per-grade table decide.
    pub points: i64,
    pub event_date: Option<DateTime<Utc>>,
    pub notes: String,
    /// Billability value for utilization submissions (fraction or percent).
    pub utilization_value: Option<f64>,
    pub assigned_validator_id: Option<ObjectId>,
    pub attachment_id: Option<ObjectId>,
}

