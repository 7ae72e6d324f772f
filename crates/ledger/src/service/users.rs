use std::ops::Deref;

use bcrypt::DEFAULT_COST;
use bson::oid::ObjectId;
use eyre::eyre;
use model::access::DashboardAccess;
use model::errors::RewardsError;
use model::session::Session;
use model::user::{Grade, Role, User};
use storage::users::UserStore;

#[derive(Clone)]
pub struct Users {
    store: UserStore,
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub grade: Option<Grade>,
    pub department: Option<String>,
    pub manager_id: Option<ObjectId>,
    pub dp_id: Option<ObjectId>,
    pub dashboard_access: DashboardAccess,
}

impl Users {
    pub(crate) fn new(store: UserStore) -> Self {
        Users { store }
    }

    pub async fn get(&self, session: &mut Session, id: ObjectId) -> Result<User, RewardsError> {
        self.store
            .get(session, id)
            .await?
            .ok_or(RewardsError::UserNotFound(id))
    }

    pub async fn find(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Option<User>, RewardsError> {
        Ok(self.store.get(session, id).await?)
    }

    /// Password login. Deactivated accounts fail exactly like bad
    /// credentials so the response does not leak account state.
    pub async fn verify_credentials(
        &self,
        session: &mut Session,
        email: &str,
        password: &str,
    ) -> Result<User, RewardsError> {
        let email = email.trim().to_lowercase();
        let user = self
            .store
            .get_by_email(session, &email)
            .await?
            .ok_or(RewardsError::InvalidCredentials)?;
        if !user.is_active {
            return Err(RewardsError::InvalidCredentials);
        }
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(RewardsError::InvalidCredentials)?;
        let valid = bcrypt::verify(password, hash).map_err(|err| eyre!("bcrypt: {err}"))?;
        if !valid {
            return Err(RewardsError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn create(
        &self,
        session: &mut Session,
        new_user: NewUser,
    ) -> Result<User, RewardsError> {
        let password_hash =
            bcrypt::hash(&new_user.password, DEFAULT_COST).map_err(|err| eyre!("bcrypt: {err}"))?;
        let mut user = User::new(
            new_user.name,
            new_user.email.trim().to_lowercase(),
            password_hash,
            new_user.role,
        );
        user.grade = new_user.grade;
        user.department = new_user.department;
        user.manager_id = new_user.manager_id;
        user.dp_id = new_user.dp_id;
        user.dashboard_access = new_user.dashboard_access;
        self.store.insert(session, &user).await?;
        Ok(user)
    }

    pub async fn deactivate(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(), RewardsError> {
        self.store.set_active(session, id, false).await?;
        Ok(())
    }
}

impl Deref for Users {
    type Target = UserStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
