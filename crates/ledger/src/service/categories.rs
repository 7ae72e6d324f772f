use std::ops::Deref;

use bson::oid::ObjectId;
use model::category::{
    Category, CategoryStatus, MergedCategory, PointsPerUnit, BONUS_CODE,
};
use model::errors::RewardsError;
use model::session::Session;
use storage::categories::CategoryStore;

#[derive(Clone)]
pub struct Categories {
    store: CategoryStore,
}

impl Categories {
    pub(crate) fn new(store: CategoryStore) -> Self {
        Categories { store }
    }

    pub async fn resolve(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Category, RewardsError> {
        self.store
            .get(session, id)
            .await?
            .ok_or(RewardsError::CategoryNotFound(id))
    }

    /// The logical category list: both generations merged by name.
    pub async fn merged(&self, session: &mut Session) -> Result<Vec<MergedCategory>, RewardsError> {
        let legacy = self.store.legacy_all(session).await?;
        let hr = self.store.hr_all(session).await?;
        Ok(MergedCategory::merge_by_name(&legacy, &hr))
    }

    /// Categories flagged `is_bonus` in either generation.
    pub async fn bonus_category_ids(
        &self,
        session: &mut Session,
    ) -> Result<Vec<ObjectId>, RewardsError> {
        let mut ids: Vec<ObjectId> = self
            .store
            .legacy_all(session)
            .await?
            .into_iter()
            .filter(|c| c.is_bonus)
            .map(|c| c.id)
            .collect();
        for category in self.store.hr_all(session).await? {
            if category.is_bonus && !ids.contains(&category.id) {
                ids.push(category.id);
            }
        }
        Ok(ids)
    }

    pub async fn create_hr(
        &self,
        session: &mut Session,
        category: Category,
    ) -> Result<Category, RewardsError> {
        if !category.code.is_empty()
            && self
                .store
                .find_hr_by_code(session, &category.code)
                .await?
                .is_some()
        {
            return Err(RewardsError::InvalidInput(format!(
                "category code {} already exists",
                category.code
            )));
        }
        self.store.insert_hr(session, &category).await?;
        Ok(category)
    }

    /// The synthetic category milestone bonuses are booked under; created
    /// on first use.
    pub async fn ensure_bonus_category(
        &self,
        session: &mut Session,
    ) -> Result<Category, RewardsError> {
        if let Some(category) = self.store.find_hr_by_code(session, BONUS_CODE).await? {
            return Ok(category);
        }
        let category = Category {
            id: ObjectId::new(),
            name: "Bonus Points".to_string(),
            code: BONUS_CODE.to_string(),
            department: Some("central".to_string()),
            description: Some("Quarterly bonus points awarded for reaching milestones".to_string()),
            points_per_unit: PointsPerUnit::Flat(0.0),
            is_bonus: true,
            status: CategoryStatus::Active,
        };
        self.store.insert_hr(session, &category).await?;
        Ok(category)
    }
}

impl Deref for Categories {
    type Target = CategoryStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
