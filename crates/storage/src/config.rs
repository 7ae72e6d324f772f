use std::sync::Arc;

use bson::doc;
use chrono::Utc;
use eyre::{Error, Result};
use log::info;
use model::config::RewardConfig;
use model::session::Session;
use mongodb::Collection;

use crate::session::Db;

const COLLECTION: &str = "reward_config";

/// Singleton reward configuration document.
#[derive(Clone)]
pub struct ConfigStore {
    config: Arc<Collection<RewardConfig>>,
}

impl ConfigStore {
    pub(crate) fn new(db: &Db) -> Self {
        ConfigStore {
            config: Arc::new(db.collection(COLLECTION)),
        }
    }

    /// The current configuration; seeded with defaults on first use.
    pub async fn get_or_init(&self, session: &mut Session) -> Result<RewardConfig, Error> {
        if let Some(config) = self
            .config
            .find_one(doc! {})
            .session(&mut *session)
            .await?
        {
            return Ok(config);
        }
        info!("No reward configuration found, seeding defaults");
        let config = RewardConfig::default();
        self.config
            .insert_one(&config)
            .session(&mut *session)
            .await?;
        Ok(config)
    }

    pub async fn update(&self, session: &mut Session, config: &mut RewardConfig) -> Result<(), Error> {
        config.last_updated = Utc::now();
        self.config
            .replace_one(doc! {}, &*config)
            .upsert(true)
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
