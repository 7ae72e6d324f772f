use bson::oid::ObjectId;
use thiserror::Error;

use crate::bonus::Ineligibility;

#[derive(Error, Debug)]
pub enum RewardsError {
    #[error("Common error: {0}")]
    Common(#[from] eyre::Error),
    #[error("Mongo error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("User not found: {0}")]
    UserNotFound(ObjectId),
    #[error("Category not found: {0}")]
    CategoryNotFound(ObjectId),
    #[error("Request not found: {0}")]
    RequestNotFound(ObjectId),
    #[error("No attachment on request {0}")]
    AttachmentNotFound(ObjectId),
    #[error("Request {0} was already processed")]
    RequestAlreadyProcessed(ObjectId),
    #[error("Not eligible: {0}")]
    NotEligible(#[from] Ineligibility),
    #[error("Awarding {points} bonus points would exceed the yearly limit of {limit}")]
    BonusLimitExceeded { points: i64, limit: i64 },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Access denied")]
    AccessDenied,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
