use std::{env::var, sync::Arc};

use dotenv::dotenv;
use eyre::{Context, Error};

/// Typed process configuration. Everything secret (Mongo URL, JWT secret,
/// SMTP credentials) is injected through the environment, never source.
#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

struct EnvInner {
    mongo_url: String,
    redis_url: String,
    bind_addr: String,
    jwt_secret: String,
    smtp_host: String,
    smtp_port: u16,
    smtp_username: String,
    smtp_password: String,
    smtp_from: String,
}

impl Env {
    pub fn mongo_url(&self) -> &str {
        &self.0.mongo_url
    }

    pub fn redis_url(&self) -> &str {
        &self.0.redis_url
    }

    pub fn bind_addr(&self) -> &str {
        &self.0.bind_addr
    }

    pub fn jwt_secret(&self) -> &str {
        &self.0.jwt_secret
    }

    pub fn smtp_host(&self) -> &str {
        &self.0.smtp_host
    }

    pub fn smtp_port(&self) -> u16 {
        self.0.smtp_port
    }

    pub fn smtp_username(&self) -> &str {
        &self.0.smtp_username
    }

    pub fn smtp_password(&self) -> &str {
        &self.0.smtp_password
    }

    pub fn smtp_from(&self) -> &str {
        &self.0.smtp_from
    }

    pub fn load() -> Result<Env, Error> {
        dotenv().ok();

        Ok(Env(Arc::new(EnvInner {
            mongo_url: var("MONGO_URL").context("MONGO_URL is not set")?,
            redis_url: var("REDIS_URL").context("REDIS_URL is not set")?,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET is not set")?,
            smtp_host: var("SMTP_HOST").context("SMTP_HOST is not set")?,
            smtp_port: var("SMTP_PORT")
                .context("SMTP_PORT is not set")?
                .parse()
                .context("SMTP_PORT is not a port number")?,
            smtp_username: var("SMTP_USERNAME").context("SMTP_USERNAME is not set")?,
            smtp_password: var("SMTP_PASSWORD").context("SMTP_PASSWORD is not set")?,
            smtp_from: var("SMTP_FROM").context("SMTP_FROM is not set")?,
        })))
    }
}
