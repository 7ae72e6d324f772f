use chrono::{Duration, Utc};
use eyre::{Context as _, Error};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_LIFETIME_HOURS: i64 = 12;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id, hex.
    pub sub: String,
    pub exp: i64,
}

pub struct Jwt {
    encode: EncodingKey,
    decode: DecodingKey,
    validation: Validation,
    header: Header,
}

impl Jwt {
    pub fn new(secret: &str) -> Self {
        Jwt {
            encode: EncodingKey::from_secret(secret.as_bytes()),
            decode: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            header: Header::default(),
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<String, Error> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };
        jsonwebtoken::encode(&self.header, &claims, &self.encode).context("encode jwt")
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decode, &self.validation)
            .context("decode jwt")?;
        Ok(data.claims)
    }
}
