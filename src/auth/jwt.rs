use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::model::auth::{Actor, Claims};
use crate::model::global_error::{AppError, ErrorCode};

const REFRESH_ROLE: &str = "refresh";

pub enum TokenVerifyResult {
    Valid(Claims),
    Expired,
    Invalid,
}

/// Verifies HS256 bearer tokens issued by the identity service.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify_token(&self, token: &str) -> TokenVerifyResult {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => TokenVerifyResult::Valid(data.claims),
            Err(err) => match *err.kind() {
                ErrorKind::ExpiredSignature => TokenVerifyResult::Expired,
                _ => TokenVerifyResult::Invalid,
            },
        }
    }

    /// Maps a token to the acting user. Refresh tokens are not accepted here.
    pub fn authenticate(&self, token: &str) -> Result<Actor, AppError> {
        let claims = match self.verify_token(token) {
            TokenVerifyResult::Valid(claims) => claims,
            TokenVerifyResult::Expired => return Err(AppError::unauthorized(ErrorCode::ExpiredAuthToken)),
            TokenVerifyResult::Invalid => return Err(AppError::unauthorized(ErrorCode::InvalidAuthToken)),
        };

        if claims.role == REFRESH_ROLE {
            return Err(AppError::with_detail(ErrorCode::InvalidAuthToken, "refresh tokens cannot be used here"));
        }

        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AppError::with_detail(ErrorCode::InvalidAuthToken, "subject is not a user id"))?;

        Ok(Actor::user(user_id, claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(sub: &str, role: &str, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: (now + expires_in).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_yields_actor() {
        let verifier = JwtVerifier::new(SECRET);
        let actor = verifier.authenticate(&token("42", "tester", Duration::hours(1))).unwrap();
        assert_eq!(actor, Actor::user(42, "tester"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = JwtVerifier::new(SECRET);
        let err = verifier.authenticate(&token("42", "tester", Duration::hours(-2))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExpiredAuthToken);
    }

    #[test]
    fn wrong_secret_and_refresh_role_are_invalid() {
        let verifier = JwtVerifier::new("another-secret");
        let err = verifier.authenticate(&token("42", "tester", Duration::hours(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAuthToken);

        let verifier = JwtVerifier::new(SECRET);
        let err = verifier.authenticate(&token("42", "refresh", Duration::hours(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAuthToken);
    }
}
