use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_HOURS;
use crate::database::error::Error;
use crate::database::schema::{User, UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, email: String, username: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_HOURS)).timestamp();

        Self {
            user_id: id,
            email,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// The authenticated principal threaded explicitly into every core operation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::forbidden(
                "You don't have permission to perform this action",
            ));
        }
        Ok(())
    }
}

#[allow(clippy::from_over_into)]
impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            user_id: self.user_id,
            email: self.email,
            username: self.username,
            is_admin: self.role == UserRole::Admin,
            role: self.role,
        }
    }
}

fn signing_key() -> Hmac<Sha256> {
    let secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| String::from("secret"));
    // Hmac::new_from_slice only fails on zero-length keys
    Hmac::new_from_slice(secret.as_bytes()).unwrap()
}

pub fn generate_jwt_session(user: &User) -> String {
    let claims = JwtSessionData::new(
        user.id,
        user.email.to_owned(),
        user.username.to_owned(),
        user.role.to_owned(),
    );

    claims.sign_with_key(&signing_key()).unwrap()
}

pub fn verify_jwt_session(token: String) -> Result<JwtSessionData, Error> {
    token
        .verify_with_key(&signing_key())
        .map_err(|_| Error::forbidden("Invalid session; Invalid token"))
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(Error::forbidden("Invalid session; Token expired"));
            }
            Ok(session)
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            password: String::new(),
            first_name: "Test".to_string(),
            last_name: "Cook".to_string(),
            role: UserRole::User,
        }
    }

    #[test]
    fn session_token_roundtrips() {
        let token = generate_jwt_session(&user());
        let session = verify_jwt_session(token).unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.email, "cook@example.com");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = generate_jwt_session(&user());
        token.push('x');

        assert!(verify_jwt_session(token).is_err());
    }

    #[test]
    fn session_data_carries_admin_flag() {
        let mut u = user();
        u.role = UserRole::Admin;
        let session: SessionData = verify_jwt_session(generate_jwt_session(&u))
            .unwrap()
            .into();

        assert!(session.is_admin);
    }
}
