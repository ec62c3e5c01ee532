use std::collections::HashMap;
use std::sync::RwLock;

use actix_web::{
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{header::Header, Method},
    middleware::Next,
    web, Error, HttpMessage, ResponseError,
};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand_core::OsRng;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Role, UserRow},
    state::AppState,
};

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = PasswordHash::new(password_hash);
    match parsed_hash {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    pub csrf_token: String,
    pub created_at: String,
}

/// In-memory bearer-token sessions. Tokens are opaque v4 UUIDs and live until
/// logout or process restart.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn open(&self, user_id: &str, role: Role) -> (String, Session) {
        let token = new_id();
        let session = Session {
            user_id: user_id.to_string(),
            role,
            csrf_token: new_id(),
            created_at: Utc::now().to_rfc3339(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(token.clone(), session.clone());
        (token, session)
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.sessions.read().unwrap().get(token).cloned()
    }

    pub fn close(&self, token: &str) -> bool {
        self.sessions.write().unwrap().remove(token).is_some()
    }
}

/// Caller identity for one request. Explicit `user_id`/`role` query
/// parameters take precedence over the session, field by field: a request may
/// pin `user_id` while the role still comes from the session token. The raw
/// session role is kept alongside the merged one for endpoints where the
/// `role` parameter carries a second meaning.
#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub user_id: Option<String>,
    pub role: Option<Role>,
    pub session_role: Option<Role>,
    pub session_token: Option<String>,
    pub csrf_token: Option<String>,
}

impl Identity {
    fn resolve(
        param_user: Option<String>,
        param_role: Option<Role>,
        token: Option<&str>,
        session: Option<Session>,
    ) -> Self {
        match session {
            Some(session) => Identity {
                user_id: param_user.or(Some(session.user_id)),
                role: param_role.or(Some(session.role)),
                session_role: Some(session.role),
                session_token: token.map(str::to_string),
                csrf_token: Some(session.csrf_token),
            },
            None => Identity {
                user_id: param_user,
                role: param_role,
                session_role: None,
                session_token: None,
                csrf_token: None,
            },
        }
    }

    pub fn require(&self) -> ApiResult<&str> {
        self.user_id.as_deref().ok_or(ApiError::Unauthenticated)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Some(Role::Admin))
    }

    pub fn require_admin(&self) -> ApiResult<&str> {
        let user_id = self.require()?;
        match self.role {
            Some(Role::Admin) => Ok(user_id),
            Some(Role::Staff) | Some(Role::Client) | None => {
                Err(ApiError::unauthorized("Admin access required"))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct IdentityParams {
    user_id: Option<String>,
    role: Option<String>,
}

/// Resolves the caller identity and stores it in request extensions. Never
/// rejects: endpoints decide what they require via [`Identity::require`] and
/// friends. A malformed `role` parameter is ignored rather than rejected.
pub async fn identity_loader<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    let params = web::Query::<IdentityParams>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();
    let param_user = params.user_id.filter(|id| !id.is_empty());
    let param_role = params
        .role
        .as_deref()
        .and_then(|role| role.parse::<Role>().ok());

    let token = Authorization::<Bearer>::parse(req.request())
        .ok()
        .map(|auth| auth.into_scheme().token().to_string());
    let session = match (req.app_data::<web::Data<AppState>>(), token.as_deref()) {
        (Some(state), Some(token)) => state.sessions.get(token),
        _ => None,
    };

    let identity = Identity::resolve(param_user, param_role, token.as_deref(), session);
    req.extensions_mut().insert(identity);

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

/// Double-submit check for state-changing requests: the `X-Csrf-Token` header
/// must match the token minted with the session. Requests that carry no
/// session have nothing to compare against and pass through.
pub trait CsrfValidator: Send + Sync {
    fn validate(&self, expected: &str, provided: Option<&str>) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SessionTokenCsrf;

impl CsrfValidator for SessionTokenCsrf {
    fn validate(&self, expected: &str, provided: Option<&str>) -> bool {
        provided == Some(expected)
    }
}

const CSRF_EXEMPT: [&str; 2] = ["/api/register", "/api/login"];

pub async fn csrf_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    if req.method() == Method::POST && !CSRF_EXEMPT.contains(&req.path()) {
        let expected = req
            .extensions()
            .get::<Identity>()
            .and_then(|identity| identity.csrf_token.clone());
        if let Some(expected) = expected {
            let provided = req
                .headers()
                .get("x-csrf-token")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let valid = match req.app_data::<web::Data<AppState>>() {
                Some(state) => state.csrf.validate(&expected, provided.as_deref()),
                None => false,
            };
            if !valid {
                let rejection = ApiError::unauthorized("Invalid CSRF token");
                return Ok(req.into_response(rejection.error_response()));
            }
        }
    }

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

pub async fn authenticate_credentials(
    state: &AppState,
    email: &str,
    password: &str,
) -> Option<UserRow> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, full_name, phone, email, dob, role, password_hash, is_active, is_verified, created_at
           FROM users
           WHERE email = ? AND is_active = 1
           LIMIT 1"#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
    .ok()?;

    let user = match user {
        Some(user) => user,
        None => return None,
    };

    if !verify_password(password, &user.password_hash) {
        return None;
    }

    Some(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn session_store_lifecycle() {
        let store = SessionStore::default();
        let (token, session) = store.open("u1", Role::Client);
        assert_eq!(store.get(&token).unwrap().user_id, "u1");
        assert_ne!(token, session.csrf_token);
        assert!(store.close(&token));
        assert!(store.get(&token).is_none());
        assert!(!store.close(&token));
    }

    #[test]
    fn params_override_session_per_field() {
        let session = Session {
            user_id: "session-user".into(),
            role: Role::Staff,
            csrf_token: "csrf".into(),
            created_at: String::new(),
        };
        let identity = Identity::resolve(
            Some("param-user".into()),
            None,
            Some("tok"),
            Some(session.clone()),
        );
        assert_eq!(identity.user_id.as_deref(), Some("param-user"));
        assert_eq!(identity.role, Some(Role::Staff));
        assert_eq!(identity.session_role, Some(Role::Staff));
        assert_eq!(identity.session_token.as_deref(), Some("tok"));

        let identity = Identity::resolve(None, Some(Role::Admin), Some("tok"), Some(session));
        assert_eq!(identity.user_id.as_deref(), Some("session-user"));
        assert_eq!(identity.role, Some(Role::Admin));
        assert_eq!(identity.session_role, Some(Role::Staff));
    }

    #[test]
    fn admin_gate() {
        let admin = Identity {
            user_id: Some("u1".into()),
            role: Some(Role::Admin),
            ..Identity::default()
        };
        assert_eq!(admin.require_admin().unwrap(), "u1");

        let staff = Identity {
            user_id: Some("u2".into()),
            role: Some(Role::Staff),
            ..Identity::default()
        };
        assert!(matches!(
            staff.require_admin(),
            Err(ApiError::Unauthorized(_))
        ));

        let anonymous = Identity::default();
        assert!(matches!(
            anonymous.require_admin(),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn csrf_token_comparison() {
        let csrf = SessionTokenCsrf;
        assert!(csrf.validate("abc", Some("abc")));
        assert!(!csrf.validate("abc", Some("abd")));
        assert!(!csrf.validate("abc", None));
    }
}
