use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tutora_shared::constants::{MIN_NAME_LEN, MIN_PASSWORD_LEN};
use tutora_shared::{FieldErrors, Role, ValidationError};
use tutora_store::{Account, NewAccount, ProfileUpdate};

use super::{created, ok, ApiJson, ApiResult, AppState};
use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::error::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    role: Option<String>,
    phone: Option<String>,
    subjects: Vec<String>,
    hourly_rate: Option<f64>,
    bio: Option<String>,
    grade: Option<String>,
    interests: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest {
    name: Option<String>,
    phone: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    subjects: Option<Vec<String>>,
    hourly_rate: Option<f64>,
    grade: Option<String>,
    interests: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AuthPayload {
    token: String,
    account: Account,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !domain.ends_with('.'))
            .unwrap_or(false)
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check a registration and turn it into the account to insert, minus the
/// password hash.
fn validate_registration(req: &RegisterRequest) -> Result<NewAccount, Vec<ValidationError>> {
    let mut errors = FieldErrors::new();

    errors.check(
        req.name.trim().chars().count() >= MIN_NAME_LEN,
        "name",
        "Name must be at least 2 characters",
    );
    errors.check(is_valid_email(&req.email), "email", "Please include a valid email");
    errors.check(
        req.password.chars().count() >= MIN_PASSWORD_LEN,
        "password",
        "Password must be at least 6 characters",
    );

    let role = match req.role.as_deref().unwrap_or("student") {
        "student" => Some(Role::Student),
        "teacher" => Some(Role::Teacher),
        _ => {
            errors.push(ValidationError::new("role", "Role must be student or teacher"));
            None
        }
    };

    let subjects = clean_list(&req.subjects);
    let interests = clean_list(&req.interests);
    let grade = req
        .grade
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string);

    match role {
        Some(Role::Teacher) => {
            errors.check(!subjects.is_empty(), "subjects", "At least one subject is required");
            errors.check(
                req.hourly_rate.is_some_and(|r| r.is_finite() && r > 0.0),
                "hourlyRate",
                "Hourly rate must be a positive number",
            );
        }
        Some(Role::Student) => {
            errors.check(grade.is_some(), "grade", "Grade is required");
        }
        _ => {}
    }

    errors.finish()?;
    let role = role.unwrap_or(Role::Student);

    let mut new = NewAccount::new(&req.name, &req.email, "", role);
    if role == Role::Teacher {
        new.subjects = subjects;
        new.hourly_rate = req.hourly_rate;
        new.bio = req.bio.clone();
    } else {
        new.grade = grade;
        new.interests = interests;
    }
    Ok(new)
}

fn validate_profile(req: &ProfileRequest, role: Role) -> Result<ProfileUpdate, Vec<ValidationError>> {
    let mut errors = FieldErrors::new();

    if let Some(name) = &req.name {
        errors.check(
            name.trim().chars().count() >= MIN_NAME_LEN,
            "name",
            "Name must be at least 2 characters",
        );
    }

    let mut update = ProfileUpdate {
        name: req.name.clone(),
        phone: req.phone.clone(),
        avatar_url: req.avatar_url.clone(),
        ..Default::default()
    };

    match role {
        Role::Teacher => {
            if let Some(rate) = req.hourly_rate {
                errors.check(
                    rate.is_finite() && rate > 0.0,
                    "hourlyRate",
                    "Hourly rate must be a positive number",
                );
            }
            let subjects = req.subjects.as_deref().map(clean_list);
            if let Some(subjects) = &subjects {
                errors.check(!subjects.is_empty(), "subjects", "At least one subject is required");
            }
            update.bio = req.bio.clone();
            update.subjects = subjects;
            update.hourly_rate = req.hourly_rate;
        }
        Role::Student => {
            update.grade = req.grade.clone();
            update.interests = req.interests.as_deref().map(clean_list);
        }
        Role::Admin => {}
    }

    errors.finish()?;
    Ok(update)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let mut new = validate_registration(&req)?;
    new.password_hash = hash_password(req.password).await?;

    let account = state.with_db(|db| {
        let account = db.create_account(&new)?;
        if let Some(phone) = req.phone.filter(|p| !p.trim().is_empty()) {
            let update = ProfileUpdate {
                phone: Some(phone),
                ..Default::default()
            };
            return Ok(db.update_profile(account.id, &update)?);
        }
        Ok(account)
    })?;

    let token = issue_token(&account, &state.config)?;
    info!(account = %account.id, role = %account.role, "Account registered");
    created(AuthPayload { token, account })
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<AuthPayload> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let account = state
        .with_db(|db| Ok(db.find_account_by_email(&req.email)?))?
        .ok_or_else(invalid)?;

    if !verify_password(req.password, account.password_hash.clone()).await {
        return Err(invalid());
    }

    let token = issue_token(&account, &state.config)?;
    info!(account = %account.id, "Login succeeded");
    ok(AuthPayload { token, account })
}

async fn me(user: AuthUser) -> ApiResult<Account> {
    ok(user.0)
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> ApiResult<Account> {
    let update = validate_profile(&req, user.role())?;
    let account = state.with_db(|db| Ok(db.update_profile(user.id(), &update)?))?;
    ok(account)
}

/// Create the configured admin account if it does not exist yet.
pub async fn bootstrap_admin(state: &AppState) -> Result<(), ApiError> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.clone(),
        state.config.admin_password.clone(),
    ) else {
        return Ok(());
    };

    if state.with_db(|db| Ok(db.find_account_by_email(&email)?))?.is_some() {
        return Ok(());
    }

    let hash = hash_password(password).await?;
    let mut new = NewAccount::new("Administrator", &email, &hash, Role::Admin);
    new.is_verified = true;
    let account = state.with_db(|db| Ok(db.create_account(&new)?))?;
    info!(account = %account.id, email = %account.email, "Admin account created");
    Ok(())
}
