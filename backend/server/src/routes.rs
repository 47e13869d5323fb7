//! # Routes
//!
//! JSON in, JSON out. Every failure answers `{ "error": message }`.
//!
//! ## Anyone
//! - `POST /login`: `{ username, password }` to `{ sessionToken, userId, displayName, role }`
//! - `POST /password-reset/request`: `{ email }`
//! - `POST /password-reset`: `{ token, newPassword, confirmPassword }`
//!
//! ## Signed In
//! - `GET /leaderboard?view=monthly`: refetches the roster, optional view switch
//! - `POST /leaderboard/view`: `{ view }` to `{ view, changed, controls }`
//! - `GET /groups`, `PUT /password`, `POST /logout`
//!
//! ## Coach
//! - `GET /display-names`, `POST /users`, `POST /scores`
//! - `GET /users/{display_name}/groups`, `PUT /groups`
//!
//! ## Member
//! - `GET /transfers/receivers`: members sharing a group with the caller
//! - `POST /transfers`, `GET /avatars`, `PUT /avatar`
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
};
use roster::{
    FormError, LeaderboardPage, RemoteError, Role, ViewControl, ViewMode,
    forms::{
        GroupEdit, PasswordReset, PasswordUpdate, Registration, ScoreAdjustment, Transfer,
        check_common_group,
    },
    remote::{Avatar, DisplayName, TransferOutcome},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{error::AppError, session::Session, state::State};

type AppState = AxumState<Arc<State>>;

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    session_token: String,
    user_id: String,
    display_name: String,
    role: Role,
}

pub async fn login_handler(
    AxumState(state): AppState,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let login = state
        .gateway
        .login(payload.username.trim(), &payload.password)
        .await?;

    state.sessions.insert(&login.session_token);
    info!("{} signed in as {}", login.user.id, login.user.role.as_str());

    Ok(Json(LoginResponse {
        session_token: login.session_token,
        user_id: login.user.id,
        display_name: login.user.display_name,
        role: login.user.role,
    }))
}

pub async fn logout_handler(AxumState(state): AppState, session: Session) -> StatusCode {
    if let Err(e) = state.gateway.logout(&session.token).await {
        warn!("Remote logout failed: {e}");
    }

    state.sessions.remove(&session.token);

    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub struct ResetRequest {
    email: String,
}

pub async fn request_reset_handler(
    AxumState(state): AppState,
    Json(payload): Json<ResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(FormError::MissingEmail.into());
    }

    state.gateway.request_password_reset(email).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Password reset e-mail sent." })),
    ))
}

pub async fn reset_password_handler(
    AxumState(state): AppState,
    Json(payload): Json<PasswordReset>,
) -> Result<Json<Value>, AppError> {
    let reset = payload.validate()?;

    state
        .gateway
        .reset_password(&reset.token, &reset.new_password)
        .await?;

    Ok(Json(json!({ "message": "Password reset successful." })))
}

#[derive(Deserialize)]
pub struct ViewQuery {
    view: Option<ViewMode>,
}

pub async fn leaderboard_handler(
    AxumState(state): AppState,
    session: Session,
    Query(query): Query<ViewQuery>,
) -> Result<Json<LeaderboardPage>, AppError> {
    let members = state
        .gateway
        .fetch_roster(&session.token)
        .await
        .map_err(AppError::roster)?
        .members();

    let page = state
        .sessions
        .with_board(&session.token, |board| {
            board.replace_roster(members);
            if let Some(view) = query.view {
                board.select(view);
            }

            board.render()
        })
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(page))
}

#[derive(Deserialize)]
pub struct ViewSelection {
    view: ViewMode,
}

#[derive(Serialize)]
pub struct ViewChange {
    view: ViewMode,
    changed: bool,
    controls: [ViewControl; 3],
}

pub async fn select_view_handler(
    AxumState(state): AppState,
    session: Session,
    Json(payload): Json<ViewSelection>,
) -> Result<Json<ViewChange>, AppError> {
    let change = state
        .sessions
        .with_board(&session.token, |board| {
            let selection = board.select(payload.view);

            ViewChange {
                view: board.active_view(),
                changed: selection.changed(),
                controls: board.controls(),
            }
        })
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(change))
}

pub async fn groups_handler(
    AxumState(state): AppState,
    session: Session,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.gateway.fetch_groups(&session.token).await?))
}

pub async fn display_names_handler(
    AxumState(state): AppState,
    session: Session,
) -> Result<Json<Vec<DisplayName>>, AppError> {
    session.require(Role::Coach)?;

    let names = state
        .gateway
        .display_names(&session.token)
        .await?
        .into_iter()
        .filter(DisplayName::is_member)
        .collect();

    Ok(Json(names))
}

pub async fn register_handler(
    AxumState(state): AppState,
    session: Session,
    Json(payload): Json<Registration>,
) -> Result<impl IntoResponse, AppError> {
    session.require(Role::Coach)?;
    let registration = payload.validate()?;

    let result = state
        .gateway
        .create_user(&session.token, &registration)
        .await?;

    info!(
        "{} registered {} {} as {}",
        session.user.id,
        registration.name,
        registration.surname,
        registration.role_name.as_str()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered.", "result": result })),
    ))
}

async fn resolve_user(
    state: &State,
    session: &Session,
    display_name: &str,
) -> Result<String, AppError> {
    match state
        .gateway
        .user_id_by_display_name(&session.token, display_name)
        .await
    {
        Ok(user_id) => Ok(user_id),
        Err(RemoteError::Rejected { message, .. }) => {
            warn!("Could not resolve {display_name}: {message}");
            Err(FormError::NoUserSelected.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn adjust_score_handler(
    AxumState(state): AppState,
    session: Session,
    Json(payload): Json<ScoreAdjustment>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Coach)?;
    let adjustment = payload.validate()?;

    let user_id = resolve_user(&state, &session, &adjustment.display_name).await?;
    state
        .gateway
        .add_remove_score(&session.token, &user_id, adjustment.score)
        .await?;

    info!("{} changed score of {user_id} by {}", session.user.id, adjustment.score);

    Ok(Json(json!({
        "message": "Score updated.",
        "userId": user_id,
        "score": adjustment.score
    })))
}

pub async fn user_groups_handler(
    AxumState(state): AppState,
    session: Session,
    Path(display_name): Path<String>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Coach)?;

    let user_id = resolve_user(&state, &session, &display_name).await?;
    let groups = state
        .gateway
        .fetch_user_groups(&session.token, &user_id)
        .await?;

    Ok(Json(json!({ "displayName": display_name, "groupNames": groups })))
}

pub async fn edit_group_handler(
    AxumState(state): AppState,
    session: Session,
    Json(payload): Json<GroupEdit>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Coach)?;
    let edit = payload.validate()?;

    let user_id = resolve_user(&state, &session, &edit.display_name).await?;
    state
        .gateway
        .update_group(&session.token, &user_id, &edit.group_names)
        .await?;

    Ok(Json(json!({
        "message": "The groups have been successfully updated",
        "groupNames": edit.group_names
    })))
}

pub async fn transfer_handler(
    AxumState(state): AppState,
    session: Session,
    Json(payload): Json<Transfer>,
) -> Result<Json<TransferOutcome>, AppError> {
    session.require(Role::Member)?;
    let transfer = payload.validate(&session.user.id)?;

    let receiver = state
        .gateway
        .fetch_user(&session.token, &transfer.receiver_id)
        .await?;
    if receiver.id == session.user.id {
        return Err(FormError::SelfTransfer.into());
    }
    if !receiver.is_member() {
        return Err(FormError::CoachReceiver.into());
    }
    check_common_group(&session.user.group_names, &receiver.groups)?;

    match state
        .gateway
        .transfer_score(&session.token, &session.user.id, &receiver.id, transfer.score)
        .await?
    {
        TransferOutcome::Refused(message) => Err(AppError::Refused(message)),
        sent => {
            info!("{} sent {} to {}", session.user.id, transfer.score, receiver.id);
            Ok(Json(sent))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receiver {
    id: String,
    display_name: String,
}

pub async fn receivers_handler(
    AxumState(state): AppState,
    session: Session,
) -> Result<Json<Vec<Receiver>>, AppError> {
    session.require(Role::Member)?;

    let receivers = state
        .gateway
        .fetch_receivers(&session.token, &session.user)
        .await?
        .into_iter()
        .map(|record| Receiver {
            id: record.id,
            display_name: record.name,
        })
        .collect();

    Ok(Json(receivers))
}

pub async fn update_password_handler(
    AxumState(state): AppState,
    session: Session,
    Json(payload): Json<PasswordUpdate>,
) -> Result<Json<Value>, AppError> {
    let update = payload.validate()?;

    // Re-authenticating proves the old password; the extra session it opens is discarded.
    let check = match state
        .gateway
        .login(&session.user.username, &update.old_password)
        .await
    {
        Ok(check) => check,
        Err(RemoteError::InvalidCredentials) => return Err(FormError::WrongOldPassword.into()),
        Err(e) => return Err(e.into()),
    };
    if let Err(e) = state.gateway.logout(&check.session_token).await {
        warn!("Could not close verification session: {e}");
    }

    state
        .gateway
        .update_password(&session.token, &session.user.id, &update.new_password)
        .await?;

    Ok(Json(json!({ "message": "The password has been successfully updated!" })))
}

pub async fn avatars_handler(
    AxumState(state): AppState,
    session: Session,
) -> Result<Json<Vec<Avatar>>, AppError> {
    session.require(Role::Member)?;

    Ok(Json(state.gateway.fetch_avatars(&session.token).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarSelection {
    avatar_id: String,
}

pub async fn update_avatar_handler(
    AxumState(state): AppState,
    session: Session,
    Json(payload): Json<AvatarSelection>,
) -> Result<Json<Value>, AppError> {
    session.require(Role::Member)?;

    let avatar_id = payload.avatar_id.trim();
    if avatar_id.is_empty() {
        return Err(FormError::NoAvatarSelected.into());
    }

    state
        .gateway
        .update_avatar(&session.token, &session.user.id, avatar_id)
        .await?;

    Ok(Json(json!({
        "message": "Your avatar has been updated successfully.",
        "avatarId": avatar_id
    })))
}
