//! # Remote
//!
//! Client for the hosted Parse backend. Every call carries the application id
//! and REST key; calls made on behalf of a user also carry their session token.
//!
//! ## Endpoints
//! - `GET /classes/_User`: roster, highest all-time score first
//! - `GET /classes/_User?where=..`: transfer receivers sharing a group
//! - `GET /login`, `GET /users/me`, `POST /logout`: sessions
//! - `POST /requestPasswordReset`, `PUT /users/{id}`: passwords
//! - `POST /functions/{name}`: cloud functions, answer wrapped in `result`
//!
//! ## Errors
//! Parse answers failures with `{ "code": int, "error": string }`.
//! - 209 or HTTP 401/403: session no longer valid
//! - 101 on login: wrong username or password
//! - anything else is passed through as a rejection
//!
//! Ids are pushed as single path segments, so a `/` inside one never reaches
//! another endpoint.
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    forms::{Registration, is_object_id},
    records::{
        FIELD_GROUPS, FIELD_ID, FIELD_NAME, FIELD_ROLE, Role, Roster, UserScoreRecord, group_names,
    },
};

pub const DEFAULT_SERVER_URL: &str = "https://parseapi.back4app.com";
pub const ROSTER_LIMIT: u32 = 1000;

const RECEIVER_KEYS: &str = "objectId,displayName,roleName,groupNames";

const HEADER_APPLICATION_ID: &str = "X-Parse-Application-Id";
const HEADER_REST_API_KEY: &str = "X-Parse-REST-API-Key";
const HEADER_SESSION_TOKEN: &str = "X-Parse-Session-Token";
const HEADER_REVOCABLE_SESSION: &str = "X-Parse-Revocable-Session";

const CODE_OBJECT_NOT_FOUND: i64 = 101;
const CODE_INVALID_SESSION: i64 = 209;

pub const TRANSFER_REFUSALS: [&str; 3] = [
    "You don't have that much score!",
    "The user cannot receive more than 10 score per month.",
    "The user cannot send more than 10 score per month.",
];

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Session is invalid or expired")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Backend rejected request ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Unexpected backend response: {0}")]
    Malformed(String),

    #[error("Backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid backend url: {0}")]
    InvalidServerUrl(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct Results {
    results: Vec<Value>,
}

#[derive(Deserialize)]
struct FunctionResult<T> {
    result: T,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub server_url: String,
    pub application_id: String,
    pub rest_api_key: String,
    pub timeout: Duration,
}

/// Signed-in user as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub group_names: Vec<String>,
}

impl RemoteUser {
    pub fn from_remote(value: &Value) -> Result<Self, RemoteError> {
        let id = value
            .get(FIELD_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::Malformed("user without objectId".to_string()))?;

        let text = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            id: id.to_string(),
            username: text("username"),
            display_name: text(FIELD_NAME),
            role: Role::from_remote(value.get(FIELD_ROLE).and_then(Value::as_str)),
            group_names: group_names(value.get(FIELD_GROUPS)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub session_token: String,
    pub user: RemoteUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayName {
    pub display_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl DisplayName {
    pub fn is_member(&self) -> bool {
        self.role.as_deref() == Some(Role::Member.as_str())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayNames {
    #[serde(default)]
    user_display_names: Vec<DisplayName>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserId {
    user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Avatar {
    pub object_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "message")]
pub enum TransferOutcome {
    Sent(String),
    Refused(String),
}

impl TransferOutcome {
    /// The function answers success and refusal alike with a plain message.
    pub fn from_message(message: String) -> Self {
        if TRANSFER_REFUSALS.contains(&message.as_str()) {
            TransferOutcome::Refused(message)
        } else {
            TransferOutcome::Sent(message)
        }
    }
}

/// Group lists come back either as names or as `{ "name": .. }` objects.
pub fn group_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|groups| {
            groups
                .iter()
                .filter_map(|group| {
                    group
                        .as_str()
                        .or_else(|| group.get("name").and_then(Value::as_str))
                })
                .filter(|group| !group.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct Gateway {
    client: Client,
    server_url: Url,
    application_id: String,
    rest_api_key: String,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, RemoteError> {
        let server_url = Url::parse(&config.server_url)
            .map_err(|e| RemoteError::InvalidServerUrl(format!("{}: {e}", config.server_url)))?;
        if server_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidServerUrl(config.server_url.clone()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            server_url,
            application_id: config.application_id.clone(),
            rest_api_key: config.rest_api_key.clone(),
        })
    }

    pub fn server_url(&self) -> &str {
        self.server_url.as_str()
    }

    /// Appends each segment percent-encoded, `.` and `..` are dropped.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.server_url.clone();

        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }

    fn request(&self, method: Method, path: &[&str], token: Option<&str>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(HEADER_APPLICATION_ID, &self.application_id)
            .header(HEADER_REST_API_KEY, &self.rest_api_key);

        match token {
            Some(token) => builder.header(HEADER_SESSION_TOKEN, token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, RemoteError> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        #[cfg(feature = "verbose")]
        debug!("Backend answered {status}: {}", String::from_utf8_lossy(&bytes));

        if !status.is_success() {
            return Err(error_from(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Malformed(e.to_string()))
    }

    pub async fn fetch_roster(&self, token: &str) -> Result<Roster, RemoteError> {
        let limit = ROSTER_LIMIT.to_string();
        let builder = self
            .request(Method::GET, &["classes", "_User"], Some(token))
            .query(&[
                ("order", "-userScore"),
                ("include", "avatar"),
                ("limit", limit.as_str()),
            ]);

        let Results { results } = self.send(builder).await?;
        let roster = Roster::from_remote(&results);

        debug!("Fetched roster of {} of {} users", roster.len(), results.len());

        Ok(roster)
    }

    pub async fn fetch_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<UserScoreRecord, RemoteError> {
        if !is_object_id(user_id) {
            return Err(RemoteError::Rejected {
                code: CODE_OBJECT_NOT_FOUND,
                message: format!("{user_id:?} is not an object id"),
            });
        }

        let builder = self.request(Method::GET, &["classes", "_User", user_id], Some(token));
        let value: Value = self.send(builder).await?;

        UserScoreRecord::from_remote(&value).map_err(|e| RemoteError::Malformed(e.to_string()))
    }

    /// Members other than `sender` sharing at least one of its groups.
    pub async fn fetch_receivers(
        &self,
        token: &str,
        sender: &RemoteUser,
    ) -> Result<Vec<UserScoreRecord>, RemoteError> {
        if sender.group_names.is_empty() {
            return Ok(Vec::new());
        }

        let filter = json!({
            "groupNames": { "$in": sender.group_names },
            "objectId": { "$ne": sender.id },
        })
        .to_string();
        let limit = ROSTER_LIMIT.to_string();
        let builder = self
            .request(Method::GET, &["classes", "_User"], Some(token))
            .query(&[
                ("where", filter.as_str()),
                ("keys", RECEIVER_KEYS),
                ("limit", limit.as_str()),
            ]);

        let Results { results } = self.send(builder).await?;
        let receivers: Vec<UserScoreRecord> = Roster::from_remote(&results)
            .members()
            .into_iter()
            .filter(|record| record.id != sender.id)
            .collect();

        debug!("{} can send score to {} users", sender.id, receivers.len());

        Ok(receivers)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Login, RemoteError> {
        let builder = self
            .request(Method::GET, &["login"], None)
            .header(HEADER_REVOCABLE_SESSION, "1")
            .query(&[("username", username), ("password", password)]);

        let value: Value = match self.send(builder).await {
            Ok(value) => value,
            Err(RemoteError::Rejected { code, .. }) if code == CODE_OBJECT_NOT_FOUND => {
                return Err(RemoteError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let session_token = value
            .get("sessionToken")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Malformed("login without sessionToken".to_string()))?
            .to_string();

        Ok(Login {
            session_token,
            user: RemoteUser::from_remote(&value)?,
        })
    }

    pub async fn current_user(&self, token: &str) -> Result<RemoteUser, RemoteError> {
        let value: Value = self
            .send(self.request(Method::GET, &["users", "me"], Some(token)))
            .await?;

        RemoteUser::from_remote(&value)
    }

    pub async fn logout(&self, token: &str) -> Result<(), RemoteError> {
        let _: Value = self
            .send(self.request(Method::POST, &["logout"], Some(token)).json(&json!({})))
            .await?;

        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), RemoteError> {
        let builder = self
            .request(Method::POST, &["requestPasswordReset"], None)
            .json(&json!({ "email": email }));

        let _: Value = self.send(builder).await?;

        Ok(())
    }

    pub async fn update_password(
        &self,
        token: &str,
        user_id: &str,
        password: &str,
    ) -> Result<(), RemoteError> {
        let builder = self
            .request(Method::PUT, &["users", user_id], Some(token))
            .json(&json!({ "password": password }));

        let _: Value = self.send(builder).await?;

        Ok(())
    }

    pub async fn call<B, T>(
        &self,
        function: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("Calling cloud function {function}");

        let builder = self
            .request(Method::POST, &["functions", function], token)
            .json(body);

        let FunctionResult { result } = self.send(builder).await?;

        Ok(result)
    }

    pub async fn create_user(
        &self,
        token: &str,
        registration: &Registration,
    ) -> Result<Value, RemoteError> {
        self.call("createUser", Some(token), registration).await
    }

    pub async fn add_remove_score(
        &self,
        token: &str,
        receiver_id: &str,
        score: i64,
    ) -> Result<Value, RemoteError> {
        let body = json!({ "receiverId": receiver_id, "score": score });

        self.call("addRemoveScore", Some(token), &body).await
    }

    pub async fn display_names(&self, token: &str) -> Result<Vec<DisplayName>, RemoteError> {
        let names: DisplayNames = self
            .call("getAllDisplayNames", Some(token), &json!({}))
            .await?;

        Ok(names.user_display_names)
    }

    pub async fn user_id_by_display_name(
        &self,
        token: &str,
        display_name: &str,
    ) -> Result<String, RemoteError> {
        let body = json!({ "displayName": display_name });
        let UserId { user_id } = self
            .call("getUserIdsByDisplayName", Some(token), &body)
            .await?;

        user_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::Rejected {
                code: CODE_OBJECT_NOT_FOUND,
                message: format!("No user named {display_name}"),
            })
    }

    pub async fn fetch_groups(&self, token: &str) -> Result<Vec<String>, RemoteError> {
        let groups: Value = self.call("fetchGroups", Some(token), &json!({})).await?;

        if !groups.is_array() {
            warn!("fetchGroups did not answer with a list");
        }

        Ok(group_list(&groups))
    }

    pub async fn fetch_user_groups(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<String>, RemoteError> {
        let body = json!({ "userId": user_id });
        let groups: Value = self.call("fetchUserGroups", Some(token), &body).await?;

        Ok(group_list(&groups))
    }

    pub async fn update_group(
        &self,
        token: &str,
        user_id: &str,
        group_names: &[String],
    ) -> Result<Value, RemoteError> {
        let body = json!({ "userId": user_id, "groupNames": group_names });

        self.call("updateGroup", Some(token), &body).await
    }

    pub async fn transfer_score(
        &self,
        token: &str,
        sender_id: &str,
        receiver_id: &str,
        score: i64,
    ) -> Result<TransferOutcome, RemoteError> {
        let body = json!({ "score": score, "senderId": sender_id, "receiverId": receiver_id });
        let message: Value = self.call("transferScore", Some(token), &body).await?;

        let message = match message {
            Value::String(message) => message,
            other => other.to_string(),
        };

        Ok(TransferOutcome::from_message(message))
    }

    pub async fn fetch_avatars(&self, token: &str) -> Result<Vec<Avatar>, RemoteError> {
        self.call("fetchAvatars", Some(token), &json!({})).await
    }

    pub async fn update_avatar(
        &self,
        token: &str,
        user_id: &str,
        avatar_id: &str,
    ) -> Result<Value, RemoteError> {
        let body = json!({ "objectId": user_id, "avatarId": avatar_id });

        self.call("updateAvatar", Some(token), &body).await
    }

    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<Value, RemoteError> {
        let body = json!({ "token": reset_token, "newPassword": new_password });

        self.call("resetPassword", None, &body).await
    }
}

fn error_from(status: StatusCode, bytes: &[u8]) -> RemoteError {
    let body: Option<ErrorBody> = serde_json::from_slice(bytes).ok();
    let code = body.as_ref().and_then(|body| body.code);

    if code == Some(CODE_INVALID_SESSION)
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return RemoteError::Unauthorized;
    }

    let message = body
        .and_then(|body| body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    RemoteError::Rejected {
        code: code.unwrap_or(i64::from(status.as_u16())),
        message,
    }
}
