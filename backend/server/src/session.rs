//! # Sessions
//!
//! Session tokens are issued by the backend on login and tracked here so each
//! signed-in user keeps their own board: roster snapshot plus selected view.
//!
//! - Token travels as `Authorization: Bearer <token>`
//! - Expires a fixed time after login, regardless of activity
//! - Unknown or expired tokens are rejected before the backend is asked
//! - The user's role is re-read from the backend on every request
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use dashmap::DashMap;
use roster::{Leaderboard, RemoteError, Role, remote::RemoteUser};
use tracing::{debug, info};

use crate::{error::AppError, state::State};

struct SessionEntry {
    issued: Instant,
    board: Leaderboard,
}

pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn insert(&self, token: &str) {
        self.sessions.insert(
            token.to_string(),
            SessionEntry {
                issued: Instant::now(),
                board: Leaderboard::new(),
            },
        );
    }

    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    fn expired(&self, entry: &SessionEntry) -> bool {
        entry.issued.elapsed() >= self.ttl
    }

    /// Drops the session if it has run out.
    pub fn is_live(&self, token: &str) -> bool {
        let expired = match self.sessions.get(token) {
            Some(entry) => self.expired(&entry),
            None => return false,
        };

        if expired {
            info!("Session expired, logging out");
            self.sessions.remove(token);
        }

        !expired
    }

    /// Runs `f` against the session's board. The entry stays locked for the
    /// duration of `f`, so `f` must not block.
    pub fn with_board<R>(
        &self,
        token: &str,
        f: impl FnOnce(&mut Leaderboard) -> R,
    ) -> Option<R> {
        let mut entry = self.sessions.get_mut(token)?;

        if self.expired(&entry) {
            return None;
        }

        Some(f(&mut entry.board))
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.issued.elapsed() < self.ttl);

        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!("Purged {purged} expired sessions");
        }

        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

pub fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Signed-in caller, resolved per request and handed to handlers explicitly.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: RemoteUser,
}

impl Session {
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.user.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(role))
        }
    }
}

impl FromRequestParts<Arc<State>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(&parts.headers).ok_or(AppError::Unauthorized)?;

        if !state.sessions.is_live(&token) {
            return Err(AppError::Unauthorized);
        }

        let user = match state.gateway.current_user(&token).await {
            Ok(user) => user,
            Err(RemoteError::Unauthorized) => {
                state.sessions.remove(&token);
                return Err(AppError::Unauthorized);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Session { token, user })
    }
}
