//! Data models for Periscope API requests

use serde::{Deserialize, Serialize};

/// Remote endpoints consumed by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Follow,
    Unfollow,
    UserBroadcasts,
    Following,
    User,
    FollowingBroadcastFeed,
    AccessChannel,
    GetBroadcastPublic,
    UserSearch,
    PingWatching,
    StopWatching,
}

impl Endpoint {
    /// Path segment appended to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
            Self::UserBroadcasts => "userBroadcasts",
            Self::Following => "following",
            Self::User => "user",
            Self::FollowingBroadcastFeed => "followingBroadcastFeed",
            Self::AccessChannel => "accessChannel",
            Self::GetBroadcastPublic => "getBroadcastPublic",
            Self::UserSearch => "userSearch",
            Self::PingWatching => "pingWatching",
            Self::StopWatching => "stopWatching",
        }
    }

    /// Full URL of this endpoint under `base`
    pub fn url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.path())
    }
}

/// Body for endpoints keyed by a user id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdRequest {
    pub user_id: String,
}

impl UserIdRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

/// Body for endpoints keyed by a broadcast id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastIdRequest {
    pub broadcast_id: String,
}

impl BroadcastIdRequest {
    pub fn new(broadcast_id: impl Into<String>) -> Self {
        Self { broadcast_id: broadcast_id.into() }
    }

    /// Query string pairs for GET endpoints
    pub fn query(&self) -> Vec<(String, String)> {
        vec![("broadcast_id".to_string(), self.broadcast_id.clone())]
    }
}

/// Body for `userSearch`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub search: String,
}

/// A single text field of a multipart/form-data request
///
/// Sent with an empty filename, which the watch endpoints expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Heartbeat telling the service a viewer session is still watching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPing {
    /// Broadcast being watched
    pub broadcast_id: String,
    /// Viewer session returned by `accessChannel`
    pub session: String,
    /// Hearts sent since the previous ping
    pub n_hearts: u32,
    /// End the viewer session instead of extending it
    pub stop: bool,
}

impl WatchPing {
    /// Endpoint this ping is sent to
    pub fn endpoint(&self) -> Endpoint {
        if self.stop { Endpoint::StopWatching } else { Endpoint::PingWatching }
    }

    /// Form fields in wire order
    pub fn form(&self) -> Vec<FormField> {
        vec![
            FormField::new("broadcast_id", self.broadcast_id.as_str()),
            FormField::new("session", self.session.as_str()),
            FormField::new("n_comments", "0"),
            FormField::new("n_hearts", self.n_hearts.to_string()),
        ]
    }
}
