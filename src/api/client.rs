//! Periscope API client

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use super::models::{
    BroadcastIdRequest, Endpoint, FormField, SearchRequest, UserIdRequest, WatchPing,
};
use super::response::{bool_response, extract_field, find_user_match};
use super::session::Session;
use crate::config::PUBID_KEY;

/// Periscope API client
///
/// One method per remote endpoint. Requests go through the wrapped
/// [`Session`], which owns authentication and the configuration store.
pub struct PeriApi<S> {
    /// Authenticated session
    session: S,
    /// Public id of the session's account, once known
    pubid: Option<String>,
    /// API base URL
    base_url: String,
}

impl<S: Session> PeriApi<S> {
    /// Create a client, seeding the public id from the session's configuration
    pub fn new(session: S) -> Self {
        let pubid = session.config().get(PUBID_KEY).map(str::to_string);
        let base_url = session.config().base_url().to_string();
        Self { session, pubid, base_url }
    }

    /// The wrapped session
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Consume the client, returning the session
    pub fn into_session(self) -> S {
        self.session
    }

    fn url(&self, endpoint: Endpoint) -> String {
        endpoint.url(&self.base_url)
    }

    /// POST a JSON body
    async fn post_json<T: Serialize>(&self, endpoint: Endpoint, payload: &T) -> ApiResult<Value> {
        let url = self.url(endpoint);
        let body = serde_json::to_value(payload)?;
        let res = self.session.post(&url, body.clone()).await;
        debug!("{}: params:{} result={:?}", url, body, res);
        res
    }

    /// GET with query parameters; bodies that are not JSON read as `{}`
    async fn get_json(&self, endpoint: Endpoint, query: &[(String, String)]) -> ApiResult<Value> {
        let url = self.url(endpoint);
        let body = self.session.get(&url, query).await?;
        debug!("{}: params:{:?} result={}", url, query, body);
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            debug!("{}: response is not JSON ({}), using empty object", url, e);
            Value::Object(Default::default())
        }))
    }

    /// POST multipart/form-data
    async fn post_multipart(&self, endpoint: Endpoint, fields: &[FormField]) -> ApiResult<Value> {
        let url = self.url(endpoint);
        let res = self.session.multipart_post(&url, fields).await;
        debug!("{}: params:{:?} result={:?}", url, fields, res);
        res
    }

    /// Public id of the session's account
    ///
    /// Resolved by searching for the session's username on first use, then
    /// cached and written to the configuration.
    pub async fn pubid(&mut self) -> ApiResult<String> {
        if let Some(pubid) = &self.pubid {
            return Ok(pubid.clone());
        }

        let name = self.session.name().to_string();
        let pubid = self.find_user_id(&name).await?;

        let config = self.session.config_mut();
        let previous = config.remove(PUBID_KEY);
        config.set(PUBID_KEY, pubid.as_str());
        if let Err(e) = config.write() {
            match previous {
                Some(value) => config.set(PUBID_KEY, value),
                None => {
                    config.remove(PUBID_KEY);
                }
            }
            return Err(ApiError::Config(format!("{:#}", e)));
        }
        info!("Resolved public id for {}: {}", name, pubid);

        self.pubid = Some(pubid.clone());
        Ok(pubid)
    }

    /// Follow a user
    pub async fn follow(&self, user_id: &str) -> ApiResult<bool> {
        bool_response(&self.post_json(Endpoint::Follow, &UserIdRequest::new(user_id)).await?)
    }

    /// Unfollow a user
    pub async fn unfollow(&self, user_id: &str) -> ApiResult<bool> {
        bool_response(&self.post_json(Endpoint::Unfollow, &UserIdRequest::new(user_id)).await?)
    }

    /// List a user's broadcasts
    pub async fn get_user_broadcast_history(&self, user_id: &str) -> ApiResult<Value> {
        self.post_json(Endpoint::UserBroadcasts, &UserIdRequest::new(user_id)).await
    }

    /// List the users `user_id` follows
    ///
    /// Transport failures, error statuses and unreadable bodies yield an
    /// empty list.
    pub async fn get_following(&self, user_id: &str) -> ApiResult<Value> {
        match self.post_json(Endpoint::Following, &UserIdRequest::new(user_id)).await {
            Err(e) if e.is_io() => {
                warn!("following {}: {}, returning empty list", user_id, e);
                Ok(Value::Array(Vec::new()))
            }
            res => res,
        }
    }

    /// Get a user's profile
    ///
    /// Transport failures, error statuses and unreadable bodies yield the
    /// error description as a JSON string.
    pub async fn get_user(&self, user_id: &str) -> ApiResult<Value> {
        match self.post_json(Endpoint::User, &UserIdRequest::new(user_id)).await {
            Err(e) if e.is_io() => {
                warn!("user {}: {}", user_id, e);
                Ok(Value::String(e.to_string()))
            }
            res => res,
        }
    }

    /// Broadcast feed of followed users
    pub async fn notifications(&self) -> ApiResult<Value> {
        self.post_json(Endpoint::FollowingBroadcastFeed, &serde_json::Map::new()).await
    }

    /// Users the session's account follows
    pub async fn following(&mut self) -> ApiResult<Value> {
        let pubid = self.pubid().await?;
        self.post_json(Endpoint::Following, &UserIdRequest::new(pubid)).await
    }

    /// Access details (such as the stream URL) for a broadcast
    pub async fn get_access(&self, broadcast_id: &str) -> ApiResult<Value> {
        self.post_json(Endpoint::AccessChannel, &BroadcastIdRequest::new(broadcast_id)).await
    }

    /// Public broadcast description, `None` if the service returned none
    pub async fn get_broadcast_info(&self, broadcast_id: &str) -> ApiResult<Option<Value>> {
        let query = BroadcastIdRequest::new(broadcast_id).query();
        let response = self.get_json(Endpoint::GetBroadcastPublic, &query).await?;
        Ok(extract_field(response, "broadcast"))
    }

    /// Look up a user id by username (case-insensitive exact match)
    pub async fn find_user_id(&self, username: &str) -> ApiResult<String> {
        let search = SearchRequest { search: username.to_string() };
        let results = self.post_json(Endpoint::UserSearch, &search).await?;
        find_user_match(&results, username)
    }

    /// Send a watch heartbeat, or end watching when `stop` is set
    ///
    /// Must be repeated about every 30 seconds to count as watching.
    pub async fn ping_watching(
        &self,
        broadcast_id: &str,
        session: &str,
        n_hearts: u32,
        stop: bool,
    ) -> ApiResult<Value> {
        let ping = WatchPing {
            broadcast_id: broadcast_id.to_string(),
            session: session.to_string(),
            n_hearts,
            stop,
        };
        self.post_multipart(ping.endpoint(), &ping.form()).await
    }
}
