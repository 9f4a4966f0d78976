//! Signed-in user context. One explicit object owned by `AppState` and handed
//! to whatever needs an identity; persistence calls are scoped by its user id.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::user::{LoginRequest, RegisterRequest, User};
use crate::store::{RestStore, StoreError};

#[derive(Clone, Default)]
pub struct Session {
    current: Arc<RwLock<Option<User>>>,
}

impl Session {
    pub async fn current(&self) -> Option<User> {
        self.current.read().await.clone()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|u| u.id.clone())
    }

    async fn set(&self, user: User) {
        info!("Session user set to {}", user.id);
        *self.current.write().await = Some(user);
    }

    pub async fn register(
        &self,
        store: &RestStore,
        request: &RegisterRequest,
    ) -> Result<User, StoreError> {
        let user = store.register(request).await?;
        self.set(user.clone()).await;
        Ok(user)
    }

    pub async fn login(&self, store: &RestStore, request: &LoginRequest) -> Result<User, StoreError> {
        let user = store.login(request).await?;
        self.set(user.clone()).await;
        Ok(user)
    }

    pub async fn logout(&self) {
        if let Some(user) = self.current.write().await.take() {
            info!("Session cleared for {}", user.id);
        }
    }

    /// Re-reads the current user from the persistence API. A user the server
    /// no longer knows is signed out; an unreachable server keeps the cached copy.
    pub async fn refresh(&self, store: &RestStore) -> Option<User> {
        let user_id = self.user_id().await?;

        match store.get_user(&user_id).await {
            Ok(Some(user)) => {
                self.set(user.clone()).await;
                Some(user)
            }
            Ok(None) => {
                warn!("User {user_id} no longer exists; clearing session");
                self.logout().await;
                None
            }
            Err(e) => {
                warn!("Failed to refresh user {user_id}: {e}");
                self.current().await
            }
        }
    }

    /// Writes profile changes through to the server and keeps the session in step.
    pub async fn update_profile(
        &self,
        store: &RestStore,
        updates: &Value,
    ) -> Result<Option<User>, StoreError> {
        let Some(user_id) = self.user_id().await else {
            return Ok(None);
        };
        let user = store.update_user(&user_id, updates).await?;
        self.set(user.clone()).await;
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    async fn spawn_mock(user_exists: Arc<AtomicBool>) -> String {
        let router = Router::new()
            .route(
                "/api/auth/login",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({"id": "u-1", "name": "Riley", "email": body["email"]}))
                }),
            )
            .route(
                "/api/users/:id",
                get(
                    |State(exists): State<Arc<AtomicBool>>, Path(id): Path<String>| async move {
                        if exists.load(Ordering::SeqCst) {
                            (
                                StatusCode::OK,
                                Json(json!({"id": id, "name": "Riley Updated", "email": "r@x.io"})),
                            )
                        } else {
                            (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"})))
                        }
                    },
                )
                .patch(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                    Json(json!({"id": id, "name": body["name"], "email": "r@x.io"}))
                }),
            )
            .with_state(user_exists);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn credentials() -> LoginRequest {
        LoginRequest {
            email: "r@x.io".to_string(),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_sets_and_logout_clears() {
        let store = RestStore::new(&spawn_mock(Arc::new(AtomicBool::new(true))).await);
        let session = Session::default();
        assert!(session.current().await.is_none());

        session.login(&store, &credentials()).await.unwrap();
        assert_eq!(session.user_id().await.as_deref(), Some("u-1"));

        session.logout().await;
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rereads_from_server() {
        let store = RestStore::new(&spawn_mock(Arc::new(AtomicBool::new(true))).await);
        let session = Session::default();
        session.login(&store, &credentials()).await.unwrap();

        let refreshed = session.refresh(&store).await.unwrap();
        assert_eq!(refreshed.name, "Riley Updated");
        assert_eq!(session.current().await.unwrap().name, "Riley Updated");
    }

    #[tokio::test]
    async fn test_refresh_clears_session_for_deleted_user() {
        let exists = Arc::new(AtomicBool::new(true));
        let store = RestStore::new(&spawn_mock(exists.clone()).await);
        let session = Session::default();
        session.login(&store, &credentials()).await.unwrap();

        exists.store(false, Ordering::SeqCst);

        assert!(session.refresh(&store).await.is_none());
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_keeps_cached_user_when_server_unreachable() {
        let live = RestStore::new(&spawn_mock(Arc::new(AtomicBool::new(true))).await);
        let session = Session::default();
        session.login(&live, &credentials()).await.unwrap();

        let offline = RestStore::new("http://127.0.0.1:9/api");
        let cached = session.refresh(&offline).await.unwrap();
        assert_eq!(cached.id, "u-1");
    }

    #[tokio::test]
    async fn test_update_profile_writes_through() {
        let store = RestStore::new(&spawn_mock(Arc::new(AtomicBool::new(true))).await);
        let session = Session::default();
        assert!(session
            .update_profile(&store, &json!({"name": "Nobody"}))
            .await
            .unwrap()
            .is_none());

        session.login(&store, &credentials()).await.unwrap();
        let user = session
            .update_profile(&store, &json!({"name": "Riley Q"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.name, "Riley Q");
        assert_eq!(session.current().await.unwrap().name, "Riley Q");
    }
}
