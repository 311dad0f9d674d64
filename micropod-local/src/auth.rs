use std::collections::HashMap;

use log::info;
use parking_lot::Mutex;
use uuid::Uuid;

use micropod_core::{AuthProvider, StoreError, User, UserId};

#[derive(Default)]
struct AuthInner {
    users: HashMap<String, User>,
    current: Option<User>,
}

/// In-process user registry. Signing in with an unknown username registers
/// it.
#[derive(Default)]
pub struct MemoryAuth {
    inner: Mutex<AuthInner>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().users.len()
    }
}

impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<User> {
        self.inner.lock().current.clone()
    }

    fn sign_in(&self, username: &str) -> Result<User, StoreError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StoreError::Validation("username is required".into()));
        }
        let mut inner = self.inner.lock();
        let user = inner
            .users
            .entry(username.to_lowercase())
            .or_insert_with(|| User {
                id: UserId::new(Uuid::new_v4().to_string()),
                username: username.to_string(),
            })
            .clone();
        info!("Signed in as {}", user.username);
        inner.current = Some(user.clone());
        Ok(user)
    }

    fn sign_out(&self) {
        if let Some(user) = self.inner.lock().current.take() {
            info!("Signed out {}", user.username);
        }
    }
}
