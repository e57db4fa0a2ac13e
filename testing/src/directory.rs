//! In-memory user directory.

use eventpass_core::error::{EventPassError, Result};
use eventpass_core::identity::UserDirectory;
use eventpass_core::types::{Role, User, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// In-memory user directory.
///
/// Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn insert(&self, user: User) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.id, user);
        }
    }

    /// Add a fresh user with `role` and return it.
    #[must_use]
    pub fn add(&self, role: Role) -> User {
        let user = User::new(UserId::new(), role);
        self.insert(user);
        user
    }

    /// Remove a user, as if the account had been deleted.
    pub fn remove(&self, id: UserId) {
        if let Ok(mut users) = self.users.lock() {
            users.remove(&id);
        }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send {
        let result = self
            .users
            .lock()
            .map(|users| users.get(&id).copied())
            .map_err(|_| EventPassError::Storage("directory lock poisoned".into()));
        async move { result }
    }
}
