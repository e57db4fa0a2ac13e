//! PostgreSQL user directory (read-only).

use eventpass_core::error::Result;
use eventpass_core::identity::UserDirectory;
use eventpass_core::types::{Role, User, UserId};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{corrupt, storage_error};

/// Reads user records from the `users` table.
#[derive(Clone, Debug)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Create a directory over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserDirectory for PostgresUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, role FROM users WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("find user", &e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: Uuid = row.try_get("id").map_err(|e| storage_error("find user", &e))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| storage_error("find user", &e))?;
        let role: Role = role.parse().map_err(|e| corrupt("user role", e))?;

        Ok(Some(User::new(UserId::from_uuid(id), role)))
    }
}
