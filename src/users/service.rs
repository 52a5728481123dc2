//! User service layer

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CoreError, CoreResult};
use crate::users::{CreateUserRequest, User, UserRole};

#[derive(Clone)]
pub struct UserService {
    db_pool: SqlitePool,
}

impl UserService {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Create a user account. Usernames are unique.
    pub async fn create_user(&self, request: CreateUserRequest) -> CoreResult<User> {
        request.validate()?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, role, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.username)
        .bind(request.role.unwrap_or(UserRole::Member))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: Uuid) -> CoreResult<User> {
        self.find_user(id)
            .await?
            .ok_or(CoreError::NotFound("user not found".to_string()))
    }

    /// Look up a user by ID, returning None when absent
    pub async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(user)
    }

    /// Resolve a user and require a staff role (moderator or admin)
    pub async fn require_staff(&self, id: Uuid) -> CoreResult<User> {
        let user = self.get_user(id).await?;

        if !user.role.is_staff() {
            return Err(CoreError::Forbidden(
                "staff role required for this action".to_string(),
            ));
        }

        Ok(user)
    }

    /// All staff user IDs, for dispute notifications.
    ///
    /// Runs against the caller's open transaction so the notify fan-out stays
    /// in the same atomic unit as the dispute itself.
    pub async fn staff_ids_tx(&self, conn: &mut SqliteConnection) -> CoreResult<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM users WHERE role IN ('moderator', 'admin')",
        )
        .fetch_all(conn)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
