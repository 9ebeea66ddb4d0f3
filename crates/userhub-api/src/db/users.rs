//! User persistence operations.
//!
//! A user spans three tables: `users`, `user_app_identities` and
//! `user_metadata`. Reads assemble the three into a [`User`]; writes that
//! touch more than one table run in a transaction and lock the `users` row
//! first.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use userhub_core::{
    AppIdentity, MetadataEntry, MetadataWrite, NewUser, SocialApp, StoreError, TokenUpdate, User,
    UserId, UserStore,
};

const USER_COLUMNS: &str = "id, username, created_at, updated_at";
const IDENTITY_COLUMNS: &str = "user_id, app, app_id, username, token, token_secret, \
     profile_url, profile_img_url, banner_img_url";
const METADATA_COLUMNS: &str = "user_id, key, value";

/// [`UserStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(user) = user else {
            return Ok(None);
        };

        let identities = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM user_app_identities WHERE user_id = $1 ORDER BY app"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let metadata = sqlx::query_as::<_, MetadataRow>(&format!(
            "SELECT {METADATA_COLUMNS} FROM user_metadata WHERE user_id = $1 ORDER BY position"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(assemble(vec![user], identities, metadata)?.pop())
    }
}

/// Map a driver error to the store taxonomy.
fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Lock the user row for the rest of the transaction.
async fn lock_user(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: &UserId,
) -> Result<(), StoreError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(backend)?
        .map(|_| ())
        .ok_or(StoreError::UserNotFound(*id))
}

async fn touch_user(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: &UserId,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE users SET updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(backend)?;
    Ok(())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_all(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let identities = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM user_app_identities ORDER BY user_id, app"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let metadata = sqlx::query_as::<_, MetadataRow>(&format!(
            "SELECT {METADATA_COLUMNS} FROM user_metadata ORDER BY user_id, position"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        assemble(users, identities, metadata)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.load(*id.as_uuid()).await
    }

    async fn get_by_app_id(
        &self,
        app: SocialApp,
        app_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM user_app_identities WHERE app = $1 AND app_id = $2",
        )
        .bind(app.as_str())
        .bind(app_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match user_id {
            Some(id) => self.load(id).await,
            None => Ok(None),
        }
    }

    async fn add(&self, new: NewUser) -> Result<User, StoreError> {
        let user = User::from_new(new);
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO users (id, username, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for identity in &user.identities {
            sqlx::query(&format!(
                "INSERT INTO user_app_identities ({IDENTITY_COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ))
            .bind(user.id.as_uuid())
            .bind(identity.app.as_str())
            .bind(&identity.app_id)
            .bind(&identity.username)
            .bind(&identity.token)
            .bind(&identity.token_secret)
            .bind(&identity.profile_url)
            .bind(&identity.profile_img_url)
            .bind(&identity.banner_img_url)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateIdentity {
                        app: identity.app,
                        app_id: identity.app_id.clone(),
                    }
                } else {
                    backend(e)
                }
            })?;
        }

        tx.commit().await.map_err(backend)?;
        tracing::trace!(user_id = %user.id, "user inserted");
        Ok(user)
    }

    async fn rm(&self, id: &UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_token(
        &self,
        id: &UserId,
        app: SocialApp,
        update: TokenUpdate,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        lock_user(&mut tx, id).await?;

        let result = sqlx::query(
            "UPDATE user_app_identities SET token = $1, token_secret = $2
             WHERE user_id = $3 AND app = $4",
        )
        .bind(&update.token)
        .bind(&update.token_secret)
        .bind(id.as_uuid())
        .bind(app.as_str())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let updated = result.rows_affected() > 0;
        if updated {
            touch_user(&mut tx, id).await?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(updated)
    }

    async fn upsert_metadata(
        &self,
        id: &UserId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<MetadataWrite, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        lock_user(&mut tx, id).await?;

        // xmax is zero only for freshly inserted tuples.
        let inserted = sqlx::query_scalar::<_, bool>(
            "INSERT INTO user_metadata (user_id, key, value) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, key) DO UPDATE SET value = EXCLUDED.value
             RETURNING (xmax = 0)",
        )
        .bind(id.as_uuid())
        .bind(key)
        .bind(&value)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        touch_user(&mut tx, id).await?;
        tx.commit().await.map_err(backend)?;

        Ok(if inserted {
            MetadataWrite::Created
        } else {
            MetadataWrite::Updated
        })
    }
}

// ── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    user_id: Uuid,
    app: String,
    app_id: String,
    username: String,
    token: String,
    token_secret: String,
    profile_url: String,
    profile_img_url: String,
    banner_img_url: String,
}

impl IdentityRow {
    fn into_identity(self) -> Result<AppIdentity, StoreError> {
        let app = self
            .app
            .parse()
            .map_err(|e: userhub_core::ValidationError| StoreError::Backend(e.to_string()))?;
        Ok(AppIdentity {
            app,
            app_id: self.app_id,
            username: self.username,
            token: self.token,
            token_secret: self.token_secret,
            profile_url: self.profile_url,
            profile_img_url: self.profile_img_url,
            banner_img_url: self.banner_img_url,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MetadataRow {
    user_id: Uuid,
    key: String,
    value: serde_json::Value,
}

/// Join rows from the three tables into users, keeping the order of `users`
/// and the row order within each child table.
fn assemble(
    users: Vec<UserRow>,
    identities: Vec<IdentityRow>,
    metadata: Vec<MetadataRow>,
) -> Result<Vec<User>, StoreError> {
    let mut identities_by_user: HashMap<Uuid, Vec<AppIdentity>> = HashMap::new();
    for row in identities {
        let user_id = row.user_id;
        identities_by_user
            .entry(user_id)
            .or_default()
            .push(row.into_identity()?);
    }

    let mut metadata_by_user: HashMap<Uuid, Vec<MetadataEntry>> = HashMap::new();
    for row in metadata {
        metadata_by_user
            .entry(row.user_id)
            .or_default()
            .push(MetadataEntry {
                key: row.key,
                value: row.value,
            });
    }

    Ok(users
        .into_iter()
        .map(|row| User {
            id: UserId::from_uuid(row.id),
            username: row.username,
            identities: identities_by_user.remove(&row.id).unwrap_or_default(),
            metadata: metadata_by_user.remove(&row.id).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect())
}
