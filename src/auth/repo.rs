use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "subscription_tier", rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_email_verified: bool,
    pub is_phone_verified: bool,
    pub subscription_tier: SubscriptionTier,
    pub subscription_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, email, password_hash, full_name, avatar_url, bio, phone_number, \
    is_active, is_admin, is_email_verified, is_phone_verified, \
    subscription_tier, subscription_expires_at, created_at, updated_at";

/// Fields settable at account creation.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_email_verified: bool,
}

/// Allow-listed profile fields a user may change about themselves.
/// Flags and tier are deliberately absent.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
}

/// Allow-listed fields an admin may override.
#[derive(Debug, Default, Deserialize)]
pub struct AdminChanges {
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_email_verified: Option<bool>,
    pub subscription_tier: Option<SubscriptionTier>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub subscription_expires_at: Option<OffsetDateTime>,
}

impl User {
    pub fn is_pro(&self) -> bool {
        self.subscription_tier == SubscriptionTier::Pro
            && self
                .subscription_expires_at
                .map_or(true, |exp| exp > OffsetDateTime::now_utc())
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn create(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, full_name, avatar_url, is_email_verified) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.full_name)
            .bind(&new.avatar_url)
            .bind(new.is_email_verified)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "UPDATE users SET \
                full_name = COALESCE($2, full_name), \
                avatar_url = COALESCE($3, avatar_url), \
                bio = COALESCE($4, bio), \
                phone_number = COALESCE($5, phone_number), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&changes.full_name)
            .bind(&changes.avatar_url)
            .bind(&changes.bio)
            .bind(&changes.phone_number)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    pub async fn admin_update(
        db: &PgPool,
        id: Uuid,
        changes: &AdminChanges,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "UPDATE users SET \
                is_active = COALESCE($2, is_active), \
                is_admin = COALESCE($3, is_admin), \
                is_email_verified = COALESCE($4, is_email_verified), \
                subscription_tier = COALESCE($5, subscription_tier), \
                subscription_expires_at = COALESCE($6, subscription_expires_at), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.is_active)
            .bind(changes.is_admin)
            .bind(changes.is_email_verified)
            .bind(changes.subscription_tier)
            .bind(changes.subscription_expires_at)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Hard delete; owned achievements, skills, goals and otps cascade.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn user(tier: SubscriptionTier, expires: Option<OffsetDateTime>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            full_name: None,
            avatar_url: None,
            bio: None,
            phone_number: None,
            is_active: true,
            is_admin: false,
            is_email_verified: true,
            is_phone_verified: false,
            subscription_tier: tier,
            subscription_expires_at: expires,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn free_tier_is_not_pro() {
        assert!(!user(SubscriptionTier::Free, None).is_pro());
    }

    #[test]
    fn pro_without_expiry_is_pro() {
        assert!(user(SubscriptionTier::Pro, None).is_pro());
    }

    #[test]
    fn pro_with_future_expiry_is_pro() {
        let exp = OffsetDateTime::now_utc() + Duration::days(30);
        assert!(user(SubscriptionTier::Pro, Some(exp)).is_pro());
    }

    #[test]
    fn pro_with_past_expiry_is_not_pro() {
        let exp = OffsetDateTime::now_utc() - Duration::days(1);
        assert!(!user(SubscriptionTier::Pro, Some(exp)).is_pro());
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let json = serde_json::to_string(&user(SubscriptionTier::Free, None)).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("alice@example.com"));
    }
}
