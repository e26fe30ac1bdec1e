use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Otp, OtpPurpose};

/// Persistence seam for OTP records. The engine only ever talks to this
/// trait; tests swap in an in-memory ledger.
#[async_trait]
pub trait OtpLedger: Send + Sync {
    /// Mark every unconsumed record for (subject, purpose) as consumed.
    /// Returns how many rows were invalidated.
    async fn invalidate_unconsumed(&self, subject: &str, purpose: OtpPurpose)
        -> anyhow::Result<u64>;

    async fn insert(&self, record: Otp) -> anyhow::Result<Otp>;

    /// Most recent unconsumed record for (subject, purpose) with this code.
    async fn find_unconsumed_matching(
        &self,
        subject: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> anyhow::Result<Option<Otp>>;

    /// Most recent unconsumed record regardless of code.
    async fn latest_unconsumed(
        &self,
        subject: &str,
        purpose: OtpPurpose,
    ) -> anyhow::Result<Option<Otp>>;

    async fn mark_consumed(&self, id: Uuid) -> anyhow::Result<()>;
}

pub struct PgOtpLedger {
    db: PgPool,
}

impl PgOtpLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OtpLedger for PgOtpLedger {
    async fn invalidate_unconsumed(
        &self,
        subject: &str,
        purpose: OtpPurpose,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE otps
               SET consumed = TRUE
             WHERE subject = $1 AND purpose = $2 AND NOT consumed
            "#,
        )
        .bind(subject)
        .bind(purpose)
        .execute(&self.db)
        .await
        .context("invalidate otps")?;
        Ok(result.rows_affected())
    }

    async fn insert(&self, record: Otp) -> anyhow::Result<Otp> {
        let otp = sqlx::query_as::<_, Otp>(
            r#"
            INSERT INTO otps (id, subject, code, purpose, delivery_method, expires_at, consumed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, subject, code, purpose, delivery_method, expires_at, consumed, created_at
            "#,
        )
        .bind(record.id)
        .bind(&record.subject)
        .bind(&record.code)
        .bind(record.purpose)
        .bind(record.delivery_method)
        .bind(record.expires_at)
        .bind(record.consumed)
        .bind(record.created_at)
        .fetch_one(&self.db)
        .await
        .context("insert otp")?;
        Ok(otp)
    }

    async fn find_unconsumed_matching(
        &self,
        subject: &str,
        purpose: OtpPurpose,
        code: &str,
    ) -> anyhow::Result<Option<Otp>> {
        let otp = sqlx::query_as::<_, Otp>(
            r#"
            SELECT id, subject, code, purpose, delivery_method, expires_at, consumed, created_at
              FROM otps
             WHERE subject = $1 AND purpose = $2 AND code = $3 AND NOT consumed
             ORDER BY created_at DESC
             LIMIT 1
            "#,
        )
        .bind(subject)
        .bind(purpose)
        .bind(code)
        .fetch_optional(&self.db)
        .await
        .context("find otp")?;
        Ok(otp)
    }

    async fn latest_unconsumed(
        &self,
        subject: &str,
        purpose: OtpPurpose,
    ) -> anyhow::Result<Option<Otp>> {
        let otp = sqlx::query_as::<_, Otp>(
            r#"
            SELECT id, subject, code, purpose, delivery_method, expires_at, consumed, created_at
              FROM otps
             WHERE subject = $1 AND purpose = $2 AND NOT consumed
             ORDER BY created_at DESC
             LIMIT 1
            "#,
        )
        .bind(subject)
        .bind(purpose)
        .fetch_optional(&self.db)
        .await
        .context("latest otp")?;
        Ok(otp)
    }

    async fn mark_consumed(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE otps SET consumed = TRUE WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("consume otp")?;
        Ok(())
    }
}
