use std::sync::Arc;

use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use super::{DeliveryMethod, Otp, OtpLedger, OtpPurpose, OtpSubject};

pub const OTP_EXPIRY_MINUTES: i64 = 10;

/// Minimum gap between issuances for the same (subject, purpose).
pub const REISSUE_COOLDOWN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("a code was issued too recently for this subject")]
    Cooldown,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Issues and verifies single-use codes. Invariant: after `issue` returns,
/// at most one unconsumed record exists per (subject, purpose), and it is
/// the returned one.
#[derive(Clone)]
pub struct OtpEngine {
    ledger: Arc<dyn OtpLedger>,
}

impl OtpEngine {
    pub fn new(ledger: Arc<dyn OtpLedger>) -> Self {
        Self { ledger }
    }

    fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }

    /// Invalidates any live code for the pair, then inserts a fresh one.
    /// Delivering the code is the caller's job and never affects issuance.
    pub async fn issue(
        &self,
        subject: &OtpSubject,
        purpose: OtpPurpose,
        delivery_method: DeliveryMethod,
    ) -> Result<Otp, IssueError> {
        let key = subject.storage_key();

        if let Some(prev) = self.ledger.latest_unconsumed(&key, purpose).await? {
            let age = OffsetDateTime::now_utc() - prev.created_at;
            if !prev.is_expired() && age < Duration::seconds(REISSUE_COOLDOWN_SECS) {
                return Err(IssueError::Cooldown);
            }
        }

        // Prior codes must be dead before the new one becomes visible.
        let invalidated = self.ledger.invalidate_unconsumed(&key, purpose).await?;
        if invalidated > 0 {
            debug!(subject = %key, ?purpose, invalidated, "stale otps invalidated");
        }

        let now = OffsetDateTime::now_utc();
        let otp = self
            .ledger
            .insert(Otp {
                id: Uuid::new_v4(),
                subject: key,
                code: Self::generate_code(),
                purpose,
                delivery_method,
                expires_at: now + Duration::minutes(OTP_EXPIRY_MINUTES),
                consumed: false,
                created_at: now,
            })
            .await?;

        info!(subject = %otp.subject, ?purpose, "otp issued");
        Ok(otp)
    }

    /// True only for an unconsumed, unexpired, matching code; consumes it.
    /// Any failure leaves the ledger untouched.
    pub async fn verify(
        &self,
        subject: &OtpSubject,
        purpose: OtpPurpose,
        code: &str,
    ) -> anyhow::Result<bool> {
        let key = subject.storage_key();
        let otp = match self
            .ledger
            .find_unconsumed_matching(&key, purpose, code)
            .await?
        {
            Some(otp) => otp,
            None => {
                debug!(subject = %key, ?purpose, "otp verify: no matching code");
                return Ok(false);
            }
        };

        if !otp.is_valid(code) {
            debug!(subject = %key, ?purpose, "otp verify: code expired");
            return Ok(false);
        }

        self.ledger.mark_consumed(otp.id).await?;
        info!(subject = %key, ?purpose, "otp verified");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Ledger backed by a Vec, with knobs to move clocks around.
    #[derive(Default)]
    struct MemLedger {
        rows: Mutex<Vec<Otp>>,
    }

    impl MemLedger {
        fn backdate_created(&self, id: Uuid, secs: i64) {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.iter_mut().find(|r| r.id == id).unwrap();
            row.created_at -= Duration::seconds(secs);
        }

        fn backdate_expiry(&self, id: Uuid, secs: i64) {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.iter_mut().find(|r| r.id == id).unwrap();
            row.expires_at -= Duration::seconds(secs);
        }

        fn unconsumed_count(&self, subject: &str, purpose: OtpPurpose) -> usize {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.subject == subject && r.purpose == purpose && !r.consumed)
                .count()
        }
    }

    #[async_trait]
    impl OtpLedger for MemLedger {
        async fn invalidate_unconsumed(
            &self,
            subject: &str,
            purpose: OtpPurpose,
        ) -> anyhow::Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let mut n = 0;
            for row in rows
                .iter_mut()
                .filter(|r| r.subject == subject && r.purpose == purpose && !r.consumed)
            {
                row.consumed = true;
                n += 1;
            }
            Ok(n)
        }

        async fn insert(&self, record: Otp) -> anyhow::Result<Otp> {
            self.rows.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn find_unconsumed_matching(
            &self,
            subject: &str,
            purpose: OtpPurpose,
            code: &str,
        ) -> anyhow::Result<Option<Otp>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|r| {
                    r.subject == subject && r.purpose == purpose && r.code == code && !r.consumed
                })
                .max_by_key(|r| r.created_at)
                .cloned())
        }

        async fn latest_unconsumed(
            &self,
            subject: &str,
            purpose: OtpPurpose,
        ) -> anyhow::Result<Option<Otp>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|r| r.subject == subject && r.purpose == purpose && !r.consumed)
                .max_by_key(|r| r.created_at)
                .cloned())
        }

        async fn mark_consumed(&self, id: Uuid) -> anyhow::Result<()> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.consumed = true;
            }
            Ok(())
        }
    }

    fn engine() -> (OtpEngine, Arc<MemLedger>) {
        let ledger = Arc::new(MemLedger::default());
        (OtpEngine::new(ledger.clone()), ledger)
    }

    fn alice() -> OtpSubject {
        OtpSubject::email("alice@example.com")
    }

    #[tokio::test]
    async fn issued_code_is_six_digits_in_range() {
        let (engine, _) = engine();
        let otp = engine
            .issue(&alice(), OtpPurpose::Registration, DeliveryMethod::Email)
            .await
            .expect("issue");
        assert_eq!(otp.code.len(), 6);
        let n: u32 = otp.code.parse().expect("numeric code");
        assert!((100_000..=999_999).contains(&n));
    }

    #[tokio::test]
    async fn issue_then_verify_then_reuse_fails() {
        let (engine, _) = engine();
        let subject = alice();
        let otp = engine
            .issue(&subject, OtpPurpose::Registration, DeliveryMethod::Email)
            .await
            .expect("issue");

        assert!(engine
            .verify(&subject, OtpPurpose::Registration, &otp.code)
            .await
            .expect("verify"));
        // single-use: the same code never verifies twice
        assert!(!engine
            .verify(&subject, OtpPurpose::Registration, &otp.code)
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_code() {
        let (engine, ledger) = engine();
        let subject = alice();
        let first = engine
            .issue(&subject, OtpPurpose::PasswordReset, DeliveryMethod::Email)
            .await
            .expect("first issue");
        ledger.backdate_created(first.id, REISSUE_COOLDOWN_SECS + 1);

        let second = engine
            .issue(&subject, OtpPurpose::PasswordReset, DeliveryMethod::Email)
            .await
            .expect("second issue");

        assert_eq!(ledger.unconsumed_count(&subject.storage_key(), OtpPurpose::PasswordReset), 1);
        assert!(!engine
            .verify(&subject, OtpPurpose::PasswordReset, &first.code)
            .await
            .expect("verify old"));
        assert!(engine
            .verify(&subject, OtpPurpose::PasswordReset, &second.code)
            .await
            .expect("verify new"));
    }

    #[tokio::test]
    async fn immediate_reissue_hits_cooldown() {
        let (engine, _) = engine();
        let subject = alice();
        engine
            .issue(&subject, OtpPurpose::Registration, DeliveryMethod::Email)
            .await
            .expect("first issue");
        let err = engine
            .issue(&subject, OtpPurpose::Registration, DeliveryMethod::Email)
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::Cooldown));
    }

    #[tokio::test]
    async fn expired_code_fails_even_if_correct() {
        let (engine, ledger) = engine();
        let subject = alice();
        let otp = engine
            .issue(&subject, OtpPurpose::PasswordReset, DeliveryMethod::Email)
            .await
            .expect("issue");
        // as if 11 minutes passed since issuance
        ledger.backdate_expiry(otp.id, (OTP_EXPIRY_MINUTES + 1) * 60);

        assert!(!engine
            .verify(&subject, OtpPurpose::PasswordReset, &otp.code)
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn wrong_code_fails_without_consuming() {
        let (engine, _ledger) = engine();
        let subject = alice();
        let otp = engine
            .issue(&subject, OtpPurpose::Registration, DeliveryMethod::Email)
            .await
            .expect("issue");
        let wrong = if otp.code == "000000" { "000001" } else { "000000" };

        assert!(!engine
            .verify(&subject, OtpPurpose::Registration, wrong)
            .await
            .expect("verify"));
        // the real code is still live
        assert!(engine
            .verify(&subject, OtpPurpose::Registration, &otp.code)
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn purposes_do_not_cross_verify() {
        let (engine, _) = engine();
        let subject = alice();
        let otp = engine
            .issue(&subject, OtpPurpose::Registration, DeliveryMethod::Email)
            .await
            .expect("issue");
        assert!(!engine
            .verify(&subject, OtpPurpose::PasswordReset, &otp.code)
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn subjects_do_not_cross_verify() {
        let (engine, _) = engine();
        let otp = engine
            .issue(&alice(), OtpPurpose::Registration, DeliveryMethod::Email)
            .await
            .expect("issue");
        assert!(!engine
            .verify(
                &OtpSubject::email("bob@example.com"),
                OtpPurpose::Registration,
                &otp.code
            )
            .await
            .expect("verify"));
    }
}
