use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub mod engine;
pub mod ledger;

pub use engine::{IssueError, OtpEngine};
pub use ledger::{OtpLedger, PgOtpLedger};

/// What a one-time code is allowed to prove.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "otp_purpose", rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    PasswordReset,
}

/// How the code reaches the subject. Sms records intent only; delivery
/// falls back to the log mailer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "delivery_method", rename_all = "lowercase")]
pub enum DeliveryMethod {
    Email,
    Sms,
}

/// Who a code is issued for. Registration codes predate the account, so the
/// subject is the raw email; every other flow keys off the user id. The two
/// map to disjoint storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpSubject {
    UserId(Uuid),
    Email(String),
}

impl OtpSubject {
    pub fn email(addr: &str) -> Self {
        Self::Email(addr.trim().to_lowercase())
    }

    pub fn storage_key(&self) -> String {
        match self {
            Self::UserId(id) => format!("user:{id}"),
            Self::Email(addr) => format!("email:{addr}"),
        }
    }
}

/// A single-use verification code.
#[derive(Debug, Clone, FromRow)]
pub struct Otp {
    pub id: Uuid,
    pub subject: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub delivery_method: DeliveryMethod,
    pub expires_at: OffsetDateTime,
    pub consumed: bool,
    pub created_at: OffsetDateTime,
}

impl Otp {
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    pub fn is_valid(&self, code: &str) -> bool {
        self.code == code && !self.consumed && !self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample(code: &str, expires_at: OffsetDateTime) -> Otp {
        Otp {
            id: Uuid::new_v4(),
            subject: "email:alice@example.com".into(),
            code: code.into(),
            purpose: OtpPurpose::Registration,
            delivery_method: DeliveryMethod::Email,
            expires_at,
            consumed: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn subject_keys_are_prefixed_and_disjoint() {
        let id = Uuid::new_v4();
        assert_eq!(OtpSubject::UserId(id).storage_key(), format!("user:{id}"));
        assert_eq!(
            OtpSubject::email("Alice@Example.COM ").storage_key(),
            "email:alice@example.com"
        );
    }

    #[test]
    fn valid_code_matches() {
        let otp = sample("482913", OffsetDateTime::now_utc() + Duration::minutes(10));
        assert!(otp.is_valid("482913"));
    }

    #[test]
    fn wrong_code_is_invalid() {
        let otp = sample("482913", OffsetDateTime::now_utc() + Duration::minutes(10));
        assert!(!otp.is_valid("482914"));
    }

    #[test]
    fn consumed_code_is_invalid() {
        let mut otp = sample("482913", OffsetDateTime::now_utc() + Duration::minutes(10));
        otp.consumed = true;
        assert!(!otp.is_valid("482913"));
    }

    #[test]
    fn expired_code_is_invalid() {
        let otp = sample("482913", OffsetDateTime::now_utc() - Duration::minutes(1));
        assert!(otp.is_expired());
        assert!(!otp.is_valid("482913"));
    }
}
