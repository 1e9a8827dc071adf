use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard ceiling on session age, whatever the token's own `exp` says.
pub const MAX_SESSION_AGE: Duration = Duration::hours(24);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Admin,
}

/// Claims carried in a signed session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn issue(
        sub: Uuid,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            sub,
            email: email.into(),
            name: name.into(),
            role,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// A session counts as signed-out once it expired or is older than a day.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let now_ts = now.timestamp();
        now_ts < self.exp && now_ts - self.iat < MAX_SESSION_AGE.num_seconds()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Admin sign-in state, kept apart from any customer session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminAuth {
    pub is_admin: bool,
    pub admin_email: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&SessionClaims> for AdminAuth {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            is_admin: claims.is_admin(),
            admin_email: claims.email.clone(),
            timestamp: claims.issued_at().unwrap_or_default(),
        }
    }
}
