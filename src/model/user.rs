use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    StoreOwner,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::StoreOwner => "store_owner",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "admin" => Ok(Role::Admin),
            "store_owner" => Ok(Role::StoreOwner),
            "customer" => Ok(Role::Customer),
            _ => Err(UnknownVariant::new("role", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Deleted,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Deleted => "deleted",
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "deleted" => Ok(UserStatus::Deleted),
            _ => Err(UnknownVariant::new("user status", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    #[serde(skip_serializing)]
    pub google_id: Option<String>,
    pub profile_image: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roles_and_statuses() {
        assert_eq!(Role::try_from("store_owner".to_string()).unwrap(), Role::StoreOwner);
        assert!(Role::try_from("root".to_string()).is_err());
        assert_eq!(UserStatus::try_from("deleted".to_string()).unwrap(), UserStatus::Deleted);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::nil(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            password_hash: Some("$2b$10$hash".into()),
            phone: None,
            role: Role::Admin,
            status: UserStatus::Active,
            google_id: Some("g-1".into()),
            profile_image: None,
            reset_token: Some("tok".into()),
            reset_token_expires_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let v = serde_json::to_value(&user).unwrap();
        assert!(v.get("passwordHash").is_none());
        assert!(v.get("resetToken").is_none());
        assert!(v.get("googleId").is_none());
        assert_eq!(v["role"], "admin");
    }
}
