//! Maps to the `users` table.

use chat_core::{Role, User};
use chrono::{DateTime, Utc};

use super::parse_id;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = StorageError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let role: Role = record
            .role
            .parse()
            .map_err(|_| StorageError::Decode(format!("invalid role: {}", record.role)))?;

        Ok(User {
            id: parse_id(&record.id)?,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            phone_number: record.phone_number,
            role,
            created_at: record.created_at,
        })
    }
}
