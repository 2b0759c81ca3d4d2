//! Users: registration, lookup, deletion with cleanup.

use chat_core::{NewUser, User};
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::UserRecord;
use crate::store::ChatStore;

const NAME_MAX_LEN: usize = 100;
const PHONE_MAX_LEN: usize = 20;

fn validate_new_user(new_user: &NewUser) -> Result<(), StorageError> {
    for (field, value) in [
        ("first_name", &new_user.first_name),
        ("last_name", &new_user.last_name),
    ] {
        if value.trim().is_empty() {
            return Err(StorageError::Validation(format!("{} may not be blank", field)));
        }
        if value.chars().count() > NAME_MAX_LEN {
            return Err(StorageError::Validation(format!(
                "{} may not exceed {} characters",
                field, NAME_MAX_LEN
            )));
        }
    }

    let email = new_user.email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid_email {
        return Err(StorageError::Validation(format!("invalid email: {}", new_user.email)));
    }

    if let Some(phone) = &new_user.phone_number {
        if phone.chars().count() > PHONE_MAX_LEN {
            return Err(StorageError::Validation(format!(
                "phone_number may not exceed {} characters",
                PHONE_MAX_LEN
            )));
        }
    }

    Ok(())
}

impl ChatStore {
    /// Inserts a user. A duplicate email is `AlreadyExists`.
    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, StorageError> {
        validate_new_user(new_user)?;

        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            email: new_user.email.trim().to_lowercase(),
            phone_number: new_user.phone_number.clone(),
            role: new_user.role,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, phone_number, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| match StorageError::from(e) {
            StorageError::AlreadyExists(_) => {
                StorageError::AlreadyExists(format!("email already registered: {}", user.email))
            }
            other => other,
        })?;

        info!(user_id = %user.id, role = %user.role, "Saved user");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await?
            .map(User::try_from)
            .transpose()
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.pool())
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Deletes the user, then runs the user-deleted observers in the same transaction.
    /// Returns `false` if the user did not exist.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<bool, StorageError> {
        let mut tx = self.pool().begin().await?;

        let Some(record) = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&mut *tx)
            .await?
        else {
            warn!(user_id = %user_id, "Delete of unknown user");
            return Ok(false);
        };
        let user = User::try_from(record)?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;

        for observer in &self.observers {
            observer.user_deleted(&mut *tx, &user).await?;
        }

        tx.commit().await?;
        info!(user_id = %user_id, "Deleted user");
        Ok(true)
    }
}
