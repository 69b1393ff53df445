//! Application registry persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `applications` table
//! and the `application_code_seq` sequence.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use credo_core::{ApplicationCode, ApplicationId, NationalId, ProfileId};

use crate::state::ApplicationRecord;

/// Allocate the next code sequence number from the database sequence.
///
/// Sequence values are monotonic and never reused, which is what makes
/// application codes unique across restarts and deletions.
pub async fn next_code_seq(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let seq: i64 = sqlx::query_scalar("SELECT nextval('application_code_seq')")
        .fetch_one(pool)
        .await?;
    Ok(u64::try_from(seq).unwrap_or_else(|_| {
        tracing::error!(seq, "application_code_seq returned a negative value");
        0
    }))
}

/// Insert a new application record.
pub async fn insert(pool: &PgPool, record: &ApplicationRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO applications (id, code, code_seq, national_id, full_name,
         address, birth_place, birth_date, email, credit_type, amount,
         collateral, owner_profile_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(record.id.as_uuid())
    .bind(record.code.as_str())
    .bind(i64::try_from(record.code.seq()).unwrap_or(i64::MAX))
    .bind(record.national_id.as_str())
    .bind(&record.full_name)
    .bind(&record.address)
    .bind(&record.birth_place)
    .bind(record.birth_date)
    .bind(&record.email)
    .bind(&record.credit_type)
    .bind(&record.amount)
    .bind(&record.collateral)
    .bind(record.owner.as_uuid())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update an application's amendable fields.
///
/// Identity, code, owner, and creation time never change; only the fields
/// the owner may amend while the application is in its initial status.
pub async fn update_fields(pool: &PgPool, record: &ApplicationRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE applications SET national_id = $2, full_name = $3, address = $4,
         birth_place = $5, birth_date = $6, email = $7, credit_type = $8,
         amount = $9, collateral = $10, updated_at = $11
         WHERE id = $1",
    )
    .bind(record.id.as_uuid())
    .bind(record.national_id.as_str())
    .bind(&record.full_name)
    .bind(&record.address)
    .bind(&record.birth_place)
    .bind(record.birth_date)
    .bind(&record.email)
    .bind(&record.credit_type)
    .bind(&record.amount)
    .bind(&record.collateral)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an application. History and ledger rows follow via
/// `ON DELETE CASCADE`; the code sequence is never rewound.
pub async fn delete(pool: &PgPool, id: ApplicationId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all applications into the in-memory directory on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ApplicationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ApplicationRow>(
        "SELECT id, code, national_id, full_name, address, birth_place,
         birth_date, email, credit_type, amount, collateral,
         owner_profile_id, created_at, updated_at
         FROM applications ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ApplicationRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    code: String,
    national_id: String,
    full_name: String,
    address: String,
    birth_place: String,
    birth_date: NaiveDate,
    email: String,
    credit_type: String,
    amount: String,
    collateral: String,
    owner_profile_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    /// Convert a database row into a domain record.
    ///
    /// A code or national id that fails domain validation means the row
    /// was written outside this code path; surface the error rather than
    /// silently coercing.
    fn into_record(self) -> Result<ApplicationRecord, sqlx::Error> {
        let code = ApplicationCode::parse(&self.code).map_err(|e| {
            tracing::error!(id = %self.id, code = %self.code, error = %e, "corrupt application code in database");
            sqlx::Error::Decode(Box::new(e))
        })?;
        let national_id = NationalId::new(&self.national_id).map_err(|e| {
            tracing::error!(id = %self.id, error = %e, "corrupt national id in database");
            sqlx::Error::Decode(Box::new(e))
        })?;

        Ok(ApplicationRecord {
            id: ApplicationId::from_uuid(self.id),
            code,
            national_id,
            full_name: self.full_name,
            address: self.address,
            birth_place: self.birth_place,
            birth_date: self.birth_date,
            email: self.email,
            credit_type: self.credit_type,
            amount: self.amount,
            collateral: self.collateral,
            owner: ProfileId::from_uuid(self.owner_profile_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
