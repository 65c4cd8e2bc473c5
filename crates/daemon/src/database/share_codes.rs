use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::OffsetDateTime;

use common::share::{ShareCodeProvider, ShareError, ShareRecord};

use crate::database::Database;

fn decode_error<E>(e: E) -> ShareError<sqlx::Error>
where
    E: std::error::Error + Send + Sync + 'static,
{
    ShareError::Provider(sqlx::Error::Decode(Box::new(e)))
}

fn record_from_row(row: &SqliteRow) -> Result<ShareRecord, ShareError<sqlx::Error>> {
    let id: i64 = row.try_get("id").map_err(ShareError::Provider)?;
    let expires_at: i64 = row.try_get("expires_at").map_err(ShareError::Provider)?;

    Ok(ShareRecord {
        id: u64::try_from(id).map_err(decode_error)?,
        volume: row.try_get("volume").map_err(ShareError::Provider)?,
        path: row.try_get("path").map_err(ShareError::Provider)?,
        expires_at: OffsetDateTime::from_unix_timestamp(expires_at).map_err(decode_error)?,
    })
}

#[async_trait]
impl ShareCodeProvider for Database {
    type Error = sqlx::Error;

    async fn get_or_create(
        &self,
        volume: &str,
        path: &str,
        expires_at: OffsetDateTime,
    ) -> Result<ShareRecord, ShareError<Self::Error>> {
        // The unique (volume, path) constraint settles concurrent creators;
        //  every caller then reads back the single surviving row.
        let now = OffsetDateTime::now_utc().unix_timestamp();
        sqlx::query(
            r#"
            INSERT INTO share_codes (volume, path, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (volume, path) DO NOTHING
            "#,
        )
        .bind(volume)
        .bind(path)
        .bind(expires_at.unix_timestamp())
        .bind(now)
        .execute(&**self)
        .await
        .map_err(ShareError::Provider)?;

        let row = sqlx::query(
            r#"
            SELECT id, volume, path, expires_at
            FROM share_codes
            WHERE volume = ? AND path = ?
            "#,
        )
        .bind(volume)
        .bind(path)
        .fetch_one(&**self)
        .await
        .map_err(ShareError::Provider)?;

        record_from_row(&row)
    }

    async fn get(&self, id: u64) -> Result<Option<ShareRecord>, ShareError<Self::Error>> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            SELECT id, volume, path, expires_at
            FROM share_codes
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&**self)
        .await
        .map_err(ShareError::Provider)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn set_expiry(
        &self,
        id: u64,
        expires_at: OffsetDateTime,
    ) -> Result<(), ShareError<Self::Error>> {
        let id = i64::try_from(id).map_err(|_| ShareError::NotFound)?;
        let result = sqlx::query("UPDATE share_codes SET expires_at = ? WHERE id = ?")
            .bind(expires_at.unix_timestamp())
            .bind(id)
            .execute(&**self)
            .await
            .map_err(ShareError::Provider)?;

        if result.rows_affected() == 0 {
            return Err(ShareError::NotFound);
        }
        Ok(())
    }
}
