//! Investments against a project and the `projects.raised` running total.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{is_numeric_out_of_range, DbError};

/// A row from the `investments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvestmentRow {
    pub id: i64,
    pub public_id: Uuid,
    pub project_id: Uuid,
    pub investor_uid: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// The stored investment plus the project's funding totals after it landed.
#[derive(Debug, Clone)]
pub struct InvestmentReceipt {
    pub investment: InvestmentRow,
    pub raised: Decimal,
    pub funding_goal: Decimal,
}

/// Records an investment and increments the project's raised total.
///
/// Both writes run in one transaction: the increment is a single
/// `UPDATE … SET raised = raised + $n`, so concurrent investments never lose
/// an update.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the project does not exist,
/// [`DbError::OutOfRange`] if the new total does not fit the column, or
/// [`DbError::Sqlx`] if either write fails (the transaction is rolled back).
pub async fn record_investment(
    pool: &PgPool,
    project_id: Uuid,
    investor_uid: &str,
    amount: Decimal,
) -> Result<InvestmentReceipt, DbError> {
    let mut tx = pool.begin().await?;

    let (raised, funding_goal): (Decimal, Decimal) = sqlx::query_as(
        "UPDATE projects \
         SET raised = raised + $2, updated_at = NOW() \
         WHERE public_id = $1 \
         RETURNING raised, funding_goal",
    )
    .bind(project_id)
    .bind(amount)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        if is_numeric_out_of_range(&e) {
            DbError::OutOfRange(format!(
                "investment of {amount} would exceed the project's maximum raised total"
            ))
        } else {
            DbError::Sqlx(e)
        }
    })?
    .ok_or(DbError::NotFound)?;

    let investment = sqlx::query_as::<_, InvestmentRow>(
        "INSERT INTO investments (public_id, project_id, investor_uid, amount) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, public_id, project_id, investor_uid, amount, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(investor_uid)
    .bind(amount)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(InvestmentReceipt {
        investment,
        raised,
        funding_goal,
    })
}
