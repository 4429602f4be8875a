//! The interaction ledger: one row per (user, project, action) guarding
//! PulsePoints issuance.
//!
//! [`record_interaction`] is the only entry point that awards points. The
//! remaining functions are its building blocks and are public for tests and
//! reporting.

use chrono::{DateTime, Utc};
use pulsevest_core::{reward_for_rank, ActionKind};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{users::credit_points, DbError};

// ---------------------------------------------------------------------------
// Row and outcome types
// ---------------------------------------------------------------------------

/// A row from the `interactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InteractionRow {
    pub id: i64,
    pub user_uid: String,
    pub project_id: Uuid,
    pub action: String,
    pub points_awarded: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Result of asking the ledger to record an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// A new ledger row was written.
    Recorded {
        points_awarded: Decimal,
        peer_rank: u64,
        /// `false` when the award was positive but the balance update did not
        /// land (no profile, or the update failed). The ledger row stands.
        credited: bool,
    },
    /// The user already has a ledger row for this project and action.
    AlreadyCredited,
}

impl InteractionOutcome {
    #[must_use]
    pub fn points_awarded(&self) -> Decimal {
        match self {
            InteractionOutcome::Recorded { points_awarded, .. } => *points_awarded,
            InteractionOutcome::AlreadyCredited => Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, InteractionOutcome::AlreadyCredited)
    }
}

const INTERACTION_COLUMNS: &str = "id, user_uid, project_id, action, points_awarded, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the ledger row for the exact (user, project, action) tuple, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_interaction(
    pool: &PgPool,
    user_uid: &str,
    project_id: Uuid,
    action: ActionKind,
) -> Result<Option<InteractionRow>, DbError> {
    let row = sqlx::query_as::<_, InteractionRow>(&format!(
        "SELECT {INTERACTION_COLUMNS} FROM interactions \
         WHERE user_uid = $1 AND project_id = $2 AND action = $3"
    ))
    .bind(user_uid)
    .bind(project_id)
    .bind(action.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Counts distinct users other than `user_uid` who already performed `action`
/// on `project_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_peer_interactions(
    pool: &PgPool,
    project_id: Uuid,
    action: ActionKind,
    user_uid: &str,
) -> Result<u64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT user_uid) FROM interactions \
         WHERE project_id = $1 AND action = $2 AND user_uid <> $3",
    )
    .bind(project_id)
    .bind(action.as_str())
    .bind(user_uid)
    .fetch_one(pool)
    .await?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Appends a ledger row, relying on the unique (user, project, action)
/// constraint to reject duplicates.
///
/// Returns `None` when a row for the tuple already exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn insert_interaction(
    pool: &PgPool,
    user_uid: &str,
    project_id: Uuid,
    action: ActionKind,
    points_awarded: Decimal,
) -> Result<Option<InteractionRow>, DbError> {
    let row = sqlx::query_as::<_, InteractionRow>(&format!(
        "INSERT INTO interactions (user_uid, project_id, action, points_awarded) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_uid, project_id, action) DO NOTHING \
         RETURNING {INTERACTION_COLUMNS}"
    ))
    .bind(user_uid)
    .bind(project_id)
    .bind(action.as_str())
    .bind(points_awarded)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Records that `user_uid` performed `action` on `project_id`, awarding
/// PulsePoints at most once per tuple.
///
/// The award depends on how many distinct users got there first (see
/// [`reward_for_rank`]). The ledger row is written even for a zero award so
/// later calls deduplicate. Crediting the balance happens after the row is
/// written and is best-effort: a failed or missing-profile credit is logged and
/// reported in the outcome, never rolled back into the ledger.
///
/// Peer-rank is a snapshot taken before the insert; two different users racing
/// on the same project may receive the same rank.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the lookup, count, or insert fails.
pub async fn record_interaction(
    pool: &PgPool,
    user_uid: &str,
    project_id: Uuid,
    action: ActionKind,
) -> Result<InteractionOutcome, DbError> {
    if find_interaction(pool, user_uid, project_id, action)
        .await?
        .is_some()
    {
        tracing::debug!(user_uid, %project_id, %action, "interaction already credited");
        return Ok(InteractionOutcome::AlreadyCredited);
    }

    let peer_rank = count_peer_interactions(pool, project_id, action, user_uid).await?;
    let points_awarded = reward_for_rank(peer_rank);

    let Some(row) = insert_interaction(pool, user_uid, project_id, action, points_awarded).await?
    else {
        // Lost a race with a concurrent request for the same tuple.
        tracing::debug!(user_uid, %project_id, %action, "interaction inserted concurrently");
        return Ok(InteractionOutcome::AlreadyCredited);
    };

    let mut credited = true;
    if points_awarded > Decimal::ZERO {
        match credit_points(pool, user_uid, points_awarded).await {
            Ok(true) => {}
            Ok(false) => {
                credited = false;
                tracing::warn!(
                    user_uid,
                    %project_id,
                    %points_awarded,
                    "no profile to credit; ledger entry kept"
                );
            }
            Err(e) => {
                credited = false;
                tracing::warn!(
                    error = %e,
                    user_uid,
                    %project_id,
                    %points_awarded,
                    "failed to credit pulse points; ledger entry kept"
                );
            }
        }
    }

    tracing::info!(
        interaction_id = row.id,
        user_uid,
        %project_id,
        %action,
        peer_rank,
        %points_awarded,
        "interaction recorded"
    );

    Ok(InteractionOutcome::Recorded {
        points_awarded,
        peer_rank,
        credited,
    })
}
