//! PostgreSQL implementation of every repository.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

use super::errors::{StoreError, StoreResult};
use super::repository::{
    PaymentProofRepository, ReferralRepository, UserRepository, WithdrawRepository,
};
use crate::auth::{NewUser, Role, User, UserCredentials, UserId, UserSummary};
use crate::referral::{
    CompletionOutcome, NewReferral, Referral, ReferralActivityRow, ReferralDetail, ReferralId,
    ReferralStatus,
};
use crate::reports::ReferrerCounts;
use crate::utils::Amount;
use crate::verification::{
    PaymentProof, PaymentProofView, ProofResolution, ProofStatus, ResolveOutcome, SignupReceipt,
};
use crate::withdraw::{NewWithdrawRequest, WithdrawOutcome, WithdrawRequest};

const USER_COLUMNS: &str = "id, email, name, role, referral_code, telegram_username, phone, \
     is_verified, status, balance, total_earnings, created_at";

const PROOF_COLUMNS: &str =
    "id, user_id, image_url, status, admin_id, admin_note, created_at, updated_at";

const REFERRAL_COLUMNS: &str = "id, referrer_id, referred_id, status, reward, created_at";

const WITHDRAW_COLUMNS: &str = "id, user_id, method, amount, account_info, status, created_at";

/// Repository implementation backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn column(prefix: &str, name: &str) -> String {
    format!("{prefix}{name}")
}

fn parse_enum<T: FromStr<Err = String>>(raw: String) -> StoreResult<T> {
    raw.parse().map_err(StoreError::InvalidData)
}

fn timestamp(row: &PgRow, name: &str) -> StoreResult<chrono::DateTime<chrono::Utc>> {
    Ok(row.try_get::<NaiveDateTime, _>(name)?.and_utc())
}

fn user_from_row(row: &PgRow, prefix: &str) -> StoreResult<User> {
    Ok(User {
        id: row.try_get(column(prefix, "id").as_str())?,
        email: row.try_get(column(prefix, "email").as_str())?,
        name: row.try_get(column(prefix, "name").as_str())?,
        role: parse_enum(row.try_get(column(prefix, "role").as_str())?)?,
        referral_code: row.try_get(column(prefix, "referral_code").as_str())?,
        telegram_username: row.try_get(column(prefix, "telegram_username").as_str())?,
        phone: row.try_get(column(prefix, "phone").as_str())?,
        is_verified: row.try_get(column(prefix, "is_verified").as_str())?,
        status: row.try_get(column(prefix, "status").as_str())?,
        balance: row.try_get(column(prefix, "balance").as_str())?,
        total_earnings: row.try_get(column(prefix, "total_earnings").as_str())?,
        created_at: timestamp(row, &column(prefix, "created_at"))?,
    })
}

fn summary_from_row(row: &PgRow, prefix: &str) -> StoreResult<UserSummary> {
    Ok(UserSummary {
        id: row.try_get(column(prefix, "id").as_str())?,
        name: row.try_get(column(prefix, "name").as_str())?,
        email: row.try_get(column(prefix, "email").as_str())?,
    })
}

fn proof_from_row(row: &PgRow) -> StoreResult<PaymentProof> {
    Ok(PaymentProof {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        image_url: row.try_get("image_url")?,
        status: parse_enum(row.try_get("status")?)?,
        admin_id: row.try_get("admin_id")?,
        admin_note: row.try_get("admin_note")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn referral_from_row(row: &PgRow) -> StoreResult<Referral> {
    Ok(Referral {
        id: row.try_get("id")?,
        referrer_id: row.try_get("referrer_id")?,
        referred_id: row.try_get("referred_id")?,
        status: parse_enum(row.try_get("status")?)?,
        reward: row.try_get("reward")?,
        created_at: timestamp(row, "created_at")?,
    })
}

fn withdraw_from_row(row: &PgRow) -> StoreResult<WithdrawRequest> {
    Ok(WithdrawRequest {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        method: parse_enum(row.try_get("method")?)?,
        amount: row.try_get("amount")?,
        account_info: row.try_get("account_info")?,
        status: parse_enum(row.try_get("status")?)?,
        created_at: timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl UserRepository for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| user_from_row(&r, "")).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| user_from_row(&r, "")).transpose()
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(UserCredentials {
                user: user_from_row(&r, "")?,
                password_hash: r.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_by_referral_code(&self, code: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE referral_code = $1");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| user_from_row(&r, "")).transpose()
    }

    async fn referral_code_exists(&self, code: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE referral_code = $1) AS taken")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("taken")?)
    }

    async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (email, name, password_hash, role, referral_code,
                               telegram_username, phone, is_verified, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.referral_code)
            .bind(&user.telegram_username)
            .bind(&user.phone)
            .bind(user.is_verified)
            .bind(&user.status)
            .fetch_one(&self.pool)
            .await?;

        user_from_row(&row, "")
    }

    async fn create_user_with_proof(
        &self,
        user: &NewUser,
        image_url: &str,
    ) -> StoreResult<SignupReceipt> {
        // Dropping the transaction on any early return rolls both inserts back
        let mut tx = self.pool.begin().await?;

        let user_row = sqlx::query(
            r#"
            INSERT INTO users (email, name, password_hash, role, referral_code,
                               telegram_username, phone, is_verified, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.referral_code)
        .bind(&user.telegram_username)
        .bind(&user.phone)
        .bind(user.is_verified)
        .bind(&user.status)
        .fetch_one(&mut *tx)
        .await?;
        let user_id: UserId = user_row.try_get("id")?;

        let proof_row = sqlx::query(
            "INSERT INTO payment_proofs (user_id, image_url, status)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(user_id)
        .bind(image_url)
        .bind(ProofStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let proof_id = proof_row.try_get("id")?;

        tx.commit().await?;

        Ok(SignupReceipt { user_id, proof_id })
    }

    async fn list_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at DESC");
        let rows = sqlx::query(&sql)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|r| user_from_row(r, "")).collect()
    }

    async fn count_by_role(&self, role: Role) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }
}

#[async_trait]
impl PaymentProofRepository for PgStore {
    async fn create_proof(&self, user_id: UserId, image_url: &str) -> StoreResult<PaymentProof> {
        let sql = format!(
            "INSERT INTO payment_proofs (user_id, image_url, status)
             VALUES ($1, $2, $3)
             RETURNING {PROOF_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(image_url)
            .bind(ProofStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await?;

        proof_from_row(&row)
    }

    async fn find_latest_for_user(&self, user_id: UserId) -> StoreResult<Option<PaymentProof>> {
        let sql = format!(
            "SELECT {PROOF_COLUMNS} FROM payment_proofs
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(proof_from_row).transpose()
    }

    async fn list_with_parties(&self) -> StoreResult<Vec<PaymentProofView>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.user_id, p.image_url, p.status, p.admin_id, p.admin_note,
                   p.created_at, p.updated_at,
                   u.id AS u_id, u.name AS u_name, u.email AS u_email,
                   a.id AS a_id, a.name AS a_name, a.email AS a_email
            FROM payment_proofs p
            JOIN users u ON u.id = p.user_id
            LEFT JOIN users a ON a.id = p.admin_id
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let admin_id: Option<UserId> = r.try_get("a_id")?;
                Ok(PaymentProofView {
                    proof: proof_from_row(r)?,
                    user: summary_from_row(r, "u_")?,
                    admin: match admin_id {
                        Some(_) => Some(summary_from_row(r, "a_")?),
                        None => None,
                    },
                })
            })
            .collect()
    }

    async fn resolve(
        &self,
        resolution: &ProofResolution,
        reward: Amount,
    ) -> StoreResult<ResolveOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent resolutions of the same proof
        let sql = format!("SELECT {PROOF_COLUMNS} FROM payment_proofs WHERE id = $1 FOR UPDATE");
        let current = sqlx::query(&sql)
            .bind(resolution.proof_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let current = proof_from_row(&current)?;

        if current.status.is_terminal() {
            tx.rollback().await?;
            return Ok(ResolveOutcome::AlreadyResolved(current));
        }

        let sql = format!(
            "UPDATE payment_proofs
             SET status = $1, admin_id = $2, admin_note = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING {PROOF_COLUMNS}"
        );
        let updated = sqlx::query(&sql)
            .bind(resolution.status.as_str())
            .bind(resolution.admin_id)
            .bind(&resolution.admin_note)
            .bind(resolution.proof_id)
            .fetch_one(&mut *tx)
            .await?;
        let updated = proof_from_row(&updated)?;

        if resolution.status == ProofStatus::Approved {
            let credited = sqlx::query(
                "UPDATE users
                 SET is_verified = TRUE,
                     balance = balance + $1,
                     total_earnings = total_earnings + $1
                 WHERE id = $2",
            )
            .bind(reward)
            .bind(updated.user_id)
            .execute(&mut *tx)
            .await?;

            if credited.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
        }

        tx.commit().await?;

        Ok(ResolveOutcome::Applied(updated))
    }
}

#[async_trait]
impl ReferralRepository for PgStore {
    async fn create_referral(&self, referral: &NewReferral) -> StoreResult<Referral> {
        let sql = format!(
            "INSERT INTO referrals (referrer_id, referred_id, status, reward)
             VALUES ($1, $2, $3, $4)
             RETURNING {REFERRAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(referral.referrer_id)
            .bind(referral.referred_id)
            .bind(referral.status.as_str())
            .bind(referral.reward)
            .fetch_one(&self.pool)
            .await?;

        referral_from_row(&row)
    }

    async fn complete_referral(&self, referral_id: ReferralId) -> StoreResult<CompletionOutcome> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = $1 FOR UPDATE");
        let current = sqlx::query(&sql)
            .bind(referral_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let current = referral_from_row(&current)?;

        if current.status == ReferralStatus::Completed {
            tx.rollback().await?;
            return Ok(CompletionOutcome::AlreadyCompleted(current));
        }

        let sql = format!(
            "UPDATE referrals SET status = $1 WHERE id = $2 RETURNING {REFERRAL_COLUMNS}"
        );
        let updated = sqlx::query(&sql)
            .bind(ReferralStatus::Completed.as_str())
            .bind(referral_id)
            .fetch_one(&mut *tx)
            .await?;
        let updated = referral_from_row(&updated)?;

        let credited = sqlx::query(
            "UPDATE users
             SET balance = balance + $1, total_earnings = total_earnings + $1
             WHERE id = $2",
        )
        .bind(updated.reward)
        .bind(updated.referrer_id)
        .execute(&mut *tx)
        .await?;

        if credited.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;

        Ok(CompletionOutcome::Completed(updated))
    }

    async fn list_for_referrer(&self, referrer_id: UserId) -> StoreResult<Vec<ReferralDetail>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.referrer_id, r.referred_id, r.status, r.reward, r.created_at,
                   u.id AS u_id, u.name AS u_name, u.email AS u_email
            FROM referrals r
            JOIN users u ON u.id = r.referred_id
            WHERE r.referrer_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(ReferralDetail {
                    referral: referral_from_row(r)?,
                    referred: summary_from_row(r, "u_")?,
                })
            })
            .collect()
    }

    async fn count_by_status(&self, status: ReferralStatus) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM referrals WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }

    async fn recent_with_referrer(&self, limit: i64) -> StoreResult<Vec<ReferralActivityRow>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.referrer_id, r.referred_id, r.status, r.reward, r.created_at,
                   u.id AS u_id, u.name AS u_name, u.email AS u_email
            FROM referrals r
            JOIN users u ON u.id = r.referrer_id
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(ReferralActivityRow {
                    referral: referral_from_row(r)?,
                    referrer: summary_from_row(r, "u_")?,
                })
            })
            .collect()
    }

    async fn referrer_counts(&self) -> StoreResult<Vec<ReferrerCounts>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.referral_code, u.telegram_username, u.phone,
                   u.is_verified, u.status, u.balance, u.total_earnings, u.created_at,
                   COUNT(r.id) AS total,
                   COUNT(r.id) FILTER (WHERE r.status = 'completed') AS successful,
                   COUNT(r.id) FILTER (WHERE r.status = 'pending') AS pending
            FROM users u
            LEFT JOIN referrals r ON r.referrer_id = u.id
            WHERE u.role = 'user'
            GROUP BY u.id
            ORDER BY u.created_at DESC, u.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(ReferrerCounts {
                    user: user_from_row(r, "")?,
                    total: r.try_get("total")?,
                    successful: r.try_get("successful")?,
                    pending: r.try_get("pending")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl WithdrawRepository for PgStore {
    async fn create_request(&self, request: &NewWithdrawRequest) -> StoreResult<WithdrawOutcome> {
        let mut tx = self.pool.begin().await?;

        let balance_row = sqlx::query("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
            .bind(request.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let available: Amount = balance_row.try_get("balance")?;

        if available < request.amount {
            tx.rollback().await?;
            return Ok(WithdrawOutcome::InsufficientBalance { available });
        }

        let sql = format!(
            "INSERT INTO withdraw_requests (user_id, method, amount, account_info, status)
             VALUES ($1, $2, $3, $4, 'pending')
             RETURNING {WITHDRAW_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(request.user_id)
            .bind(request.method.as_str())
            .bind(request.amount)
            .bind(&request.account_info)
            .fetch_one(&mut *tx)
            .await?;
        let created = withdraw_from_row(&row)?;

        tx.commit().await?;

        Ok(WithdrawOutcome::Created(created))
    }

    async fn list_for_user(&self, user_id: UserId) -> StoreResult<Vec<WithdrawRequest>> {
        let sql = format!(
            "SELECT {WITHDRAW_COLUMNS} FROM withdraw_requests
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(withdraw_from_row).collect()
    }

    async fn total_completed(&self) -> StoreResult<Amount> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT AS total
             FROM withdraw_requests
             WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("total")?)
    }
}
