//! Wallet ledger service - business logic for balance movement
//!
//! The `_tx` methods run against an open transaction so order and dispute
//! settlement can compose ledger moves with their own state changes in one
//! atomic unit. The public wrappers open and commit a transaction themselves.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CoreError, CoreResult};
use crate::models::PaginatedResponse;
use crate::wallet::{
    DepositRequest, TxFilter, TxMeta, TxStatus, TxType, Wallet, WalletTransaction,
    WithdrawRequest, INTERNAL_PROVIDER,
};

#[derive(Clone)]
pub struct WalletService {
    db_pool: SqlitePool,
}

impl WalletService {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Get a user's wallet, creating it with zero balances on first touch
    pub async fn get_or_create_wallet(&self, user_id: Uuid) -> CoreResult<Wallet> {
        let mut tx = self.db_pool.begin().await?;
        let wallet = self.ensure_wallet_tx(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(wallet)
    }

    /// Credit the available balance from an external source
    pub async fn deposit(
        &self,
        user_id: Uuid,
        request: DepositRequest,
    ) -> CoreResult<WalletTransaction> {
        request.validate()?;

        let mut tx = self.db_pool.begin().await?;
        let entry = self
            .credit_tx(
                &mut tx,
                user_id,
                request.amount,
                TxType::Deposit,
                request.provider.as_deref(),
                request.reference_id,
                None,
            )
            .await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Debit the available balance toward an external destination
    pub async fn withdraw(
        &self,
        user_id: Uuid,
        request: WithdrawRequest,
    ) -> CoreResult<WalletTransaction> {
        request.validate()?;

        let mut tx = self.db_pool.begin().await?;
        let entry = self
            .debit_tx(
                &mut tx,
                user_id,
                request.amount,
                TxType::Withdrawal,
                request.provider.as_deref(),
                request.reference_id,
                None,
            )
            .await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Move funds from available to held for the same user
    pub async fn hold(
        &self,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<WalletTransaction> {
        let mut tx = self.db_pool.begin().await?;
        let entry = self
            .hold_tx(&mut tx, user_id, amount, reference_id, meta)
            .await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Pay held funds out to another user's available balance
    pub async fn release(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<(WalletTransaction, WalletTransaction)> {
        let mut tx = self.db_pool.begin().await?;
        let entries = self
            .release_tx(&mut tx, from_user_id, to_user_id, amount, reference_id, meta)
            .await?;
        tx.commit().await?;

        Ok(entries)
    }

    /// Return held funds to the same user's available balance
    pub async fn refund(
        &self,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<WalletTransaction> {
        let mut tx = self.db_pool.begin().await?;
        let entry = self
            .refund_tx(&mut tx, user_id, amount, reference_id, meta)
            .await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// List a user's ledger entries with filtering and pagination
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: TxFilter,
    ) -> CoreResult<PaginatedResponse<WalletTransaction>> {
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM wallet_transactions WHERE user_id = ");
        query_builder.push_bind(user_id);
        let mut count_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = ");
        count_builder.push_bind(user_id);

        if let Some(tx_type) = filter.tx_type {
            query_builder.push(" AND tx_type = ");
            query_builder.push_bind(tx_type);
            count_builder.push(" AND tx_type = ");
            count_builder.push_bind(tx_type);
        }
        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }
        if let Some(from) = filter.from {
            query_builder.push(" AND created_at >= ");
            query_builder.push_bind(from);
            count_builder.push(" AND created_at >= ");
            count_builder.push_bind(from);
        }
        if let Some(to) = filter.to {
            query_builder.push(" AND created_at <= ");
            query_builder.push_bind(to);
            count_builder.push(" AND created_at <= ");
            count_builder.push_bind(to);
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let entries = query_builder
            .build_query_as::<WalletTransaction>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: entries,
            total,
            page,
            limit,
        })
    }

    // ===== Transaction-scoped primitives =====

    /// Fetch the wallet row inside an open transaction, creating it if absent
    pub async fn ensure_wallet_tx(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
    ) -> CoreResult<Wallet> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance_available, balance_held, created_at, updated_at)
            VALUES (?1, 0, 0, ?2, ?2)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(wallet)
    }

    /// Increase available balance and record one ledger entry
    pub async fn credit_tx(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
        amount: i64,
        tx_type: TxType,
        provider: Option<&str>,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<WalletTransaction> {
        assert_positive(amount)?;
        self.ensure_wallet_tx(&mut *conn, user_id).await?;

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_available = balance_available + ?1, updated_at = ?2
            WHERE user_id = ?3
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        self.insert_entry_tx(conn, user_id, tx_type, amount, provider, reference_id, meta)
            .await
    }

    /// Decrease available balance and record one ledger entry
    pub async fn debit_tx(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
        amount: i64,
        tx_type: TxType,
        provider: Option<&str>,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<WalletTransaction> {
        assert_positive(amount)?;
        let wallet = self.ensure_wallet_tx(&mut *conn, user_id).await?;

        if wallet.balance_available < amount {
            return Err(CoreError::InsufficientFunds {
                available: wallet.balance_available,
                requested: amount,
            });
        }

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_available = balance_available - ?1, updated_at = ?2
            WHERE user_id = ?3
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        self.insert_entry_tx(conn, user_id, tx_type, amount, provider, reference_id, meta)
            .await
    }

    /// Move available -> held for one user and record a HOLD entry
    pub async fn hold_tx(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<WalletTransaction> {
        assert_positive(amount)?;
        let wallet = self.ensure_wallet_tx(&mut *conn, user_id).await?;

        if wallet.balance_available < amount {
            return Err(CoreError::InsufficientFunds {
                available: wallet.balance_available,
                requested: amount,
            });
        }

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_available = balance_available - ?1,
                balance_held = balance_held + ?1,
                updated_at = ?2
            WHERE user_id = ?3
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        self.insert_entry_tx(
            conn,
            user_id,
            TxType::Hold,
            amount,
            Some(INTERNAL_PROVIDER),
            reference_id,
            meta,
        )
        .await
    }

    /// Pay held funds from one user into another's available balance.
    ///
    /// Writes exactly two ledger entries: RELEASE for the payer and DEPOSIT
    /// for the payee, both carrying the same reference and meta.
    pub async fn release_tx(
        &self,
        conn: &mut SqliteConnection,
        from_user_id: Uuid,
        to_user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<(WalletTransaction, WalletTransaction)> {
        assert_positive(amount)?;
        let from_wallet = self.ensure_wallet_tx(&mut *conn, from_user_id).await?;

        if from_wallet.balance_held < amount {
            return Err(CoreError::InsufficientHeldFunds {
                held: from_wallet.balance_held,
                requested: amount,
            });
        }

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_held = balance_held - ?1, updated_at = ?2
            WHERE user_id = ?3
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(from_user_id)
        .execute(&mut *conn)
        .await?;

        let payer_entry = self
            .insert_entry_tx(
                &mut *conn,
                from_user_id,
                TxType::Release,
                amount,
                Some(INTERNAL_PROVIDER),
                reference_id,
                meta.clone(),
            )
            .await?;

        let payee_entry = self
            .credit_tx(
                &mut *conn,
                to_user_id,
                amount,
                TxType::Deposit,
                Some(INTERNAL_PROVIDER),
                reference_id,
                meta,
            )
            .await?;

        Ok((payer_entry, payee_entry))
    }

    /// Move held -> available for one user and record a REFUND entry
    pub async fn refund_tx(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<WalletTransaction> {
        assert_positive(amount)?;
        let wallet = self.ensure_wallet_tx(&mut *conn, user_id).await?;

        if wallet.balance_held < amount {
            return Err(CoreError::InsufficientHeldFunds {
                held: wallet.balance_held,
                requested: amount,
            });
        }

        sqlx::query(
            r#"
            UPDATE wallets
            SET balance_held = balance_held - ?1,
                balance_available = balance_available + ?1,
                updated_at = ?2
            WHERE user_id = ?3
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        self.insert_entry_tx(
            conn,
            user_id,
            TxType::Refund,
            amount,
            Some(INTERNAL_PROVIDER),
            reference_id,
            meta,
        )
        .await
    }

    /// Append one immutable ledger entry
    async fn insert_entry_tx(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
        tx_type: TxType,
        amount: i64,
        provider: Option<&str>,
        reference_id: Option<Uuid>,
        meta: Option<TxMeta>,
    ) -> CoreResult<WalletTransaction> {
        let entry = sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions
                (id, user_id, tx_type, amount, status, provider, reference_id, meta, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(tx_type)
        .bind(amount)
        .bind(TxStatus::Success)
        .bind(provider)
        .bind(reference_id)
        .bind(meta.map(Json))
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(entry)
    }
}

fn assert_positive(amount: i64) -> CoreResult<()> {
    if amount <= 0 {
        return Err(CoreError::Validation(
            "amount must be a positive number of minor units".to_string(),
        ));
    }
    Ok(())
}
