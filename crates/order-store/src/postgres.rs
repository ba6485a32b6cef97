//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{OrderId, UserId, VehicleId};
use domain::{
    Discount, Money, NewOrder, Order, OrderStatus, PayloadType, PaymentId, PaymentSession,
    PaymentStrategy, RentalPeriod,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::store::RentalStore;
use crate::{Result, StoreError};

/// PostgreSQL [`RentalStore`] implementation.
///
/// Guarded status writes are a single `UPDATE ... WHERE status = ANY(...)`
/// so the guard check and the write happen under the row lock; the
/// reinitialization swap runs in a transaction.
#[derive(Clone)]
pub struct PostgresRentalStore {
    pool: PgPool,
}

impl PostgresRentalStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order status {status_str}")))?;
        let discount_percent: i16 = row.try_get("discount")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            status,
            amount: Money::from_minor_units(row.try_get("amount")?),
            discount: decode_discount(discount_percent)?,
            starts_at: row.try_get("starts_at")?,
            ends_at: row.try_get("ends_at")?,
            pickup_location: row.try_get("pickup_location")?,
            pickup_district: row.try_get("pickup_district")?,
            return_location: row.try_get("return_location")?,
            return_district: row.try_get("return_district")?,
            with_manager: row.try_get("with_manager")?,
            created_at: row.try_get("created_at")?,
            vehicle_id: VehicleId::from_uuid(row.try_get::<Uuid, _>("vehicle_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        })
    }

    fn row_to_session(row: &PgRow) -> Result<PaymentSession> {
        let strategy_str: String = row.try_get("strategy")?;
        let payload_type_str: String = row.try_get("payload_type")?;

        Ok(PaymentSession {
            payment_id: PaymentId::new(row.try_get::<String, _>("payment_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            strategy: decode_strategy(&strategy_str)?,
            payload_type: decode_payload_type(&payload_type_str)?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            lifetime: Duration::seconds(row.try_get("lifetime_seconds")?),
        })
    }
}

const ORDER_COLUMNS: &str = "id, status, amount, discount, starts_at, ends_at, \
     pickup_location, pickup_district, return_location, return_district, \
     with_manager, created_at, vehicle_id, user_id";

fn encode_discount(discount: Discount) -> i16 {
    i16::from(discount.percent())
}

fn decode_discount(percent: i16) -> Result<Discount> {
    Ok(match percent {
        0 => Discount::None,
        5 => Discount::Five,
        10 => Discount::Ten,
        15 => Discount::Fifteen,
        other => return Err(StoreError::Corrupt(format!("unknown discount tier {other}"))),
    })
}

fn encode_strategy(strategy: PaymentStrategy) -> &'static str {
    match strategy {
        PaymentStrategy::Card => "CARD",
        PaymentStrategy::Sbp => "SBP",
    }
}

fn decode_strategy(s: &str) -> Result<PaymentStrategy> {
    Ok(match s {
        "CARD" => PaymentStrategy::Card,
        "SBP" => PaymentStrategy::Sbp,
        other => {
            return Err(StoreError::Corrupt(format!(
                "unknown payment strategy {other}"
            )));
        }
    })
}

fn encode_payload_type(payload_type: PayloadType) -> &'static str {
    match payload_type {
        PayloadType::PaymentUrl => "PAYMENT_URL",
        PayloadType::QrUrl => "QR_URL",
        PayloadType::QrImage => "QR_IMAGE",
    }
}

fn decode_payload_type(s: &str) -> Result<PayloadType> {
    Ok(match s {
        "PAYMENT_URL" => PayloadType::PaymentUrl,
        "QR_URL" => PayloadType::QrUrl,
        "QR_IMAGE" => PayloadType::QrImage,
        other => {
            return Err(StoreError::Corrupt(format!(
                "unknown payload type {other}"
            )));
        }
    })
}

#[async_trait]
impl RentalStore for PostgresRentalStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let id = OrderId::new();
        let sql = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), $12, $13) \
             RETURNING {ORDER_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(OrderStatus::New.as_str())
            .bind(order.amount.minor_units())
            .bind(encode_discount(order.discount))
            .bind(order.period.starts_at())
            .bind(order.period.ends_at())
            .bind(&order.pickup_location)
            .bind(&order.pickup_district)
            .bind(&order.return_location)
            .bind(&order.return_district)
            .bind(order.with_manager)
            .bind(order.vehicle_id.as_uuid())
            .bind(order.user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_order(&row)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        // The payment session goes with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn transition(
        &self,
        id: OrderId,
        allowed: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Order> {
        let allowed_strs: Vec<String> =
            allowed.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            "UPDATE orders SET status = $2 \
             WHERE id = $1 AND status = ANY($3) \
             RETURNING {ORDER_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(to.as_str())
            .bind(&allowed_strs)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_order(&row),
            None => {
                // Nothing matched: report whether the order is missing or
                // the guard rejected its current status.
                let current: Option<String> =
                    sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                        .bind(id.as_uuid())
                        .fetch_optional(&self.pool)
                        .await?;

                match current {
                    None => Err(StoreError::OrderNotFound(id)),
                    Some(status_str) => {
                        let current = OrderStatus::parse(&status_str).ok_or_else(|| {
                            StoreError::Corrupt(format!("unknown order status {status_str}"))
                        })?;
                        Err(StoreError::GuardRejected {
                            order_id: id,
                            current,
                        })
                    }
                }
            }
        }
    }

    async fn orders_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: RentalPeriod,
        excluding: Option<OrderId>,
    ) -> Result<Vec<Order>> {
        let released: Vec<String> = [
            OrderStatus::Canceled,
            OrderStatus::Rejected,
            OrderStatus::ReinitFailed,
            OrderStatus::PaymentSessionExpired,
        ]
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE vehicle_id = $1 \
               AND starts_at < $3 AND ends_at > $2 \
               AND status <> ALL($4) \
               AND ($5::uuid IS NULL OR id <> $5)"
        );

        let rows = sqlx::query(&sql)
            .bind(vehicle_id.as_uuid())
            .bind(period.starts_at())
            .bind(period.ends_at())
            .bind(&released)
            .bind(excluding.map(|id| id.as_uuid()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn insert_payment_session(&self, session: PaymentSession) -> Result<()> {
        sqlx::query(
            "INSERT INTO payment_sessions \
             (payment_id, order_id, strategy, payload_type, payload, created_at, lifetime_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(session.payment_id.as_str())
        .bind(session.order_id.as_uuid())
        .bind(encode_strategy(session.strategy))
        .bind(encode_payload_type(session.payload_type))
        .bind(&session.payload)
        .bind(session.created_at)
        .bind(session.lifetime.num_seconds())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateSession(session.payment_id.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn payment_session(&self, order_id: OrderId) -> Result<Option<PaymentSession>> {
        let row = sqlx::query("SELECT * FROM payment_sessions WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn replace_payment_session(
        &self,
        order_id: OrderId,
        session: PaymentSession,
        new_status: OrderStatus,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM payment_sessions WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::SessionNotFound(order_id));
        }

        sqlx::query(
            "INSERT INTO payment_sessions \
             (payment_id, order_id, strategy, payload_type, payload, created_at, lifetime_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(session.payment_id.as_str())
        .bind(session.order_id.as_uuid())
        .bind(encode_strategy(session.strategy))
        .bind(encode_payload_type(session.payload_type))
        .bind(&session.payload)
        .bind(session.created_at)
        .bind(session.lifetime.num_seconds())
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .bind(new_status.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))?;
        let order = Self::row_to_order(&row)?;

        tx.commit().await?;
        Ok(order)
    }

    async fn activate_due_orders(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1 WHERE status = $2 AND starts_at <= $3",
        )
        .bind(OrderStatus::Active.as_str())
        .bind(OrderStatus::Booked.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn expire_stale_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1 \
             FROM payment_sessions ps \
             WHERE ps.order_id = orders.id \
               AND orders.status = ANY($2) \
               AND ps.created_at + make_interval(secs => ps.lifetime_seconds::double precision) <= $3",
        )
        .bind(OrderStatus::PaymentSessionExpired.as_str())
        .bind(vec![
            OrderStatus::AwaitPayment.as_str().to_string(),
            OrderStatus::AwaitReservation.as_str().to_string(),
        ])
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
