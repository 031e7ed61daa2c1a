use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Expense, ExpenseId, ExpenseSplit, Participant, Settlement, Trip, TripId};

use super::MIGRATION_001_INITIAL;

/// Everything a balance computation reads for one trip, taken from a single
/// read transaction.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub participants: Vec<Participant>,
    pub expenses: Vec<Expense>,
    pub settlements: Vec<Settlement>,
}

/// Repository for persisting and querying trips and their ledger records.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Trip operations
    // ========================

    pub async fn save_trip(&self, trip: &Trip) -> Result<()> {
        sqlx::query("INSERT INTO trips (id, name, created_at) VALUES (?, ?, ?)")
            .bind(trip.id.to_string())
            .bind(&trip.name)
            .bind(trip.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save trip")?;
        Ok(())
    }

    pub async fn get_trip(&self, id: TripId) -> Result<Option<Trip>> {
        let row = sqlx::query("SELECT id, name, created_at FROM trips WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch trip")?;

        row.as_ref().map(Self::row_to_trip).transpose()
    }

    pub async fn get_trip_by_name(&self, name: &str) -> Result<Option<Trip>> {
        let row = sqlx::query("SELECT id, name, created_at FROM trips WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch trip by name")?;

        row.as_ref().map(Self::row_to_trip).transpose()
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM trips ORDER BY created_at, name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list trips")?;

        rows.iter().map(Self::row_to_trip).collect()
    }

    fn row_to_trip(row: &SqliteRow) -> Result<Trip> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Trip {
            id: Uuid::parse_str(&id_str).context("Invalid trip ID")?,
            name: row.get("name"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Participant operations
    // ========================

    /// Save a participant at the end of its trip's participant order.
    pub async fn save_participant(&self, participant: &Participant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO participants (id, trip_id, name, position)
            SELECT ?, ?, ?, COALESCE(MAX(position), 0) + 1
            FROM participants
            WHERE trip_id = ?
            "#,
        )
        .bind(participant.id.to_string())
        .bind(participant.trip_id.to_string())
        .bind(&participant.name)
        .bind(participant.trip_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to save participant")?;
        Ok(())
    }

    pub async fn get_participant_by_name(
        &self,
        trip_id: TripId,
        name: &str,
    ) -> Result<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, trip_id, name FROM participants WHERE trip_id = ? AND name = ?",
        )
        .bind(trip_id.to_string())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch participant by name")?;

        row.as_ref().map(Self::row_to_participant).transpose()
    }

    /// List a trip's participants in the order they joined.
    pub async fn list_participants(&self, trip_id: TripId) -> Result<Vec<Participant>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::fetch_participants(&mut conn, trip_id).await
    }

    async fn fetch_participants(
        conn: &mut SqliteConnection,
        trip_id: TripId,
    ) -> Result<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT id, trip_id, name FROM participants WHERE trip_id = ? ORDER BY position",
        )
        .bind(trip_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list participants")?;

        rows.iter().map(Self::row_to_participant).collect()
    }

    fn row_to_participant(row: &SqliteRow) -> Result<Participant> {
        let id_str: String = row.get("id");
        let trip_id_str: String = row.get("trip_id");

        Ok(Participant {
            id: Uuid::parse_str(&id_str).context("Invalid participant ID")?,
            trip_id: Uuid::parse_str(&trip_id_str).context("Invalid trip ID")?,
            name: row.get("name"),
        })
    }

    // ========================
    // Expense operations
    // ========================

    /// Save an expense together with its splits in one transaction.
    pub async fn save_expense(&self, expense: &Expense) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO expenses
                (id, trip_id, description, amount_cents, paid_by, spent_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.trip_id.to_string())
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(expense.paid_by.map(|id| id.to_string()))
        .bind(expense.spent_at.to_rfc3339())
        .bind(expense.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save expense")?;

        for (position, split) in expense.splits.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO expense_splits (id, expense_id, participant_id, amount_cents, position)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(split.id.to_string())
            .bind(split.expense_id.to_string())
            .bind(split.participant_id.to_string())
            .bind(split.amount_cents)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .context("Failed to save expense split")?;
        }

        tx.commit().await.context("Failed to commit expense")?;
        Ok(())
    }

    /// List a trip's expenses (with splits) in the order they were spent.
    pub async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::fetch_expenses(&mut conn, trip_id).await
    }

    async fn fetch_expenses(conn: &mut SqliteConnection, trip_id: TripId) -> Result<Vec<Expense>> {
        let expense_rows = sqlx::query(
            r#"
            SELECT id, trip_id, description, amount_cents, paid_by, spent_at, created_at
            FROM expenses
            WHERE trip_id = ?
            ORDER BY spent_at, created_at
            "#,
        )
        .bind(trip_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list expenses")?;

        let split_rows = sqlx::query(
            r#"
            SELECT s.id, s.expense_id, s.participant_id, s.amount_cents
            FROM expense_splits s
            JOIN expenses e ON e.id = s.expense_id
            WHERE e.trip_id = ?
            ORDER BY s.expense_id, s.position
            "#,
        )
        .bind(trip_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list expense splits")?;

        let mut splits: HashMap<ExpenseId, Vec<ExpenseSplit>> = HashMap::new();
        for row in &split_rows {
            let split = Self::row_to_split(row)?;
            splits.entry(split.expense_id).or_default().push(split);
        }

        expense_rows
            .iter()
            .map(|row| {
                let mut expense = Self::row_to_expense(row)?;
                expense.splits = splits.remove(&expense.id).unwrap_or_default();
                Ok(expense)
            })
            .collect()
    }

    fn row_to_expense(row: &SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let trip_id_str: String = row.get("trip_id");
        let paid_by_str: Option<String> = row.get("paid_by");
        let spent_at_str: String = row.get("spent_at");
        let created_at_str: String = row.get("created_at");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            trip_id: Uuid::parse_str(&trip_id_str).context("Invalid trip ID")?,
            description: row.get("description"),
            amount_cents: row.get("amount_cents"),
            paid_by: paid_by_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid paid_by ID")?,
            splits: Vec::new(),
            spent_at: parse_timestamp(&spent_at_str).context("Invalid spent_at")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    fn row_to_split(row: &SqliteRow) -> Result<ExpenseSplit> {
        let id_str: String = row.get("id");
        let expense_id_str: String = row.get("expense_id");
        let participant_id_str: String = row.get("participant_id");

        Ok(ExpenseSplit {
            id: Uuid::parse_str(&id_str).context("Invalid split ID")?,
            expense_id: Uuid::parse_str(&expense_id_str).context("Invalid expense ID")?,
            participant_id: Uuid::parse_str(&participant_id_str)
                .context("Invalid participant ID")?,
            amount_cents: row.get("amount_cents"),
        })
    }

    // ========================
    // Settlement operations
    // ========================

    pub async fn save_settlement(&self, settlement: &Settlement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settlements (id, trip_id, from_id, to_id, amount_cents, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(settlement.id.to_string())
        .bind(settlement.trip_id.to_string())
        .bind(settlement.from_id.to_string())
        .bind(settlement.to_id.to_string())
        .bind(settlement.amount_cents)
        .bind(&settlement.note)
        .bind(settlement.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save settlement")?;
        Ok(())
    }

    /// List a trip's settlements in the order they were recorded.
    pub async fn list_settlements(&self, trip_id: TripId) -> Result<Vec<Settlement>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::fetch_settlements(&mut conn, trip_id).await
    }

    async fn fetch_settlements(
        conn: &mut SqliteConnection,
        trip_id: TripId,
    ) -> Result<Vec<Settlement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trip_id, from_id, to_id, amount_cents, note, created_at
            FROM settlements
            WHERE trip_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(trip_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list settlements")?;

        rows.iter().map(Self::row_to_settlement).collect()
    }

    fn row_to_settlement(row: &SqliteRow) -> Result<Settlement> {
        let id_str: String = row.get("id");
        let trip_id_str: String = row.get("trip_id");
        let from_str: String = row.get("from_id");
        let to_str: String = row.get("to_id");
        let created_at_str: String = row.get("created_at");

        Ok(Settlement {
            id: Uuid::parse_str(&id_str).context("Invalid settlement ID")?,
            trip_id: Uuid::parse_str(&trip_id_str).context("Invalid trip ID")?,
            from_id: Uuid::parse_str(&from_str).context("Invalid from_id")?,
            to_id: Uuid::parse_str(&to_str).context("Invalid to_id")?,
            amount_cents: row.get("amount_cents"),
            note: row.get("note"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Ledger snapshot
    // ========================

    /// Read participants, expenses and settlements of a trip inside one
    /// transaction, so a concurrent write is seen entirely or not at all.
    pub async fn load_ledger(&self, trip_id: TripId) -> Result<LedgerSnapshot> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let participants = Self::fetch_participants(&mut tx, trip_id).await?;
        let expenses = Self::fetch_expenses(&mut tx, trip_id).await?;
        let settlements = Self::fetch_settlements(&mut tx, trip_id).await?;

        tx.commit().await.context("Failed to finish ledger read")?;

        Ok(LedgerSnapshot {
            participants,
            expenses,
            settlements,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
