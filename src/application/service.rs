use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::{
    Cents, Expense, IntegrityReport, MAX_CENTS, NewSettlement, Participant, ParticipantId,
    Settlement, Trip, TripId, check_integrity,
};
use crate::storage::{LedgerSnapshot, Repository};

use super::{AppError, TripBalances};

/// Application service providing high-level operations over trip ledgers.
/// This is the primary interface for any client (CLI, export, tests).
pub struct LedgerService {
    repo: Repository,
}

/// Request to record an expense.
pub struct NewExpense {
    pub description: Option<String>,
    pub amount_cents: Cents,
    pub paid_by: Option<ParticipantId>,
    /// Share per participant; each participant at most once
    pub splits: Vec<(ParticipantId, Cents)>,
    pub spent_at: DateTime<Utc>,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        tracing::debug!(database = database_path, "database initialized");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Trip operations
    // ========================

    pub async fn create_trip(&self, name: String) -> Result<Trip, AppError> {
        if self.repo.get_trip_by_name(&name).await?.is_some() {
            return Err(AppError::TripAlreadyExists(name));
        }

        let trip = Trip::new(name);
        self.repo.save_trip(&trip).await?;
        tracing::info!(trip = %trip.name, id = %trip.id, "trip created");
        Ok(trip)
    }

    /// Get a trip by name.
    pub async fn get_trip(&self, name: &str) -> Result<Trip, AppError> {
        self.repo
            .get_trip_by_name(name)
            .await?
            .ok_or_else(|| AppError::TripNotFound(name.to_string()))
    }

    pub async fn get_trip_by_id(&self, id: TripId) -> Result<Trip, AppError> {
        self.repo
            .get_trip(id)
            .await?
            .ok_or_else(|| AppError::TripNotFound(id.to_string()))
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>, AppError> {
        Ok(self.repo.list_trips().await?)
    }

    // ========================
    // Participant operations
    // ========================

    pub async fn add_participant(
        &self,
        trip_id: TripId,
        name: String,
    ) -> Result<Participant, AppError> {
        let trip = self.get_trip_by_id(trip_id).await?;

        if self
            .repo
            .get_participant_by_name(trip.id, &name)
            .await?
            .is_some()
        {
            return Err(AppError::ParticipantAlreadyExists(name));
        }

        let participant = Participant::new(trip.id, name);
        self.repo.save_participant(&participant).await?;
        tracing::info!(trip = %trip.name, participant = %participant.name, "participant added");
        Ok(participant)
    }

    /// Get a participant of a trip by name.
    pub async fn get_participant(
        &self,
        trip_id: TripId,
        name: &str,
    ) -> Result<Participant, AppError> {
        self.repo
            .get_participant_by_name(trip_id, name)
            .await?
            .ok_or_else(|| AppError::ParticipantNotFound(name.to_string()))
    }

    /// List a trip's participants in the order they joined.
    pub async fn list_participants(&self, trip_id: TripId) -> Result<Vec<Participant>, AppError> {
        let trip = self.get_trip_by_id(trip_id).await?;
        Ok(self.repo.list_participants(trip.id).await?)
    }

    // ========================
    // Expense operations
    // ========================

    /// Record an expense and its splits.
    ///
    /// Amounts must lie in `0..=MAX_CENTS`, the payer and every split participant
    /// must belong to the trip, and nobody may appear twice in the splits.
    /// Splits are not required to add up to the amount.
    pub async fn record_expense(
        &self,
        trip_id: TripId,
        request: NewExpense,
    ) -> Result<Expense, AppError> {
        let trip = self.get_trip_by_id(trip_id).await?;
        let members: HashSet<ParticipantId> = self
            .repo
            .list_participants(trip.id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        if request.amount_cents < 0 {
            return Err(AppError::InvalidExpense(
                "Amount must not be negative".to_string(),
            ));
        }
        if request.amount_cents > MAX_CENTS {
            return Err(AppError::InvalidExpense(
                "Amount exceeds the largest accepted value".to_string(),
            ));
        }
        if let Some(payer) = request.paid_by {
            if !members.contains(&payer) {
                return Err(AppError::InvalidExpense(format!(
                    "Payer {} does not belong to trip {}",
                    payer, trip.name
                )));
            }
        }

        let mut expense = Expense::new(trip.id, request.amount_cents, request.spent_at);
        if let Some(desc) = request.description {
            expense = expense.with_description(desc);
        }
        if let Some(payer) = request.paid_by {
            expense = expense.with_payer(payer);
        }

        for &(participant_id, amount) in &request.splits {
            if !(0..=MAX_CENTS).contains(&amount) {
                return Err(AppError::InvalidExpense(
                    "Split amounts must be between zero and the largest accepted value"
                        .to_string(),
                ));
            }
            if !members.contains(&participant_id) {
                return Err(AppError::InvalidExpense(format!(
                    "Split participant {} does not belong to trip {}",
                    participant_id, trip.name
                )));
            }
        }
        expense = expense.with_splits(request.splits);

        if let Some(duplicate) = expense.duplicate_split_participant() {
            return Err(AppError::InvalidExpense(format!(
                "Participant {} appears more than once in the splits",
                duplicate
            )));
        }

        self.repo.save_expense(&expense).await?;
        tracing::info!(
            trip = %trip.name,
            amount_cents = expense.amount_cents,
            splits = expense.splits.len(),
            "expense recorded"
        );
        if !expense.is_fully_split() {
            tracing::warn!(
                expense = %expense.id,
                amount_cents = expense.amount_cents,
                split_total = expense.split_total(),
                "expense splits do not add up to its amount"
            );
        }
        Ok(expense)
    }

    pub async fn list_expenses(&self, trip_id: TripId) -> Result<Vec<Expense>, AppError> {
        let trip = self.get_trip_by_id(trip_id).await?;
        Ok(self.repo.list_expenses(trip.id).await?)
    }

    // ========================
    // Settlement operations
    // ========================

    /// Record that a payment happened between two participants.
    /// Rejected requests write nothing.
    pub async fn record_settlement(
        &self,
        trip_id: TripId,
        request: NewSettlement,
    ) -> Result<Settlement, AppError> {
        let trip = self.get_trip_by_id(trip_id).await?;
        let participants = self.repo.list_participants(trip.id).await?;

        let settlement = request
            .validate(&trip, &participants)
            .inspect_err(|err| {
                tracing::warn!(trip = %trip.name, reason = %err, "settlement rejected")
            })?;

        self.repo.save_settlement(&settlement).await?;
        tracing::info!(
            trip = %trip.name,
            from = %settlement.from_id,
            to = %settlement.to_id,
            amount_cents = settlement.amount_cents,
            "settlement recorded"
        );
        Ok(settlement)
    }

    pub async fn list_settlements(&self, trip_id: TripId) -> Result<Vec<Settlement>, AppError> {
        let trip = self.get_trip_by_id(trip_id).await?;
        Ok(self.repo.list_settlements(trip.id).await?)
    }

    // ========================
    // Balance operations
    // ========================

    /// Read the trip's current records in one snapshot.
    pub async fn get_ledger(&self, trip_id: TripId) -> Result<LedgerSnapshot, AppError> {
        let trip = self.get_trip_by_id(trip_id).await?;
        Ok(self.repo.load_ledger(trip.id).await?)
    }

    /// Net balance of every participant plus the payments that would clear
    /// them. Recomputed from scratch on every call.
    pub async fn get_trip_balances(&self, trip_id: TripId) -> Result<TripBalances, AppError> {
        let snapshot = self.get_ledger(trip_id).await?;
        let result = TripBalances::from_snapshot(&snapshot);

        tracing::debug!(
            trip = %trip_id,
            participants = snapshot.participants.len(),
            expenses = snapshot.expenses.len(),
            settlements = snapshot.settlements.len(),
            transactions = result.transactions.len(),
            "balances computed"
        );
        Ok(result)
    }

    /// Check a trip ledger for records that keep it from balancing.
    pub async fn check_trip(&self, trip_id: TripId) -> Result<IntegrityReport, AppError> {
        let snapshot = self.get_ledger(trip_id).await?;
        let report = check_integrity(
            &snapshot.participants,
            &snapshot.expenses,
            &snapshot.settlements,
        );

        for issue in &report.issues {
            tracing::warn!(trip = %trip_id, %issue, "integrity issue");
        }
        Ok(report)
    }
}
