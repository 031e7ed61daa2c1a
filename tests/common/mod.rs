// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;
use tripsplit::application::{LedgerService, NewExpense};
use tripsplit::domain::{Cents, Expense, Participant, ParticipantId, Trip};

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: a trip with its participants, in joining order
pub struct TripFixture {
    pub trip: Trip,
    pub people: Vec<Participant>,
}

impl TripFixture {
    pub async fn create(service: &LedgerService, name: &str, people: &[&str]) -> Result<Self> {
        let trip = service.create_trip(name.to_string()).await?;
        let mut added = Vec::with_capacity(people.len());
        for person in people {
            added.push(service.add_participant(trip.id, person.to_string()).await?);
        }
        Ok(Self {
            trip,
            people: added,
        })
    }

    /// Participant id by joining position
    pub fn id(&self, index: usize) -> ParticipantId {
        self.people[index].id
    }

    /// Record an expense paid by `payer` with explicit shares
    pub async fn expense(
        &self,
        service: &LedgerService,
        payer: Option<usize>,
        amount_cents: Cents,
        shares: &[(usize, Cents)],
    ) -> Result<Expense> {
        let expense = service
            .record_expense(
                self.trip.id,
                NewExpense {
                    description: None,
                    amount_cents,
                    paid_by: payer.map(|i| self.id(i)),
                    splits: shares.iter().map(|&(i, c)| (self.id(i), c)).collect(),
                    spent_at: Utc::now(),
                },
            )
            .await?;
        Ok(expense)
    }
}
