use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{LedgerService, TripBalances};
use crate::domain::{
    Balance, Expense, Participant, Settlement, Transaction, Trip, TripId, format_cents,
};

/// Full picture of one trip, as written by `export full`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub trip: Trip,
    pub participants: Vec<Participant>,
    pub expenses: Vec<Expense>,
    pub settlements: Vec<Settlement>,
    pub balances: Vec<Balance>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for writing trip ledgers to CSV or JSON.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export net balances to CSV, one row per participant.
    pub async fn export_balances_csv<W: Write>(
        &self,
        trip_id: TripId,
        writer: W,
    ) -> Result<usize> {
        let result = self.service.get_trip_balances(trip_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["participant_id", "participant", "net"])?;
        for balance in &result.balances {
            csv_writer.write_record([
                balance.participant_id.to_string(),
                balance.name.clone(),
                format_cents(balance.net),
            ])?;
        }

        csv_writer.flush()?;
        Ok(result.balances.len())
    }

    /// Export the suggested payments to CSV, in planning order.
    pub async fn export_plan_csv<W: Write>(&self, trip_id: TripId, writer: W) -> Result<usize> {
        let result = self.service.get_trip_balances(trip_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["from", "to", "amount"])?;
        for transaction in &result.transactions {
            csv_writer.write_record([
                transaction.from.name.as_str(),
                transaction.to.name.as_str(),
                format_cents(transaction.amount).as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(result.transactions.len())
    }

    /// Export the whole trip, computed balances included, as JSON.
    pub async fn export_trip_json<W: Write>(
        &self,
        trip_id: TripId,
        mut writer: W,
    ) -> Result<TripSnapshot> {
        let trip = self.service.get_trip_by_id(trip_id).await?;
        let ledger = self.service.get_ledger(trip_id).await?;
        let result = TripBalances::from_snapshot(&ledger);

        let snapshot = TripSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            trip,
            participants: ledger.participants,
            expenses: ledger.expenses,
            settlements: ledger.settlements,
            balances: result.balances,
            transactions: result.transactions,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
