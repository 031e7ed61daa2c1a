use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Cents, MAX_CENTS, Participant, ParticipantId, Trip, TripId, money};

pub type SettlementId = Uuid;

/// A real-world payment already made between two participants of a trip.
/// Settlements are append-only; the ledger never edits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: SettlementId,
    pub trip_id: TripId,
    /// Debtor who paid
    pub from_id: ParticipantId,
    /// Creditor who received the money
    pub to_id: ParticipantId,
    /// Always positive
    #[serde(rename = "amount", with = "money::decimal")]
    pub amount_cents: Cents,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        trip_id: TripId,
        from_id: ParticipantId,
        to_id: ParticipantId,
        amount: Cents,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            from_id,
            to_id,
            amount_cents: amount,
            note: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Why a settlement request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("amount must be positive (got {0} cents)")]
    NonPositiveAmount(Cents),

    #[error("amount exceeds the largest accepted value (got {0} cents)")]
    AmountTooLarge(Cents),

    #[error("a participant cannot settle with themselves")]
    SelfSettlement,

    #[error("participant {0} does not belong to this trip")]
    ParticipantNotInTrip(ParticipantId),

    /// A party named by a client that is not a member of the trip.
    #[error("participant {0} does not belong to this trip")]
    UnknownParticipant(String),
}

/// An unvalidated settlement request. Every field may be absent, exactly as
/// it arrives from a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSettlement {
    pub from_id: Option<ParticipantId>,
    pub to_id: Option<ParticipantId>,
    #[serde(rename = "amount", default, with = "optional_decimal")]
    pub amount_cents: Option<Cents>,
    pub note: Option<String>,
}

impl NewSettlement {
    pub fn new(from_id: ParticipantId, to_id: ParticipantId, amount_cents: Cents) -> Self {
        Self {
            from_id: Some(from_id),
            to_id: Some(to_id),
            amount_cents: Some(amount_cents),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Check the request against the trip and its participants and build the
    /// settlement to persist. Nothing is written here.
    ///
    /// Checks run in order: required fields, positive amount within
    /// [`MAX_CENTS`], distinct parties, trip membership of both parties.
    pub fn validate(
        &self,
        trip: &Trip,
        participants: &[Participant],
    ) -> Result<Settlement, SettlementError> {
        let from_id = self.from_id.ok_or(SettlementError::MissingField("fromId"))?;
        let to_id = self.to_id.ok_or(SettlementError::MissingField("toId"))?;
        let amount = self
            .amount_cents
            .ok_or(SettlementError::MissingField("amount"))?;

        if amount <= 0 {
            return Err(SettlementError::NonPositiveAmount(amount));
        }
        if amount > MAX_CENTS {
            return Err(SettlementError::AmountTooLarge(amount));
        }
        if from_id == to_id {
            return Err(SettlementError::SelfSettlement);
        }

        let in_trip = |id: ParticipantId| {
            participants
                .iter()
                .any(|p| p.id == id && p.trip_id == trip.id)
        };
        for id in [from_id, to_id] {
            if !in_trip(id) {
                return Err(SettlementError::ParticipantNotInTrip(id));
            }
        }

        let settlement = Settlement::new(trip.id, from_id, to_id, amount);
        Ok(match &self.note {
            Some(note) => settlement.with_note(note.clone()),
            None => settlement,
        })
    }
}

/// `Option<Cents>` as an optional decimal currency value.
mod optional_decimal {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::{Cents, cents_to_decimal, decimal_to_cents};

    pub fn serialize<S: Serializer>(
        cents: &Option<Cents>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match cents {
            Some(c) => serializer.serialize_some(&cents_to_decimal(*c)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Cents>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(decimal_to_cents)
            .transpose()
            .map_err(D::Error::custom)
    }
}
