use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TripId = Uuid;
pub type ParticipantId = Uuid;

/// A trip groups the participants, expenses and settlements of one ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Someone sharing the costs of a trip. Belongs to exactly one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub trip_id: TripId,
    pub name: String,
}

impl Participant {
    pub fn new(trip_id: TripId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            name: name.into(),
        }
    }

    pub fn to_ref(&self) -> ParticipantRef {
        ParticipantRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Id and display name of a participant, as carried in computed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: ParticipantId,
    pub name: String,
}
