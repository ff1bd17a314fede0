use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(TripId);

/// Server-assigned lifecycle stage of a trip.
///
/// The server stores an empty string for rows created before status tracking
/// existed; those read as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TripStatus {
    #[default]
    #[serde(alias = "")]
    Pending,
    Completed,
    Failed,
    Modified,
}

impl TripStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Pending => "Pending",
            TripStatus::Completed => "Completed",
            TripStatus::Failed => "Failed",
            TripStatus::Modified => "Modified",
        }
    }

    /// A status after which a polling session has nothing left to wait for.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TripStatus::Pending)
    }

    /// Whether the trip has generated content worth showing.
    pub fn has_content(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Modified)
    }

    /// Transitions the client may observe on its own.
    ///
    /// Regeneration and form updates send a trip back to `Pending` on the
    /// server; the client re-enters observation there instead of treating it
    /// as a transition.
    pub fn can_transition_to(self, next: TripStatus) -> bool {
        matches!(
            (self, next),
            (TripStatus::Pending, TripStatus::Completed)
                | (TripStatus::Pending, TripStatus::Failed)
                | (TripStatus::Completed, TripStatus::Modified)
        ) || self == next
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
