//! Participant lookup semantics shared by every store backend.

mod comparison;
mod fields;
mod filter;

pub use comparison::{PREVIOUS_PARTICIPANTS, locate_in_ranking};
pub use fields::{Field, ParticipantFields};
pub use filter::{Criterion, MatchKind, ParticipantFilter, escape_like};
