pub mod event;
pub mod participant;
pub mod slug;

pub use event::{Event, EventStatus};
pub use participant::{Participant, ParticipantData};
