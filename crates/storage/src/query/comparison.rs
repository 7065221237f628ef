use crate::dto::participant::ComparisonResponse;
use crate::models::Participant;
use crate::query::ParticipantFields;

/// How many finishers ahead of the requested participant are returned.
pub const PREVIOUS_PARTICIPANTS: usize = 5;

/// Picks the leader and the finishers just ahead of `bib` out of an already ordered
/// ranking. An unknown bib yields an empty response.
pub fn locate_in_ranking(ranking: Vec<Participant>, bib: &str) -> ComparisonResponse {
    let bib = bib.trim();
    let Some(target) = ranking.iter().position(|participant| {
        ParticipantFields::extract(&participant.data)
            .bib
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(bib))
    }) else {
        return ComparisonResponse::default();
    };

    let first_place = ranking.first().cloned();
    let start = target.saturating_sub(PREVIOUS_PARTICIPANTS);
    let mut ranking = ranking;
    ranking.truncate(target);

    ComparisonResponse {
        first_place,
        previous_participants: ranking.split_off(start),
    }
}
