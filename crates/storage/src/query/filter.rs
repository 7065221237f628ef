use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use super::fields::{Field, ParticipantFields};
use crate::error::{Result, StorageError};

/// Participant search parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParticipantFilter {
    /// Case-insensitive substring of the participant name
    pub name: Option<String>,
    /// Exact chip code
    pub chip: Option<String>,
    /// Exact bib number, also accepted as `bib`
    #[serde(alias = "bib")]
    pub dorsal: Option<String>,
    /// Case-insensitive substring of the category
    pub category: Option<String>,
    /// Exact distance / modality, e.g. `10K`
    pub distance: Option<String>,
    /// Exact sex code
    pub sex: Option<String>,
    /// Overall finishing position
    pub position: Option<String>,
    /// Case-insensitive substring of the city
    pub city: Option<String>,
    /// Case-insensitive substring of the team or club
    pub team: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Contains,
    Equals,
}

/// One AND-ed condition on a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Text {
        field: Field,
        kind: MatchKind,
        value: String,
    },
    Position(i32),
}

impl ParticipantFilter {
    /// Turns the non-empty parameters into conditions. Fails on a non-numeric position.
    pub fn criteria(&self) -> Result<Vec<Criterion>> {
        let text = [
            (Field::Name, MatchKind::Contains, &self.name),
            (Field::Category, MatchKind::Contains, &self.category),
            (Field::City, MatchKind::Contains, &self.city),
            (Field::Team, MatchKind::Contains, &self.team),
            (Field::Bib, MatchKind::Equals, &self.dorsal),
            (Field::Chip, MatchKind::Equals, &self.chip),
            (Field::Sex, MatchKind::Equals, &self.sex),
            (Field::Distance, MatchKind::Equals, &self.distance),
        ];

        let mut criteria: Vec<Criterion> = text
            .into_iter()
            .filter_map(|(field, kind, value)| {
                non_empty(value).map(|value| Criterion::Text {
                    field,
                    kind,
                    value: value.to_string(),
                })
            })
            .collect();

        if let Some(position) = non_empty(&self.position) {
            let position = position.parse::<i32>().map_err(|_| {
                StorageError::Validation(format!("invalid position '{}', must be a number", position))
            })?;
            criteria.push(Criterion::Position(position));
        }

        Ok(criteria)
    }
}

impl Criterion {
    pub fn matches(&self, fields: &ParticipantFields) -> bool {
        match self {
            Self::Text { field, kind, value } => {
                let Some(candidate) = fields.get(*field) else {
                    return false;
                };
                let candidate = candidate.to_lowercase();
                let value = value.to_lowercase();
                match kind {
                    MatchKind::Contains => candidate.contains(&value),
                    MatchKind::Equals => candidate == value,
                }
            }
            Self::Position(position) => fields.position == Some(*position),
        }
    }

    /// Appends ` AND <condition>` to a query already filtering on the event.
    pub fn push_sql(&self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Self::Text {
                field,
                kind: MatchKind::Contains,
                value,
            } => {
                query.push(format!(" AND {} ILIKE ", field.column()));
                query.push_bind(format!("%{}%", escape_like(value)));
                query.push(" ESCAPE '\\'");
            }
            Self::Text {
                field,
                kind: MatchKind::Equals,
                value,
            } => {
                query.push(format!(" AND lower({}) = lower(", field.column()));
                query.push_bind(value.clone());
                query.push(")");
            }
            Self::Position(position) => {
                query.push(" AND position = ");
                query.push_bind(*position);
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Escapes LIKE wildcards so user input is matched literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ParticipantFields {
        ParticipantFields {
            name: Some("María José Pérez".to_string()),
            bib: Some("007".to_string()),
            chip: Some("AB12".to_string()),
            category: Some("Senior A Damas".to_string()),
            distance: Some("10K".to_string()),
            sex: Some("F".to_string()),
            city: Some("Cuenca".to_string()),
            team: None,
            position: Some(7),
        }
    }

    #[test]
    fn empty_parameters_produce_no_criteria() {
        let filter = ParticipantFilter {
            name: Some("   ".to_string()),
            chip: Some(String::new()),
            ..Default::default()
        };
        assert!(filter.criteria().unwrap().is_empty());
    }

    #[test]
    fn name_is_case_insensitive_substring() {
        let filter = ParticipantFilter {
            name: Some("JOSÉ".to_string()),
            ..Default::default()
        };
        let criteria = filter.criteria().unwrap();
        assert!(criteria.iter().all(|c| c.matches(&fields())));

        let filter = ParticipantFilter {
            name: Some("jose".to_string()),
            ..Default::default()
        };
        assert!(!filter.criteria().unwrap()[0].matches(&fields()));
    }

    #[test]
    fn bib_and_sex_require_whole_value() {
        let exact = ParticipantFilter {
            dorsal: Some("007".to_string()),
            sex: Some("f".to_string()),
            ..Default::default()
        };
        assert!(exact.criteria().unwrap().iter().all(|c| c.matches(&fields())));

        let partial = ParticipantFilter {
            dorsal: Some("07".to_string()),
            ..Default::default()
        };
        assert!(!partial.criteria().unwrap()[0].matches(&fields()));
    }

    #[test]
    fn criteria_are_combined_with_and() {
        let filter = ParticipantFilter {
            name: Some("maría".to_string()),
            distance: Some("5K".to_string()),
            ..Default::default()
        };
        let criteria = filter.criteria().unwrap();
        assert_eq!(criteria.len(), 2);
        assert!(!criteria.iter().all(|c| c.matches(&fields())));
    }

    #[test]
    fn missing_field_never_matches() {
        let filter = ParticipantFilter {
            team: Some("runners".to_string()),
            ..Default::default()
        };
        assert!(!filter.criteria().unwrap()[0].matches(&fields()));
    }

    #[test]
    fn position_must_be_numeric() {
        let filter = ParticipantFilter {
            position: Some("7".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.criteria().unwrap(), vec![Criterion::Position(7)]);
        assert!(filter.criteria().unwrap()[0].matches(&fields()));

        let filter = ParticipantFilter {
            position: Some("first".to_string()),
            ..Default::default()
        };
        assert!(matches!(filter.criteria(), Err(StorageError::Validation(_))));
    }

    #[test]
    fn bib_alias_is_accepted() {
        let filter: ParticipantFilter = serde_json::from_str(r#"{"bib":"12"}"#).unwrap();
        assert_eq!(filter.dorsal.as_deref(), Some("12"));
    }

    #[test]
    fn sql_binds_escaped_patterns() {
        let filter = ParticipantFilter {
            name: Some("50%_off".to_string()),
            dorsal: Some("12".to_string()),
            position: Some("3".to_string()),
            ..Default::default()
        };

        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM participants WHERE TRUE");
        for criterion in filter.criteria().unwrap() {
            criterion.push_sql(&mut query);
        }

        assert_eq!(
            query.sql(),
            "SELECT 1 FROM participants WHERE TRUE AND name ILIKE $1 ESCAPE '\\' AND lower(bib) = lower($2) AND position = $3"
        );
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
