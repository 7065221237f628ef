use crate::models::ParticipantData;
use crate::models::slug::fold_accents;

/// Well-known result columns, recognised whatever the file calls them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Bib,
    Chip,
    Category,
    Distance,
    Sex,
    City,
    Team,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Bib,
        Field::Chip,
        Field::Category,
        Field::Distance,
        Field::Sex,
        Field::City,
        Field::Team,
    ];

    /// Column of `participants` holding the extracted value.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Bib => "bib",
            Self::Chip => "chip",
            Self::Category => "category",
            Self::Distance => "distance",
            Self::Sex => "sex",
            Self::City => "city",
            Self::Team => "team",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Name => &["NOMBRE", "NAME"],
            Self::Bib => &["DORSAL", "BIB"],
            Self::Chip => &["CHIP"],
            Self::Category => &["CATEGORIA", "CATEGORY"],
            Self::Distance => &["MODALIDAD", "DISTANCE", "DISTANCIA"],
            Self::Sex => &["SEXO", "SEX"],
            Self::City => &["CIUDAD", "CITY"],
            Self::Team => &["EQUIPO", "TEAM", "CLUB"],
        }
    }
}

const POSITION_ALIASES: &[&str] = &["POSICION", "POSITION", "POS"];

/// Searchable values pulled out of a row's free-form columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantFields {
    pub name: Option<String>,
    pub bib: Option<String>,
    pub chip: Option<String>,
    pub category: Option<String>,
    pub distance: Option<String>,
    pub sex: Option<String>,
    pub city: Option<String>,
    pub team: Option<String>,
    pub position: Option<i32>,
}

impl ParticipantFields {
    pub fn extract(data: &ParticipantData) -> Self {
        let mut fields = Self::default();

        for (column, value) in data.iter() {
            let key = normalize_column(column);
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            if POSITION_ALIASES.contains(&key.as_str()) {
                if fields.position.is_none() {
                    fields.position = parse_position(value);
                }
                continue;
            }

            if let Some(field) = Field::ALL.iter().find(|f| f.aliases().contains(&key.as_str())) {
                let slot = fields.slot_mut(*field);
                if slot.is_none() {
                    *slot = Some(value.to_string());
                }
            }
        }

        fields
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => self.name.as_deref(),
            Field::Bib => self.bib.as_deref(),
            Field::Chip => self.chip.as_deref(),
            Field::Category => self.category.as_deref(),
            Field::Distance => self.distance.as_deref(),
            Field::Sex => self.sex.as_deref(),
            Field::City => self.city.as_deref(),
            Field::Team => self.team.as_deref(),
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Bib => &mut self.bib,
            Field::Chip => &mut self.chip,
            Field::Category => &mut self.category,
            Field::Distance => &mut self.distance,
            Field::Sex => &mut self.sex,
            Field::City => &mut self.city,
            Field::Team => &mut self.team,
        }
    }
}

/// `Categoría`, `CATEGORIA` and `categoria` all become `CATEGORIA`; `POS.CAT.` becomes `POSCAT`.
fn normalize_column(column: &str) -> String {
    fold_accents(column)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Leading digits of the cell, so `1`, `001`, `1º` and `1.` all rank first.
fn parse_position(value: &str) -> Option<i32> {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(columns: &[(&str, &str)]) -> ParticipantData {
        columns
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn extracts_spanish_headers() {
        let fields = ParticipantFields::extract(&data(&[
            ("SEXO", "F"),
            ("NOMBRE", "Marta Ruiz"),
            ("CHIP", "A77"),
            ("DORSAL", "007"),
            ("MODALIDAD", "10K"),
            ("CATEGORIA", "SENIOR"),
            ("POSICION", "7"),
            ("POS.CAT.", "2"),
            ("CIUDAD", "Quito"),
            ("EQUIPO", "Runners"),
        ]));

        assert_eq!(fields.name.as_deref(), Some("Marta Ruiz"));
        assert_eq!(fields.bib.as_deref(), Some("007"));
        assert_eq!(fields.chip.as_deref(), Some("A77"));
        assert_eq!(fields.distance.as_deref(), Some("10K"));
        assert_eq!(fields.category.as_deref(), Some("SENIOR"));
        assert_eq!(fields.sex.as_deref(), Some("F"));
        assert_eq!(fields.city.as_deref(), Some("Quito"));
        assert_eq!(fields.team.as_deref(), Some("Runners"));
        assert_eq!(fields.position, Some(7));
    }

    #[test]
    fn header_matching_ignores_case_and_accents() {
        let fields = ParticipantFields::extract(&data(&[
            ("Categoría", "Veterano"),
            ("nombre", "Luis"),
            ("Posición", "12º"),
        ]));

        assert_eq!(fields.category.as_deref(), Some("Veterano"));
        assert_eq!(fields.name.as_deref(), Some("Luis"));
        assert_eq!(fields.position, Some(12));
    }

    #[test]
    fn blank_and_non_numeric_cells_are_absent() {
        let fields = ParticipantFields::extract(&data(&[
            ("NOMBRE", "  "),
            ("POSICION", "DNF"),
        ]));

        assert_eq!(fields.name, None);
        assert_eq!(fields.position, None);
    }
}
