use std::collections::BTreeSet;

use thiserror::Error;

use crate::models::ParticipantData;
use crate::query::ParticipantFields;

const FIELD_SEPARATOR: char = '|';
const SECTION_MARKER: char = ';';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("results file is empty or its first line has no event name")]
    MissingEventName,

    #[error("results file has no header row")]
    MissingHeader,
}

/// A data row together with the race section it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub race: Option<String>,
    pub data: ParticipantData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResults {
    pub event_name: String,
    pub rows: Vec<ParsedRow>,
    pub lines_read: usize,
    pub records_skipped: usize,
}

impl ParsedResults {
    /// Sorted distinct distances present in the file.
    pub fn unique_modalities(&self) -> Vec<String> {
        self.distinct(|fields| fields.distance)
    }

    /// Sorted distinct categories present in the file.
    pub fn unique_categories(&self) -> Vec<String> {
        self.distinct(|fields| fields.category)
    }

    fn distinct(&self, pick: impl Fn(ParticipantFields) -> Option<String>) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| pick(ParticipantFields::extract(&row.data)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Parses a `.racecheck` export.
///
/// The first line carries the event name. `;1|CAD 3G` lines open a race section,
/// `;SEXO|NOMBRE|...` lines declare the columns of the rows that follow, and every
/// other non-blank line is a `|` separated data row. Rows whose field count does not
/// match the current header are skipped.
pub fn parse_results(bytes: &[u8]) -> Result<ParsedResults, ParseError> {
    let text = decode(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let mut lines = text.lines();

    let event_name = lines
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ParseError::MissingEventName)?
        .to_string();

    let mut rows = Vec::new();
    let mut race: Option<String> = None;
    let mut headers: Option<Vec<String>> = None;
    let mut saw_header = false;
    let mut lines_read = 1;
    let mut records_skipped = 0;

    for line in lines {
        lines_read += 1;

        if line.trim().is_empty() {
            continue;
        }

        if let Some(body) = line.strip_prefix(SECTION_MARKER) {
            if !body.contains(FIELD_SEPARATOR) {
                continue;
            }

            let (first, rest) = body.split_once(FIELD_SEPARATOR).unwrap_or((body, ""));
            if first.trim().parse::<u32>().is_ok() {
                race = Some(rest.trim().to_string()).filter(|name| !name.is_empty());
                headers = None;
            } else {
                headers = Some(
                    body.split(FIELD_SEPARATOR)
                        .map(|column| column.trim().to_string())
                        .collect(),
                );
                saw_header = true;
            }
            continue;
        }

        let Some(columns) = headers.as_ref() else {
            continue;
        };

        let values: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if values.len() != columns.len() {
            records_skipped += 1;
            continue;
        }

        let data = columns
            .iter()
            .zip(values)
            .map(|(column, value)| (column.clone(), value.trim().to_string()))
            .collect();

        rows.push(ParsedRow {
            race: race.clone(),
            data,
        });
    }

    if !saw_header {
        return Err(ParseError::MissingHeader);
    }

    Ok(ParsedResults {
        event_name,
        rows,
        lines_read,
        records_skipped,
    })
}

/// Timing software exports are usually UTF-8 but older installs write ISO-8859-1.
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Maratón Test\n\
;1|10K GENERAL\n\
;SEXO|NOMBRE|CHIP|DORSAL|MODALIDAD|CATEGORIA|POSICION|TIEMPO\n\
M|Ana Pérez|C1|001|10K|SENIOR|1|00:35:10\n\
F|Luis Gil|C2|002|10K|VETERANO|2|00:36:00\n\
;2|5K GENERAL\n\
;SEXO|NOMBRE|CHIP|DORSAL|MODALIDAD|CATEGORIA|POSICION|TIEMPO\n\
F|Marta Ruiz|C3|101|5K|SENIOR|1|00:19:40\n";

    #[test]
    fn parses_event_name_races_and_rows() {
        let parsed = parse_results(SAMPLE.as_bytes()).unwrap();

        assert_eq!(parsed.event_name, "Maratón Test");
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.records_skipped, 0);
        assert_eq!(parsed.rows[0].race.as_deref(), Some("10K GENERAL"));
        assert_eq!(parsed.rows[2].race.as_deref(), Some("5K GENERAL"));
        assert_eq!(parsed.rows[1].data.get("NOMBRE"), Some("Luis Gil"));
    }

    #[test]
    fn keeps_header_column_order() {
        let parsed = parse_results(SAMPLE.as_bytes()).unwrap();
        let keys: Vec<&str> = parsed.rows[0].data.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["SEXO", "NOMBRE", "CHIP", "DORSAL", "MODALIDAD", "CATEGORIA", "POSICION", "TIEMPO"]
        );
    }

    #[test]
    fn skips_rows_with_wrong_field_count() {
        let file = "Carrera\n;SEXO|NOMBRE|DORSAL\nM|Ana|1\nF|Luis\nM|Pedro|3|extra\nF|Eva|4\n";
        let parsed = parse_results(file.as_bytes()).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.records_skipped, 2);
        assert_eq!(parsed.lines_read, 6);
    }

    #[test]
    fn ignores_rows_before_the_first_header() {
        let file = "Carrera\nM|Ana|1\n;SEXO|NOMBRE|DORSAL\nF|Eva|4\n";
        let parsed = parse_results(file.as_bytes()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn race_line_resets_the_header() {
        let file = "Carrera\n;SEXO|NOMBRE|DORSAL\nM|Ana|1\n;2|CAD 3G\nF|Eva|4\n";
        let parsed = parse_results(file.as_bytes()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn rejects_file_without_header() {
        let file = "Carrera\nM|Ana|1\nF|Eva|4\n";
        assert_eq!(parse_results(file.as_bytes()), Err(ParseError::MissingHeader));
    }

    #[test]
    fn rejects_empty_file_and_blank_name() {
        assert_eq!(parse_results(b""), Err(ParseError::MissingEventName));
        assert_eq!(
            parse_results(b"   \n;SEXO|NOMBRE\nM|Ana\n"),
            Err(ParseError::MissingEventName)
        );
    }

    #[test]
    fn accepts_crlf_bom_and_latin1() {
        let mut bytes = b"Marat\xf3n\r\n;SEXO|NOMBRE\r\nM|Jos\xe9\r\n".to_vec();
        let parsed = parse_results(&bytes).unwrap();
        assert_eq!(parsed.event_name, "Maratón");
        assert_eq!(parsed.rows[0].data.get("NOMBRE"), Some("José"));

        bytes = "\u{feff}Carrera\n;SEXO|NOMBRE\nM|Ana\n".as_bytes().to_vec();
        assert_eq!(parse_results(&bytes).unwrap().event_name, "Carrera");
    }

    #[test]
    fn collects_sorted_modalities_and_categories() {
        let parsed = parse_results(SAMPLE.as_bytes()).unwrap();
        assert_eq!(parsed.unique_modalities(), vec!["10K", "5K"]);
        assert_eq!(parsed.unique_categories(), vec!["SENIOR", "VETERANO"]);
    }
}
