use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::{fs::File, io, path::Path};
use tracing::info;

use crate::{error::ScrapeError, types::ExtractionRecord};

pub const HEADER: [&str; 5] = ["home", "away", "stadium_info", "match_date", "url"];

/// Writes the header and one row per record, rows joined by `\n` with no
/// newline after the last one. Fields are quoted only when they contain `;`,
/// `"` or a line break; the error is not a column.
pub fn write_records<W: io::Write>(mut out: W, records: &[ExtractionRecord]) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;
    for record in records {
        wtr.write_record([
            &record.home,
            &record.away,
            &record.stadium_info,
            &record.match_date,
            &record.url,
        ])?;
    }

    let mut buf = wtr.into_inner().map_err(|e| e.into_error())?;
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    out.write_all(&buf)?;
    out.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, records: &[ExtractionRecord]) -> Result<(), ScrapeError> {
    let output_err = |source: csv::Error| ScrapeError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| output_err(e.into()))?;
    }
    let file = File::create(path).map_err(|e| output_err(e.into()))?;
    write_records(file, records).map_err(output_err)?;

    info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(records: &[ExtractionRecord]) -> String {
        let mut buf = Vec::new();
        write_records(&mut buf, records).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn record(home: &str, stadium: &str) -> ExtractionRecord {
        ExtractionRecord {
            home: home.into(),
            away: "Inter".into(),
            stadium_info: stadium.into(),
            match_date: "1.10.2025, 21:00".into(),
            url: "https://de.uefa.com/uefachampionsleague/match/2045913/".into(),
            error: None,
        }
    }

    #[test]
    fn test_header_only_for_no_records() {
        assert_eq!(render(&[]), "home;away;stadium_info;match_date;url");
    }

    #[test]
    fn test_plain_fields_are_not_quoted() {
        assert_eq!(
            render(&[record("PSG", "Parc des Princes, Paris")]),
            "home;away;stadium_info;match_date;url\n\
             PSG;Inter;Parc des Princes, Paris;1.10.2025, 21:00;https://de.uefa.com/uefachampionsleague/match/2045913/"
        );
    }

    #[test]
    fn test_rows_are_joined_without_trailing_newline() {
        let out = render(&[record("PSG", "Parc"), record("Inter", "San Siro")]);
        assert_eq!(out.matches('\n').count(), 2);
        assert!(out.ends_with("/match/2045913/"));
    }

    #[test]
    fn test_special_fields_are_quoted() {
        let out = render(&[record("A;B", "say \"hi\"")]);
        let row = out.lines().nth(1).unwrap();
        assert!(row.starts_with("\"A;B\";Inter;\"say \"\"hi\"\"\";"));
    }

    #[test]
    fn test_round_trip_through_reader() {
        let tricky = "Stade; \"Vélodrome\"\nMarseille\r\n";
        let out = render(&[record(tricky, tricky)]);

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_reader(out.as_bytes());
        let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], tricky);
        assert_eq!(&rows[0][2], tricky);
    }

    #[test]
    fn test_error_rows_keep_blank_columns() {
        let out = render(&[ExtractionRecord::failed(
            "https://de.uefa.com/uefachampionsleague/match/1/",
            "net::ERR_NAME_NOT_RESOLVED",
        )]);
        assert_eq!(
            out.lines().nth(1).unwrap(),
            ";;;;https://de.uefa.com/uefachampionsleague/match/1/"
        );
    }

    #[test]
    fn test_write_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("matches.csv");
        write_csv(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "home;away;stadium_info;match_date;url"
        );
    }
}
