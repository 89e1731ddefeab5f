//! Integration tests for csv-sieve

use csv_sieve::{
    DataType, DetectionOptions, DiagnosticKind, Dialect, EncodingChoice, Inspector, LineEnding,
    Quote, RowReader, Sampler, SampleOptions, SieveError, TextEncoding,
};
use std::io::Cursor;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

fn read_all(data: &[u8], dialect: Dialect) -> (Vec<Vec<String>>, RowReader<Cursor<Vec<u8>>>) {
    let mut reader = RowReader::open(Cursor::new(data.to_vec()), dialect).unwrap();
    let mut rows = Vec::new();
    while reader.read().unwrap() {
        rows.push(reader.current().unwrap().fields.clone());
    }
    (rows, reader)
}

#[test]
fn test_read_semicolon_file_from_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "name;city").unwrap();
    writeln!(file, "Alice;Berlin").unwrap();
    writeln!(file, "Bob;Zürich").unwrap();
    file.flush().unwrap();

    let mut reader = RowReader::from_path(file.path(), Dialect::with_delimiter(';')).unwrap();
    assert_eq!(reader.headers(), ["name", "city"]);
    assert!(reader.read().unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(reader.get_by_name("city"), Some("Zürich"));
    assert!(!reader.read().unwrap());
    assert_eq!(reader.record_number(), 2);
}

#[test]
fn test_from_path_rejects_invalid_dialect() {
    let file = NamedTempFile::new().unwrap();
    let dialect = Dialect {
        delimiter: '"',
        ..Dialect::default()
    };
    let err = RowReader::from_path(file.path(), dialect).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_quoted_delimiters_and_doubled_quotes() {
    let data = b"a,b\n\"x, y\",\"say \"\"hi\"\"\"\n";
    let (rows, reader) = read_all(data, Dialect::default());
    assert_eq!(rows, vec![vec!["x, y", "say \"hi\""]]);
    assert!(reader.diagnostics().is_empty());
}

#[test]
fn test_single_quote_dialect() {
    let dialect = Dialect {
        quote: Quote::Some('\''),
        ..Dialect::default()
    };
    let (rows, _) = read_all(b"a,b\n'1,5',x\n", dialect);
    assert_eq!(rows, vec![vec!["1,5", "x"]]);
}

#[test]
fn test_embedded_line_break_keeps_line_numbers() {
    let data = b"id,note\n1,\"first\nsecond\"\n2,plain\n";
    let mut reader = RowReader::open(Cursor::new(data.to_vec()), Dialect::default()).unwrap();

    assert!(reader.read().unwrap());
    let row = reader.current().unwrap();
    assert_eq!(row.fields[1], "first\nsecond");
    assert_eq!((row.start_line, row.end_line), (2, 3));

    assert!(reader.read().unwrap());
    let row = reader.current().unwrap();
    assert_eq!(row.record_number, 2);
    assert_eq!((row.start_line, row.end_line), (4, 4));
}

#[test]
fn test_unclosed_quote_reported_at_end() {
    let data = b"a,b\n1,\"open\n2,3\n";
    let (rows, reader) = read_all(data, Dialect::default());
    assert_eq!(rows.len(), 1);
    assert!(rows[0][1].starts_with("open\n2,3"));
    assert_eq!(reader.diagnostics().count_of(DiagnosticKind::UnclosedQuote), 1);
    assert!(!reader.diagnostics().has_fatal());
}

#[test]
fn test_row_combining_repairs_wrapped_rows() {
    let dialect = Dialect {
        allow_row_combining: true,
        ..Dialect::default()
    };
    let data = b"id,text,qty\n1,broken\nline,5\n2,ok,7\n";
    let (rows, reader) = read_all(data, dialect);
    assert_eq!(rows, vec![vec!["1", "broken\nline", "5"], vec!["2", "ok", "7"]]);
    assert_eq!(reader.diagnostics().count_of(DiagnosticKind::RowCombined), 1);
}

#[test]
fn test_utf8_bom_is_stripped() {
    let mut data = vec![0xEF, 0xBB, 0xBF];
    data.extend_from_slice(b"id,name\n1,x\n");
    let (rows, reader) = read_all(&data, Dialect::default());
    assert_eq!(reader.headers(), ["id", "name"]);
    assert_eq!(reader.encoding(), TextEncoding::utf8());
    assert_eq!(rows, vec![vec!["1", "x"]]);
}

#[test]
fn test_utf16le_with_bom() {
    let mut data = vec![0xFF, 0xFE];
    for unit in "id,name\r\n1,Ärger\r\n".encode_utf16() {
        data.extend_from_slice(&unit.to_le_bytes());
    }
    let (rows, reader) = read_all(&data, Dialect::default());
    assert_eq!(reader.encoding(), TextEncoding::utf16le());
    assert_eq!(reader.line_ending(), Some(LineEnding::CrLf));
    assert_eq!(rows, vec![vec!["1", "Ärger"]]);
}

#[test]
fn test_encoding_hint_used_without_bom() {
    let windows_1252 = TextEncoding::for_label("windows-1252").unwrap();
    let dialect = Dialect {
        encoding: EncodingChoice::Hint(windows_1252),
        ..Dialect::default()
    };
    let (rows, reader) = read_all(b"name\nCaf\xE9\n", dialect);
    assert_eq!(reader.encoding(), windows_1252);
    assert_eq!(rows, vec![vec!["Café"]]);
    assert!(reader.diagnostics().is_empty());
}

#[test]
fn test_old_mac_line_endings() {
    let (rows, reader) = read_all(b"a,b\r1,2\r3,4\r", Dialect::default());
    assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    assert_eq!(reader.line_ending(), Some(LineEnding::Cr));
    assert!(reader.saw_lone_cr());
}

#[test]
fn test_no_header_generates_names() {
    let dialect = Dialect {
        has_header: false,
        ..Dialect::default()
    };
    let (rows, reader) = read_all(b"1,2,3\n4,5,6\n", dialect);
    assert_eq!(reader.headers(), ["column_1", "column_2", "column_3"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["1", "2", "3"]);
}

#[test]
fn test_field_count_always_matches_header() {
    let data = b"a,b,c\n1\n1,2,3,4,5\n1,2,3\n";
    let (rows, reader) = read_all(data, Dialect::default());
    assert!(rows.iter().all(|row| row.len() == 3));
    assert_eq!(reader.diagnostics().count_of(DiagnosticKind::MissingColumns), 1);
    assert_eq!(reader.diagnostics().count_of(DiagnosticKind::ExtraColumns), 1);
    assert_eq!(reader.diagnostics().warning_row_count(), 2);
}

#[test]
fn test_bookmark_restore_rereads_rows() {
    let data = b"n\n1\n2\n3\n";
    let mut reader = RowReader::open(Cursor::new(data.to_vec()), Dialect::default()).unwrap();
    assert!(reader.read().unwrap());
    let mark = reader.bookmark();
    assert!(reader.read().unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(reader.get(0), Some("3"));

    reader.restore(mark).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.get(0), Some("2"));
    assert_eq!(reader.record_number(), 2);
    reader.release(mark).unwrap();
}

#[test]
fn test_sampler_second_pass_after_rewind() {
    let data = b"a,b\n1,x\nNULL,y\n3,z\n";
    let reader = RowReader::open(Cursor::new(data.to_vec()), Dialect::default()).unwrap();
    let options = SampleOptions {
        treat_as_null: Some("NULL".into()),
        ..SampleOptions::default()
    };
    let mut sampler = Sampler::new(reader, options);

    let first = sampler.collect_column(0).unwrap();
    assert_eq!(first.values, vec!["1", "3"]);
    assert!(first.reached_end);
    let all = sampler.collect_all().unwrap();
    assert_eq!(all[0].values, first.values);
    assert_eq!(all[1].values, vec!["x", "y", "z"]);
}

#[test]
fn test_sampler_empty_source_is_error() {
    let reader = RowReader::open(Cursor::new(b"a,b\n".to_vec()), Dialect::default()).unwrap();
    let mut sampler = Sampler::new(reader, SampleOptions::default());
    assert!(matches!(sampler.collect_all(), Err(SieveError::EmptyData)));
}

#[test]
fn test_inspect_file_types() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id,amount,when,paid,ref").unwrap();
    writeln!(file, "1,12.50,2024-01-31,true,3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
    writeln!(file, "2,7.25,2024-02-29,false,6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
    writeln!(file, "3,100.00,2024-03-15,true,1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
    file.flush().unwrap();

    let inspection = Inspector::new().inspect_path(file.path()).unwrap();
    let types: Vec<DataType> = inspection
        .columns
        .iter()
        .map(|c| c.guess.as_ref().unwrap().data_type())
        .collect();
    assert_eq!(
        types,
        vec![
            DataType::Integer,
            DataType::Numeric,
            DataType::DateTime,
            DataType::Boolean,
            DataType::Guid
        ]
    );

    let when = inspection.column("when").unwrap().guess.as_ref().unwrap();
    assert_eq!(
        when.format.as_ref().unwrap().date_pattern.as_deref(),
        Some("yyyy-MM-dd")
    );
}

#[test]
fn test_inspect_german_locale() {
    let data = "Betrag;Datum\n1.234,56;31.12.2024\n2.000,00;01.02.2023\n17,5;15.06.2022\n";
    let mut inspector = Inspector::new();
    inspector.delimiter(';').locale("de-DE");
    let inspection = inspector.inspect_bytes(data.as_bytes()).unwrap();

    let amount = inspection.columns[0].guess.as_ref().unwrap();
    let format = amount.format.as_ref().unwrap();
    assert_eq!(format.data_type, DataType::Numeric);
    assert_eq!(format.decimal_separator, Some(','));
    assert_eq!(format.group_separator, Some('.'));

    let date = inspection.columns[1].guess.as_ref().unwrap();
    assert_eq!(
        date.format.as_ref().unwrap().date_pattern.as_deref(),
        Some("dd.MM.yyyy")
    );
}

#[test]
fn test_inspect_ignores_identifier_columns() {
    let data = b"CustomerID,score\n17,1\n18,5\n25,9\n";
    let mut inspector = Inspector::new();
    inspector.detection(DetectionOptions {
        ignore_id_columns: true,
        ..DetectionOptions::default()
    });
    let inspection = inspector.inspect_bytes(data).unwrap();

    let id = inspection.column("CustomerID").unwrap().guess.as_ref().unwrap();
    assert!(id.not_converted);
    assert_eq!(id.data_type(), DataType::String);
    let score = inspection.column("score").unwrap().guess.as_ref().unwrap();
    assert_eq!(score.data_type(), DataType::Integer);
}

#[test]
fn test_inspect_reports_diagnostics() {
    let data = b"a,b\n1,2\n3\n4,5\n";
    let inspection = Inspector::new().inspect_bytes(data).unwrap();
    assert_eq!(inspection.records_sampled, 3);
    assert_eq!(
        inspection.diagnostics.count_of(DiagnosticKind::MissingColumns),
        1
    );
    assert!(inspection.diagnostics.render(200).starts_with("Row 2"));
}

#[tokio::test]
async fn test_inspect_async_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "n").unwrap();
    for i in 0..50 {
        writeln!(file, "{i}").unwrap();
    }
    file.flush().unwrap();

    let cancel = CancellationToken::new();
    let inspection = Inspector::new()
        .inspect_async(std::fs::File::open(file.path()).unwrap(), &cancel)
        .await
        .unwrap();
    assert_eq!(inspection.records_sampled, 50);
    assert_eq!(
        inspection.columns[0].guess.as_ref().unwrap().data_type(),
        DataType::Integer
    );
}

#[tokio::test]
async fn test_cancellation_stops_reader() {
    let data = b"n\n1\n2\n3\n";
    let mut reader = RowReader::open(Cursor::new(data.to_vec()), Dialect::default()).unwrap();
    let cancel = CancellationToken::new();

    assert!(reader.read_async(&cancel).await.unwrap());
    cancel.cancel();
    let err = reader.read_async(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(reader.current().is_none());

    // Once cancelled, the reader stays cancelled.
    assert!(reader.read().unwrap_err().is_cancelled());
    assert!(reader.rewind().unwrap_err().is_cancelled());
}
