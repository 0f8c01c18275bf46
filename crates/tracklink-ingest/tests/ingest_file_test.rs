use std::io::Write;
use tracklink_ingest::{HeaderSchema, IngestError, RowIngestor};

fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents).expect("write temp file");
    file
}

#[test]
fn test_ingest_exportify_file_with_bom_and_quotes() {
    let file = write_temp(
        "\u{feff}\"Track URI\",\"Track Name\",\"Artist Name(s)\"\n\
         \"spotify:track:1\",\"Águas de Março\",\"Elis Regina, Tom Jobim\"\n\
         \"spotify:track:2\",\"Chega de Saudade\",\"João Gilberto\"\n"
            .as_bytes(),
    );

    let ingested = RowIngestor::new()
        .ingest_path(file.path())
        .expect("ingest exportify file");

    assert_eq!(ingested.schema, HeaderSchema::Exportify);
    assert_eq!(ingested.headers.len(), 3);
    assert_eq!(ingested.queries.len(), 2);
    assert_eq!(ingested.queries[0].track_name, "Águas de Março");
    assert_eq!(ingested.queries[0].artist_name, "Elis Regina, Tom Jobim");
    assert_eq!(ingested.queries[1].source_fields[0], "spotify:track:2");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let err = RowIngestor::new()
        .ingest_path(dir.path().join("missing.csv"))
        .unwrap_err();
    assert!(matches!(err, IngestError::Io(_)));
}

#[test]
fn test_header_only_file_is_empty_job() {
    let file = write_temp(b"Musica,Artista\n");
    // "Musica" without the accent is not the recognized header
    let err = RowIngestor::new().ingest_path(file.path()).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedSchema { .. }));

    let file = write_temp("Música,Artista\n".as_bytes());
    let err = RowIngestor::new().ingest_path(file.path()).unwrap_err();
    assert!(matches!(err, IngestError::EmptyJob { skipped: 0 }));
}
