use chrono::NaiveDate;
use intake_core::fixtures::{blank_pdf, pdf_with_columns, pdf_with_pages};
use intake_ingest::{
    build_extractor, extract_fields, extract_fields_from_path, extract_path_with, ErrorClass,
    ExtractError, IngestError, IngestOptions,
};

const HEADER: &str = "Patient Name and Address   Patient Date of Birth";

fn text_only() -> IngestOptions {
    IngestOptions {
        ocr_enabled: false,
        ..IngestOptions::default()
    }
}

#[test]
fn extracts_from_text_layer_pdf() {
    let bytes = pdf_with_pages(&[&[HEADER, "Marie Curie 12/05/1900", "1 Rue Pierre"]]);
    let result = extract_fields(&bytes).unwrap();
    assert_eq!(result.first_name, "Marie");
    assert_eq!(result.last_name, "Curie");
    assert_eq!(
        result.date_of_birth,
        NaiveDate::from_ymd_opt(1900, 12, 5).unwrap()
    );
}

#[test]
fn extracts_from_two_column_form() {
    let bytes = pdf_with_columns(
        &[72, 330],
        &[
            &["Patient Name and Address", "Patient Date of Birth"],
            &["Martin Van Buren", "03/07/1982"],
            &["1600 Kinderhook Rd"],
        ],
    );
    let result = build_extractor(&text_only()).extract(&bytes).unwrap();
    assert_eq!(result.first_name, "Martin");
    assert_eq!(result.last_name, "Van Buren");
    assert_eq!(
        result.date_of_birth,
        NaiveDate::from_ymd_opt(1982, 3, 7).unwrap()
    );
}

#[test]
fn first_complete_page_wins() {
    let bytes = pdf_with_pages(&[
        &["Referral cover sheet"],
        &["Patient Name: Ada Lovelace", "DOB: 12/10/1915"],
        &["Patient Name: Grace Hopper", "DOB: 12/09/1906"],
    ]);
    let result = build_extractor(&text_only()).extract(&bytes).unwrap();
    assert_eq!((result.first_name.as_str(), result.last_name.as_str()), ("Ada", "Lovelace"));
}

#[test]
fn fields_split_across_pages_are_incomplete() {
    let bytes = pdf_with_pages(&[&["Patient Name: Ada Lovelace"], &["DOB: 12/10/1915"]]);
    let err = build_extractor(&text_only()).extract(&bytes).unwrap_err();
    assert!(matches!(err, ExtractError::IncompleteExtraction(_)));
}

#[test]
fn scanned_pdf_without_ocr_is_incomplete() {
    let err = build_extractor(&text_only())
        .extract(&blank_pdf(2))
        .unwrap_err();
    assert!(matches!(err, ExtractError::IncompleteExtraction(_)));
    assert!(err.to_string().contains("'Date of Birth'"));
}

#[test]
fn garbage_bytes_are_unreadable() {
    let err = build_extractor(&text_only())
        .extract(b"%PDF-1.7 but nothing else")
        .unwrap_err();
    assert!(matches!(err, ExtractError::UnreadableDocument(_)));
    assert_eq!(err.error_class(), ErrorClass::BadRequest);
}

#[test]
fn path_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("referral.PDF");
    std::fs::write(
        &path,
        pdf_with_pages(&[&[HEADER, "Alan Turing 06/23/1912"]]),
    )
    .unwrap();

    let result = extract_fields_from_path(&path).unwrap();
    assert_eq!(result.first_name, "Alan");
    assert_eq!(result.last_name, "Turing");
}

#[test]
fn non_pdf_extension_is_rejected_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("referral.txt");
    std::fs::write(&path, pdf_with_pages(&[&[HEADER, "Alan Turing 06/23/1912"]])).unwrap();

    let err = extract_path_with(&build_extractor(&text_only()), &path).unwrap_err();
    assert!(matches!(err, IngestError::NotPdf(_)));
    assert_eq!(err.error_class(), ErrorClass::BadRequest);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = extract_path_with(&build_extractor(&text_only()), &dir.path().join("gone.pdf"))
        .unwrap_err();
    assert!(matches!(err, IngestError::Io(_)));
    assert_eq!(err.error_class(), ErrorClass::BadRequest);
}

#[test]
fn extraction_failure_keeps_its_class() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.pdf");
    std::fs::write(&path, blank_pdf(1)).unwrap();

    let err = extract_path_with(&build_extractor(&text_only()), &path).unwrap_err();
    assert!(matches!(
        err,
        IngestError::Extract(ExtractError::IncompleteExtraction(_))
    ));
    assert_eq!(err.error_class().status_code(), 400);
}

#[test]
fn page_text_dump() {
    let bytes = pdf_with_pages(&[&["first page"], &[]]);
    let texts = build_extractor(&text_only()).page_texts(&bytes).unwrap();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].as_deref().unwrap_or_default().contains("first page"));
    assert_eq!(texts[1], None);
}
