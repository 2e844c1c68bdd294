use std::io::Write;

use amide_io::plddt::{collect_plddt, write_plddt_csv};
use amide_io::{table_from_csv, ErrorLog, PreprocessOptions, RecordTable};
use serde_json::json;
use tempfile::tempdir;

const MODEL: &str = "data_AF
loop_
_ma_qa_metric_local.label_asym_id
_ma_qa_metric_local.label_comp_id
_ma_qa_metric_local.label_seq_id
_ma_qa_metric_local.metric_id
_ma_qa_metric_local.metric_value
_ma_qa_metric_local.model_id
_ma_qa_metric_local.ordinal_id
A MET 1 2 47.62 1 1
A ASN 2 2 88.10 1 2
#
";

#[test]
fn preprocessed_table_survives_a_write_and_read() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("sheet.csv");
    std::fs::write(
        &csv_path,
        "uniprot_id,aa_position,pdb_data_obj,relSESA\n\
         P68871,58,\"[{\"\"pdb_id\"\": \"\"1a3n\"\", \"\"chain_id\"\": \"\"B\"\"}]\",\n",
    )
    .unwrap();

    let table = table_from_csv(&csv_path, &PreprocessOptions::default()).unwrap();
    assert_eq!(
        table.get("pdb_data_obj", "0"),
        Some(&json!([{"pdb_id": "1a3n", "chain_id": "B"}]))
    );

    let json_path = dir.path().join("preprocess.json");
    table.write(&json_path).unwrap();
    let reread = RecordTable::read(&json_path).unwrap();
    assert_eq!(reread, table);
}

#[test]
fn error_log_is_written_as_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("errors.csv");

    let mut log = ErrorLog::new();
    log.push("P68871", "Error in P68871, /A@58: boom");
    log.write_csv(&path).unwrap();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "P68871");
    assert_eq!(&rows[0][1], "Error in P68871, /A@58: boom");
}

#[test]
fn plddt_lookup_skips_missing_models() {
    let dir = tempdir().unwrap();
    let models = dir.path().join("models");
    std::fs::create_dir(&models).unwrap();
    std::fs::write(models.join("AF-P68871-F1-model_v4.cif"), MODEL).unwrap();

    let rows_path = dir.path().join("rows.csv");
    let mut rows = std::fs::File::create(&rows_path).unwrap();
    writeln!(rows, "uniprot_id,aa_position").unwrap();
    writeln!(rows, "P68871,2").unwrap();
    writeln!(rows, "Q00000,5").unwrap();
    drop(rows);

    let results = collect_plddt(&rows_path, &models).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].plddt_score, 88.10);
    assert!(results[0].is_high_confidence());

    let out = dir.path().join("plddt.csv");
    write_plddt_csv(&results, &out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("uniprot_id,aa_position,plddt_score,high_confidence"));
    assert!(text.contains("P68871,2,88.1,Yes"));
}
