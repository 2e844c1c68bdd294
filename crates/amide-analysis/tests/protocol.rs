//! Fallback protocol properties against the in-memory engine

use amide_analysis::{
    analyze_candidates, analyze_structure, AnalysisError, AnalysisOptions, AnalysisTarget,
    AmideResidue, CandidateSource, ResolutionPolicy, TorsionMode,
};
use amide_host::{FixtureResidue, MemoryEngine, Preparation, StructureFixture, StructureSource};

fn structure(residues: Vec<FixtureResidue>) -> StructureFixture {
    residues
        .into_iter()
        .fold(StructureFixture::new(), StructureFixture::residue)
}

#[test]
fn test_offset_fallback_measures_previous_residue() {
    let source = StructureSource::experimental("4hhb");
    let mut engine = MemoryEngine::new().with_structure(
        source.clone(),
        structure(vec![
            FixtureResidue::new("A", 57, "GLN")
                .with_sesa(53.267)
                .with_distance(3.6)
                .with_torsion(Some(-65.0), Some(-40.0)),
            FixtureResidue::new("A", 58, "LYS"),
        ]),
    );
    let options = AnalysisOptions {
        torsion: TorsionMode::Measure,
        ..Default::default()
    };

    let analysis = analyze_structure(
        &mut engine,
        &source,
        &Preparation::stripped(),
        &AnalysisTarget::new("P69905", Some("A".into()), 58),
        &options,
    )
    .unwrap();

    assert_eq!(analysis.kind, AmideResidue::Gln);
    assert_eq!(analysis.position, 57);
    assert!(analysis.used_offset_fallback);
    assert_eq!(analysis.rel_sesa, Some(0.5));
    assert_eq!(analysis.torsion.unwrap().phi, Some(-65.0));
}

#[test]
fn test_exact_policy_rejects_offset() {
    let source = StructureSource::experimental("4hhb");
    let mut engine = MemoryEngine::new().with_structure(
        source.clone(),
        structure(vec![
            FixtureResidue::new("A", 57, "GLN"),
            FixtureResidue::new("A", 58, "LYS"),
        ]),
    );
    let options = AnalysisOptions {
        policy: ResolutionPolicy::exact(),
        ..Default::default()
    };

    let err = analyze_structure(
        &mut engine,
        &source,
        &Preparation::none(),
        &AnalysisTarget::new("P69905", Some("A".into()), 58),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::ResidueTypeMismatch(_)));
}

#[test]
fn test_at_most_one_handle_across_candidates() {
    let good = FixtureResidue::new("A", 58, "ASN").with_sesa(90.541);
    let mut engine = MemoryEngine::new()
        .with_structure(
            StructureSource::experimental("1bad"),
            structure(vec![FixtureResidue::new("A", 58, "ALA"), FixtureResidue::new("A", 57, "ALA")]),
        )
        .with_structure(
            StructureSource::experimental("2bad"),
            structure(vec![FixtureResidue::new("A", 3, "ASN")]),
        )
        .with_structure(StructureSource::predicted("P68871"), structure(vec![good]));
    let list: Vec<CandidateSource> = serde_json::from_str(
        r#"[
            {"pdb_id": "1bad", "chain_id": "A", "resolution": 2.0, "experimental_method": "X-ray"},
            {"pdb_id": "2bad", "chain_id": "A", "resolution": 2.5, "experimental_method": "X-ray"}
        ]"#,
    )
    .unwrap();

    let report = analyze_candidates(
        &mut engine,
        "P68871",
        58,
        Some(&list),
        &AnalysisOptions::default(),
    );

    assert_eq!(report.attempt_errors.len(), 2);
    assert!(report.attempt_errors[0].contains("N/Q not found"));
    assert!(report.attempt_errors[1].contains("AA position not found"));
    assert!(report.exhaustion.is_some());
    assert_eq!(report.result.unwrap().analysis.rel_sesa, Some(1.0));
    assert_eq!(engine.max_open(), 1);
    assert_eq!(engine.open_count(), 0);
}

#[test]
fn test_persistent_communication_failure_fails_record() {
    let source = StructureSource::experimental("4hhb");
    let mut engine = MemoryEngine::new().with_structure(
        source.clone(),
        structure(vec![FixtureResidue::new("A", 58, "ASN")]),
    );
    engine.fail_next_calls(2);

    let err = analyze_structure(
        &mut engine,
        &source,
        &Preparation::none(),
        &AnalysisTarget::new("P69905", Some("A".into()), 58),
        &AnalysisOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::HostCommunication(_)));
    assert_eq!(engine.open_count(), 0);
}
