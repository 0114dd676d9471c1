//! End-to-end: source table → record files → filtered collection → figures.

use std::fs;
use std::path::Path;

use yieldscope::compare::{residuals, Normalization};
use yieldscope::config::Settings;
use yieldscope::data::filter::{energy_filter, field_filter, interaction_type_filter};
use yieldscope::data::ingest::{ingest_file, normalize};
use yieldscope::data::loader::{load_all, load_dir, load_record};
use yieldscope::data::model::{MetadataValue, YieldType};
use yieldscope::data::source::SourceTable;
use yieldscope::physics::{Quanta, YieldModel};
use yieldscope::render::{build_diff_figure, build_figure, render_batch};
use yieldscope::Error;

/// Six electrons and eight photons per keV at every field.
struct ConstantModel;

impl YieldModel for ConstantModel {
    fn name(&self) -> &str {
        "Constant"
    }

    fn nuclear_recoil(&self, energy: f64, _field: f64) -> Quanta {
        Quanta {
            photons: 8.0 * energy,
            electrons: 6.0 * energy,
        }
    }
}

const TABLE: &str = "\
Field,Name,keVr,Q_y (e-/keVr),error,EnergyCorr,Y+,Y-
100,Run A,2.0,7.0,0.5,2.1,,
100,Run A 2025,4.0,6.5,0.5,4.0,,
730,Run A,3.0,5.5,,3.1,6.0,5.0
730,Run A,30.0,5.0,,29.5,5.6,4.6
2000,Run A,8.0,4.0,0.25,8.0,,
";

fn write_table(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("run_a.csv");
    fs::write(&path, TABLE).unwrap();
    path
}

fn ingest(dir: &Path) -> Vec<std::path::PathBuf> {
    let src = write_table(dir);
    let out = dir.join("records");
    ingest_file(&src, YieldType::Charge, &out, &Settings::default()).unwrap()
}

#[test]
fn ingest_writes_one_file_per_field() {
    let tmp = tempfile::tempdir().unwrap();
    let written = ingest(tmp.path());

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "run_a_100.0_qy.json",
            "run_a_730.0_qy.json",
            "run_a_2000.0_qy.json"
        ]
    );

    // Ingesting again overwrites the same files.
    assert_eq!(ingest(tmp.path()), written);
}

#[test]
fn stored_records_load_back_complete() {
    let tmp = tempfile::tempdir().unwrap();
    ingest(tmp.path());

    let records = load_dir(&tmp.path().join("records")).unwrap();
    assert_eq!(records.len(), 3);
    let samples: usize = records.iter().map(|r| r.len()).sum();
    assert_eq!(samples, 5, "every source row lands in exactly one record");

    let r100 = records.iter().find(|r| r.field == 100.0).unwrap();
    assert_eq!(r100.identification, "Run A 2025");
    assert_eq!(r100.interaction_type, "NR");
    assert_eq!(r100.recoil_error, Some(vec![Some(0.5), Some(0.5)]));
    assert_eq!(r100.max_yield, None);

    let r730 = records.iter().find(|r| r.field == 730.0).unwrap();
    assert_eq!(r730.recoil_error, None);
    assert_eq!(r730.max_yield, Some(vec![Some(6.0), Some(5.6)]));
    assert_eq!(r730.min_yield, Some(vec![Some(5.0), Some(4.6)]));
    assert_eq!(r730.corrected_energy, vec![3.1, 29.5]);
}

const FULL_TABLE: &str = "\
Field,Name,keVr,Q_y (e-/keVr),error,EnergyCorr,df +/- [V/cm],GasF [V/cm],LiqF [V/cm],Extr Assumed,Extr PIXeY,Y+,Y-,x+,x-
180,LUX D-D,1.1,8.2,0.6,1.08,12,6.0 kV/cm,180,0.49,n/a,8.9,7.6,1.2,1.0
180,LUX D-D 2016,2.3,7.4,,2.31,12,6.0 kV/cm,180,0.49,n/a,,,2.5,2.1
180,LUX D-D,5.7,6.1,0.2,5.72,12,6.0 kV/cm,180,0.49,n/a,6.4,5.8,,
400,LUX D-D,3.3,6.9,0.3,3.3,20,7.5,400 V/cm,0.5*,0.61,,,3.6,3.0
400,LUX D-D 2016,9.9,5.2,0.25,10.02,20,7.5,400 V/cm,0.5*,0.61,,,10.8,9.1
";

#[test]
fn every_column_survives_the_file_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("lux.csv");
    fs::write(&src, FULL_TABLE).unwrap();
    let settings = Settings::default();

    let table = SourceTable::load(&src).unwrap();
    let expected = normalize(&table, YieldType::Charge, &settings).unwrap();
    let written = ingest_file(&src, YieldType::Charge, &tmp.path().join("out"), &settings).unwrap();
    let loaded: Vec<_> = written.iter().map(|p| load_record(p).unwrap()).collect();
    assert_eq!(loaded, expected);

    let r180 = &loaded[0];
    assert_eq!(r180.pixey, Some(MetadataValue::Text("n/a".into())));
    assert_eq!(r180.gas_drift_field, Some(MetadataValue::Number(6.0)));
    assert_eq!(r180.max_recoil, Some(vec![Some(1.2), Some(2.5), None]));
    assert_eq!(r180.min_yield, Some(vec![Some(7.6), None, Some(5.8)]));
    assert_eq!(loaded[1].extraction_efficiency, Some(MetadataValue::Number(0.5)));
    assert_eq!(loaded[1].max_yield, None);

    // The directory loader sees the same records.
    let mut by_dir = load_dir(&tmp.path().join("out")).unwrap();
    by_dir.sort_by(|a, b| a.field.total_cmp(&b.field));
    assert_eq!(by_dir, expected);
}

#[test]
fn non_finite_yield_is_rejected_at_ingest() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("nan.csv");
    fs::write(&src, "Field,Name,keVr,Q_y (e-/keVr),EnergyCorr\n100,A,1.0,NAN,1.0\n").unwrap();
    let out = tmp.path().join("out");

    let err = ingest_file(&src, YieldType::Charge, &out, &Settings::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidCell { .. }));
    // Nothing is written that a later load would trip over.
    assert!(!out.exists());
}

#[test]
fn stored_json_uses_the_record_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let written = ingest(tmp.path());
    let text = fs::read_to_string(&written[1]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value["field"], 730.0);
    assert_eq!(value["yield_type"], "charge");
    assert_eq!(value["yield"][0], 5.5);
    assert!(value.get("recoil_error").is_none());
    assert!(text.contains("\n    \"name\""), "four-space indent");
}

#[test]
fn filters_compose_over_a_loaded_collection() {
    let tmp = tempfile::tempdir().unwrap();
    ingest(tmp.path());
    let pattern = tmp.path().join("records").join("*.json");
    let all = load_all(&pattern.to_string_lossy()).unwrap();

    let low_field = field_filter(0.0, 1000.0, &all);
    assert_eq!(low_field.len(), 2);
    assert_eq!(field_filter(0.0, 1000.0, &low_field), low_field);

    let a = energy_filter(0.0, 10.0, &low_field);
    let b = field_filter(0.0, 1000.0, &energy_filter(0.0, 10.0, &all));
    assert_eq!(a, b);
    assert_eq!(a.len(), 1, "the 730 V/cm record reaches 30 keV");

    assert_eq!(interaction_type_filter("NR", &all).len(), 3);
    assert!(interaction_type_filter("ER", &all).is_empty());
}

#[test]
fn malformed_file_fails_the_whole_load() {
    let tmp = tempfile::tempdir().unwrap();
    ingest(tmp.path());
    let dir = tmp.path().join("records");
    fs::write(dir.join("zz_broken.json"), "{ \"name\": ").unwrap();

    let err = load_dir(&dir).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn no_matches_is_an_empty_collection() {
    let tmp = tempfile::tempdir().unwrap();
    let records = load_dir(tmp.path()).unwrap();
    assert!(records.is_empty());

    let err = render_batch(&ConstantModel, &records, &tmp.path().join("out.svg")).unwrap_err();
    assert!(matches!(err, Error::EmptyCollection));
}

fn assert_close(value: Option<f64>, expected: f64) {
    let v = value.expect("residual should be defined");
    assert!((v - expected).abs() < 1e-9, "{v} != {expected}");
}

#[test]
fn residuals_pick_the_available_normalizer() {
    let tmp = tempfile::tempdir().unwrap();
    ingest(tmp.path());
    let records = load_dir(&tmp.path().join("records")).unwrap();

    let r100 = records.iter().find(|r| r.field == 100.0).unwrap();
    let res = residuals(&ConstantModel, r100);
    assert_eq!(res.scheme, Normalization::RecoilError);
    // (7.0 - 6.0) / 0.5
    assert_close(res.points[0].value, 2.0);

    let r730 = records.iter().find(|r| r.field == 730.0).unwrap();
    let res = residuals(&ConstantModel, r730);
    assert_eq!(res.scheme, Normalization::YieldBounds);
    // (5.5 - 6.0) / ((6.0 - 5.0) / 2)
    assert_close(res.points[0].value, -1.0);
}

#[test]
fn figures_describe_each_record() {
    let tmp = tempfile::tempdir().unwrap();
    ingest(tmp.path());
    let records = load_dir(&tmp.path().join("records")).unwrap();

    for r in &records {
        let fig = build_figure(&ConstantModel, r).unwrap();
        assert!(fig.title.contains(&r.identification));
        assert_eq!(fig.upper.series[0].points.len(), r.len());
        assert!(fig.upper.series[1]
            .label
            .as_deref()
            .unwrap()
            .starts_with("Constant: "));
    }
}

#[test]
fn percent_errors_cover_the_collection() {
    let tmp = tempfile::tempdir().unwrap();
    ingest(tmp.path());
    let records = load_dir(&tmp.path().join("records")).unwrap();

    let fig = build_diff_figure(&ConstantModel, &records).unwrap();
    assert!(fig.lower.is_none());
    assert!(fig.title.contains("Constant"));
    let series = &fig.upper.series;
    let points: usize = series.iter().map(|s| s.points.len()).sum();
    assert_eq!(points, 5);
    // One dataset name, one colour.
    assert!(series.iter().all(|s| s.color == series[0].color));

    let labelled = series
        .iter()
        .find(|s| s.label.as_deref() == Some("Run A 2025"))
        .unwrap();
    let at_100: Vec<f64> = labelled
        .points
        .iter()
        .filter(|p| p.0 == 100.0)
        .map(|p| p.1)
        .collect();
    // |7.0 - 6.0| / 6.0 and |6.5 - 6.0| / 6.0, in percent.
    assert_eq!(at_100.len(), 2);
    assert!((at_100[0] - 100.0 / 6.0).abs() < 1e-9);
    assert!((at_100[1] - 50.0 / 6.0).abs() < 1e-9);
}

#[test]
fn empty_record_stops_a_batch_before_drawing() {
    let tmp = tempfile::tempdir().unwrap();
    ingest(tmp.path());
    let mut records = load_dir(&tmp.path().join("records")).unwrap();
    records[0].recoil_energy.clear();
    records[0].yields.clear();
    records[0].corrected_energy.clear();
    records[0].recoil_error = None;

    let out = tmp.path().join("batch.svg");
    let err = render_batch(&ConstantModel, &records, &out).unwrap_err();
    assert!(matches!(err, Error::EmptyRecord { .. }));
    assert!(!out.exists());
}

#[test]
fn missing_required_column_fails_ingest() {
    let tmp = tempfile::tempdir().unwrap();
    let src = write_table(tmp.path());
    let err = ingest_file(&src, YieldType::Light, &tmp.path().join("out"), &Settings::default())
        .unwrap_err();
    assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "Ly (ph/keVr)"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn parquet_tables_ingest_like_csv() {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("light.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("Field", DataType::Float64, false),
        Field::new("Name", DataType::Utf8, false),
        Field::new("keVr", DataType::Float64, false),
        Field::new("Ly (ph/keVr)", DataType::Float64, false),
        Field::new("error", DataType::Float64, true),
        Field::new("EnergyCorr", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(vec![190.0, 190.0, 730.0])),
        Arc::new(StringArray::from(vec!["Run B", "Run B 2025", "Run B"])),
        Arc::new(Float64Array::from(vec![5.0, 10.0, 5.0])),
        Arc::new(Float64Array::from(vec![7.5, 8.0, 6.5])),
        Arc::new(Float64Array::from(vec![Some(0.5), None, None])),
        Arc::new(Float64Array::from(vec![5.0, 10.0, 5.0])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let file = fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let out = tmp.path().join("records");
    let written = ingest_file(&path, YieldType::Light, &out, &Settings::default()).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("run_b_190.0_ly.json"));

    let records = load_dir(&out).unwrap();
    let r190 = records.iter().find(|r| r.field == 190.0).unwrap();
    assert_eq!(r190.yield_type, YieldType::Light);
    assert_eq!(r190.identification, "Run B 2025");
    assert_eq!(r190.yields, vec![7.5, 8.0]);
    assert_eq!(r190.recoil_error, Some(vec![Some(0.5), None]));
    let r730 = records.iter().find(|r| r.field == 730.0).unwrap();
    assert_eq!(r730.recoil_error, None);
}
