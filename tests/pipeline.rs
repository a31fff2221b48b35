use std::fs;
use std::path::Path;

use tjsp_ml::{
    cleaning::CleaningConfig, explore, run_cleaning, run_modeling, Error, ExploreConfig,
    ForestParams, ModelingConfig, Table,
};

const HEADER: &str = "Nome orgao;Municipio;UF;Grau;TPSent_12_meses;TPCPL_Dec_2024;TC_Dec_2024;IAD_12_meses;%CP;%Sus;CN_12_meses";

fn write_raw(path: &Path, rows: usize) {
    let mut text = String::from(HEADER);
    text.push('\n');
    for i in 0..rows {
        let vara = format!("{}ª Vara Cível", i % 4 + 1);
        let municipio = if i % 7 == 0 { "" } else { "São Paulo" };
        let grau = if i % 2 == 0 { "G1" } else { "JE" };
        let years = i % 3;
        let months = i % 12;
        let sent = if i % 11 == 5 {
            String::new()
        } else if years == 0 {
            format!("{} meses", months)
        } else {
            format!("{} anos {} meses", years, months)
        };
        let cpl = format!("{} meses", i % 9 + 1);
        let cn = 100 + i * 3;
        let iad = format!("{},{}%", 80 + i % 20, i % 10);
        text.push_str(&format!(
            "{};{};SP;{};{};{};;{};;1%;{}\n",
            vara, municipio, grau, sent, cpl, iad, cn
        ));
    }
    fs::write(path, text).unwrap();
}

fn modeling_config() -> ModelingConfig {
    ModelingConfig {
        numeric_features: vec!["TPCPL_Dec_2024_num".to_string(), "CN_12_meses".to_string()],
        categorical_features: vec!["Nome orgao".to_string(), "Grau".to_string()],
        forest: ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        },
        ..ModelingConfig::default()
    }
}

#[test]
fn cleaned_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("tjsp_processos_sp.csv");
    let cleaned = dir.path().join("dados").join("tjsp_processos_tratado.csv");
    write_raw(&raw, 44);

    let summary = run_cleaning(&raw, &cleaned, b';', &CleaningConfig::default()).unwrap();
    // строки с i % 11 == 5 не имеют срока
    assert_eq!(summary.rows_read, 44);
    assert_eq!(summary.rows_dropped, 4);
    assert_eq!(summary.rows_written, 40);

    let text = fs::read_to_string(&cleaned).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        format!("{};TPSent_12_meses_num;TPCPL_Dec_2024_num", HEADER)
    );
    // i = 0: "0 meses", Municipio пуст
    assert_eq!(
        lines.next().unwrap(),
        "1ª Vara Cível;Não informado;SP;G1;0 meses;1 meses;Não informado;80,0%;0%;1%;100;0;1"
    );
    // i = 1: "1 anos 1 meses" -> 13
    assert!(lines.next().unwrap().ends_with(";103;13;2"));

    let table = Table::read_csv(&cleaned, b';').unwrap();
    assert_eq!(table.n_rows(), 40);
    let report = explore(&table, &ExploreConfig::default()).unwrap();
    assert_eq!(report.groups.len(), 3);
    assert_eq!(report.demand_index.unwrap().count, 40);
}

#[test]
fn modeling_is_reproducible_with_fixed_seed() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    let cleaned = dir.path().join("clean.csv");
    write_raw(&raw, 120);
    run_cleaning(&raw, &cleaned, b';', &CleaningConfig::default()).unwrap();

    let table = Table::read_csv(&cleaned, b';').unwrap();
    let first = run_modeling(&table, &modeling_config()).unwrap();
    let second = run_modeling(&Table::read_csv(&cleaned, b';').unwrap(), &modeling_config()).unwrap();

    assert_eq!(first.train_rows, second.train_rows);
    assert_eq!(first.test_rows, second.test_rows);
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.n_train + first.n_test, first.n_samples);

    let other_seed = ModelingConfig {
        seed: 7,
        ..modeling_config()
    };
    let third = run_modeling(&table, &other_seed).unwrap();
    assert_ne!(first.test_rows, third.test_rows);
}

#[test]
fn missing_input_leaves_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let err = run_cleaning(&dir.path().join("absent.csv"), &output, b';', &CleaningConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(!output.exists());
}

#[test]
fn schema_mismatch_leaves_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    let output = dir.path().join("out.csv");
    fs::write(&raw, "Nome orgao;TPSent_12_meses\nVara;2 anos\n").unwrap();

    let err = run_cleaning(&raw, &output, b';', &CleaningConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingColumn(_)));
    assert!(!output.exists());
}

#[test]
fn shifted_row_fails_instead_of_writing_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    let output = dir.path().join("out.csv");
    // ';' внутри имени подразделения сдвигает все последующие ячейки
    fs::write(
        &raw,
        "Nome orgao;Municipio;UF;TPSent_12_meses;TPCPL_Dec_2024;TC_Dec_2024;IAD_12_meses;%CP;%Sus\n\
         Vara;Civel;Santos;SP;2 anos;3 meses;x;80%;1%;2%\n",
    )
    .unwrap();

    let err = run_cleaning(&raw, &output, b';', &CleaningConfig::default()).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch(_)));
    assert!(!output.exists());
}
