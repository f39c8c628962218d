//! CLI integration tests.
//!
//! Tests cover:
//! - Run config loading from INI files on disk
//! - Dataset loading through the CSV adapter
//! - The validate, describe, indicators, symbols and optimize commands
//! - Exit codes for config, data and strategy failures

mod common;

use clap::Parser;
use common::*;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use stratgen::adapters::file_config_adapter::FileConfigAdapter;
use stratgen::cli::{self, Cli};
use stratgen::domain::error::GeneratorError;
use stratgen::domain::strategy_config::load_run_config;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn ini_for(dir: &Path) -> String {
    format!(
        r#"
[data]
dir = {}
symbol = EURUSD
digits = 5

[optimizer]
seed = 42
rounds = 1
time_limit_secs = 20

[strategy]
name = RSI swing
slots = entry_point:Bar Opening, entry_filter:RSI, exit_point:Bar Closing, exit_filter:CCI MA Oscillator
permanent_sl = 300

[slot1]
logic = 2
num0 = 10
"#,
        dir.display()
    )
}

fn setup(bars: usize) -> (TempDir, tempfile::NamedTempFile) {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "EURUSD", &generate_bars("2023-01-02", bars, 1.1));
    let ini = write_temp_ini(&ini_for(dir.path()));
    (dir, ini)
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["stratgen"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

fn code(exit: ExitCode) -> String {
    format!("{exit:?}")
}

fn expected(value: u8) -> String {
    code(ExitCode::from(value))
}

mod config_loading {
    use super::*;

    #[test]
    fn run_config_from_file() {
        let (dir, ini) = setup(120);
        let adapter = FileConfigAdapter::from_file(ini.path()).unwrap();
        let run = load_run_config(&adapter).unwrap();

        assert_eq!(run.data.dir, dir.path());
        assert_eq!(run.data.instrument.symbol, "EURUSD");
        assert_eq!(run.options.seed, 42);
        assert_eq!(run.strategy.slots.len(), 4);
        assert_eq!(run.strategy.slots[1].param.num[0].value, 10.0);
        assert!(run.strategy.permanent_sl.enabled);
    }

    #[test]
    fn load_dataset_reads_csv() {
        let (_dir, ini) = setup(120);
        let adapter = FileConfigAdapter::from_file(ini.path()).unwrap();
        let run = load_run_config(&adapter).unwrap();
        let data = cli::load_dataset(&run.data).unwrap();
        assert_eq!(data.all_bars().len(), 120);
        assert!(data.all_bars().windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn short_history_is_refused() {
        let (_dir, ini) = setup(cli::MIN_BARS - 1);
        let adapter = FileConfigAdapter::from_file(ini.path()).unwrap();
        let run = load_run_config(&adapter).unwrap();
        let err = cli::load_dataset(&run.data).unwrap_err();
        assert!(matches!(err, GeneratorError::InsufficientData { .. }));
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_good_config() {
        let (_dir, ini) = setup(120);
        let exit = run(&["validate", "--config", ini.path().to_str().unwrap()]);
        assert_eq!(code(exit), code(ExitCode::SUCCESS));
    }

    #[test]
    fn validate_missing_file_is_config_error() {
        let exit = run(&["validate", "--config", "/nonexistent/stratgen.ini"]);
        assert_eq!(code(exit), expected(2));
    }

    #[test]
    fn validate_bad_slot_order_is_strategy_error() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&format!(
            "[data]\ndir = {}\nsymbol = EURUSD\n\n[strategy]\nslots = exit_point:Bar Closing, entry_point:Bar Opening\n",
            dir.path().display()
        ));
        let exit = run(&["validate", "--config", ini.path().to_str().unwrap()]);
        assert_eq!(code(exit), expected(4));
    }

    #[test]
    fn describe_succeeds() {
        let (_dir, ini) = setup(120);
        let exit = run(&["describe", "--config", ini.path().to_str().unwrap()]);
        assert_eq!(code(exit), code(ExitCode::SUCCESS));
    }

    #[test]
    fn indicators_for_role() {
        assert_eq!(code(run(&["indicators", "--slot", "entry_filter"])), code(ExitCode::SUCCESS));
        assert_eq!(code(run(&["indicators", "--slot", "sideways"])), expected(2));
    }

    #[test]
    fn symbols_lists_data_dir() {
        let (_dir, ini) = setup(120);
        let exit = run(&["symbols", "--config", ini.path().to_str().unwrap()]);
        assert_eq!(code(exit), code(ExitCode::SUCCESS));
    }

    #[test]
    fn optimize_writes_description() {
        let (dir, ini) = setup(200);
        let output = dir.path().join("best.txt");
        let exit = run(&[
            "optimize",
            "--config",
            ini.path().to_str().unwrap(),
            "--seed",
            "7",
            "--output",
            output.to_str().unwrap(),
        ]);
        assert_eq!(code(exit), code(ExitCode::SUCCESS));

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("Strategy: RSI swing\n"));
        assert!(text.contains("Open a new long position at the beginning of the bar"));
    }

    #[test]
    fn optimize_missing_data_is_data_error() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&ini_for(dir.path()));
        let exit = run(&["optimize", "--config", ini.path().to_str().unwrap()]);
        assert_eq!(code(exit), expected(3));
    }
}
