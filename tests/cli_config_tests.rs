// Command-line parsing and validation

use clap::Parser;
use gentty::config::{Cli, Config, ConfigError};
use gentty::interpreter::constants::DEFAULT_TRACE_LIMIT;
use std::io::Write;
use tempfile::NamedTempFile;

fn script() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "def gen():\n    yield 1\nprint(list(gen()))").expect("write");
    file
}

fn parse(args: &[&str]) -> Result<Config, ConfigError> {
    Config::from_cli(Cli::try_parse_from(args).expect("arguments"))
}

#[test]
fn test_valid_configuration() {
    let file = script();
    let path = file.path().to_str().unwrap();
    let config = parse(&["gentty", path, "--headless", "--trace-limit", "25"]).unwrap();
    assert_eq!(config.file, file.path());
    assert!(config.headless);
    assert_eq!(config.trace_limit, 25);
    assert!(config.logs_to_stderr());
}

#[test]
fn test_defaults() {
    let file = script();
    let config = parse(&["gentty", file.path().to_str().unwrap()]).unwrap();
    assert!(!config.headless);
    assert_eq!(config.trace_limit, DEFAULT_TRACE_LIMIT);
    assert!(config.log_level.is_none());
    assert!(!config.logs_to_stderr());
}

#[test]
fn test_zero_trace_limit_rejected() {
    let file = script();
    let err = parse(&["gentty", file.path().to_str().unwrap(), "--trace-limit", "0"]).unwrap_err();
    assert!(matches!(err, ConfigError::ZeroTraceLimit));
}

#[test]
fn test_missing_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.py");
    let err = parse(&["gentty", missing.to_str().unwrap()]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(ref p) if *p == missing));
    assert!(err.to_string().contains("absent.py"));
}

#[test]
fn test_directory_is_not_a_script() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse(&["gentty", dir.path().to_str().unwrap()]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(_)));
}

#[test]
fn test_log_options() {
    let file = script();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("gentty.log");
    let config = parse(&[
        "gentty",
        file.path().to_str().unwrap(),
        "--headless",
        "--log-level",
        "debug",
        "--log-file",
        log.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(config.log_level.as_deref(), Some("debug"));
    assert_eq!(config.log_file.as_deref(), Some(log.as_path()));
    assert!(!config.logs_to_stderr());
}

#[test]
fn test_script_from_temp_file_runs() {
    let file = script();
    let config = parse(&["gentty", file.path().to_str().unwrap(), "--headless"]).unwrap();
    let source = std::fs::read_to_string(&config.file).unwrap();
    let program = gentty::parser::parse_source(&source).unwrap();
    let mut interpreter = gentty::interpreter::Interpreter::new(config.trace_limit);
    interpreter.run(&program).unwrap();
    assert_eq!(interpreter.output(), ["[1]"]);
}
