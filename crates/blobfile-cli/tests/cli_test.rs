//! Integration tests for the blobfile binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use url::Url;

fn file_url(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

fn blobfile() -> Command {
    Command::cargo_bin("blobfile").unwrap()
}

#[test]
fn test_put_then_cat() {
    let temp_dir = TempDir::new().unwrap();
    let object = temp_dir.path().join("bucket/greeting.txt");

    blobfile()
        .arg("put")
        .arg(file_url(&object))
        .write_stdin("hello from stdin\n")
        .assert()
        .success()
        .code(0);

    assert_eq!(fs::read_to_string(&object).unwrap(), "hello from stdin\n");

    blobfile()
        .arg("cat")
        .arg(file_url(&object))
        .assert()
        .success()
        .stdout("hello from stdin\n");
}

#[test]
fn test_put_from_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("local.bin");
    let object = temp_dir.path().join("bucket/remote.bin");
    fs::write(&input, [0u8, 1, 2, 3, 255]).unwrap();

    blobfile()
        .arg("put")
        .arg(file_url(&object))
        .arg("--input")
        .arg(&input)
        .arg("--private")
        .arg("--expires-days")
        .arg("3")
        .assert()
        .success();

    assert_eq!(fs::read(&object).unwrap(), vec![0u8, 1, 2, 3, 255]);
}

#[test]
fn test_cat_lines_with_encoding() {
    let temp_dir = TempDir::new().unwrap();
    let object = temp_dir.path().join("latin.txt");
    fs::write(&object, b"caf\xe9\nna\xefve\n").unwrap();

    blobfile()
        .arg("cat")
        .arg("--lines")
        .arg("--encoding")
        .arg("latin-1")
        .arg(file_url(&object))
        .assert()
        .success()
        .stdout("café\nnaïve\n");
}

#[test]
fn test_truncate() {
    let temp_dir = TempDir::new().unwrap();
    let object = temp_dir.path().join("digits.txt");
    fs::write(&object, "0123456789").unwrap();

    blobfile()
        .arg("truncate")
        .arg(file_url(&object))
        .arg("4")
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&object).unwrap(), "0123");

    blobfile()
        .arg("truncate")
        .arg(file_url(&object))
        .arg("100")
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&object).unwrap(), "0123");
}

#[test]
fn test_cat_missing_object_exit_code() {
    let temp_dir = TempDir::new().unwrap();

    blobfile()
        .arg("cat")
        .arg(file_url(&temp_dir.path().join("absent.txt")))
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_invalid_url_exit_code() {
    blobfile()
        .arg("cat")
        .arg("ftp://example.com/file.txt")
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_init_config_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("blobfile.toml");
    let object = temp_dir.path().join("note.txt");
    fs::write(&object, "configured\n").unwrap();

    blobfile()
        .arg("init-config")
        .arg(&config)
        .assert()
        .success();
    assert!(fs::read_to_string(&config).unwrap().contains("encoding = \"utf-8\""));

    blobfile()
        .arg("init-config")
        .arg(&config)
        .assert()
        .failure()
        .code(1);

    blobfile()
        .arg("--config")
        .arg(&config)
        .arg("cat")
        .arg("--lines")
        .arg(file_url(&object))
        .assert()
        .success()
        .stdout(predicate::str::contains("configured"));
}

#[test]
fn test_bad_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("broken.toml");
    fs::write(&config, "encoding = \"klingon\"\n").unwrap();

    blobfile()
        .arg("--config")
        .arg(&config)
        .arg("cat")
        .arg(file_url(&temp_dir.path().join("any.txt")))
        .assert()
        .failure()
        .code(3);
}
