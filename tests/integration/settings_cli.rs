use crate::common::TestSettings;
use std::process::Command;

fn portward() -> Command {
    Command::new(env!("CARGO_BIN_EXE_portward"))
}

#[test]
fn init_creates_and_refuses_overwrite() {
    let settings = TestSettings::empty();

    let output = portward()
        .args(["-f", settings.path.to_str().unwrap(), "init"])
        .output()
        .unwrap();
    assert!(output.status.success(), "init should succeed on a fresh path");
    assert!(settings.path.exists());

    let contents = std::fs::read_to_string(&settings.path).unwrap();
    assert!(
        contents.contains("forwardingConfiguration"),
        "settings file should use the camelCase wire shape"
    );

    // Running init again must not clobber the existing file.
    let output = portward()
        .args(["-f", settings.path.to_str().unwrap(), "init"])
        .output()
        .unwrap();
    assert!(!output.status.success(), "init must refuse to overwrite");
}

#[test]
fn validate_accepts_generated_settings() {
    let settings = TestSettings::empty();

    let status = portward()
        .args(["-f", settings.path.to_str().unwrap(), "init"])
        .status()
        .unwrap();
    assert!(status.success());

    let status = portward()
        .args(["-f", settings.path.to_str().unwrap(), "validate"])
        .status()
        .unwrap();
    assert!(status.success(), "generated example settings must validate");
}

#[test]
fn validate_rejects_bad_ports() {
    let settings = TestSettings::new(
        r#"{
          "forwardingConfiguration": {
            "services": [
              {
                "serviceName": "pg",
                "serviceNamespace": "default",
                "ports": [{ "local": "not-a-port", "remote": "5432" }]
              }
            ]
          }
        }"#,
    );

    let output = portward()
        .args(["-f", settings.path.to_str().unwrap(), "validate"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("not-a-port"),
        "error output should name the offending port, got: {stderr}"
    );
}

#[test]
fn validate_reports_missing_file() {
    let settings = TestSettings::empty();

    let output = portward()
        .args(["-f", settings.path.to_str().unwrap(), "validate"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
