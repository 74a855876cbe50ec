use std::path::Path;
use std::process::{Command, Output};

fn generator(config: &Path, arguments: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_generator"))
        .arg("--config")
        .arg(config)
        .args(arguments)
        .output()
        .unwrap()
}

#[test]
fn failure_is_reported_once() {
    let directory = tempfile::tempdir().unwrap();
    let config = directory.path().join("config.toml");
    let missing = directory.path().join("absent.pcap");

    let output = generator(&config, &["read", missing.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr.matches("Capture file not found.").count(), 1, "{stderr}");
    assert_eq!(stderr.lines().count(), 1, "{stderr}");
    assert!(stderr.contains(missing.to_str().unwrap()));
}

#[test]
fn filter_prints_one_verdict_per_packet() {
    let directory = tempfile::tempdir().unwrap();
    let config = directory.path().join("config.toml");
    let capture = directory.path().join("example.pcap");
    let rules = directory.path().join("firewall.rules");

    let output = generator(&config, &["create", "-o", capture.to_str().unwrap()]);
    assert!(output.status.success());

    std::fs::write(&rules, "-P INPUT DROP\n-A INPUT -d 1.2.3.4 --dport 80 -j ACCEPT\n").unwrap();
    let output = generator(
        &config,
        &["filter", rules.to_str().unwrap(), capture.to_str().unwrap()],
    );

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "ACCEPT\nDROP\n");
}
