//! CLI surface smoke tests.

use assert_cmd::Command;

#[test]
fn flows_subcommand_lists_every_flow() {
    let output = Command::cargo_bin("webpilot")
        .unwrap()
        .arg("flows")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    for flow in [
        "import-seed",
        "import-key",
        "connect-dapp",
        "settings",
        "send-chord",
    ] {
        assert!(stdout.contains(flow), "missing {flow} in:\n{stdout}");
    }
}

#[test]
fn run_requires_flow_specific_arguments() {
    Command::cargo_bin("webpilot")
        .unwrap()
        .args(["run", "import-seed"])
        .env("WEBPILOT_WEBDRIVER_URL", "http://127.0.0.1:1")
        .assert()
        .failure();
}
