use std::{env, fs, path::PathBuf, process::Command};

fn scratch_ledger(name: &str) -> PathBuf {
    env::temp_dir().join(format!("blight-cli-{name}-{}.json", std::process::id()))
}

#[test]
fn simulation_restores_the_meadow() {
    let ledger = scratch_ledger("simulate");
    let output = Command::new(env!("CARGO_BIN_EXE_blight"))
        .args(["simulate", "--ticks", "300", "--extent", "12", "--radius", "10"])
        .args(["--cure-every", "50", "--force-spread-at", "120", "--json"])
        .arg("--ledger")
        .arg(&ledger)
        .output()
        .expect("failed to run blight simulate");

    assert!(
        output.status.success(),
        "simulate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary is JSON");
    assert_eq!(summary["reversible"], serde_json::Value::Bool(true));
    assert_eq!(summary["ticks"], 300);
    assert!(summary["converted"].as_u64().unwrap_or(0) > 0);
    assert_eq!(summary["forced_spreads"], 1);

    let _ = fs::remove_file(&ledger);
}

#[test]
fn ledger_commands_read_and_clear_the_file() {
    let ledger = scratch_ledger("ledger");
    fs::write(
        &ledger,
        r#"{"version":1,"cured":[{"region":0,"x":1,"y":2,"z":3}]}"#,
    )
    .expect("ledger written");

    let show = Command::new(env!("CARGO_BIN_EXE_blight"))
        .arg("ledger")
        .arg("--ledger")
        .arg(&ledger)
        .arg("show")
        .output()
        .expect("failed to run blight ledger show");
    assert!(show.status.success());
    assert!(String::from_utf8_lossy(&show.stdout).starts_with("1 cured positions"));

    let reset = Command::new(env!("CARGO_BIN_EXE_blight"))
        .arg("ledger")
        .arg("--ledger")
        .arg(&ledger)
        .arg("reset")
        .status()
        .expect("failed to run blight ledger reset");
    assert!(reset.success());

    let contents = fs::read_to_string(&ledger).expect("ledger still present");
    let document: serde_json::Value = serde_json::from_str(&contents).expect("ledger is JSON");
    assert_eq!(document["cured"], serde_json::json!([]));

    let _ = fs::remove_file(&ledger);
}
