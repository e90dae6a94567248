use std::process::Command;

#[test]
fn cli_binary_passes_cargo_check() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "bike-swarm"])
        .status()
        .expect("failed to invoke cargo check for bike-swarm CLI binary");

    assert!(status.success(), "cargo check --bin bike-swarm should succeed");
}
