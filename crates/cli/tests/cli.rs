use assert_cmd::Command;

fn shelf() -> Command {
    let mut cmd = Command::cargo_bin("shelf-cli").unwrap();
    cmd.env_remove("SHELF_ENV")
        .env("SHELF_CONFIG_DIR", concat!(env!("CARGO_MANIFEST_DIR"), "/../../config"));
    cmd
}

#[test]
fn settings_prints_resolved_configuration() {
    let output = shelf()
        .arg("settings")
        .env("SHELF_SERVER__PORT", "9099")
        .env("SHELF_AUTH__ADMIN_ROLE", "librarian")
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["server"]["port"], 9099);
    assert_eq!(settings["auth"]["admin_role"], "librarian");
    assert_eq!(settings["catalog"]["seed_on_init"], true);
}

#[test]
fn unknown_subcommand_fails() {
    shelf().arg("shred").assert().failure();
}
