use std::{
    fs,
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
};

const CONFIG: &str = r#"
view_radius = 2

[rules]
spawn_probability = 1.0
start = { lat = 0.00005, lng = 0.00005 }
"#;

fn scratch_config(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("geomerge-cli-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    let path = dir.join("config.toml");
    fs::write(&path, CONFIG).expect("write config");
    path
}

fn play(name: &str, script: &str) -> String {
    let config = scratch_config(name);
    let mut child = Command::new(env!("CARGO_BIN_EXE_geomerge"))
        .args(["--no-save", "--config"])
        .arg(&config)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to launch geomerge binary");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_bytes())
        .expect("write script");
    let output = child.wait_with_output().expect("binary exits");
    assert!(output.status.success(), "geomerge should exit cleanly");

    if let Some(dir) = config.parent() {
        let _ = fs::remove_dir_all(dir);
    }
    String::from_utf8(output.stdout).expect("utf-8 output")
}

#[test]
fn collecting_and_merging_through_the_terminal() {
    let stdout = play("merge", "click 0 0\nclick 0 1\nlook\nquit\n");

    assert!(stdout.starts_with("Welcome to geomerge"));
    assert!(stdout.contains("Picked up a 1 from (0, 0)."));
    assert!(stdout.contains("Merged two 1s into a 2 at (0, 1)."));
    assert!(stdout.contains("   @."));
}

#[test]
fn bad_input_is_reported_and_play_continues() {
    let stdout = play("errors", "dance\nclick 9 9\nfix 1 1\nstatus\n");

    assert!(stdout.contains("error: unknown command `dance`"));
    assert!(stdout.contains("[no] Cannot act on (9, 9)"));
    assert!(stdout.contains("error: location fixes need feed movement"));
    assert!(stdout.contains("holding nothing | step movement"));
}
