//! Shared E2E test helpers for `orbit` binary tests.

use std::io::Write;
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

/// Build a Command for the `orbit` binary that ignores ambient config.
///
/// Runs in a fresh temp directory so no stray `orbit.toml` is picked up.
/// Returns (command, _guard); keep the guard alive for the test's duration.
#[allow(deprecated)]
pub fn orbit_cmd() -> (assert_cmd::Command, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let mut cmd = assert_cmd::Command::cargo_bin("orbit").expect("orbit binary");
    cmd.timeout(TIMEOUT_BASIC);
    cmd.current_dir(tmp.path());
    for var in [
        "ORBIT_THREAD_NAME",
        "ORBIT_READY_TIMEOUT_MS",
        "ORBIT_MIN_TIMER_DELAY_MS",
        "ORBIT_LUA_SANDBOX",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    (cmd, tmp)
}

/// Writes `source` to `<dir>/<name>` and returns the path as a string.
pub fn write_script(dir: &tempfile::TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create script");
    file.write_all(source.as_bytes()).expect("write script");
    path.to_str().expect("valid utf8").to_string()
}
