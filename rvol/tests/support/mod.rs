//! Test fixture driving the `rvol` binary against a fake `rclone`.
//!
//! The fake tool understands the two subcommands `rvol` uses:
//! - `lsf --files-only [-R] fake:<dir>` lists files under `<root>/<dir>`
//! - `copyto fake:<path> <dest>` copies `<root>/<path>` to `<dest>`
//!
//! `<root>` comes from the `root = ` line of the config file, so a run only works if the config
//! blob actually reached the tool. Source files containing `FAIL` make `copyto` exit 1, files
//! containing `SLEEP` make it hang for a while.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const FAKE_RCLONE: &str = r#"#!/bin/sh
set -u
if [ "$1" != "--config" ]; then
    echo "missing --config" >&2
    exit 2
fi
cfg="$2"
shift 2
if ! grep -q "fake-credentials" "$cfg"; then
    echo "config does not contain credentials" >&2
    exit 2
fi
root=$(sed -n 's/^root = //p' "$cfg")
cmd="$1"
shift
if [ -n "${FAKE_RCLONE_LOG:-}" ]; then
    echo "$cmd $*" >> "$FAKE_RCLONE_LOG"
fi
case "$cmd" in
    lsf)
        recursive=0
        src=""
        for arg in "$@"; do
            case "$arg" in
                -R) recursive=1 ;;
                --files-only) ;;
                *) src="$arg" ;;
            esac
        done
        dir="$root/${src#fake:}"
        if [ ! -d "$dir" ]; then
            echo "ERROR : $src: directory not found" >&2
            exit 3
        fi
        if [ "$recursive" -eq 1 ]; then
            (cd "$dir" && find . -type f | sed 's|^\./||' | sort)
        else
            (cd "$dir" && for f in *; do if [ -f "$f" ]; then echo "$f"; fi; done)
        fi
        ;;
    copyto)
        src="$1"
        dst="$2"
        file="$root/${src#fake:}"
        if [ ! -f "$file" ]; then
            echo "ERROR : $src: object not found" >&2
            exit 3
        fi
        if grep -q FAIL "$file"; then
            echo "ERROR : $src: simulated transfer failure" >&2
            exit 1
        fi
        if grep -q SLEEP "$file"; then
            sleep 5
        fi
        cp "$file" "$dst"
        ;;
    *)
        echo "unknown command $cmd" >&2
        exit 2
        ;;
esac
"#;

pub struct Fixture {
    _dir: tempfile::TempDir,
    /// objects visible to the fake tool as `fake:<relative path>`
    pub remote_root: PathBuf,
    pub volume: PathBuf,
    pub config: PathBuf,
    pub tool: PathBuf,
    pub call_log: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let remote_root = dir.path().join("remote");
        let volume = dir.path().join("volume");
        fs::create_dir_all(&remote_root).unwrap();
        fs::create_dir_all(&volume).unwrap();
        let config = dir.path().join("rclone.conf");
        fs::write(
            &config,
            format!(
                "[fake]\ntype = local\ntoken = fake-credentials\nroot = {}\n",
                remote_root.display()
            ),
        )
        .unwrap();
        let tool = dir.path().join("rclone");
        fs::write(&tool, FAKE_RCLONE).unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let call_log = dir.path().join("calls.log");
        Self {
            _dir: dir,
            remote_root,
            volume,
            config,
            tool,
            call_log,
        }
    }

    /// Creates a remote object at `path` (relative to the remote root).
    pub fn remote_file(&self, path: &str, contents: &str) {
        let path = self.remote_root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn remote_dir(&self, path: &str) {
        fs::create_dir_all(self.remote_root.join(path)).unwrap();
    }

    /// Path of `name` inside the destination subdirectory `out` on the volume.
    pub fn dest(&self, name: &str) -> PathBuf {
        self.volume.join("out").join(name)
    }

    pub fn calls(&self) -> String {
        fs::read_to_string(&self.call_log).unwrap_or_default()
    }

    /// `rvol run` for `source`, writing into `<volume>/out`.
    pub fn run(&self, source: &str) -> assert_cmd::Command {
        self.run_with_config(source, &self.config)
    }

    pub fn run_with_config(&self, source: &str, config: &Path) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("rvol").unwrap();
        cmd.env("FAKE_RCLONE_LOG", &self.call_log)
            .env_remove("RUST_LOG")
            .arg("run")
            .args(["--source", source, "--dest-subdir", "out"])
            .arg("--config")
            .arg(config)
            .arg("--volume-mount")
            .arg(&self.volume)
            .arg("--tool-path")
            .arg(&self.tool);
        cmd
    }
}
