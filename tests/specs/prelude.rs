//! Shared helpers for driving the `mscope` binary.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::OnceLock;

use tempfile::TempDir;

/// A home directory that never holds a configuration file.
const EMPTY_HOME: &str = "/nonexistent/mscope-specs-home";

/// Command builder with an isolated environment.
pub struct Cli {
    cmd: assert_cmd::Command,
}

/// Path to the `mscope` binary in the target directory these specs were
/// built into, building it first when the workspace has not yet.
fn mscope_bin() -> &'static Path {
    static BIN: OnceLock<PathBuf> = OnceLock::new();
    BIN.get_or_init(|| {
        // target/<profile>/deps/specs-<hash>
        let exe = std::env::current_exe().unwrap();
        let profile_dir = exe.parent().and_then(Path::parent).unwrap().to_path_buf();
        let bin = profile_dir.join(format!("mscope{}", std::env::consts::EXE_SUFFIX));
        if !bin.exists() {
            let mut build = std::process::Command::new(env!("CARGO"));
            build.args(["build", "--quiet", "-p", "mscope", "--bin", "mscope"]);
            if profile_dir.file_name().is_some_and(|name| name == "release") {
                build.arg("--release");
            }
            let status = build.current_dir(env!("CARGO_MANIFEST_DIR")).status().unwrap();
            assert!(status.success(), "building mscope failed");
        }
        bin
    })
}

pub fn cli() -> Cli {
    let mut cmd = assert_cmd::Command::new(mscope_bin());
    cmd.env_remove("MSCOPE_CONFIG")
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("RUST_LOG")
        .env("HOME", EMPTY_HOME)
        .env("MSCOPE_LOG", "warn")
        .env("NO_COLOR", "1");
    Cli { cmd }
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    fn run(mut self) -> Run {
        Run { output: self.cmd.output().unwrap() }
    }

    pub fn passes(self) -> Run {
        let run = self.run();
        assert!(run.output.status.success(), "expected success\n{}", run.describe());
        run
    }

    pub fn exits(self, code: i32) -> Run {
        let run = self.run();
        assert_eq!(run.output.status.code(), Some(code), "unexpected exit\n{}", run.describe());
        run
    }
}

/// Finished invocation.
pub struct Run {
    output: Output,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    fn describe(&self) -> String {
        format!(
            "status: {:?}\nstdout:\n{}\nstderr:\n{}",
            self.output.status,
            self.stdout(),
            self.stderr()
        )
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout().contains(needle), "stdout lacks {needle:?}\n{}", self.describe());
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(!self.stdout().contains(needle), "stdout has {needle:?}\n{}", self.describe());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr().contains(needle), "stderr lacks {needle:?}\n{}", self.describe());
        self
    }
}

const CONVERTER: &str = r#"shift 3
for f in "$@"; do
  cp "$f" "${f%.*}.v"
  echo "converted $f"
done"#;

const CONDA: &str = r#"shift 4
exec "$@""#;

const PREDICT: &str = r#"while [ $# -gt 0 ]; do
  case "$1" in
    -i) in="$2"; shift 2;;
    -o) out="$2"; shift 2;;
    *) shift;;
  esac
done
for f in "$in"/*_0000.v; do
  b=$(basename "$f" _0000.v)
  cp "$f" "$out/$b.v"
  echo "done with $b"
done"#;

const DESCRIPTOR: &str = r#"shift 1
for f in "$@"; do cp "$f" "${f%.v}.rdf"; done"#;

const PREPROCESS: &str = r#"for f in *_img.v; do cp "$f" "${f%_img.v}_roi.v"; done"#;

/// A temporary installation: tool scripts, configuration and data.
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// Scripted tools and a config declaring only this machine.
    pub fn with_tools() -> Self {
        let project = Self { dir: tempfile::tempdir().unwrap() };
        let training = project.path("training");
        let create_dataset = format!(
            r#"out="Dataset$(printf %03d "$1")_$2/imagesTr"
mkdir -p "$out"
for f in {}/*_img.v; do b=$(basename "$f" _img.v); cp "$f" "$out/${{b}}_0000.v"; done"#,
            training.display()
        );
        for (name, body) in [
            ("converter", CONVERTER),
            ("conda", CONDA),
            ("predict", PREDICT),
            ("descriptor", DESCRIPTOR),
            ("preprocess.sh", PREPROCESS),
            ("create_dataset.sh", create_dataset.as_str()),
        ] {
            project.script(name, body);
        }
        fs::create_dir_all(project.path("raw")).unwrap();
        fs::create_dir_all(project.path("staging")).unwrap();
        project.config(&project.default_config());
        project
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Replace `tools/<name>` with a bash script.
    pub fn script(&self, name: &str, body: &str) {
        let path = self.file(&format!("tools/{name}"), &format!("#!/usr/bin/env bash\nset -e\n{body}\n"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn config(&self, content: &str) {
        self.file("config.toml", content);
    }

    pub fn default_config(&self) -> String {
        let root = self.dir.path().display();
        format!(
            r#"[[hosts]]
name = "localhost"
default = true
cpu_load_threshold = 1000.0

[tools]
converter = "{root}/tools/converter"
descriptor = "{root}/tools/descriptor"
conda = "{root}/tools/conda"
predict = "{root}/tools/predict"
train = "{root}/tools/train"

[inference]
dataset = "Dataset001_spheroids"
trainer = "nnUNetTrainer"
config = "3d_fullres"
plans = "nnUNetPlans"

[staging]
local_root = "{root}/staging"

[retrain]
preprocess_script = "{root}/tools/preprocess.sh"
create_dataset_script = "{root}/tools/create_dataset.sh"
training_staging_dir = "{root}/training"
preprocessed_dir = "{root}/preprocessed"
dataset_workdir = "{root}/raw"
"#
        )
    }

    /// `mscope --config <project config>`
    pub fn mscope(&self) -> Cli {
        let config = self.path("config.toml");
        cli().args(&["--config", config.to_str().unwrap()])
    }

    pub fn is_empty_dir(&self, relative: &str) -> bool {
        fs::read_dir(self.path(relative)).unwrap().next().is_none()
    }
}

pub fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
