// src/task/spec.rs

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Memory request passed through to the execution backend, in megabytes.
///
/// The core never interprets the quantity; it only forwards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Memory(u64);

impl Memory {
    pub const fn mb(megabytes: u64) -> Self {
        Self(megabytes)
    }

    pub const fn gb(gigabytes: u64) -> Self {
        Self(gigabytes * 1024)
    }

    pub const fn as_mb(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} MB", self.0)
    }
}

/// Everything the execution backend needs to run one task: the command, the
/// declared I/O files, the output directory and the resource request.
///
/// Declared `inputs` must exist before submission; declared `outputs` are
/// verified non-empty after backend-reported success. The task runs with
/// `output_dir` as its working directory, so relative file names in `args`
/// land next to the redirected stdout/stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    /// Present for fan-out members, absent for singleton tasks.
    pub batch_index: Option<u32>,
    pub program: String,
    pub args: Vec<String>,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// File name (within `output_dir`) stdout is redirected to.
    pub stdout: String,
    /// File name (within `output_dir`) stderr is redirected to.
    pub stderr: String,
    pub memory: Memory,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batch_index: None,
            program: program.into(),
            args: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            output_dir: PathBuf::new(),
            stdout: "stdout.txt".to_string(),
            stderr: "stderr.txt".to_string(),
            memory: Memory::gb(1),
        }
    }

    pub fn with_batch_index(mut self, batch_index: u32) -> Self {
        self.batch_index = Some(batch_index);
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_stdout(mut self, file_name: impl Into<String>) -> Self {
        self.stdout = file_name.into();
        self
    }

    pub fn with_memory(mut self, memory: Memory) -> Self {
        self.memory = memory;
        self
    }

    /// First declared output; recorded in the output ledger as the stage's
    /// primary artifact.
    pub fn primary_output(&self) -> Option<&Path> {
        self.outputs.first().map(PathBuf::as_path)
    }
}
