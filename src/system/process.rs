use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Scheduler state of a process as reported in `/proc/<pid>/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Sleeping,
    Waiting,
    Zombie,
    Stopped,
    Traced,
    Dead,
    /// Any state letter outside the table above (idle kernel threads, parked, ...)
    Other(char),
}

impl ProcessState {
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::Waiting,
            'Z' => ProcessState::Zombie,
            'T' => ProcessState::Stopped,
            't' => ProcessState::Traced,
            'X' | 'x' => ProcessState::Dead,
            other => ProcessState::Other(other),
        }
    }

    pub fn code(&self) -> char {
        match self {
            ProcessState::Running => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::Waiting => 'D',
            ProcessState::Zombie => 'Z',
            ProcessState::Stopped => 'T',
            ProcessState::Traced => 't',
            ProcessState::Dead => 'X',
            ProcessState::Other(c) => *c,
        }
    }

    /// Only running and sleeping processes count as active. Everything else,
    /// including states we do not recognise, is inactive.
    pub fn is_active(&self) -> bool {
        matches!(self, ProcessState::Running | ProcessState::Sleeping)
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Host memory accounting, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: u64,
    pub free: u64,
    pub available: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    pub pid: u64,
    pub state: ProcessState,
}

/// OS-level source for the current process status and host memory totals
pub trait ProcessStatusSource: Send + Sync {
    fn process_status(&self) -> Result<ProcessStatus, SnapshotError>;

    fn memory_stats(&self) -> Result<MemoryStats, SnapshotError>;
}

/// Reads process and memory accounting from a procfs mount
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessStatusSource for ProcFs {
    fn process_status(&self) -> Result<ProcessStatus, SnapshotError> {
        let path = self
            .root
            .join(std::process::id().to_string())
            .join("stat");
        let contents = fs::read_to_string(&path).map_err(|e| SnapshotError::io(&path, e))?;
        parse_stat(&contents, &path)
    }

    fn memory_stats(&self) -> Result<MemoryStats, SnapshotError> {
        let path = self.root.join("meminfo");
        let contents = fs::read_to_string(&path).map_err(|e| SnapshotError::io(&path, e))?;
        parse_meminfo(&contents, &path)
    }
}

/// Parse the pid and state out of a `/proc/<pid>/stat` line.
///
/// The command name sits between the first `(` and the last `)` and may
/// itself contain spaces or parentheses, so the state is read after the last `)`.
fn parse_stat(contents: &str, path: &Path) -> Result<ProcessStatus, SnapshotError> {
    let open = contents
        .find('(')
        .ok_or_else(|| SnapshotError::parse(path, "missing command name"))?;
    let close = contents
        .rfind(')')
        .ok_or_else(|| SnapshotError::parse(path, "unterminated command name"))?;

    let pid = contents[..open]
        .trim()
        .parse::<u64>()
        .map_err(|e| SnapshotError::parse(path, format!("invalid pid: {}", e)))?;

    let state = contents[close + 1..]
        .split_whitespace()
        .next()
        .and_then(|field| field.chars().next())
        .ok_or(SnapshotError::MissingField {
            path: path.to_path_buf(),
            field: "state",
        })?;

    Ok(ProcessStatus {
        pid,
        state: ProcessState::from_code(state),
    })
}

fn parse_meminfo(contents: &str, path: &Path) -> Result<MemoryStats, SnapshotError> {
    let mut total = None;
    let mut free = None;
    let mut available = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let slot = match key.trim() {
            "MemTotal" => &mut total,
            "MemFree" => &mut free,
            "MemAvailable" => &mut available,
            _ => continue,
        };

        let mut parts = value.split_whitespace();
        let amount = parts
            .next()
            .ok_or_else(|| SnapshotError::parse(path, format!("empty value for {}", key)))?
            .parse::<u64>()
            .map_err(|e| SnapshotError::parse(path, format!("invalid value for {}: {}", key, e)))?;

        // meminfo reports kibibytes despite the "kB" suffix
        let bytes = match parts.next() {
            Some("kB") => amount.saturating_mul(1024),
            _ => amount,
        };
        *slot = Some(bytes);
    }

    let missing = |field| SnapshotError::MissingField {
        path: path.to_path_buf(),
        field,
    };

    Ok(MemoryStats {
        total: total.ok_or_else(|| missing("MemTotal"))?,
        free: free.ok_or_else(|| missing("MemFree"))?,
        available: available.ok_or_else(|| missing("MemAvailable"))?,
    })
}
