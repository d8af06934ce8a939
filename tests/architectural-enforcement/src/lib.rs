//! Architectural Enforcement
//!
//! Source scanners backing the workspace's architectural tests. Every relay
//! binary runs on tokio, so production code must not block a runtime thread
//! on I/O or park it with `std::thread::sleep`.
//!
//! # What Counts as Production Code
//!
//! Everything under a crate's `src/` except:
//! - functions marked `#[test]` or `#[tokio::test]`
//! - the `#[cfg(test)]` module at the bottom of a file
//! - non-async functions, for console I/O only (a blocking read of stdin
//!   outside async code does not stall the runtime)

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Source directories checked, relative to the workspace root
pub const PRODUCTION_SOURCES: &[&str] = &[
    "relay/core/src",
    "relay/daemon/src",
    "slack/src",
    "chat/src",
];

/// Kind of blocking call found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// `std::fs::` instead of `tokio::fs::`
    FileIo,
    /// Blocking socket types from `std::net`
    NetworkIo,
    /// `std::process::Command` instead of `tokio::process::Command`
    ProcessIo,
    /// `reqwest::blocking`
    BlockingHttp,
    /// `std::io::stdin()`/`stdout()` inside async code
    ConsoleIo,
    /// `std::thread::sleep` parks a runtime worker
    ThreadSleep,
}

impl ViolationKind {
    /// Async replacement to suggest
    #[must_use]
    pub fn fix(self) -> &'static str {
        match self {
            Self::FileIo => "use tokio::fs",
            Self::NetworkIo => "use tokio::net",
            Self::ProcessIo => "use tokio::process::Command",
            Self::BlockingHttp => "use the async reqwest::Client",
            Self::ConsoleIo => "use tokio::io::stdin()/stdout()",
            Self::ThreadSleep => "use tokio::time::sleep, or wait on the event itself",
        }
    }
}

/// One blocking call in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the call
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// What was found
    pub kind: ViolationKind,
    /// The offending line, trimmed
    pub source: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {:?}: {} ({})",
            self.path.display(),
            self.line,
            self.kind,
            self.source,
            self.kind.fix()
        )
    }
}

/// Workspace root, two levels above this crate
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Scan every production source directory
#[must_use]
pub fn scan_workspace() -> Vec<Violation> {
    let root = workspace_root();
    PRODUCTION_SOURCES
        .iter()
        .flat_map(|dir| scan_directory(&root.join(dir)))
        .collect()
}

/// Scan every `.rs` file below `dir`
///
/// A missing directory yields nothing; [`scan_workspace`] callers check
/// that the directories exist.
#[must_use]
pub fn scan_directory(dir: &Path) -> Vec<Violation> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "rs"))
        .flat_map(|entry| match fs::read_to_string(entry.path()) {
            Ok(content) => scan_source(entry.path(), &content),
            Err(_) => Vec::new(),
        })
        .collect()
}

/// Scan one file's content
#[must_use]
pub fn scan_source(path: &Path, content: &str) -> Vec<Violation> {
    let lines: Vec<&str> = content.lines().collect();
    let test_module = test_module_start(&lines);
    let mut violations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if test_module.is_some_and(|start| idx >= start) {
            break;
        }

        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            continue;
        }
        let code = trimmed.split("//").next().unwrap_or(trimmed);

        let Some(kind) = classify(code) else {
            continue;
        };
        if is_in_test_function(&lines, idx) {
            continue;
        }
        if kind == ViolationKind::ConsoleIo && !is_in_async_function(&lines, idx) {
            continue;
        }

        violations.push(Violation {
            path: path.to_path_buf(),
            line: idx + 1,
            kind,
            source: trimmed.to_string(),
        });
    }

    violations
}

fn classify(code: &str) -> Option<ViolationKind> {
    const BLOCKING_NET: &[&str] = &[
        "std::net::TcpStream",
        "std::net::TcpListener",
        "std::net::UdpSocket",
    ];

    if code.contains("std::fs::") || code.starts_with("use std::fs") {
        Some(ViolationKind::FileIo)
    } else if BLOCKING_NET.iter().any(|ty| code.contains(ty)) {
        Some(ViolationKind::NetworkIo)
    } else if code.contains("std::process::Command") {
        Some(ViolationKind::ProcessIo)
    } else if code.contains("reqwest::blocking") {
        Some(ViolationKind::BlockingHttp)
    } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
        Some(ViolationKind::ConsoleIo)
    } else if code.contains("thread::sleep") {
        Some(ViolationKind::ThreadSleep)
    } else {
        None
    }
}

/// Line index of a `#[cfg(test)]` attribute at module level, if any
fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|line| *line == "#[cfg(test)]")
}

/// Whether the line is a function signature, and if so whether it is async
fn fn_signature(line: &str) -> Option<bool> {
    let mut rest = line.trim();
    for visibility in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(visibility) {
            rest = stripped;
            break;
        }
    }
    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") || rest.starts_with("const fn ") {
        Some(false)
    } else {
        None
    }
}

/// Index of the nearest function signature at or above `idx`
fn enclosing_fn(lines: &[&str], idx: usize) -> Option<usize> {
    (0..=idx).rev().find(|&i| fn_signature(lines[i]).is_some())
}

/// Whether the line belongs to a function marked as a test
#[must_use]
pub fn is_in_test_function(lines: &[&str], idx: usize) -> bool {
    let Some(signature) = enclosing_fn(lines, idx) else {
        return false;
    };
    lines[..signature]
        .iter()
        .rev()
        .map(|line| line.trim())
        .take_while(|line| line.starts_with("#[") || line.starts_with("///"))
        .any(|line| line.starts_with("#[test]") || line.starts_with("#[tokio::test"))
}

/// Whether the line belongs to an `async fn`
#[must_use]
pub fn is_in_async_function(lines: &[&str], idx: usize) -> bool {
    enclosing_fn(lines, idx)
        .and_then(|i| fn_signature(lines[i]))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(content: &str) -> Vec<(usize, ViolationKind)> {
        scan_source(Path::new("sample.rs"), content)
            .into_iter()
            .map(|v| (v.line, v.kind))
            .collect()
    }

    #[test]
    fn test_detects_blocking_file_io() {
        let content = "pub async fn load() {\n    let s = std::fs::read_to_string(\"x\");\n}\n";
        assert_eq!(kinds(content), vec![(2, ViolationKind::FileIo)]);
    }

    #[test]
    fn test_socket_addr_allowed() {
        let content = "use std::net::SocketAddr;\nuse std::net::TcpStream;\n";
        assert_eq!(kinds(content), vec![(2, ViolationKind::NetworkIo)]);
    }

    #[test]
    fn test_comments_ignored() {
        let content = "// std::fs::read is blocking\nfn f() {} // std::process::Command\n";
        assert_eq!(kinds(content), vec![]);
    }

    #[test]
    fn test_test_functions_ignored() {
        let content = "#[tokio::test]\nasync fn reads() {\n    std::fs::read(\"x\");\n}\n";
        assert_eq!(kinds(content), vec![]);
    }

    #[test]
    fn test_test_module_ignored() {
        let content = "fn run() {}\n\n#[cfg(test)]\nmod tests {\n    fn helper() {\n        std::fs::read(\"x\");\n    }\n}\n";
        assert_eq!(kinds(content), vec![]);
    }

    #[test]
    fn test_console_io_only_in_async() {
        let content = "fn prompt() {\n    std::io::stdin().read_line(&mut s);\n}\n\npub async fn chat() {\n    std::io::stdout().flush();\n}\n";
        assert_eq!(kinds(content), vec![(6, ViolationKind::ConsoleIo)]);
    }

    #[test]
    fn test_thread_sleep_detected() {
        let content = "fn wait() {\n    std::thread::sleep(Duration::from_secs(1));\n}\n";
        assert_eq!(kinds(content), vec![(2, ViolationKind::ThreadSleep)]);
    }

    #[test]
    fn test_fn_signature() {
        assert_eq!(fn_signature("pub async fn run(&self) {"), Some(true));
        assert_eq!(fn_signature("    pub(crate) fn name() -> &str {"), Some(false));
        assert_eq!(fn_signature("let f = run();"), None);
    }

    #[test]
    fn test_violation_display_names_fix() {
        let violation = Violation {
            path: PathBuf::from("chat/src/repl.rs"),
            line: 7,
            kind: ViolationKind::ProcessIo,
            source: "std::process::Command::new(\"ls\")".to_string(),
        };
        let shown = violation.to_string();
        assert!(shown.starts_with("chat/src/repl.rs:7"));
        assert!(shown.contains("tokio::process::Command"));
    }
}
