//! Blocking I/O Prohibition
//!
//! Production code in relay-core, the daemon, the Slack bot, and the chat
//! client runs on tokio worker threads. A blocking call there stalls every
//! task on that worker, including in-flight reply streams.
//!
//! **Exceptions**: test code, and console I/O in non-async functions.

use architectural_enforcement::{scan_workspace, workspace_root, PRODUCTION_SOURCES};

#[test]
fn test_production_sources_exist() {
    let root = workspace_root();
    for dir in PRODUCTION_SOURCES {
        assert!(
            root.join(dir).is_dir(),
            "{dir} is missing; update PRODUCTION_SOURCES"
        );
    }
}

#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = scan_workspace();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - Test code (#[test], #[tokio::test], #[cfg(test)] modules)");
        eprintln!("  - std::io::stdin()/stdout() outside async functions");
        eprintln!("  - std::net::SocketAddr and other plain address types");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - std::fs, std::process::Command, reqwest::blocking");
        eprintln!("  - std::net sockets");
        eprintln!("  - std::thread::sleep");

        panic!(
            "\nFound {} blocking call(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
