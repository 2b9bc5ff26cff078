use anyhow::Result;
use serde::Serialize;

use costline::propagation::PropagationPolicy;

use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Serialize)]
struct InfoReport {
    version: &'static str,
    build_date: &'static str,
    git_commit: &'static str,
    config_path: Option<String>,
    store_path: Option<String>,
    propagation: PropagationPolicy,
}

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let report = InfoReport {
        version: env!("CARGO_PKG_VERSION"),
        build_date: env!("BUILD_DATE"),
        git_commit: env!("GIT_HASH"),
        config_path: ctx.config_path().map(|p| p.display().to_string()),
        store_path: ctx.store_path().map(|p| p.display().to_string()),
        propagation: ctx.config().propagation.clone(),
    };

    emit(ctx.output(), &report, |report| {
        println!("Costline System Information");
        println!("===========================");
        println!("Version: {}", report.version);
        println!("Build Date: {}", report.build_date);
        println!("Git Commit: {}", report.git_commit);
        println!();

        println!("Configuration:");
        println!(
            "- Config File: {}",
            report.config_path.as_deref().unwrap_or("(none)")
        );
        println!(
            "- Store Snapshot: {}",
            report.store_path.as_deref().unwrap_or("(not set)")
        );
        let policy = &report.propagation;
        println!(
            "- Lock Checks: {} concurrent, timeout {}",
            policy.max_concurrent_lock_checks,
            match policy.lock_check_timeout_ms {
                0 => "disabled".to_string(),
                ms => format!("{ms}ms"),
            }
        );
        println!(
            "- Tracking Writes: {} concurrent",
            policy.max_concurrent_track_writes
        );
    })
}
