// src/lib.rs

pub mod cancel;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cancel::{spawn_interrupt_handler, Cancellation};
use crate::cli::CliArgs;
use crate::config::{load_or_default, resolve_roles, EnvSource, ProcessEnv, Settings};
use crate::engine::Orchestrator;
use crate::exec::TokioSpawner;
use crate::types::{Pid, RoleSelection};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config file + environment resolution
/// - Ctrl-C handling
/// - the orchestrator and its launchers
///
/// Returns the process exit status.
pub async fn run(args: CliArgs) -> Result<i32> {
    let env = ProcessEnv;
    let (settings, roles) = prepare(&args, &env)?;

    if args.dry_run {
        print_dry_run(&settings, roles);
        return Ok(0);
    }

    let cancel = Cancellation::new();
    let _interrupts = spawn_interrupt_handler(cancel.clone());

    info!(version = env!("CARGO_PKG_VERSION"), "gw1h started");

    let orchestrator = Orchestrator::new(Arc::new(settings), Arc::new(TokioSpawner::new()), cancel);
    let report = orchestrator.run(roles).await;

    info!(exit_code = report.exit_code(), "gw1h stopped");
    Ok(report.exit_code())
}

/// Resolve settings and role selection without touching any process.
pub fn prepare(args: &CliArgs, env: &impl EnvSource) -> Result<(Settings, RoleSelection)> {
    let file = load_or_default(args.config.as_deref(), env)?;
    let settings = Settings::resolve(file, env, args.gw_pid.clone())?;
    let roles = resolve_roles(env, args.gw, args.toolbox);
    Ok((settings, roles))
}

/// Dry-run output: roles, commands and the wine overrides.
fn print_dry_run(settings: &Settings, roles: RoleSelection) {
    println!("gw1h dry-run");
    println!("  start primary   = {}", roles.primary);
    println!("  start dependent = {}", roles.dependent);
    println!(
        "  WINEARCH        = {}",
        settings.env.get("WINEARCH").unwrap_or_default()
    );
    println!(
        "  WINEPREFIX      = {}",
        settings.env.get("WINEPREFIX").unwrap_or_default()
    );
    println!();

    if roles.primary {
        println!("primary:");
        println!("  {}", settings.primary_command().display_line());
        println!("discovery (after warm-up):");
        println!("  {}", settings.discovery_command().display_line());
        println!("  radix: {:?}", settings.discovery_radix);
    }

    if roles.dependent {
        println!("dependent:");
        if roles.primary {
            println!("  pid: discovered from the primary");
        } else {
            match settings.preset_pid.as_deref().map(|raw| (raw, raw.parse::<Pid>())) {
                Some((_, Ok(pid))) => {
                    println!("  {}", settings.dependent_command(pid).display_line())
                }
                Some((raw, Err(e))) => println!("  invalid preset pid {raw:?}: {e}"),
                None => println!("  no preset pid; the dependent would refuse to start"),
            }
        }
    }

    if !roles.any() {
        println!("no role selected; a real run would refuse to start");
    }

    debug!("dry-run complete (no execution)");
}
