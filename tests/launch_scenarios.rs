// tests/launch_scenarios.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use gw1h::cancel::{CancelReason, Cancellation};
use gw1h::config::Settings;
use gw1h::engine::{
    pid_slot, DependentLauncher, Orchestrator, PidSource, RunReport, HANDOFF_TIMEOUT,
    PRIMARY_WARMUP,
};
use gw1h::errors::{Cardinality, Gw1hError};
use gw1h::types::{Pid, PidRadix, ProcessOutcome, Role, RoleSelection};
use gw1h_test_utils::{init_tracing, with_timeout, FakeProcess, FakeSpawner, SettingsBuilder};

const BOTH: RoleSelection = RoleSelection {
    primary: true,
    dependent: true,
};
const PRIMARY_ONLY: RoleSelection = RoleSelection {
    primary: true,
    dependent: false,
};
const DEPENDENT_ONLY: RoleSelection = RoleSelection {
    primary: false,
    dependent: true,
};

fn orchestrator(settings: Arc<Settings>, spawner: &FakeSpawner) -> Orchestrator {
    Orchestrator::new(settings, Arc::new(spawner.clone()), Cancellation::new())
}

async fn run(settings: Arc<Settings>, spawner: &FakeSpawner, roles: RoleSelection) -> RunReport {
    with_timeout(orchestrator(settings, spawner).run(roles)).await
}

fn pid(raw: u32) -> Pid {
    Pid::new(raw).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_discovered_hex_pid_is_handed_to_dependent() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(
            Role::Primary,
            FakeProcess::runs_for(Duration::from_secs(30), ProcessOutcome::Success),
        )
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .with(Role::Dependent, FakeProcess::prints(""));

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert!(report.success(), "unexpected report: {report:?}");
    assert_eq!(report.exit_code(), 0);
    assert!(matches!(report.outcome(Role::Primary), Some(Ok(()))));
    assert!(matches!(report.outcome(Role::Dependent), Some(Ok(()))));

    let dependent = spawner.spawns_of(Role::Dependent);
    assert_eq!(dependent.len(), 1);
    assert_eq!(dependent[0].program, "wine");
    assert!(dependent[0].args.iter().any(|a| a == "6699"));
    assert!(spawner.terminated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_discovery_waits_for_primary_warmup() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(
            Role::Primary,
            FakeProcess::runs_for(Duration::from_secs(30), ProcessOutcome::Success),
        )
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .with(Role::Dependent, FakeProcess::prints(""));

    run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert_eq!(
        spawner.spawned_roles(),
        vec![Role::Primary, Role::Discovery, Role::Dependent]
    );
    let primary_at = spawner.spawns_of(Role::Primary)[0].at;
    let discovery_at = spawner.spawns_of(Role::Discovery)[0].at;
    let dependent_at = spawner.spawns_of(Role::Dependent)[0].at;

    assert!(discovery_at - primary_at >= PRIMARY_WARMUP);
    assert!(dependent_at >= discovery_at);
}

#[tokio::test(start_paused = true)]
async fn test_empty_discovery_output_cancels_run() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints(""));

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::DiscoveryCardinality(Cardinality::None)))
    ));
    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::Cancelled(Role::Dependent)))
    ));
    assert_eq!(report.exit_code(), 5);

    assert!(spawner.was_terminated(Role::Primary));
    assert!(!spawner.was_spawned(Role::Dependent));
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_discovery_output_is_rejected() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints("1a2b\n1a2c\n"));

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    match report.outcome(Role::Primary) {
        Some(Err(Gw1hError::DiscoveryCardinality(Cardinality::Multiple(pids)))) => {
            assert_eq!(pids, &vec![pid(6699), pid(6700)]);
        }
        other => panic!("expected ambiguous discovery, got {other:?}"),
    }
    assert_eq!(report.exit_code(), 5);
    assert!(spawner.was_terminated(Role::Primary));
    assert!(!spawner.was_spawned(Role::Dependent));
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_discovery_line_is_stream_error() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints("zz\n"));

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    match report.outcome(Role::Primary) {
        Some(Err(Gw1hError::StreamParse { line, .. })) => assert_eq!(line, "zz"),
        other => panic!("expected a stream parse error, got {other:?}"),
    }
    assert_eq!(report.exit_code(), 4);
    assert!(spawner.was_terminated(Role::Primary));
    assert!(!spawner.was_spawned(Role::Dependent));
}

#[tokio::test(start_paused = true)]
async fn test_failing_diagnostic_tool_cancels_run() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(
            Role::Discovery,
            FakeProcess::prints_and_exits("1a2b\n", ProcessOutcome::Failed(1)),
        );

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::ProcessExit {
            role: Role::Discovery,
            outcome: ProcessOutcome::Failed(1),
        }))
    ));
    assert_eq!(report.exit_code(), 7);
    assert!(!spawner.was_spawned(Role::Dependent));
}

#[tokio::test(start_paused = true)]
async fn test_missing_diagnostic_tool_is_spawn_error() {
    init_tracing();

    // No script for the discovery role: spawning it fails.
    let spawner = FakeSpawner::new().with(Role::Primary, FakeProcess::runs_forever());

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::Spawn {
            role: Role::Discovery,
            ..
        }))
    ));
    assert_eq!(report.exit_code(), 3);
    assert!(spawner.was_terminated(Role::Primary));
}

#[tokio::test(start_paused = true)]
async fn test_preset_pid_starts_dependent_without_waiting() {
    init_tracing();

    let spawner = FakeSpawner::new().with(Role::Dependent, FakeProcess::prints(""));
    let settings = SettingsBuilder::new().with_preset_pid("4242").build();

    let started = Instant::now();
    let report = run(settings, &spawner, DEPENDENT_ONLY).await;

    assert!(report.success());
    assert_eq!(spawner.spawned_roles(), vec![Role::Dependent]);

    let dependent = &spawner.spawns_of(Role::Dependent)[0];
    assert!(dependent.args.iter().any(|a| a == "4242"));
    assert_eq!(dependent.at, started);
}

#[tokio::test(start_paused = true)]
async fn test_missing_preset_pid_is_configuration_error() {
    init_tracing();

    let spawner = FakeSpawner::new().with(Role::Dependent, FakeProcess::prints(""));

    let report = run(SettingsBuilder::new().build(), &spawner, DEPENDENT_ONLY).await;

    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::Configuration(_)))
    ));
    assert_eq!(report.exit_code(), 2);
    assert!(spawner.spawned().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_preset_pid_is_configuration_error() {
    init_tracing();

    let spawner = FakeSpawner::new().with(Role::Dependent, FakeProcess::prints(""));
    let settings = SettingsBuilder::new().with_preset_pid("not-a-pid").build();

    let report = run(settings, &spawner, DEPENDENT_ONLY).await;

    assert_eq!(report.exit_code(), 2);
    assert!(spawner.spawned().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_handoff_timeout_leaves_primary_running() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::runs_forever());
    let orchestrator = orchestrator(SettingsBuilder::new().build(), &spawner);
    let cancel = orchestrator.cancellation().clone();

    let run = tokio::spawn(async move { orchestrator.run(BOTH).await });

    sleep(PRIMARY_WARMUP + HANDOFF_TIMEOUT + Duration::from_secs(5)).await;

    // The dependent gave up on its own; nothing else was disturbed.
    assert!(!cancel.is_triggered());
    assert!(spawner.terminated().is_empty());
    assert!(!spawner.was_spawned(Role::Dependent));

    cancel.trigger(CancelReason::Interrupted);
    let report = with_timeout(run).await.unwrap();

    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::HandoffTimeout(t))) if *t == HANDOFF_TIMEOUT
    ));
    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::Cancelled(Role::Primary)))
    ));
    assert_eq!(report.exit_code(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_dependent_times_out_after_fixed_delay() {
    init_tracing();

    let spawner = FakeSpawner::new().with(Role::Dependent, FakeProcess::prints(""));
    let (publisher, subscriber) = pid_slot();
    let cancel = Cancellation::new();

    let launcher = DependentLauncher::new(
        SettingsBuilder::new().build(),
        Arc::new(spawner.clone()),
        cancel.clone(),
        PidSource::Handoff(subscriber),
    );

    let started = Instant::now();
    let result = with_timeout(launcher.run()).await;

    assert!(matches!(result, Err(Gw1hError::HandoffTimeout(_))));
    assert_eq!(started.elapsed(), HANDOFF_TIMEOUT);
    assert!(!cancel.is_triggered());
    assert!(!spawner.was_spawned(Role::Dependent));

    drop(publisher);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_selected_spawns_nothing() {
    init_tracing();

    let spawner = FakeSpawner::new();
    let report = run(SettingsBuilder::new().build(), &spawner, RoleSelection::default()).await;

    assert!(matches!(report.rejected, Some(Gw1hError::Configuration(_))));
    assert!(report.outcomes.is_empty());
    assert_eq!(report.exit_code(), 2);
    assert!(spawner.spawned().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_primary_spawn_failure_cancels_dependent() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .failing(Role::Primary)
        .with(Role::Dependent, FakeProcess::prints(""));

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::Spawn {
            role: Role::Primary,
            ..
        }))
    ));
    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::Cancelled(Role::Dependent)))
    ));
    assert_eq!(report.exit_code(), 3);
    assert_eq!(spawner.spawned_roles(), vec![Role::Primary]);
}

#[tokio::test(start_paused = true)]
async fn test_dependent_spawn_failure_stops_primary() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .failing(Role::Dependent);

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::Spawn {
            role: Role::Dependent,
            ..
        }))
    ));
    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::Cancelled(Role::Primary)))
    ));
    assert_eq!(report.exit_code(), 3);
    assert!(spawner.was_terminated(Role::Primary));
}

#[tokio::test(start_paused = true)]
async fn test_primary_exit_during_warmup_cancels_run() {
    init_tracing();

    let spawner = FakeSpawner::new().with(
        Role::Primary,
        FakeProcess::runs_for(Duration::from_secs(1), ProcessOutcome::Failed(2)),
    );

    let report = run(SettingsBuilder::new().build(), &spawner, BOTH).await;

    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::ProcessExit {
            role: Role::Primary,
            outcome: ProcessOutcome::Failed(2),
        }))
    ));
    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::Cancelled(Role::Dependent)))
    ));
    assert_eq!(spawner.spawned_roles(), vec![Role::Primary]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_prevents_dependent() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .with(Role::Dependent, FakeProcess::runs_forever());
    let orchestrator = orchestrator(SettingsBuilder::new().build(), &spawner);
    orchestrator.cancellation().trigger(CancelReason::Interrupted);

    let report = with_timeout(orchestrator.run(BOTH)).await;

    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::Cancelled(Role::Dependent)))
    ));
    assert!(!spawner.was_spawned(Role::Dependent));
    assert!(!spawner.was_spawned(Role::Discovery));
    assert!(spawner.was_terminated(Role::Primary));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_stops_both_processes() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .with(Role::Dependent, FakeProcess::runs_forever());
    let orchestrator = orchestrator(SettingsBuilder::new().build(), &spawner);
    let cancel = orchestrator.cancellation().clone();

    let run = tokio::spawn(async move { orchestrator.run(BOTH).await });

    sleep(Duration::from_secs(20)).await;
    assert!(spawner.was_spawned(Role::Dependent));

    cancel.trigger(CancelReason::Interrupted);
    let report = with_timeout(run).await.unwrap();

    assert!(report.success());
    assert_eq!(report.exit_code(), 0);
    assert!(spawner.was_terminated(Role::Primary));
    assert!(spawner.was_terminated(Role::Dependent));
    assert_eq!(cancel.reason(), Some(CancelReason::Interrupted));
}

#[tokio::test(start_paused = true)]
async fn test_primary_only_still_discovers_pid() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(
            Role::Primary,
            FakeProcess::runs_for(Duration::from_secs(30), ProcessOutcome::Success),
        )
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"));

    let report = run(SettingsBuilder::new().build(), &spawner, PRIMARY_ONLY).await;

    assert!(report.success());
    assert_eq!(spawner.spawned_roles(), vec![Role::Primary, Role::Discovery]);
    assert!(report.outcome(Role::Dependent).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_processes_run_with_wine_isolation_env() {
    init_tracing();

    let spawner = FakeSpawner::new().with(Role::Dependent, FakeProcess::prints(""));
    let settings = SettingsBuilder::new()
        .with_env("WINEPREFIX", "/somewhere/else")
        .with_env("GW1H_WINE_PREFIX", "/games/prefix")
        .with_preset_pid("77")
        .build();

    run(settings, &spawner, DEPENDENT_ONLY).await;

    let env = &spawner.spawns_of(Role::Dependent)[0].env;
    let prefixes: Vec<&str> = env
        .iter()
        .filter(|(k, _)| k == "WINEPREFIX")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(prefixes, vec!["/games/prefix"]);
    assert!(env.iter().any(|(k, v)| k == "WINEARCH" && v == "win64"));
    assert!(env.iter().any(|(k, _)| k == "PATH"));
}

#[tokio::test(start_paused = true)]
async fn test_dependent_failure_leaves_primary_running() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .with(
            Role::Dependent,
            FakeProcess::runs_for(Duration::from_secs(1), ProcessOutcome::Failed(1)),
        );
    let orchestrator = orchestrator(SettingsBuilder::new().build(), &spawner);
    let cancel = orchestrator.cancellation().clone();

    let run = tokio::spawn(async move { orchestrator.run(BOTH).await });

    sleep(PRIMARY_WARMUP + Duration::from_secs(5)).await;

    assert!(spawner.was_spawned(Role::Dependent));
    assert!(!cancel.is_triggered());
    assert!(!spawner.was_terminated(Role::Primary));

    cancel.trigger(CancelReason::Interrupted);
    let report = with_timeout(run).await.unwrap();

    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::ProcessExit {
            role: Role::Dependent,
            outcome: ProcessOutcome::Failed(1),
        }))
    ));
    assert!(matches!(
        report.outcome(Role::Primary),
        Some(Err(Gw1hError::Cancelled(Role::Primary)))
    ));
    assert_eq!(report.exit_code(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_dependent_clean_exit_leaves_primary_running() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(Role::Primary, FakeProcess::runs_forever())
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .with(
            Role::Dependent,
            FakeProcess::runs_for(Duration::from_secs(1), ProcessOutcome::Success),
        );
    let orchestrator = orchestrator(SettingsBuilder::new().build(), &spawner);
    let cancel = orchestrator.cancellation().clone();

    let run = tokio::spawn(async move { orchestrator.run(BOTH).await });

    sleep(PRIMARY_WARMUP + Duration::from_secs(5)).await;

    assert!(!cancel.is_triggered());
    assert!(!spawner.was_terminated(Role::Primary));

    cancel.trigger(CancelReason::Interrupted);
    let report = with_timeout(run).await.unwrap();

    assert!(matches!(report.outcome(Role::Dependent), Some(Ok(()))));
    assert_eq!(spawner.terminated(), vec![Role::Primary]);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_primary_clean_exit_after_publishing_leaves_dependent_running() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(
            Role::Primary,
            FakeProcess::runs_forever().exits_after(Duration::from_secs(10)),
        )
        .with(Role::Discovery, FakeProcess::prints("1a2b\n"))
        .with(Role::Dependent, FakeProcess::runs_forever());
    let orchestrator = orchestrator(SettingsBuilder::new().build(), &spawner);
    let cancel = orchestrator.cancellation().clone();

    let run = tokio::spawn(async move { orchestrator.run(BOTH).await });

    sleep(Duration::from_secs(15)).await;

    assert!(!cancel.is_triggered());
    assert!(!spawner.was_terminated(Role::Dependent));

    cancel.trigger(CancelReason::Interrupted);
    let report = with_timeout(run).await.unwrap();

    assert!(matches!(report.outcome(Role::Primary), Some(Ok(()))));
    assert!(matches!(
        report.outcome(Role::Dependent),
        Some(Err(Gw1hError::Cancelled(Role::Dependent)))
    ));
    assert_eq!(spawner.terminated(), vec![Role::Dependent]);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_primary_clean_exit_during_warmup_is_reported_as_such() {
    init_tracing();

    let spawner = FakeSpawner::new().with(
        Role::Primary,
        FakeProcess::runs_for(Duration::from_secs(1), ProcessOutcome::Success),
    );

    let report = run(SettingsBuilder::new().build(), &spawner, PRIMARY_ONLY).await;

    match report.outcome(Role::Primary) {
        Some(Err(
            err @ Gw1hError::ProcessExit {
                role: Role::Primary,
                outcome: ProcessOutcome::Success,
            },
        )) => {
            assert!(err.to_string().contains("exited cleanly"));
            assert!(!err.to_string().contains("abnormally"));
        }
        other => panic!("expected an early clean exit, got {other:?}"),
    }
    assert_eq!(report.exit_code(), 7);
    assert!(!spawner.was_spawned(Role::Discovery));
}

#[tokio::test(start_paused = true)]
async fn test_custom_decimal_pipeline_and_arguments() {
    init_tracing();

    let spawner = FakeSpawner::new()
        .with(
            Role::Primary,
            FakeProcess::runs_for(Duration::from_secs(30), ProcessOutcome::Success),
        )
        .with(Role::Discovery, FakeProcess::prints("4242\n"))
        .with(Role::Dependent, FakeProcess::prints(""));
    let settings = SettingsBuilder::new()
        .with_primary_executable(r"D:\Games\GW\Gw.exe")
        .with_dependent_args(&["/quiet"])
        .with_discovery_command("pgrep -f Gw.exe")
        .with_discovery_radix(PidRadix::Decimal)
        .build();

    let report = run(settings, &spawner, BOTH).await;
    assert!(report.success(), "unexpected report: {report:?}");

    let primary = &spawner.spawns_of(Role::Primary)[0];
    assert_eq!(primary.args, vec![r"D:\Games\GW\Gw.exe"]);

    let discovery = &spawner.spawns_of(Role::Discovery)[0];
    assert_eq!(discovery.program, "bash");
    assert_eq!(discovery.args, vec!["-c", "pgrep -f Gw.exe"]);

    let dependent = &spawner.spawns_of(Role::Dependent)[0];
    assert_eq!(&dependent.args[1..], ["/pid", "4242", "/quiet"]);
}
