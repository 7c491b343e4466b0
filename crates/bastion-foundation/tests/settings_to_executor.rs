//! Settings documents drive the executor's per-dependency behaviour.

use bastion_foundation::ResilientExecutor;
use bastion_kernel::config::{FileFormat, ResilienceSettings, from_str};
use bastion_kernel::resilience::{CircuitState, NoopRecorder, ResilienceError};
use bastion_kernel::DependencyError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SETTINGS: &str = r#"
[defaults]
failure_threshold = 3

[dependencies.sql]
failure_threshold = 1
break_duration_ms = 2000
max_retries = 0
jitter = false
"#;

fn executor() -> ResilientExecutor {
    let settings: ResilienceSettings = from_str(SETTINGS, FileFormat::Toml).unwrap();
    settings.validate().unwrap();
    ResilientExecutor::new(settings, Arc::new(NoopRecorder))
}

#[tokio::test(start_paused = true)]
async fn per_dependency_settings_apply() {
    let executor = executor();
    let token = CancellationToken::new();
    let calls = AtomicU32::new(0);

    let err = executor
        .run_simple("sql", &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DependencyError::Transport("reset".into())) }
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ResilienceError::RetryExhausted { attempts: 1, .. }));
    assert_eq!(executor.breaker("sql").state(), CircuitState::Open);

    assert_eq!(executor.breaker("llm").config().failure_threshold, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn open_circuit_recovers_through_probe() {
    let executor = executor();
    let token = CancellationToken::new();

    executor
        .run_simple("sql", &token, || async { Err::<(), _>(DependencyError::Timeout) })
        .await
        .unwrap_err();
    let rejected = executor
        .run_simple("sql", &token, || async { Ok::<_, DependencyError>(1) })
        .await
        .unwrap_err();
    assert!(rejected.is_circuit_open());

    tokio::time::advance(Duration::from_secs(2)).await;
    let value = executor
        .run_simple("sql", &token, || async { Ok::<_, DependencyError>(1) })
        .await
        .unwrap();
    assert_eq!(value, 1);

    let states = executor.registry().get_all_states();
    assert_eq!(states.get("sql").map(String::as_str), Some("closed"));
}

#[tokio::test]
async fn isolation_through_registry_blocks_executor() {
    let executor = executor();
    let token = CancellationToken::new();
    executor.registry().isolate("llm");

    let err = executor
        .run_simple("llm", &token, || async { Ok::<_, DependencyError>(()) })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResilienceError::CircuitOpen { state: CircuitState::Isolated, .. }
    ));

    assert!(executor.registry().reset("llm"));
    executor
        .run_simple("llm", &token, || async { Ok::<_, DependencyError>(()) })
        .await
        .unwrap();
}
