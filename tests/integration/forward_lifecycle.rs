#![cfg(unix)]
use crate::common::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use portward::config::model::{PortMapping, ServiceDefinition, ServiceId};
use portward::supervisor::events::StopReason;
use portward::supervisor::SessionSupervisor;

fn pg_definition() -> ServiceDefinition {
    ServiceDefinition {
        service_name: "pg".to_string(),
        service_namespace: "default".to_string(),
        ports: vec![PortMapping::new("5432", "5432")],
    }
}

fn pg() -> ServiceId {
    ServiceId::new("pg", "default")
}

#[tokio::test]
async fn register_enable_log_disable() {
    let sink = Arc::new(RecordingSink::default());
    let factory = Arc::new(ShellFactory::new(&[(
        "pg",
        "echo 'Forwarding from 127.0.0.1:5432 -> 5432'; sleep 30",
    )]));
    let supervisor = SessionSupervisor::new(factory, sink.clone());

    supervisor.reconcile(vec![pg_definition()]).await;
    assert!(sink
        .events()
        .contains(&SinkEvent::Registered(pg())));

    supervisor.enable(&pg()).await.unwrap();
    assert!(
        wait_until(|| !sink.logs(&pg()).is_empty(), Duration::from_secs(5)).await,
        "expected process output to reach the sink"
    );

    let before = Instant::now();
    supervisor.disable(&pg()).await.unwrap();
    assert!(
        before.elapsed() < Duration::from_secs(5),
        "disable must complete within the grace period for a cooperative process"
    );

    assert_eq!(sink.stop_reasons(&pg()), vec![StopReason::GracefulExit]);
    assert!(!supervisor.is_live(&pg()).await.unwrap());
}

#[tokio::test]
async fn whole_system_teardown_with_resistant_session() {
    let sink = Arc::new(RecordingSink::default());
    let factory = Arc::new(ShellFactory::new(&[
        ("a", "sleep 30"),
        ("b", "sleep 30"),
        ("stubborn", "trap '' TERM; echo armed; while true; do sleep 0.1; done"),
    ]));
    let supervisor = SessionSupervisor::new(factory, sink.clone())
        .with_grace(Duration::from_millis(800));

    let definitions: Vec<ServiceDefinition> = ["a", "b", "stubborn"]
        .iter()
        .map(|name| ServiceDefinition {
            service_name: name.to_string(),
            service_namespace: "default".to_string(),
            ports: vec![PortMapping::new("80", "80")],
        })
        .collect();
    supervisor.reconcile(definitions).await;

    for name in ["a", "b", "stubborn"] {
        supervisor
            .enable(&ServiceId::new(name, "default"))
            .await
            .unwrap();
    }

    // Wait for the sentinel so the TERM trap is installed before teardown;
    // otherwise the signal can win the race and the process exits gracefully.
    assert!(
        wait_until(
            || {
                sink.logs(&ServiceId::new("stubborn", "default"))
                    .iter()
                    .any(|l| l == "armed")
            },
            Duration::from_secs(5)
        )
        .await,
        "stubborn must arm its TERM trap before disable_all"
    );

    supervisor.disable_all().await;

    for name in ["a", "b", "stubborn"] {
        let id = ServiceId::new(name, "default");
        assert!(
            !supervisor.is_live(&id).await.unwrap(),
            "{name} must reach inactive even when it resists SIGTERM"
        );
    }
    assert_eq!(
        sink.stop_reasons(&ServiceId::new("stubborn", "default")),
        vec![StopReason::Killed]
    );
}

#[tokio::test]
async fn disable_racing_natural_exit_is_clean() {
    let sink = Arc::new(RecordingSink::default());
    let factory = Arc::new(ShellFactory::new(&[("flash", "exit 0")]));
    let supervisor = SessionSupervisor::new(factory, sink.clone());

    supervisor
        .reconcile(vec![ServiceDefinition {
            service_name: "flash".to_string(),
            service_namespace: "default".to_string(),
            ports: vec![PortMapping::new("80", "80")],
        }])
        .await;
    let id = ServiceId::new("flash", "default");

    // The process exits on its own right away; disable without waiting so
    // the stop request races the natural exit.
    supervisor.enable(&id).await.unwrap();
    supervisor.disable(&id).await.unwrap();

    assert!(!supervisor.is_live(&id).await.unwrap());
    assert_eq!(sink.stop_reasons(&id), vec![StopReason::GracefulExit]);
}

#[tokio::test]
async fn missing_binary_leaves_session_inactive() {
    let sink = Arc::new(RecordingSink::default());

    struct MissingBinaryFactory;
    impl portward::supervisor::events::ProcessFactory for MissingBinaryFactory {
        fn build(
            &self,
            _definition: &ServiceDefinition,
        ) -> portward::supervisor::events::ProcessSpec {
            portward::supervisor::events::ProcessSpec {
                program: "/nonexistent/port-forwarder".to_string(),
                args: vec![],
            }
        }
    }

    let supervisor = SessionSupervisor::new(Arc::new(MissingBinaryFactory), sink.clone());
    supervisor.reconcile(vec![pg_definition()]).await;

    let err = supervisor.enable(&pg()).await.unwrap_err();
    assert!(matches!(
        err,
        portward::supervisor::SupervisorError::SpawnFailed { .. }
    ));

    // A following disable is a no-op, proving the session stayed inactive.
    supervisor.disable(&pg()).await.unwrap();
    assert!(sink.stop_reasons(&pg()).is_empty());
}
