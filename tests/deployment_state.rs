// ABOUTME: Tests for the deployment type state chain.
// ABOUTME: Verifies marker types and each transition step against the fake engine.

mod support;

use bondi::deploy::{
    DeployError, DeploySettings, Deployment, Discovered, ImagePulled, Planned, Retired, Started,
};
use bondi::runtime::ContainerState;
use std::mem::size_of;
use support::fake_engine::{Call, FakeEngine};
use support::{APP, request, service_labels};

// =============================================================================
// State Marker Type Tests
// =============================================================================

#[test]
fn stateless_markers_are_zero_sized() {
    assert_eq!(size_of::<Planned>(), 0);
    assert_eq!(size_of::<Retired>(), 0);
}

#[test]
fn transition_type_signatures_compile() {
    use bondi::runtime::{ContainerOps, ImageOps};

    // Never called; it only has to compile.
    #[allow(dead_code)]
    async fn check_signatures<R: ContainerOps + ImageOps>(runtime: &R, d0: Deployment<Planned>) {
        let d1: Result<Deployment<Discovered>, DeployError> = d0.discover(runtime).await;
        let d2: Result<Deployment<ImagePulled>, DeployError> =
            d1.unwrap().pull_image(runtime).await;
        let d3: Result<Deployment<Retired>, DeployError> =
            d2.unwrap().retire_previous(runtime).await;
        let d4: Result<Deployment<Started>, DeployError> =
            d3.unwrap().start_container(runtime).await;
        let _id = d4.unwrap().into_container_id();
    }
}

// =============================================================================
// Step-by-step transitions
// =============================================================================

fn planned(tag: &str) -> Deployment<Planned> {
    Deployment::new(request(tag).validate().unwrap(), DeploySettings::default())
}

#[tokio::test]
async fn discover_finds_running_and_stopped_previous_containers() {
    let engine = FakeEngine::new();
    let _ = engine.seed_container(
        "bondi-service",
        &format!("{APP}:v1"),
        ContainerState::Running,
        service_labels(),
    );
    let _ = engine.seed_container(
        "leftover",
        &format!("{APP}:v0"),
        ContainerState::Exited,
        service_labels(),
    );

    let discovered = planned("v2").discover(&engine).await.unwrap();

    assert_eq!(discovered.previous().len(), 2);
    assert_eq!(discovered.image().to_string(), format!("{APP}:v2"));
}

#[tokio::test]
async fn pull_keeps_previous_containers_untouched() {
    let engine = FakeEngine::new();
    let old = engine.seed_container(
        "bondi-service",
        &format!("{APP}:v1"),
        ContainerState::Running,
        service_labels(),
    );

    let pulled = planned("v2")
        .discover(&engine)
        .await
        .unwrap()
        .pull_image(&engine)
        .await
        .unwrap();

    assert_eq!(pulled.previous().len(), 1);
    assert!(engine.has_image(&format!("{APP}:v2")));
    assert_eq!(
        engine.container(&old).unwrap().state,
        ContainerState::Running
    );
}

#[tokio::test]
async fn retire_stops_before_removing() {
    let engine = FakeEngine::new();
    let old = engine.seed_container(
        "bondi-service",
        &format!("{APP}:v1"),
        ContainerState::Running,
        service_labels(),
    );

    planned("v2")
        .discover(&engine)
        .await
        .unwrap()
        .pull_image(&engine)
        .await
        .unwrap()
        .retire_previous(&engine)
        .await
        .unwrap();

    let calls = engine.calls();
    let stop = calls.iter().position(|c| *c == Call::Stop(old.to_string()));
    let remove = calls.iter().position(|c| *c == Call::Remove(old.to_string()));
    assert!(stop.unwrap() < remove.unwrap());
    assert!(engine.containers().is_empty());
}

#[tokio::test]
async fn start_container_yields_running_container() {
    let engine = FakeEngine::new();

    let started = planned("v1")
        .discover(&engine)
        .await
        .unwrap()
        .pull_image(&engine)
        .await
        .unwrap()
        .retire_previous(&engine)
        .await
        .unwrap()
        .start_container(&engine)
        .await
        .unwrap();

    let container = engine.container(started.container_id()).unwrap();
    assert_eq!(container.state, ContainerState::Running);
    assert_eq!(container.name, started.settings().service_container);
}
