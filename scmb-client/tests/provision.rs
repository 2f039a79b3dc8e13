//! End-to-end provisioning tests against the mock appliance.

mod common;

use std::fs;
use std::time::Duration;

use common::{ApplianceState, MockAppliance, PASSWORD, TEST_CA, TEST_CERT, TEST_KEY, USERNAME};
use scmb_client::{certificates, provision, task, ApiClient, ApiError, CredentialStore,
    ProvisionError, Session};

#[tokio::test]
async fn test_provisioning_writes_bundle_and_logs_out_once() {
    let appliance = MockAppliance::start(ApplianceState {
        poll_states: vec!["Running", "Completed"],
        ..Default::default()
    })
    .await;

    let session = appliance.login().await;
    let mut store = CredentialStore::acquire().unwrap();
    let paths = provision::ensure_credentials(session, &mut store)
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(&paths.ca_bundle).unwrap(), TEST_CA);
    assert_eq!(fs::read_to_string(&paths.certificate).unwrap(), TEST_CERT);
    assert_eq!(fs::read_to_string(&paths.private_key).unwrap(), TEST_KEY);

    let state = appliance.state.lock().unwrap();
    assert_eq!(state.logins, 1);
    assert_eq!(state.logouts, 1);
}

#[tokio::test]
async fn test_already_exists_still_downloads_bundle() {
    let appliance = MockAppliance::start(ApplianceState {
        conflict_on_generate: true,
        ..Default::default()
    })
    .await;

    let session = appliance.login().await;
    let mut store = CredentialStore::acquire().unwrap();
    let paths = provision::ensure_credentials(session, &mut store)
        .await
        .unwrap();

    assert!(paths.ca_bundle.is_file());
    assert!(paths.certificate.is_file());
    assert!(paths.private_key.is_file());

    let state = appliance.state.lock().unwrap();
    assert_eq!(state.task_polls, 0, "no task should have been polled");
    assert_eq!(state.logouts, 1);
}

#[tokio::test]
async fn test_task_error_surfaces_message_and_writes_nothing() {
    let appliance = MockAppliance::start(ApplianceState {
        poll_states: vec!["Error"],
        task_error: Some("unable to sign the certificate"),
        ..Default::default()
    })
    .await;

    let session = appliance.login().await;
    let mut store = CredentialStore::acquire().unwrap();
    let dir = store.path().unwrap().to_path_buf();

    let err = provision::ensure_credentials(session, &mut store)
        .await
        .unwrap_err();
    match err {
        ProvisionError::TaskFailed { message } => {
            assert!(message.contains("unable to sign the certificate"));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }

    // The store was released in the failure branch: no partial bundle.
    assert!(!dir.exists());
    assert!(store.path().is_none());
    assert_eq!(appliance.state.lock().unwrap().logouts, 1);
}

#[tokio::test]
async fn test_timeout_after_exactly_sixty_polls() {
    // Empty sequence: the task reports Running forever.
    let appliance = MockAppliance::start(ApplianceState::default()).await;

    let api = ApiClient::new(&appliance.url(), false).unwrap();
    let generated = certificates::generate_client_certificate(&api)
        .await
        .unwrap()
        .expect("generation should return a task");

    let err = task::wait_for_task_with(&api, generated, Duration::from_millis(1), 60)
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::Timeout { polls: 60 }));
    assert_eq!(appliance.state.lock().unwrap().task_polls, 60);
}

#[tokio::test]
async fn test_base64_keypair_is_decoded() {
    let appliance = MockAppliance::start(ApplianceState {
        poll_states: vec!["Completed"],
        keypair_base64: true,
        ..Default::default()
    })
    .await;

    let session = appliance.login().await;
    let mut store = CredentialStore::acquire().unwrap();
    let paths = provision::ensure_credentials(session, &mut store)
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(&paths.certificate).unwrap(), TEST_CERT);
    assert_eq!(fs::read_to_string(&paths.private_key).unwrap(), TEST_KEY);
}

#[tokio::test]
async fn test_warning_state_is_benign() {
    let appliance = MockAppliance::start(ApplianceState {
        poll_states: vec!["Warning"],
        task_error: Some("minor diagnostic"),
        ..Default::default()
    })
    .await;

    let session = appliance.login().await;
    let mut store = CredentialStore::acquire().unwrap();
    let paths = provision::ensure_credentials(session, &mut store)
        .await
        .unwrap();
    assert!(paths.ca_bundle.is_file());
}

#[tokio::test]
async fn test_login_rejected() {
    let appliance = MockAppliance::start(ApplianceState::default()).await;

    let err = Session::login(&appliance.url(), USERNAME, "wrong-password", false)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)));
    assert_eq!(appliance.state.lock().unwrap().logins, 0);
}

#[tokio::test]
async fn test_login_accepts_configured_credentials() {
    let appliance = MockAppliance::start(ApplianceState::default()).await;

    let session = Session::login(&appliance.url(), USERNAME, PASSWORD, false)
        .await
        .unwrap();
    session.logout().await.unwrap();

    let state = appliance.state.lock().unwrap();
    assert_eq!(state.logins, 1);
    assert_eq!(state.logouts, 1);
}
