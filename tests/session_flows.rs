//! End-to-end scenarios over the in-memory driver.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use wd_adapter::{ElementSpec, FakeDriver, FakeEffect, Key, KeyInput, WireDriver};
use webpilot::{ContextId, ContextRole, PilotConfig, PilotSession, SeedPhrase};

const PHRASE_12: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn test_config(artifacts: &TempDir) -> PilotConfig {
    PilotConfig {
        artifacts_dir: artifacts.path().to_path_buf(),
        poll_timeout_ms: 300,
        poll_interval_ms: 2,
        settle_ms: 1,
        flow_timeout_ms: 5_000,
        ..PilotConfig::default()
    }
}

fn onboarding_popup(driver: &FakeDriver) -> ContextId {
    let popup = driver.add_window("chrome-extension://abcdef/popup.html#/onboarding");
    driver.add_element(
        &popup,
        ElementSpec::new()
            .with_test_id("import-wallet-seed")
            .on_click(FakeEffect::Reveal("seed-phrase-input".into())),
    );
    driver.add_element(
        &popup,
        ElementSpec::new().with_test_id("seed-phrase-input").hidden(),
    );
    driver.add_element(
        &popup,
        ElementSpec::new()
            .with_test_id("import-submit")
            .on_click(FakeEffect::Reveal("wallet-ready".into())),
    );
    driver.add_element(
        &popup,
        ElementSpec::new()
            .with_test_id("wallet-ready")
            .with_text("Your wallet is ready")
            .hidden(),
    );
    driver.add_element(
        &popup,
        ElementSpec::new()
            .with_test_id("account-address")
            .with_text("0x5290…9ee7"),
    );
    popup
}

#[tokio::test]
async fn seed_import_ends_with_wallet_ready_and_shortened_address() {
    let artifacts = TempDir::new().unwrap();
    let driver = Arc::new(FakeDriver::new());
    let popup = onboarding_popup(&driver);
    let session = PilotSession::with_driver(driver.clone(), test_config(&artifacts));

    let phrase = SeedPhrase::parse(PHRASE_12).unwrap();
    let flows = session.flows();
    let report = session
        .run_flow("seed import", |fctx| async move {
            flows.import_wallet_by_seed(&fctx, &popup, &phrase).await
        })
        .await
        .unwrap();

    assert!(report.ok);
    assert_eq!(report.flow, "import-wallet-seed");
    // A passing flow leaves no failure artifacts behind.
    assert_eq!(fs::read_dir(artifacts.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failing_flow_captures_a_named_screenshot() {
    let artifacts = TempDir::new().unwrap();
    let driver = Arc::new(FakeDriver::new());
    // Popup with no onboarding controls at all.
    let popup = driver.add_window("chrome-extension://abcdef/popup.html#/onboarding");
    let session = PilotSession::with_driver(driver.clone(), test_config(&artifacts));

    let phrase = SeedPhrase::parse(PHRASE_12).unwrap();
    let flows = session.flows();
    let result = session
        .run_flow("seed import", |fctx| async move {
            flows.import_wallet_by_seed(&fctx, &popup, &phrase).await
        })
        .await;

    assert!(result.is_err());
    let names: Vec<String> = fs::read_dir(artifacts.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["seed-import.png".to_string()]);
}

#[tokio::test]
async fn chord_from_focused_row_opens_send_route() {
    let artifacts = TempDir::new().unwrap();
    let driver = Arc::new(FakeDriver::new());
    let popup = driver.add_window("chrome-extension://abcdef/popup.html#/assets");
    driver.add_element(&popup, ElementSpec::new().with_test_id("asset-row-0"));
    driver.set_tab_order(&popup, &["asset-row-0"]);
    driver.on_chord(
        &popup,
        Key::Meta,
        KeyInput::Named(Key::Enter),
        FakeEffect::SetUrl("chrome-extension://abcdef/popup.html#/send".into()),
    );
    let session = PilotSession::with_driver(driver.clone(), test_config(&artifacts));

    let flows = session.flows();
    let target = popup.clone();
    let report = session
        .run_flow("chord send", |fctx| async move {
            flows.send_via_chord(&fctx, &target, "asset-row-0").await
        })
        .await
        .unwrap();

    assert!(report.ok);
    assert!(driver.url_of(&popup).unwrap().contains("send"));
}

#[tokio::test]
async fn dapp_connect_round_trips_through_the_approval_popup() {
    let artifacts = TempDir::new().unwrap();
    let driver = Arc::new(FakeDriver::new());
    let dapp = driver.add_window("https://dapp.test/");
    driver.add_element(
        &dapp,
        ElementSpec::new()
            .with_dom_id("connect")
            .on_click(FakeEffect::OpenWindow {
                url: "chrome-extension://abcdef/notification.html".into(),
                delay_polls: 2,
                elements: vec![ElementSpec::new()
                    .with_test_id("approve-connect")
                    .on_click(FakeEffect::CloseWindow)],
            }),
    );
    driver.add_element(
        &dapp,
        ElementSpec::new()
            .with_dom_id("accounts")
            .with_text("0x52908400098527886e0f7030069857d2e4169ee7"),
    );
    let session = PilotSession::with_driver(driver.clone(), test_config(&artifacts));

    let flows = session.flows();
    let target = dapp.clone();
    let report = session
        .run_flow("dapp connect", |fctx| async move {
            flows.connect_to_dapp(&fctx, &target).await
        })
        .await
        .unwrap();

    assert!(report.ok);
    // Both parties ended up explicitly tagged.
    assert_eq!(
        session.registry().find_by_role(ContextRole::Dapp),
        Some(dapp)
    );
}

#[tokio::test]
async fn registry_classification_needs_at_most_one_untagged_context() {
    let artifacts = TempDir::new().unwrap();
    let driver = Arc::new(FakeDriver::new());
    let dapp = driver.add_window("https://dapp.test/");
    let popup = driver.add_window("chrome-extension://abcdef/notification.html");
    let session = PilotSession::with_driver(driver.clone(), test_config(&artifacts));

    let classified = session
        .registry()
        .classify(Some((&dapp, ContextRole::Dapp)))
        .await
        .unwrap();
    assert_eq!(classified.popup, popup);

    // A third untagged window makes elimination refuse rather than guess.
    driver.add_window("https://other.test/");
    session
        .registry()
        .assign_role(&popup, ContextRole::Unknown)
        .unwrap();
    session
        .registry()
        .assign_role(&dapp, ContextRole::Unknown)
        .unwrap();
    let err = session
        .registry()
        .classify(Some((&dapp, ContextRole::Dapp)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        webpilot::RegistryError::AmbiguousContexts { .. }
    ));
}

#[tokio::test]
async fn quit_tears_the_session_down() {
    let artifacts = TempDir::new().unwrap();
    let driver = Arc::new(FakeDriver::new());
    driver.add_window("https://dapp.test/");
    let session = PilotSession::with_driver(driver.clone(), test_config(&artifacts));

    session.quit().await.unwrap();
    assert!(driver.status().await.is_err());
}
