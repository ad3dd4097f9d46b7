//! Integration Tests für den HTTP Control Plane
//!
//! Requests laufen komplett durch den Supervisor: Routing, Formular,
//! Speicher und Antwort.

mod common;

use cnc_core::{DeviceConfig, NetworkMode, RestartReason, TickOutcome};
use common::{CONFIG_PAGE, Rig, TestSupervisor, station_config, tick};

const HTML_OK: &str = "HTTP/1.1 200 OK\r\nContent-type: text/html\r\n\r\n";
const JSON_OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n";

fn station() -> (Rig, TestSupervisor) {
    let rig = Rig::reachable();
    let supervisor = rig.boot(station_config(None));
    (rig, supervisor)
}

fn access_point() -> (Rig, TestSupervisor) {
    let rig = Rig::default();
    let supervisor = rig.boot(DeviceConfig::default());
    (rig, supervisor)
}

/// Ein Request, ein Tick, die Antwort als Text
fn exchange(rig: &Rig, supervisor: &mut TestSupervisor, request: &str) -> (TickOutcome, String) {
    rig.listener.queue(request);
    let outcome = tick(supervisor, 100).expect("tick failed");
    (outcome, rig.listener.last_response())
}

// ============================================================================
// Tests: Routing
// ============================================================================

#[test]
fn test_root_serves_config_page() {
    let (rig, mut supervisor) = station();
    let (outcome, response) = exchange(&rig, &mut supervisor, "GET / HTTP/1.1\r\nHost: cnc\r\n\r\n");

    assert_eq!(outcome, TickOutcome::Continue);
    assert_eq!(response, format!("{}{}", HTML_OK, String::from_utf8_lossy(CONFIG_PAGE)));
}

#[test]
fn test_unknown_path_in_station_mode_is_404() {
    let (rig, mut supervisor) = station();
    let (_, response) = exchange(&rig, &mut supervisor, "GET /foo HTTP/1.1\r\n\r\n");
    assert_eq!(response, "HTTP/1.1 404 Not Found\r\n\r\n<h1>404</h1>");
}

#[test]
fn test_unknown_path_in_access_point_mode_redirects() {
    let (rig, mut supervisor) = access_point();
    let (_, response) = exchange(&rig, &mut supervisor, "GET /generate_204 HTTP/1.1\r\n\r\n");
    assert_eq!(response, "HTTP/1.1 302 Found\r\nLocation: http://192.168.4.1\r\n\r\n");
    assert_eq!(rig.listener.0.borrow().accepted_modes, [NetworkMode::AccessPoint]);
}

#[test]
fn test_config_page_also_served_in_access_point_mode() {
    let (rig, mut supervisor) = access_point();
    let (_, response) = exchange(&rig, &mut supervisor, "GET / HTTP/1.1\r\n\r\n");
    assert!(response.starts_with(HTML_OK));
}

#[test]
fn test_post_is_not_found() {
    let (rig, mut supervisor) = station();
    let (_, response) = exchange(&rig, &mut supervisor, "POST /config HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404"));
}

#[test]
fn test_malformed_request_gets_no_response() {
    let (rig, mut supervisor) = station();
    let (outcome, response) = exchange(&rig, &mut supervisor, "GARBAGE\r\n\r\n");

    assert_eq!(outcome, TickOutcome::Continue);
    assert_eq!(response, "");
    // Verbindung wurde trotzdem geschlossen
    assert_eq!(rig.listener.0.borrow().responses.len(), 1);
}

#[test]
fn test_binary_request_gets_no_response() {
    let (rig, mut supervisor) = station();
    rig.listener.0.borrow_mut().pending.push_back(vec![0xFF, 0xFE, 0x00, 0x80]);

    assert_eq!(tick(&mut supervisor, 100), Ok(TickOutcome::Continue));
    assert_eq!(rig.listener.last_response(), "");
}

#[test]
fn test_one_connection_per_tick() {
    let (rig, mut supervisor) = station();
    rig.listener.queue("GET /status HTTP/1.1\r\n\r\n");
    rig.listener.queue("GET /status HTTP/1.1\r\n\r\n");

    tick(&mut supervisor, 100).unwrap();
    assert_eq!(rig.listener.0.borrow().responses.len(), 1);
    tick(&mut supervisor, 200).unwrap();
    assert_eq!(rig.listener.0.borrow().responses.len(), 2);
}

// ============================================================================
// Tests: JSON Endpunkte
// ============================================================================

#[test]
fn test_status_reports_pin_level() {
    let (rig, mut supervisor) = station();

    let (_, response) = exchange(&rig, &mut supervisor, "GET /status HTTP/1.1\r\n\r\n");
    assert_eq!(response, format!("{}{}", JSON_OK, r#"{"status":"OFFLINE","gpio_value":0}"#));

    rig.pin.0.set(true);
    let (_, response) = exchange(&rig, &mut supervisor, "GET /status HTTP/1.1\r\n\r\n");
    assert_eq!(response, format!("{}{}", JSON_OK, r#"{"status":"ONLINE","gpio_value":1}"#));
}

#[test]
fn test_config_never_returns_password() {
    let (rig, mut supervisor) = station();
    let (_, response) = exchange(&rig, &mut supervisor, "GET /config HTTP/1.1\r\n\r\n");

    assert_eq!(
        response,
        format!(
            "{}{}",
            JSON_OK,
            r#"{"ssid":"Halle","password":"","ip":"","mqtt_broker":"","mqtt_port":1883,"mqtt_topic":"cnc1/status","mqtt_interval":5}"#
        )
    );
}

#[test]
fn test_scan_retries_until_found() {
    let (rig, mut supervisor) = access_point();
    {
        let mut wifi = rig.wifi.0.borrow_mut();
        wifi.scan_results.push_back(Ok(false));
        wifi.scan_results.push_back(Err(cnc_core::WifiError::Scan));
        wifi.scan_results.push_back(Ok(true));
    }
    let waited_before = rig.waited_ms();

    let (_, response) = exchange(&rig, &mut supervisor, "GET /scan?ssid=Neue+Halle HTTP/1.1\r\n\r\n");
    assert_eq!(response, format!("{}{}", JSON_OK, r#"{"found":true}"#));
    assert_eq!(rig.wifi.0.borrow().scan_calls, 3);
    // Zwei Pausen zwischen drei Scans plus Tick-Pause
    assert_eq!(rig.waited_ms() - waited_before, 2_000 + 50);
}

#[test]
fn test_scan_gives_up_after_ten_attempts() {
    let (rig, mut supervisor) = access_point();
    let (_, response) = exchange(&rig, &mut supervisor, "GET /scan?ssid=Fremd HTTP/1.1\r\n\r\n");

    assert_eq!(response, format!("{}{}", JSON_OK, r#"{"found":false}"#));
    assert_eq!(rig.wifi.0.borrow().scan_calls, 10);
}

// ============================================================================
// Tests: Formular
// ============================================================================

#[test]
fn test_submission_saves_and_requests_restart() {
    let (rig, mut supervisor) = station();
    let (outcome, response) = exchange(
        &rig,
        &mut supervisor,
        "GET /?ssid=NewNet&mqtt_port=1884 HTTP/1.1\r\n\r\n",
    );

    assert_eq!(outcome, TickOutcome::Restart(RestartReason::ConfigSaved));
    assert!(response.starts_with(HTML_OK));
    assert!(response.contains("Configuration Saved!"));

    // Gespeichert wird inklusive Passwort
    let stored = rig.storage.0.borrow().document.clone().expect("nothing stored");
    let stored = String::from_utf8(stored).unwrap();
    assert!(stored.contains(r#""ssid":"NewNet""#));
    assert!(stored.contains(r#""password":"geheim""#));
    assert!(stored.contains(r#""mqtt_port":1884"#));

    let config = &supervisor.state().config;
    assert_eq!(config.ssid.as_str(), "NewNet");
    assert_eq!(config.mqtt_port, 1884);

    // Bis zum Neustart liefert /config schon die neuen Werte, ohne Passwort
    let (_, response) = exchange(&rig, &mut supervisor, "GET /config HTTP/1.1\r\n\r\n");
    assert!(response.contains(r#""ssid":"NewNet""#));
    assert!(response.contains(r#""password":"""#));
    assert!(response.contains(r#""mqtt_port":1884"#));
}

#[test]
fn test_blank_password_keeps_stored_one() {
    let (rig, mut supervisor) = station();
    exchange(&rig, &mut supervisor, "GET /?ssid=Werk+2&password= HTTP/1.1\r\n\r\n");

    let config = &supervisor.state().config;
    assert_eq!(config.ssid.as_str(), "Werk 2");
    assert_eq!(config.password.as_str(), "geheim");
}

#[test]
fn test_blank_ip_clears_static_address() {
    let (rig, mut supervisor) = station();
    exchange(&rig, &mut supervisor, "GET /?ip=10.0.0.42 HTTP/1.1\r\n\r\n");
    assert_eq!(supervisor.state().config.static_ip.as_deref(), Some("10.0.0.42"));

    exchange(&rig, &mut supervisor, "GET /?ip= HTTP/1.1\r\n\r\n");
    assert_eq!(supervisor.state().config.static_ip, None);
}

#[test]
fn test_invalid_numbers_are_ignored() {
    let (rig, mut supervisor) = station();
    exchange(
        &rig,
        &mut supervisor,
        "GET /?mqtt_port=viele&mqtt_interval=30 HTTP/1.1\r\n\r\n",
    );

    let config = &supervisor.state().config;
    assert_eq!(config.mqtt_port, 1883);
    assert_eq!(config.mqtt_interval_seconds, 30);
}

#[test]
fn test_save_failure_answers_500_without_restart() {
    let (rig, mut supervisor) = station();
    rig.storage.0.borrow_mut().fail_store = true;

    let (outcome, response) = exchange(&rig, &mut supervisor, "GET /?ssid=NewNet HTTP/1.1\r\n\r\n");

    assert_eq!(outcome, TickOutcome::Continue);
    assert!(response.starts_with("HTTP/1.1 500"));
    assert_eq!(supervisor.state().config.ssid.as_str(), "Halle");
}

#[test]
fn test_saved_config_restarts_even_if_client_is_gone() {
    let (rig, mut supervisor) = station();
    rig.listener.0.borrow_mut().client_gone = true;
    rig.listener.queue("GET /?ssid=NewNet HTTP/1.1\r\n\r\n");

    let outcome = tick(&mut supervisor, 100).expect("tick failed");

    // Bestätigung kam nicht an, der Neustart bleibt trotzdem Pflicht
    assert_eq!(outcome, TickOutcome::Restart(RestartReason::ConfigSaved));
    assert!(rig.listener.last_response().is_empty());
    assert_eq!(rig.storage.0.borrow().stores, 1);
    assert_eq!(supervisor.state().config.ssid.as_str(), "NewNet");
}

#[test]
fn test_unsaved_config_with_client_gone_does_not_restart() {
    let (rig, mut supervisor) = station();
    rig.storage.0.borrow_mut().fail_store = true;
    rig.listener.0.borrow_mut().client_gone = true;
    rig.listener.queue("GET /?ssid=NewNet HTTP/1.1\r\n\r\n");

    assert_eq!(tick(&mut supervisor, 100), Ok(TickOutcome::Continue));
    assert_eq!(supervisor.state().config.ssid.as_str(), "Halle");
}

#[test]
fn test_submission_from_access_point() {
    let (rig, mut supervisor) = access_point();
    let (outcome, _) = exchange(
        &rig,
        &mut supervisor,
        "GET /?ssid=Halle&password=geheim&mqtt_broker=broker.local HTTP/1.1\r\n\r\n",
    );

    assert_eq!(outcome, TickOutcome::Restart(RestartReason::ConfigSaved));
    let config = &supervisor.state().config;
    assert!(config.has_station_credentials());
    assert_eq!(config.broker(), Some("broker.local"));
    assert_eq!(rig.storage.0.borrow().stores, 1);
}
