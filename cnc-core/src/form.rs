//! Formular-Dekodierung und Anwendung auf die Konfiguration
//!
//! Die Konfigurationsseite sendet ihre Felder als Query-String
//! (`GET /?ssid=...&password=...`). Dekodiert werden nur `+` und `%20`.

use core::str::FromStr;

use heapless::String;

use crate::types::{DeviceConfig, bounded};

/// Maximale Länge eines dekodierten Formularwerts
pub const FORM_VALUE_CAPACITY: usize = 128;

/// Ein dekodierter Formularwert
pub type FormValue = String<FORM_VALUE_CAPACITY>;

/// Zerlegt einen Query-String in `(key, raw_value)` Paare
///
/// Segmente ohne `=` werden übersprungen.
pub fn form_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter_map(|segment| segment.split_once('='))
}

/// Letzter Rohwert zu `key`
pub fn form_value<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    form_pairs(query)
        .filter(|(candidate, _)| *candidate == key)
        .map(|(_, value)| value)
        .last()
}

/// Ersetzt `+` und `%20` durch Leerzeichen, sonst keine Dekodierung
///
/// `None` wenn das Ergebnis nicht in [`FORM_VALUE_CAPACITY`] passt.
pub fn decode_value(raw: &str) -> Option<FormValue> {
    let mut decoded = FormValue::new();
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if let Some(tail) = rest.strip_prefix("%20") {
            decoded.push(' ').ok()?;
            rest = tail;
            continue;
        }
        decoded.push(if c == '+' { ' ' } else { c }).ok()?;
        rest = &rest[c.len_utf8()..];
    }
    Some(decoded)
}

/// Wendet eine Formular-Submission auf eine Kopie von `config` an
///
/// Regeln pro Feld:
/// - unbekannte Keys werden ignoriert
/// - leeres Passwort behält das gespeicherte
/// - leere Werte werden ignoriert, außer `ip` und `mqtt_broker` (löschen)
/// - `mqtt_port`/`mqtt_interval` werden ignoriert wenn nicht parsebar
/// - Werte werden getrimmt, zu lange Werte ignoriert
pub fn apply_form(config: &DeviceConfig, query: &str) -> DeviceConfig {
    let mut updated = config.clone();
    for (key, raw) in form_pairs(query) {
        let Some(value) = decode_value(raw) else {
            warn!("Form: Value for '{}' too long, ignored", key);
            continue;
        };
        if !apply_field(&mut updated, key, value.trim()) {
            debug!("Form: Field '{}' ignored", key);
        }
    }
    updated
}

/// `true` wenn das Feld übernommen wurde
fn apply_field(config: &mut DeviceConfig, key: &str, value: &str) -> bool {
    match key {
        "ip" => {
            if value.is_empty() {
                config.static_ip = None;
                return true;
            }
            replace(&mut config.static_ip, value)
        }
        "mqtt_broker" => {
            if value.is_empty() {
                config.mqtt_broker = None;
                return true;
            }
            replace(&mut config.mqtt_broker, value)
        }
        _ if value.is_empty() => false,
        "ssid" => assign(&mut config.ssid, value),
        "password" => assign(&mut config.password, value),
        "mqtt_topic" => assign(&mut config.mqtt_topic, value),
        "mqtt_port" => parse_into(&mut config.mqtt_port, value),
        "mqtt_interval" => parse_into(&mut config.mqtt_interval_seconds, value),
        _ => false,
    }
}

fn assign<const N: usize>(field: &mut String<N>, value: &str) -> bool {
    match bounded::<N>(value) {
        Some(text) => {
            *field = text;
            true
        }
        None => false,
    }
}

fn replace<const N: usize>(field: &mut Option<String<N>>, value: &str) -> bool {
    match bounded::<N>(value) {
        Some(text) => {
            *field = Some(text);
            true
        }
        None => false,
    }
}

fn parse_into<T: FromStr>(field: &mut T, value: &str) -> bool {
    match value.parse() {
        Ok(parsed) => {
            *field = parsed;
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> DeviceConfig {
        let mut config = DeviceConfig::default();
        config.ssid = bounded("Werkstatt").unwrap();
        config.password = bounded("geheim123").unwrap();
        config.mqtt_broker = bounded("broker.local");
        config.static_ip = bounded("192.168.1.50");
        config
    }

    #[test]
    fn test_decode_plus_and_space_escape() {
        assert_eq!(decode_value("Halle+2").unwrap().as_str(), "Halle 2");
        assert_eq!(decode_value("Halle%202").unwrap().as_str(), "Halle 2");
        // Andere Escapes bleiben unverändert
        assert_eq!(decode_value("a%2Fb").unwrap().as_str(), "a%2Fb");
    }

    #[test]
    fn test_decode_rejects_oversized_value() {
        let long = "x".repeat(FORM_VALUE_CAPACITY + 1);
        assert!(decode_value(&long).is_none());
    }

    #[test]
    fn test_blank_password_keeps_stored() {
        let updated = apply_form(&configured(), "ssid=Neu&password=");
        assert_eq!(updated.ssid.as_str(), "Neu");
        assert_eq!(updated.password.as_str(), "geheim123");
    }

    #[test]
    fn test_blank_broker_and_ip_clear() {
        let updated = apply_form(&configured(), "ip=&mqtt_broker=+");
        assert_eq!(updated.static_ip, None);
        assert_eq!(updated.broker(), None);
    }

    #[test]
    fn test_blank_ssid_ignored() {
        let updated = apply_form(&configured(), "ssid=%20%20");
        assert_eq!(updated.ssid.as_str(), "Werkstatt");
    }

    #[test]
    fn test_invalid_numbers_ignored() {
        let updated = apply_form(&configured(), "mqtt_port=abc&mqtt_interval=10");
        assert_eq!(updated.mqtt_port, 1883);
        assert_eq!(updated.mqtt_interval_seconds, 10);
    }

    #[test]
    fn test_unknown_keys_and_bare_segments_ignored() {
        let base = configured();
        let updated = apply_form(&base, "foo=bar&novalue&mqtt_topic=cnc2/status");
        assert_eq!(updated.mqtt_topic.as_str(), "cnc2/status");
        assert_eq!(updated.ssid, base.ssid);
    }

    #[test]
    fn test_values_are_trimmed() {
        let updated = apply_form(&configured(), "ssid=+Halle+3+");
        assert_eq!(updated.ssid.as_str(), "Halle 3");
    }

    #[test]
    fn test_form_value_last_wins() {
        assert_eq!(form_value("ssid=a&ssid=b", "ssid"), Some("b"));
        assert_eq!(form_value("other=1", "ssid"), None);
    }
}
