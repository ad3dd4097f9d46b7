//! Client-ID und Status-Payload für den MQTT Publisher
//!
//! Das Protokoll selbst spricht `rust-mqtt`, hier liegen nur die Inhalte.

use core::fmt::Write as _;

use heapless::String;

use crate::types::StatusValue;

/// Präfix der Client-ID, gefolgt von der Hardware-ID als Hex
pub const CLIENT_ID_PREFIX: &str = "esp32-c3-cnc-";

pub type ClientId = String<48>;
pub type StatusPayload = String<40>;

/// Client-ID aus der Hardware-ID (MAC)
pub fn client_id(hardware_id: &[u8]) -> ClientId {
    let mut id = ClientId::new();
    let _ = id.push_str(CLIENT_ID_PREFIX);
    for byte in hardware_id {
        if write!(id, "{:02x}", byte).is_err() {
            break;
        }
    }
    id
}

/// Payload: `{"cycle":<0|1>,"L1":0,"L2":0,"L3":0}`
///
/// Feste Reihenfolge der Felder, deshalb kein Serializer. L1..L3 sind
/// reservierte Zähler und immer 0.
pub fn status_payload(status: StatusValue) -> StatusPayload {
    let mut payload = StatusPayload::new();
    let _ = write!(
        payload,
        "{{\"cycle\":{},\"L1\":0,\"L2\":0,\"L3\":0}}",
        status.cycle()
    );
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_from_mac() {
        let id = client_id(&[0x34, 0x85, 0x18, 0x0a, 0xbc, 0xde]);
        assert_eq!(id.as_str(), "esp32-c3-cnc-3485180abcde");
    }

    #[test]
    fn test_status_payload_fields() {
        assert_eq!(
            status_payload(StatusValue::Online).as_str(),
            r#"{"cycle":1,"L1":0,"L2":0,"L3":0}"#
        );
        assert_eq!(
            status_payload(StatusValue::Offline).as_str(),
            r#"{"cycle":0,"L1":0,"L2":0,"L3":0}"#
        );
    }
}
