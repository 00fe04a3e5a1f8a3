//! Fixed documents sent to streaming clients.

use serde_json::json;

pub const WELCOME_MESSAGE: &str = "Connected to alpha-strikes notification service.";

pub const ACKNOWLEDGE_MESSAGE: &str =
    "Knocking on my door? Join the discord listed on the documentation page!";

pub const ERROR_MESSAGE: &str = "Error! Contact owner of alpha-strike services.";

/// Sent once, right after a client is registered.
pub fn welcome() -> String {
    json!({ "message": WELCOME_MESSAGE }).to_string()
}

/// Static reply to any text a client sends, echoing it back.
pub fn acknowledge(received: &str) -> String {
    json!({ "message": ACKNOWLEDGE_MESSAGE, "echo": received }).to_string()
}

/// Best-effort notice before a connection is closed on a transport error.
pub fn transport_error() -> String {
    json!({ "message": ERROR_MESSAGE }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_welcome_document() {
        assert_eq!(
            welcome(),
            r#"{"message":"Connected to alpha-strikes notification service."}"#
        );
    }

    #[test]
    fn test_acknowledge_echoes_input() {
        let doc: Value = serde_json::from_str(&acknowledge("hello \"there\"")).unwrap();
        assert_eq!(doc["message"], ACKNOWLEDGE_MESSAGE);
        assert_eq!(doc["echo"], "hello \"there\"");
    }

    #[test]
    fn test_transport_error_document() {
        let doc: Value = serde_json::from_str(&transport_error()).unwrap();
        assert_eq!(doc["message"], ERROR_MESSAGE);
    }
}
