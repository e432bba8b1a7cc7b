//! Pipeline input.

use serde::Deserialize;

use super::metadata::MetadataField;

/// Default mailbox to search when the request does not name one.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Everything needed to run the pipeline once for one order.
///
/// Deserializes from the JSON body the owning HTTP handler receives, e.g.
/// `{"email": "...", "password": "...", "host": "...", "port": 993,
/// "tls": true, "orderId": "ORD-42"}`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    /// Mailbox login.
    #[serde(alias = "email", alias = "mailboxUser")]
    pub user: String,

    /// Mailbox password. Never printed by `Debug`.
    #[serde(alias = "mailboxPassword")]
    pub password: String,

    /// Mail server host name.
    pub host: String,

    /// Mail server port (993 for implicit TLS, 143 for STARTTLS).
    pub port: u16,

    /// `true` for implicit TLS, `false` for STARTTLS.
    #[serde(default = "default_tls", alias = "tls", alias = "useTLS")]
    pub use_tls: bool,

    /// Mailbox (folder) to search.
    #[serde(default = "default_mailbox")]
    pub mailbox: String,

    /// Order id searched for in message subjects.
    pub order_id: String,

    /// Caller-supplied fields; these win over body fields with the same key.
    #[serde(default, deserialize_with = "deserialize_fields")]
    pub metadata_fields: Vec<MetadataField>,
}

impl RetrievalRequest {
    /// Create a request for `order_id` against `host:port` with TLS and the default mailbox.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            use_tls: true,
            mailbox: DEFAULT_MAILBOX.to_string(),
            order_id: order_id.into(),
            metadata_fields: Vec::new(),
        }
    }

    /// `host:port`, used in logs and connection errors.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for RetrievalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalRequest")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("mailbox", &self.mailbox)
            .field("order_id", &self.order_id)
            .field("metadata_fields", &self.metadata_fields)
            .finish()
    }
}

fn default_tls() -> bool {
    true
}

fn default_mailbox() -> String {
    DEFAULT_MAILBOX.to_string()
}

/// Accept either `{"key": "value", ...}` or `[{"key": ..., "value": ...}]`.
///
/// Object keys keep the order they were written in. Non-string values are
/// stored as their JSON text.
fn deserialize_fields<'de, D>(deserializer: D) -> Result<Vec<MetadataField>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Fields {
        List(Vec<MetadataField>),
        Map(serde_json::Map<String, serde_json::Value>),
    }

    Ok(match Fields::deserialize(deserializer)? {
        Fields::List(list) => list,
        Fields::Map(map) => map
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(value) => MetadataField::new(key, value),
                other => MetadataField::new(key, other.to_string()),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_handler_body() {
        let json = r#"{
            "email": "orders@example.com",
            "password": "hunter2",
            "host": "imap.example.com",
            "port": 993,
            "orderId": "ORD-42",
            "metadataFields": {"Currency": "EUR"}
        }"#;
        let req: RetrievalRequest = serde_json::from_str(json).expect("parse");
        assert_eq!(req.user, "orders@example.com");
        assert!(req.use_tls);
        assert_eq!(req.mailbox, "INBOX");
        assert_eq!(req.order_id, "ORD-42");
        assert_eq!(req.metadata_fields, vec![MetadataField::new("Currency", "EUR")]);
    }

    #[test]
    fn test_deserialize_field_list_and_tls_flag() {
        let json = r#"{
            "user": "u", "password": "p", "host": "h", "port": 143, "tls": false,
            "orderId": "X", "metadataFields": [{"key": "B", "value": "2"}, {"key": "A", "value": "1"}]
        }"#;
        let req: RetrievalRequest = serde_json::from_str(json).expect("parse");
        assert!(!req.use_tls);
        assert_eq!(req.metadata_fields[0].key, "B");
        assert_eq!(req.metadata_fields[1].key, "A");
    }

    #[test]
    fn test_deserialize_request_field_names() {
        let json = r#"{
            "mailboxUser": "u", "mailboxPassword": "p", "host": "h", "port": 143,
            "useTLS": false, "orderId": "ORD-1"
        }"#;
        let req: RetrievalRequest = serde_json::from_str(json).expect("parse");
        assert_eq!(req.user, "u");
        assert_eq!(req.password, "p");
        assert_eq!(req.port, 143);
        assert!(!req.use_tls);
        assert_eq!(req.order_id, "ORD-1");
    }

    #[test]
    fn test_field_map_keeps_caller_order() {
        let json = r#"{
            "user": "u", "password": "p", "host": "h", "port": 993, "orderId": "X",
            "metadataFields": {"Zone": "B", "Amount": "5", "Items": 3}
        }"#;
        let req: RetrievalRequest = serde_json::from_str(json).expect("parse");
        assert_eq!(
            req.metadata_fields,
            vec![
                MetadataField::new("Zone", "B"),
                MetadataField::new("Amount", "5"),
                MetadataField::new("Items", "3"),
            ]
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let req = RetrievalRequest::new("u", "s3cret", "h", 993, "X");
        let debug = format!("{req:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(req.endpoint(), "h:993");
    }
}
