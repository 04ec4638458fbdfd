use serde::{Deserialize, Serialize};

/// Per-stream configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Credit granted to the outbound producer the first time the stream is joined.
    ///
    /// Requester-initiated interactions set this so the producer may start emitting before the
    /// peer sends any REQUEST_N. Zero grants nothing.
    pub initial_outgoing_request: u32,
}

impl ChannelConfig {
    /// Set the initial outbound credit.
    pub fn with_initial_request(mut self, n: u32) -> Self {
        self.initial_outgoing_request = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_initial_credit() {
        assert_eq!(ChannelConfig::default().initial_outgoing_request, 0);
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let cfg: ChannelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ChannelConfig::default());

        let cfg: ChannelConfig =
            serde_json::from_str(r#"{"initial_outgoing_request": 4}"#).unwrap();
        assert_eq!(cfg, ChannelConfig::default().with_initial_request(4));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = serde_json::from_str::<ChannelConfig>(r#"{"initial_request": 4}"#);
        assert!(err.is_err());
    }
}
