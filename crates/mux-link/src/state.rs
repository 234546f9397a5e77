//! Connection state of the gateway-to-board link

/// Lifecycle state of the serial connection
///
/// Drives the remotely visible gateway status attribute. Transitions:
/// `Disconnected → Connecting → Connected`, then on an I/O failure
/// `Disconnected → Reconnecting → Connected` as the monitor repairs the
/// link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No link, and no repair in progress
    #[default]
    Disconnected,
    /// Initial connection attempt underway
    Connecting,
    /// Link is up
    Connected,
    /// Link was lost and the monitor is attempting repair
    Reconnecting,
}

impl ConnectionState {
    /// Label exposed through the gateway status attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(ConnectionState::Reconnecting.as_str(), "Reconnecting");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}
