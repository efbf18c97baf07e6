//! API server configuration.

/// Configuration for the API server, resolved by the server binary from its
/// flags and environment.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// Session token signing secret.
    pub session_secret: String,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("session_secret", &"<redacted>")
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_secret() {
        let config = ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            session_secret: "hunter2".into(),
            cookie_secure: false,
        };
        let shown = format!("{config:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("127.0.0.1:0"));
    }
}
