use serde::{Deserialize, Serialize};

/// SMTP-specific configuration settings.
///
/// Holds all settings needed to establish a connection to an SMTP server.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub smtp_host: String,

    /// SMTP server port. Defaults to 587 (STARTTLS submission port).
    pub smtp_port: u16,

    /// Optional SMTP username for authentication.
    pub username: Option<String>,

    /// Optional SMTP password for authentication.
    pub password: Option<String>,

    /// Whether to use TLS for the SMTP connection. Defaults to `true`.
    pub tls: bool,

    /// The `From` address used in outgoing emails.
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("tls", &self.tls)
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_owned(),
            smtp_port: 587,
            username: None,
            password: None,
            tls: true,
            from_address: "noreply@localhost".to_owned(),
        }
    }
}

impl SmtpConfig {
    /// Create a new SMTP config with the given host and sender address.
    #[must_use]
    pub fn new(smtp_host: impl Into<String>, from_address: impl Into<String>) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            from_address: from_address.into(),
            ..Self::default()
        }
    }

    /// Set SMTP authentication credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Override the default SMTP port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.smtp_port = port;
        self
    }

    /// Set whether TLS should be used for SMTP.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SmtpConfig::default();
        assert_eq!(config.smtp_host, "localhost");
        assert_eq!(config.smtp_port, 587);
        assert!(config.tls);
    }

    #[test]
    fn debug_redacts_password() {
        let config = SmtpConfig::new("smtp.example.com", "test@example.com")
            .with_credentials("user", "test-pw-placeholder");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"), "password must be redacted");
        assert!(!debug.contains("test-pw-placeholder"));
        assert!(debug.contains("smtp.example.com"));
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = SmtpConfig::new("smtp.example.com", "test@example.com")
            .with_credentials("user", "myvalue")
            .with_port(465)
            .with_tls(false);

        let json = serde_json::to_string(&config).unwrap();
        let back: SmtpConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.smtp_host, "smtp.example.com");
        assert_eq!(back.smtp_port, 465);
        assert_eq!(back.username.as_deref(), Some("user"));
        assert!(!back.tls);
    }
}
