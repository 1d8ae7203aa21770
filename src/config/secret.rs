//! Connection string protection
//!
//! The `[postgresql]` connection string embeds the loader's database password. It is
//! kept in a [`SecretString`]: zeroed on drop, redacted in `Debug` output, readable only
//! through `ExposeSecret`.
//!
//! ```rust
//! use deid_loader::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let conn = secret_string("postgresql://loader:pw@db/i2b2".to_string());
//! assert!(conn.expose_secret().as_str().starts_with("postgresql://"));
//! assert!(!format!("{conn:?}").contains("pw@"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Raw connection string held inside a [`SecretString`]
#[derive(Clone, Zeroize, Serialize, Deserialize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Connection string as stored in [`crate::config::PostgreSQLConfig`]
pub type SecretString = Secret<SecretValue>;

/// Wraps a connection string read from the config file or an env override
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[derive(Serialize, Deserialize)]
    struct Section {
        connection_string: SecretString,
    }

    #[test]
    fn test_debug_output_hides_password() {
        let section = Section {
            connection_string: secret_string("postgresql://loader:hunter2@db/i2b2".to_string()),
        };
        let rendered = format!("{:?}", section.connection_string);
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_loads_from_toml_unchanged() {
        let section: Section =
            toml::from_str("connection_string = \"postgres://localhost/i2b2\"").unwrap();
        assert_eq!(
            section.connection_string.expose_secret().as_str(),
            "postgres://localhost/i2b2"
        );
    }

    #[test]
    fn test_written_back_as_plain_string() {
        let section = Section {
            connection_string: secret_string("postgresql://db/i2b2".to_string()),
        };
        let rendered = toml::to_string(&section).unwrap();
        assert_eq!(rendered.trim(), "connection_string = \"postgresql://db/i2b2\"");
    }
}
