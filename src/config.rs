//! Config for the LDAP export client.
use std::{path::PathBuf, sync::Arc, time::Duration};

use ldap3::LdapConnSettings;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// LDAP export configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
	/// The URL to connect to the server with. Supports ldap, ldaps, and ldapi
	/// schemes
	pub url: Url,
	/// Connection settings.
	pub connection: ConnectionConfig,
	/// The username for the LDAP search user
	pub search_user: String,
	/// The password for the LDAP search user
	pub search_password: String,
	/// Base, filter and paging parameters for the export search
	pub search: SearchConfig,
	/// Source labels stamped onto every exported record
	pub source: SourceConfig,
}

/// Configuration for how to connect to the LDAP server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
	/// Timeout to establish a connection in seconds.
	pub timeout: u64,

	/// LDAP operation timeout. For search per reply.
	pub operation_timeout: Duration,

	/// TLS config
	pub tls: TLSConfig,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		ConnectionConfig {
			timeout: 5,
			operation_timeout: Duration::from_secs(120),
			tls: TLSConfig::default(),
		}
	}
}

/// TLS Configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TLSConfig {
	/// Use StartTLS extended operation for establishing a secure connection,
	/// rather than TLS on a dedicated port.
	pub starttls: bool,

	/// Disable verification of TLS certificates
	pub no_tls_verify: bool,

	/// TLS root certificates path
	pub root_certificates_path: Option<PathBuf>,
}

/// Configurable search parameters for one export run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
	/// The search base the export is scoped to
	pub base: String,
	/// The search filter selecting the objects to export
	pub filter: String,
	/// Attributes the server should return. `None` requests all attributes.
	#[serde(default)]
	pub attributes: Option<Vec<String>>,
	/// Page size for the [simple paged search control]
	///
	/// [simple paged search control]: https://www.rfc-editor.org/rfc/rfc2696.html
	#[serde(default = "default_page_size")]
	pub page_size: i32,
}

/// The page size used when the configuration does not name one.
fn default_page_size() -> i32 {
	1000
}

/// Labels describing which server/domain/environment produced the data
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
	/// The type of source the data is coming from
	pub source_type: String,
	/// Specific value for the source type. Used to distinguish between data
	/// of the same source type.
	pub source_value: String,
}

impl ConnectionConfig {
	/// Create a [`LdapConnSettings`] based on this [`ConnectionConfig`]
	pub(crate) async fn to_settings(&self) -> Result<LdapConnSettings, Error> {
		let mut settings = LdapConnSettings::new()
			.set_conn_timeout(Duration::from_secs(self.timeout))
			.set_starttls(self.tls.starttls)
			.set_no_tls_verify(self.tls.no_tls_verify);

		if let Some(path) = &self.tls.root_certificates_path {
			let pem = tokio::fs::read(path).await?;
			let mut roots = rustls::RootCertStore::empty();
			let mut reader = pem.as_slice();
			for der in rustls_pemfile::certs(&mut reader)? {
				roots
					.add(&rustls::Certificate(der))
					.map_err(|_| Error::Invalid("Could not read root certificate".to_owned()))?;
			}
			let tls_config = rustls::ClientConfig::builder()
				.with_safe_defaults()
				.with_root_certificates(roots)
				.with_no_client_auth();
			settings = settings.set_config(Arc::new(tls_config));
		}
		Ok(settings)
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use std::io::ErrorKind;

	use crate::{error::Error, Config, ConnectionConfig, TLSConfig};

	#[test]
	fn test_config_defaults() {
		let config: Config = serde_json::from_str(
			r#"{
				"url": "ldap://localhost:1389",
				"connection": {
					"timeout": 5,
					"operation_timeout": { "secs": 120, "nanos": 0 },
					"tls": { "starttls": false, "no_tls_verify": false }
				},
				"search_user": "cn=admin,dc=example,dc=org",
				"search_password": "adminpassword",
				"search": {
					"base": "ou=users,dc=example,dc=org",
					"filter": "(objectClass=inetOrgPerson)"
				},
				"source": { "source_type": "ad", "source_value": "example" }
			}"#,
		)
		.unwrap();

		assert_eq!(config.search.page_size, 1000);
		assert!(config.search.attributes.is_none());
		assert!(config.connection.tls.root_certificates_path.is_none());
	}

	#[tokio::test]
	async fn test_tls_config() {
		// invalid path test
		let err = ConnectionConfig {
			tls: TLSConfig {
				starttls: false,
				no_tls_verify: false,
				root_certificates_path: Some("invalid_path".into()),
			},
			timeout: 5,
			operation_timeout: std::time::Duration::from_secs(5),
		}
		.to_settings()
		.await
		.err()
		.unwrap();
		assert!(matches!(err, Error::Io(io_err) if io_err.kind() == ErrorKind::NotFound));

		// a rust source file is not a certificate
		let err = ConnectionConfig {
			tls: TLSConfig {
				starttls: false,
				no_tls_verify: false,
				root_certificates_path: Some("src/config.rs".into()),
			},
			timeout: 5,
			operation_timeout: std::time::Duration::from_secs(5),
		}
		.to_settings()
		.await;
		// No PEM blocks parse out of it, so settings are built without roots.
		assert!(err.is_ok());
	}
}
