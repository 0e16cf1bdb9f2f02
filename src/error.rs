//! Error codes

/// Errors that can occur when using this library
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// A configuration value could not be used.
	#[error("Invalid configuration: {0}")]
	Invalid(String),
	/// Reading configured files or writing records failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	/// A record could not be serialized.
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	/// An underlying protocol error or similar occurred, or the LDAP library
	/// was used incorrectly.
	#[error(transparent)]
	Ldap(#[from] ldap3::LdapError),
}
