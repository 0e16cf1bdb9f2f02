//! Bulk-export directory entries from an LDAP server as normalized records.
//!
//! The library performs one search against a directory server and
//! transparently resumes it across result pages using the simple paged
//! results control ([RFC 2696]). Every returned entry is then normalized
//! for downstream ingestion: binary object GUIDs and security identifiers
//! are decoded to their canonical string forms, packed mail values are
//! split into individual addresses, and everything else is carried over as
//! text with a best-effort fallback for values that are not valid UTF-8.
//! Each entry yields exactly one [`NormalizedRecord`] stamped with
//! provenance metadata (source host, source labels, extraction time),
//! ready to be written out one JSON object at a time.
//!
//! For a general primer on LDAP, the [introduction] in the `ldap3` crate
//! which is used here for interfacing with LDAP is an excellent resource.
//!
//! [RFC 2696]: https://www.rfc-editor.org/rfc/rfc2696.html
//! [introduction]: https://github.com/inejge/ldap3/blob/master/LDAP-primer.md
//!
//! # Getting started
//! A minimal example of running an export might look like so:
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use url::Url;
//! use ldap_exporter::{
//!     config::{Config, ConnectionConfig, SearchConfig, SourceConfig},
//!     ldap::Ldap,
//!     record,
//! };
//!
//! // Configuration can also be deserialized with serde. It's hand-constructed
//! // here for demonstration purposes.
//! let config = Config {
//!     url: Url::parse("ldap://localhost")?,
//!     connection: ConnectionConfig::default(),
//!     search_user: "admin".to_owned(),
//!     search_password: "verysecret".to_owned(),
//!     search: SearchConfig {
//!         base: "dc=example,dc=com".to_owned(),
//!         filter: "(objectClass=person)".to_owned(),
//!         attributes: None,
//!         page_size: 1000,
//!     },
//!     source: SourceConfig {
//!         source_type: "active_directory".to_owned(),
//!         source_value: "example".to_owned(),
//!     },
//! };
//!
//! let client = Ldap::new(config);
//! let records = client.export().await?;
//! let mut out = std::io::stdout().lock();
//! record::write_records(&mut out, &records)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//! * The export is strictly read-only; the library performs no directory
//!   modifications of any kind.
//! * One search per run against one server. Fanning out over several
//!   domains means several clients.
//! * A server that ignores the paged results control caps the export at
//!   whatever a single response delivers; this is reported as a warning,
//!   not an error.
//! * [secrecy](https://docs.rs/secrecy) is not used for storing the search
//!   user password, it probably should be

pub mod config;
pub mod entry;
pub mod error;
pub mod ldap;
pub mod record;

pub use ldap3::{self, SearchEntry};

pub use crate::{
	config::{Config, ConnectionConfig, SearchConfig, SourceConfig, TLSConfig},
	error::Error,
	ldap::{paged_search, Ldap, PagedSearchResult},
	record::{normalize, write_records, AttrValue, NormalizedRecord, Provenance},
};
