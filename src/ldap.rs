//! Client for connecting to LDAP and exporting directory entries
use std::time::Duration;

use ldap3::{
	controls::{Control, ControlType, PagedResults},
	LdapConnAsync, Scope, SearchEntry,
};
use tracing::{debug, warn};

use crate::{
	config::Config,
	error::Error,
	record::{normalize, NormalizedRecord, Provenance},
};

/// Holds data and provides interface for interactions with an LDAP server.
#[derive(Debug, Clone)]
pub struct Ldap {
	/// The configuration of the LDAP client.
	config: Config,
}

/// The accumulated outcome of one paged search.
#[derive(Debug, Clone)]
pub struct PagedSearchResult {
	/// Every entry the server returned, in arrival order.
	pub entries: Vec<SearchEntry>,
	/// The number of request/response rounds performed.
	pub rounds: usize,
	/// Whether the server ignored the paging control. When set, `entries`
	/// holds whatever a single unpaged round delivered.
	pub paging_ignored: bool,
}

/// Continuation state of a paged search after one round.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageCursor {
	/// The server issued a cookie; another page must be requested.
	More(Vec<u8>),
	/// The result set is exhausted.
	Exhausted,
}

/// Read the paged results response control out of one round's response
/// controls. Returns `None` when the server sent no such control. A
/// control without a value or with an empty cookie both mean the search
/// is exhausted.
fn page_cursor(ctrls: &[Control]) -> Option<PageCursor> {
	let raw = ctrls.iter().find_map(|ctrl| match ctrl {
		Control(Some(ControlType::PagedResults), raw) => Some(raw),
		_ => None,
	})?;
	if raw.val.is_none() {
		return Some(PageCursor::Exhausted);
	}
	let response: PagedResults = raw.parse();
	if response.cookie.is_empty() {
		Some(PageCursor::Exhausted)
	} else {
		Some(PageCursor::More(response.cookie))
	}
}

/// Fetch every entry matching `filter` below `base`, transparently
/// resuming the search across pages with the simple paged results control
/// ([RFC 2696]).
///
/// `attrs` restricts which attributes the server returns; `None` requests
/// all of them. `page_size` is fixed for the whole search and the cookie
/// is only ever fed back into the search that issued it. The optional
/// `timeout` applies per round; exceeding it aborts the entire operation.
/// Any protocol error discards all partial results. A server that ignores
/// the paging control yields a warning and whatever the single round
/// returned.
///
/// The session's bind state is left untouched and the session is not
/// closed; its lifecycle belongs to the caller.
///
/// [RFC 2696]: https://www.rfc-editor.org/rfc/rfc2696.html
pub async fn paged_search(
	ldap: &mut ldap3::Ldap,
	base: &str,
	filter: &str,
	attrs: Option<&[String]>,
	page_size: i32,
	timeout: Option<Duration>,
) -> Result<PagedSearchResult, Error> {
	let attrs = attrs.map_or_else(|| vec!["*".to_owned()], <[String]>::to_vec);
	let mut entries = Vec::new();
	let mut rounds = 0;
	let mut cookie = Vec::new();

	loop {
		if let Some(timeout) = timeout {
			ldap.with_timeout(timeout);
		}
		let (page, res) = ldap
			.with_controls(PagedResults { size: page_size, cookie })
			.search(base, Scope::Subtree, filter, attrs.clone())
			.await?
			.success()?;
		rounds += 1;
		entries.extend(page.into_iter().map(SearchEntry::construct));

		match page_cursor(&res.ctrls) {
			Some(PageCursor::More(next)) => {
				debug!(rounds, entries = entries.len(), "Requesting next page");
				cookie = next;
			}
			Some(PageCursor::Exhausted) => {
				return Ok(PagedSearchResult { entries, rounds, paging_ignored: false });
			}
			None => {
				warn!("Server ignores the simple paged results control");
				return Ok(PagedSearchResult { entries, rounds, paging_ignored: true });
			}
		}
	}
}

impl Ldap {
	/// Create a new [`Ldap`] client with the given configuration.
	#[must_use]
	pub fn new(config: Config) -> Self {
		Ldap { config }
	}

	/// Create a connection to an ldap server based on the settings and url
	/// specified in the configuration.
	async fn connect(&self) -> Result<(LdapConnAsync, ldap3::Ldap), Error> {
		let settings = self.config.connection.to_settings().await?;
		let (conn, ldap) =
			LdapConnAsync::from_url_with_settings(settings, &self.config.url).await?;
		Ok((conn, ldap))
	}

	/// Run one complete export: bind, fetch every entry matching the
	/// configured filter, and normalize the results. The session created
	/// for the run is released before returning, whether the search
	/// succeeded or not.
	pub async fn export(&self) -> Result<Vec<NormalizedRecord>, Error> {
		let (conn, mut ldap) = self.connect().await?;
		let conn = tokio::spawn(async move {
			if let Err(err) = conn.drive().await {
				warn!("Ldap connection error {err}");
			}
		});

		ldap.simple_bind(&self.config.search_user, &self.config.search_password)
			.await?
			.success()?;

		let result = paged_search(
			&mut ldap,
			&self.config.search.base,
			&self.config.search.filter,
			self.config.search.attributes.as_deref(),
			self.config.search.page_size,
			Some(self.config.connection.operation_timeout),
		)
		.await;

		ldap.unbind().await?;
		if let Err(err) = conn.await {
			warn!("Failed to join background task: {err}");
		}

		Ok(normalize(&result?.entries, &self.provenance()))
	}

	/// Provenance metadata identifying this run's source directory.
	fn provenance(&self) -> Provenance {
		let datasource = self.config.url.host_str().unwrap_or_default().to_owned();
		Provenance::new(
			datasource,
			self.config.source.source_type.clone(),
			self.config.source.source_value.clone(),
		)
	}
}
