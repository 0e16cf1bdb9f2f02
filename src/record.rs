//! Normalized output records and their JSON serialization.
use std::{collections::BTreeMap, io::Write};

use ldap3::SearchEntry;
use serde::{ser::SerializeMap, Serialize, Serializer};
use time::OffsetDateTime;

use crate::{
	entry::{decode_guid, decode_sid, lossy_value, split_mail, DecodeRule},
	error::Error,
};

/// Metadata describing the origin of one export run. Injected identically
/// into every record the run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
	/// Host the data was extracted from.
	pub datasource: String,
	/// The type of source the data is coming from.
	pub datasource_type: String,
	/// Specific value for the source type. Used to distinguish between data
	/// of the same source type.
	pub datasource_value: String,
	/// Wall-clock moment of the run, as a unix timestamp string.
	pub extract_time: String,
}

impl Provenance {
	/// Provenance stamped with the current time.
	#[must_use]
	pub fn new(datasource: String, datasource_type: String, datasource_value: String) -> Self {
		let extract_time = OffsetDateTime::now_utc().unix_timestamp().to_string();
		Self::with_extract_time(datasource, datasource_type, datasource_value, extract_time)
	}

	/// Provenance with a caller-supplied extraction timestamp.
	#[must_use]
	pub fn with_extract_time(
		datasource: String,
		datasource_type: String,
		datasource_value: String,
		extract_time: String,
	) -> Self {
		Provenance { datasource, datasource_type, datasource_value, extract_time }
	}
}

/// A decoded attribute value: a lone string or an ordered sequence of
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
	/// The attribute decoded to exactly one string.
	Single(String),
	/// The attribute decoded to several strings, order preserved.
	Multi(Vec<String>),
}

/// One directory object, normalized for downstream ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
	/// Run provenance, identical across one export.
	pub provenance: Provenance,
	/// Decoded attributes, keyed by attribute name as the server returned
	/// it.
	pub fields: BTreeMap<String, AttrValue>,
}

impl Serialize for NormalizedRecord {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		/// A borrowed provenance or attribute value.
		#[derive(Serialize)]
		#[serde(untagged)]
		enum Field<'a> {
			/// A provenance string.
			Str(&'a str),
			/// A decoded attribute value.
			Value(&'a AttrValue),
		}

		// Provenance keys first so a directory attribute of the same name
		// takes precedence, then everything in sorted key order.
		let mut sorted = BTreeMap::new();
		sorted.insert("datasource", Field::Str(&self.provenance.datasource));
		sorted.insert("datasource_type", Field::Str(&self.provenance.datasource_type));
		sorted.insert("datasource_value", Field::Str(&self.provenance.datasource_value));
		sorted.insert("extractTime", Field::Str(&self.provenance.extract_time));
		for (name, value) in &self.fields {
			sorted.insert(name.as_str(), Field::Value(value));
		}

		let mut map = serializer.serialize_map(Some(sorted.len()))?;
		for (key, value) in sorted {
			map.serialize_entry(key, &value)?;
		}
		map.end()
	}
}

impl NormalizedRecord {
	/// Serialize this record as one JSON object with sorted keys and
	/// four-space indentation, followed by a newline.
	pub fn write_json<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
		let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
		let mut serializer = serde_json::Serializer::with_formatter(&mut *writer, formatter);
		self.serialize(&mut serializer)?;
		writer.write_all(b"\n")?;
		Ok(())
	}
}

/// Write a batch of records to a sink, one JSON object per record.
pub fn write_records<W: Write>(writer: &mut W, records: &[NormalizedRecord]) -> Result<(), Error> {
	for record in records {
		record.write_json(writer)?;
	}
	Ok(())
}

/// Normalize a batch of raw entries. Every entry yields exactly one record
/// carrying the given provenance; the transformation is pure and
/// deterministic for a fixed extraction timestamp.
#[must_use]
pub fn normalize(entries: &[SearchEntry], provenance: &Provenance) -> Vec<NormalizedRecord> {
	entries.iter().map(|entry| normalize_entry(entry, provenance)).collect()
}

/// Decode one entry's attributes into a record.
///
/// `ldap3` delivers an attribute in `attrs` when every value is valid
/// UTF-8 and in `bin_attrs` otherwise, which is exactly the strict/degraded
/// split the default text rule needs.
fn normalize_entry(entry: &SearchEntry, provenance: &Provenance) -> NormalizedRecord {
	let mut fields = BTreeMap::new();

	for (name, values) in &entry.attrs {
		let decoded = match DecodeRule::for_attribute(name) {
			DecodeRule::Guid => decode_values(values.iter().map(String::as_bytes), decode_guid),
			DecodeRule::Sid => decode_values(values.iter().map(String::as_bytes), decode_sid),
			DecodeRule::Mail => {
				collapse(values.iter().flat_map(|value| split_mail(value.as_bytes())).collect())
			}
			DecodeRule::Text => collapse(values.clone()),
		};
		fields.insert(name.clone(), decoded);
	}

	for (name, values) in &entry.bin_attrs {
		let decoded = match DecodeRule::for_attribute(name) {
			DecodeRule::Guid => decode_values(values.iter().map(Vec::as_slice), decode_guid),
			DecodeRule::Sid => decode_values(values.iter().map(Vec::as_slice), decode_sid),
			DecodeRule::Mail => {
				collapse(values.iter().flat_map(|value| split_mail(value)).collect())
			}
			// Strict text decoding failed for at least one value. Emit one
			// combined best-effort rendering of the whole value list; the
			// shape change from sequence to string is kept for
			// compatibility with existing consumers.
			DecodeRule::Text => AttrValue::Single(combined_lossy(values)),
		};
		fields.insert(name.clone(), decoded);
	}

	NormalizedRecord { provenance: provenance.clone(), fields }
}

/// Run `decode` over every raw value, falling back to a permissive text
/// rendering for values the decoder rejects. A fault in one value never
/// affects its siblings.
fn decode_values<'a>(
	values: impl Iterator<Item = &'a [u8]>,
	decode: fn(&[u8]) -> Option<String>,
) -> AttrValue {
	collapse(values.map(|raw| decode(raw).unwrap_or_else(|| lossy_value(raw))).collect())
}

/// Exactly one decoded string stays a lone string; anything else is an
/// ordered sequence.
fn collapse(mut decoded: Vec<String>) -> AttrValue {
	if decoded.len() == 1 {
		AttrValue::Single(decoded.remove(0))
	} else {
		AttrValue::Multi(decoded)
	}
}

/// Single textual rendering of an entire undecodable value list.
fn combined_lossy(values: &[Vec<u8>]) -> String {
	let rendered: Vec<_> = values.iter().map(|raw| String::from_utf8_lossy(raw)).collect();
	format!("{rendered:?}")
}
