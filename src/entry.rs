//! Decoding of raw attribute values into canonical text.
use tracing::debug;
use uuid::Uuid;

/// The attribute whose values hold binary object GUIDs.
pub const GUID_ATTRIBUTE: &str = "objectGUID";
/// The attribute whose values hold binary security identifiers.
pub const SID_ATTRIBUTE: &str = "objectSid";
/// The attribute whose values hold mail addresses.
pub const MAIL_ATTRIBUTE: &str = "mail";

/// How the values of one attribute are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRule {
	/// A 16-byte object GUID, rendered in canonical hyphenated form.
	Guid,
	/// A binary security identifier, rendered as `S-1-...`.
	Sid,
	/// Mail addresses. One raw value may pack several comma-separated
	/// addresses.
	Mail,
	/// Plain text.
	Text,
}

impl DecodeRule {
	/// Select the decode rule for an attribute. Names are matched exactly
	/// as the server returned them.
	#[must_use]
	pub fn for_attribute(name: &str) -> Self {
		match name {
			GUID_ATTRIBUTE => DecodeRule::Guid,
			SID_ATTRIBUTE => DecodeRule::Sid,
			MAIL_ATTRIBUTE => DecodeRule::Mail,
			_ => DecodeRule::Text,
		}
	}
}

/// Decode one object GUID value to its hyphenated lowercase form.
/// Returns `None` unless the value is exactly 16 bytes.
#[must_use]
pub fn decode_guid(raw: &[u8]) -> Option<String> {
	Uuid::from_slice(raw).ok().map(|uuid| uuid.to_string())
}

/// Decode one binary security identifier to its `S-R-A-S1-...-Sn` string
/// form.
///
/// Layout: revision (1 byte, must be 1), sub-authority count `N` (1 byte),
/// authority (6 bytes, big-endian), then exactly `N` little-endian `u32`
/// sub-authority groups. Returns `None` on any layout violation.
#[must_use]
pub fn decode_sid(raw: &[u8]) -> Option<String> {
	let (&revision, rest) = raw.split_first()?;
	if revision != 1 {
		debug!(revision, "Unexpected SID revision");
		return None;
	}
	let (&count, rest) = rest.split_first()?;
	if rest.len() != 6 + 4 * usize::from(count) {
		return None;
	}

	let mut authority = [0_u8; 8];
	authority[2..].copy_from_slice(&rest[..6]);
	let authority = u64::from_be_bytes(authority);

	let mut sid = format!("S-{revision}-{authority}");
	for group in rest[6..].chunks_exact(4) {
		let sub = u32::from_le_bytes([group[0], group[1], group[2], group[3]]);
		sid.push('-');
		sid.push_str(&sub.to_string());
	}
	Some(sid)
}

/// Split one mail attribute value into its comma-separated addresses,
/// trimming surrounding whitespace. Input that is not valid UTF-8 is
/// decoded permissively before splitting.
#[must_use]
pub fn split_mail(raw: &[u8]) -> Vec<String> {
	String::from_utf8_lossy(raw).split(',').map(|addr| addr.trim().to_owned()).collect()
}

/// Best-effort text rendering of a raw value whose decode rule failed.
#[must_use]
pub fn lossy_value(raw: &[u8]) -> String {
	String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use super::{decode_guid, decode_sid, split_mail, DecodeRule};

	/// Build a SID byte value from its parts.
	fn sid_bytes(revision: u8, authority: u64, subauthorities: &[u32]) -> Vec<u8> {
		let mut raw = vec![revision, subauthorities.len() as u8];
		raw.extend_from_slice(&authority.to_be_bytes()[2..]);
		for sub in subauthorities {
			raw.extend_from_slice(&sub.to_le_bytes());
		}
		raw
	}

	#[test]
	fn sid_round_trip() {
		let raw = sid_bytes(1, 5, &[21, 100, 200, 1001]);
		assert_eq!(decode_sid(&raw).unwrap(), "S-1-5-21-100-200-1001");
	}

	#[test]
	fn sid_no_subauthorities() {
		let raw = sid_bytes(1, 5, &[]);
		assert_eq!(decode_sid(&raw).unwrap(), "S-1-5");
	}

	#[test]
	fn sid_large_values() {
		// 48-bit authority and u32::MAX sub-authority must not wrap.
		let raw = sid_bytes(1, 0x0000_FFFF_FFFF_FFFF, &[u32::MAX]);
		assert_eq!(decode_sid(&raw).unwrap(), "S-1-281474976710655-4294967295");
	}

	#[test]
	fn sid_bad_revision() {
		let raw = sid_bytes(2, 5, &[21]);
		assert_eq!(decode_sid(&raw), None);
	}

	#[test]
	fn sid_length_mismatch() {
		// Count says four sub-authorities, body carries three.
		let mut raw = sid_bytes(1, 5, &[21, 100, 200]);
		raw[1] = 4;
		assert_eq!(decode_sid(&raw), None);

		assert_eq!(decode_sid(&[]), None, "empty value");
		assert_eq!(decode_sid(&[1]), None, "header only");
		assert_eq!(decode_sid(&[1, 0, 0, 0]), None, "truncated authority");
	}

	#[test]
	fn guid_canonical_form() {
		let raw: [u8; 16] = [
			0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
			0xEE, 0xFF,
		];
		assert_eq!(decode_guid(&raw).unwrap(), "00112233-4455-6677-8899-aabbccddeeff");
	}

	#[test]
	fn guid_wrong_length() {
		assert_eq!(decode_guid(&[0_u8; 15]), None);
		assert_eq!(decode_guid(&[0_u8; 17]), None);
	}

	#[test]
	fn mail_packed_values() {
		assert_eq!(split_mail(b"a@x.com, b@x.com"), ["a@x.com", "b@x.com"]);
		assert_eq!(split_mail(b"solo@x.com"), ["solo@x.com"]);
		assert_eq!(split_mail(b"  padded@x.com  "), ["padded@x.com"]);
	}

	#[test]
	fn mail_invalid_utf8() {
		let decoded = split_mail(b"ok@x.com,\xFF\xFE");
		assert_eq!(decoded[0], "ok@x.com");
		assert_eq!(decoded[1], "\u{FFFD}\u{FFFD}");
	}

	#[test]
	fn rule_dispatch_is_case_sensitive() {
		assert_eq!(DecodeRule::for_attribute("objectGUID"), DecodeRule::Guid);
		assert_eq!(DecodeRule::for_attribute("objectSid"), DecodeRule::Sid);
		assert_eq!(DecodeRule::for_attribute("mail"), DecodeRule::Mail);
		assert_eq!(DecodeRule::for_attribute("objectguid"), DecodeRule::Text);
		assert_eq!(DecodeRule::for_attribute("cn"), DecodeRule::Text);
	}
}
