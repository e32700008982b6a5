/*!
# Named entity codec

The parser decodes entity references in text and attribute values with an
[`EntityDecoder`]; the writer escapes text and attribute values with an
[`EntityEncoder`]. Both know the five predefined XML entities and any
caller-supplied [`EntityDef`]s.

Character references (`&#...;`) are not expanded; unknown references pass
through unchanged.

```
use staxml::entities::{EntityDecoder, EntityEncoder};

let enc = EntityEncoder::new(&[], true);
let dec = EntityDecoder::new(&[]);
let original = "5 < 10 & 20 > 15 \"q\" 'a'";
let encoded = enc.encode(original);
assert_eq!(encoded, "5 &lt; 10 &amp; 20 &gt; 15 &quot;q&quot; &apos;a&apos;");
assert_eq!(dec.decode(&encoded), original);
```
*/
use std::borrow::Cow;
use std::collections::HashMap;

use log::debug;
use memchr::{memchr, memchr2, memchr3};

use crate::options::EntityDef;

/// The predefined entities, in decoding order. `&amp;` comes last.
pub const PREDEFINED: [(&str, &str); 5] = [
	("&lt;", "<"),
	("&gt;", ">"),
	("&quot;", "\""),
	("&apos;", "'"),
	("&amp;", "&"),
];

const AMP: &str = "&amp;";

fn encode_special(b: u8) -> Option<&'static str> {
	match b {
		b'&' => Some("&amp;"),
		b'<' => Some("&lt;"),
		b'>' => Some("&gt;"),
		b'"' => Some("&quot;"),
		b'\'' => Some("&apos;"),
		_ => None,
	}
}

fn usable_overrides(defs: &[EntityDef]) -> impl Iterator<Item = (String, &str)> {
	defs.iter().filter_map(|def| {
		let pair = def.normalized();
		if pair.is_none() {
			debug!("ignoring incomplete entity definition {:?}", def);
		}
		pair
	})
}

/// Entity-to-text replacement table used by the parser.
#[derive(Debug, Clone)]
pub struct EntityDecoder {
	// ordered as they are applied; `&amp;` is always the final entry
	table: Vec<(String, String)>,
	index: HashMap<String, usize>,
}

impl EntityDecoder {
	/// Build a decoder from the predefined entities plus `overrides`.
	///
	/// Overrides may replace the replacement text of `&lt;`, `&gt;`,
	/// `&quot;` and `&apos;`, but not of `&amp;`.
	pub fn new(overrides: &[EntityDef]) -> Self {
		let mut result = Self {
			table: Vec::with_capacity(PREDEFINED.len() + overrides.len()),
			index: HashMap::new(),
		};
		for (entity, value) in PREDEFINED[..4].iter() {
			result.insert(entity.to_string(), value.to_string());
		}
		for (entity, value) in usable_overrides(overrides) {
			if entity == AMP {
				debug!("ignoring override of {}", AMP);
				continue;
			}
			result.insert(entity, value.to_string());
		}
		result.insert(AMP.to_string(), "&".to_string());
		result
	}

	fn insert(&mut self, entity: String, value: String) {
		match self.index.get(&entity) {
			Some(&i) => self.table[i].1 = value,
			None => {
				self.index.insert(entity.clone(), self.table.len());
				self.table.push((entity, value));
			}
		}
	}

	/// Look up the replacement text of a complete entity reference
	/// (including `&` and `;`).
	pub fn lookup(&self, entity: &str) -> Option<&str> {
		self.index.get(entity).map(|&i| self.table[i].1.as_str())
	}

	/// Iterate over the `(entity, replacement)` pairs in application order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.table.iter().map(|(e, v)| (e.as_str(), v.as_str()))
	}

	/// Replace all known entity references in `s`.
	///
	/// This is a single left-to-right pass: replacement text is never
	/// scanned again, so `&amp;lt;` decodes to `&lt;`.
	pub fn decode<'a>(&self, s: &'a str) -> Cow<'a, str> {
		let bytes = s.as_bytes();
		let mut pos = match memchr(b'&', bytes) {
			None => return Cow::Borrowed(s),
			Some(p) => p,
		};
		let mut out = String::with_capacity(s.len());
		let mut last = 0;
		while let Some(off) = memchr(b'&', &bytes[pos..]) {
			let amp = pos + off;
			let tail = &bytes[amp + 1..];
			match memchr2(b';', b'&', tail) {
				Some(n) if tail[n] == b';' => {
					let end = amp + n + 2;
					if let Some(replacement) = self.lookup(&s[amp..end]) {
						out.push_str(&s[last..amp]);
						out.push_str(replacement);
						last = end;
						pos = end;
					} else {
						pos = amp + 1;
					}
				}
				Some(n) => pos = amp + 1 + n,
				None => break,
			}
		}
		out.push_str(&s[last..]);
		Cow::Owned(out)
	}
}

impl Default for EntityDecoder {
	fn default() -> Self {
		Self::new(&[])
	}
}

/// Text-to-entity escaping table used by the writer.
#[derive(Debug, Clone)]
pub struct EntityEncoder {
	// literal -> entity, longest literal first
	overrides: Vec<(String, String)>,
	enabled: bool,
}

impl EntityEncoder {
	/// Build an encoder from the predefined entities plus `overrides`.
	///
	/// If `enabled` is false, [`EntityEncoder::encode`] returns its input
	/// unchanged.
	pub fn new(overrides: &[EntityDef], enabled: bool) -> Self {
		let mut table: Vec<(String, String)> = usable_overrides(overrides)
			.map(|(entity, value)| (value.to_string(), entity))
			.collect();
		table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
		Self {
			overrides: table,
			enabled,
		}
	}

	/// Whether escaping is enabled.
	pub fn enabled(&self) -> bool {
		self.enabled
	}

	fn needs_escape(&self, s: &str) -> bool {
		let bytes = s.as_bytes();
		memchr3(b'<', b'>', b'&', bytes).is_some()
			|| memchr2(b'"', b'\'', bytes).is_some()
			|| self
				.overrides
				.iter()
				.any(|(literal, _)| s.contains(literal.as_str()))
	}

	/// Escape `s`.
	///
	/// `&` is escaped before anything else is considered, so the `&` of an
	/// inserted entity is never escaped again.
	pub fn encode<'a>(&self, s: &'a str) -> Cow<'a, str> {
		if !self.enabled || !self.needs_escape(s) {
			return Cow::Borrowed(s);
		}
		let bytes = s.as_bytes();
		let mut out = String::with_capacity(s.len() + s.len() / 8);
		let mut last = 0;
		let mut i = 0;
		'outer: while i < s.len() {
			let rest = &s[i..];
			for (literal, entity) in self.overrides.iter() {
				if rest.starts_with(literal.as_str()) {
					out.push_str(&s[last..i]);
					out.push_str(entity);
					i += literal.len();
					last = i;
					continue 'outer;
				}
			}
			if let Some(entity) = encode_special(bytes[i]) {
				out.push_str(&s[last..i]);
				out.push_str(entity);
				i += 1;
				last = i;
				continue;
			}
			i += rest.chars().next().map_or(1, char::len_utf8);
		}
		out.push_str(&s[last..]);
		Cow::Owned(out)
	}
}

impl Default for EntityEncoder {
	fn default() -> Self {
		Self::new(&[], true)
	}
}
