/*!
# Parser and writer configuration

Both option structs follow the same pattern: construct them with
[`Default::default()`] and adjust individual settings with the by-value
setters.

```
use staxml::{EntityDef, ParserOptions, WriterOptions};

let popts = ParserOptions::default()
	.max_buffer_size(4096)
	.entity(EntityDef::new("&copy;", "©"));
let wopts = WriterOptions::default().pretty_print(true).indent("\t");
assert_eq!(popts.max_buffer_size, 4096);
assert!(wopts.pretty_print);
```
*/

/// Default value of [`ParserOptions::max_buffer_size`].
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024;

/// A caller-supplied entity.
///
/// On the parser side, occurrences of `entity` are replaced by `value`. On the
/// writer side, occurrences of `value` are replaced by `entity`.
///
/// Entries where either side is missing (or empty) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityDef {
	/// Entity reference, with or without the surrounding `&` and `;`.
	pub entity: Option<String>,
	/// Replacement text.
	pub value: Option<String>,
}

impl EntityDef {
	/// Define an entity with both sides present.
	pub fn new<E: Into<String>, V: Into<String>>(entity: E, value: V) -> Self {
		Self {
			entity: Some(entity.into()),
			value: Some(value.into()),
		}
	}

	/// Return the normalized `(&name;, value)` pair, if both sides are
	/// usable.
	pub(crate) fn normalized(&self) -> Option<(String, &str)> {
		let entity = self.entity.as_deref()?;
		let value = self.value.as_deref()?;
		let name = entity.trim_start_matches('&').trim_end_matches(';');
		if name.is_empty() || value.is_empty() {
			return None;
		}
		Some((format!("&{};", name), value))
	}
}

/// Configuration of the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
	/// Label of the decoder used to turn bytes into text.
	///
	/// Only `utf-8` (and its alias `utf8`) is supported.
	pub decoder: String,

	/// Additional entities to decode.
	pub entities: Vec<EntityDef>,

	/// Whether to decode entities in text and attribute values.
	pub auto_decode_entities: bool,

	/// Buffer size after which unread bytes are compacted more eagerly.
	///
	/// This is not a hard limit: a single construct larger than this grows
	/// the buffer as needed.
	pub max_buffer_size: usize,

	/// Whether to move unread bytes to the start of the buffer from time to
	/// time.
	pub enable_buffer_compaction: bool,
}

impl ParserOptions {
	/// Set the [`ParserOptions::decoder`] value.
	pub fn decoder<T: Into<String>>(mut self, v: T) -> Self {
		self.decoder = v.into();
		self
	}

	/// Add an entity to [`ParserOptions::entities`].
	pub fn entity(mut self, v: EntityDef) -> Self {
		self.entities.push(v);
		self
	}

	/// Set the [`ParserOptions::auto_decode_entities`] value.
	pub fn auto_decode_entities(mut self, v: bool) -> Self {
		self.auto_decode_entities = v;
		self
	}

	/// Set the [`ParserOptions::max_buffer_size`] value.
	pub fn max_buffer_size(mut self, v: usize) -> Self {
		self.max_buffer_size = v;
		self
	}

	/// Set the [`ParserOptions::enable_buffer_compaction`] value.
	pub fn enable_buffer_compaction(mut self, v: bool) -> Self {
		self.enable_buffer_compaction = v;
		self
	}
}

impl Default for ParserOptions {
	fn default() -> Self {
		Self {
			decoder: "utf-8".to_string(),
			entities: Vec::new(),
			auto_decode_entities: true,
			max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
			enable_buffer_compaction: true,
		}
	}
}

/// Configuration of the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
	/// Encoding name written into the XML declaration.
	///
	/// Output is always UTF-8; this only affects the declaration text.
	pub encoding: String,

	/// Whether to indent nested elements.
	pub pretty_print: bool,

	/// Indentation unit used with [`WriterOptions::pretty_print`].
	pub indent: String,

	/// Additional entities to encode.
	pub entities: Vec<EntityDef>,

	/// Whether to escape text and attribute values.
	pub auto_encode_entities: bool,

	/// `(prefix, uri)` pairs declared on the first element of the document.
	///
	/// An empty prefix declares the default namespace.
	pub namespaces: Vec<(String, String)>,
}

impl WriterOptions {
	/// Set the [`WriterOptions::encoding`] value.
	pub fn encoding<T: Into<String>>(mut self, v: T) -> Self {
		self.encoding = v.into();
		self
	}

	/// Set the [`WriterOptions::pretty_print`] value.
	pub fn pretty_print(mut self, v: bool) -> Self {
		self.pretty_print = v;
		self
	}

	/// Set the [`WriterOptions::indent`] value.
	pub fn indent<T: Into<String>>(mut self, v: T) -> Self {
		self.indent = v.into();
		self
	}

	/// Add an entity to [`WriterOptions::entities`].
	pub fn entity(mut self, v: EntityDef) -> Self {
		self.entities.push(v);
		self
	}

	/// Set the [`WriterOptions::auto_encode_entities`] value.
	pub fn auto_encode_entities(mut self, v: bool) -> Self {
		self.auto_encode_entities = v;
		self
	}

	/// Add a document-level namespace declaration.
	pub fn namespace<P: Into<String>, U: Into<String>>(mut self, prefix: P, uri: U) -> Self {
		self.namespaces.push((prefix.into(), uri.into()));
		self
	}
}

impl Default for WriterOptions {
	fn default() -> Self {
		Self {
			encoding: "UTF-8".to_string(),
			pretty_print: false,
			indent: "  ".to_string(),
			entities: Vec::new(),
			auto_encode_entities: true,
			namespaces: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn entity_def_normalizes_delimiters() {
		let (a, _) = EntityDef::new("copy", "©").normalized().unwrap();
		let (b, _) = EntityDef::new("&copy;", "©").normalized().unwrap();
		assert_eq!(a, "&copy;");
		assert_eq!(a, b);
	}

	#[test]
	fn entity_def_drops_sparse_entries() {
		let e = EntityDef {
			entity: Some("&x;".to_string()),
			value: None,
		};
		assert!(e.normalized().is_none());
		let e = EntityDef {
			entity: None,
			value: Some("x".to_string()),
		};
		assert!(e.normalized().is_none());
		assert!(EntityDef::new("&;", "x").normalized().is_none());
	}

	#[test]
	fn parser_defaults() {
		let opts = ParserOptions::default();
		assert_eq!(opts.decoder, "utf-8");
		assert!(opts.auto_decode_entities);
		assert_eq!(opts.max_buffer_size, 65536);
		assert!(opts.enable_buffer_compaction);
	}

	#[test]
	fn writer_defaults() {
		let opts = WriterOptions::default();
		assert_eq!(opts.encoding, "UTF-8");
		assert!(!opts.pretty_print);
		assert!(opts.auto_encode_entities);
		assert!(opts.namespaces.is_empty());
	}
}
