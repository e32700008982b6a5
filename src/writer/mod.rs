/*!
# Writer for XML documents

The [`Encoder`] is a state machine which turns a sequence of write calls
into XML text. It writes into any [`bytes::BufMut`] and never does I/O
itself; [`AsyncWriter`] couples it to a [`tokio::io::AsyncWrite`] sink.

Calls are validated before anything is written. A rejected call leaves both
the encoder and the output untouched, but the encoder does not roll back
calls which were accepted: a document abandoned halfway is not
well-formed.
*/
use bytes::BufMut;
use log::trace;

use crate::entities::EntityEncoder;
use crate::error::{ConstructError, NamespaceError, Result, StateError};
use crate::event::Event;
use crate::namespaces::{
	declared_prefix, split_qname, NamespaceScope, ScopeStack, PREFIX_XMLNS,
};
use crate::options::WriterOptions;

#[cfg(feature = "async")]
mod sink;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use sink::AsyncWriter;

/// States of the [`Encoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
	/// Nothing has been written yet.
	Initial,
	/// A start tag is open and accepts attributes and namespace
	/// declarations.
	ElementHead,
	/// The start tag of the innermost element has been closed.
	InsideElement,
	/// A complete piece of markup (or the XML declaration) was written last.
	AfterElement,
	/// The document has been ended.
	Closed,
	/// The output sink failed.
	Error,
}

/// Options for [`Encoder::start_element()`].
///
/// ```
/// use staxml::ElementOptions;
///
/// let opts = ElementOptions::default()
/// 	.prefix("h")
/// 	.uri("urn:example:h")
/// 	.attribute("id", "1")
/// 	.self_closing(true);
/// assert_eq!(opts.attributes.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementOptions {
	/// Prefix of the element name.
	pub prefix: Option<String>,

	/// Namespace URI of the element.
	///
	/// If the prefix (or the default namespace, without prefix) is not
	/// already bound to this URI, a declaration is written on the element.
	pub uri: Option<String>,

	/// Attributes as `(qualified name, value)` pairs, written in order.
	///
	/// `xmlns` and `xmlns:p` entries declare namespaces for the element.
	pub attributes: Vec<(String, String)>,

	/// Write the element as `<name/>` and return to the parent immediately.
	pub self_closing: bool,
}

impl ElementOptions {
	/// Set the [`ElementOptions::prefix`] value.
	pub fn prefix<T: Into<String>>(mut self, v: T) -> Self {
		self.prefix = Some(v.into());
		self
	}

	/// Set the [`ElementOptions::uri`] value.
	pub fn uri<T: Into<String>>(mut self, v: T) -> Self {
		self.uri = Some(v.into());
		self
	}

	/// Append an attribute to [`ElementOptions::attributes`].
	pub fn attribute<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
		self.attributes.push((name.into(), value.into()));
		self
	}

	/// Set the [`ElementOptions::self_closing`] value.
	pub fn self_closing(mut self, v: bool) -> Self {
		self.self_closing = v;
		self
	}
}

struct Frame {
	qname: String,
	had_text: bool,
}

fn decl_name(prefix: &str) -> String {
	if prefix.is_empty() {
		PREFIX_XMLNS.to_string()
	} else {
		qualify(Some(PREFIX_XMLNS), prefix)
	}
}

/// Check an attribute against the attributes of the same start tag.
///
/// Returns `false` if it repeats a namespace declaration with the same URI,
/// in which case it must be skipped.
fn check_unique(head: &[(String, String)], qname: &str, value: &str) -> Result<bool> {
	let existing = match head.iter().find(|(k, _)| k == qname) {
		Some((_, existing)) => existing,
		None => return Ok(true),
	};
	match declared_prefix(qname) {
		Some(_) if existing == value => Ok(false),
		Some(prefix) => Err(NamespaceError::ConflictingDeclaration {
			prefix: prefix.to_string(),
			uri: value.to_string(),
		}
		.into()),
		None => Err(ConstructError::DuplicateAttribute(qname.to_string()).into()),
	}
}

fn check_terminator(
	s: &str,
	construct: &'static str,
	sequence: &'static str,
) -> std::result::Result<(), ConstructError> {
	if s.contains(sequence) {
		Err(ConstructError::ForbiddenSequence {
			construct,
			sequence,
		})
	} else {
		Ok(())
	}
}

fn qualify(prefix: Option<&str>, local_name: &str) -> String {
	match prefix {
		Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local_name),
		_ => local_name.to_string(),
	}
}

/**
Encodes XML into buffers.

Encoders are stateful. They can only be used to encode a single XML
document and have then to be disposed.

```rust
use staxml::{ElementOptions, Encoder};
use bytes::BytesMut;

let mut enc = Encoder::new();
let mut buf = BytesMut::new();
enc.start_document("1.0", None, &mut buf).unwrap();
enc.start_element("greeting", ElementOptions::default().attribute("lang", "en"), &mut buf).unwrap();
enc.characters("1 < 2", &mut buf).unwrap();
enc.end_element(&mut buf).unwrap();
enc.end_document(&mut buf).unwrap();
assert_eq!(
	&buf[..],
	&b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><greeting lang=\"en\">1 &lt; 2</greeting>"[..],
);
```
*/
pub struct Encoder {
	state: EncoderState,
	frames: Vec<Frame>,
	scopes: ScopeStack,
	entities: EntityEncoder,
	encoding: String,
	pretty: bool,
	indent: String,
	// pending document-level namespace declarations
	doc_namespaces: Option<Vec<(String, String)>>,
	// attributes of the open start tag
	head: Vec<(String, String)>,
	written: bool,
}

impl Encoder {
	/// Create a new encoder with default options.
	pub fn new() -> Self {
		Self::with_options(WriterOptions::default())
	}

	/// Create a new encoder with the given options.
	pub fn with_options(opts: WriterOptions) -> Self {
		let doc_namespaces = if opts.namespaces.is_empty() {
			None
		} else {
			Some(opts.namespaces)
		};
		Self {
			state: EncoderState::Initial,
			frames: Vec::new(),
			scopes: ScopeStack::new(),
			entities: EntityEncoder::new(&opts.entities, opts.auto_encode_entities),
			encoding: opts.encoding,
			pretty: opts.pretty_print,
			indent: opts.indent,
			doc_namespaces,
			head: Vec::new(),
			written: false,
		}
	}

	/// The current state.
	pub fn state(&self) -> EncoderState {
		self.state
	}

	/// Number of open elements.
	pub fn depth(&self) -> usize {
		self.frames.len()
	}

	/// Namespace bindings in effect for the innermost open element.
	pub fn scope(&self) -> &NamespaceScope {
		self.scopes.current()
	}

	/// Mark the encoder as failed.
	///
	/// All further calls return [`StateError::Failed`].
	pub fn poison(&mut self) {
		self.state = EncoderState::Error;
	}

	fn check_usable(&self) -> std::result::Result<(), StateError> {
		match self.state {
			EncoderState::Closed => Err(StateError::Closed),
			EncoderState::Error => Err(StateError::Failed),
			_ => Ok(()),
		}
	}

	fn check_in_head(&self) -> std::result::Result<(), StateError> {
		self.check_usable()?;
		match self.state {
			EncoderState::ElementHead => Ok(()),
			_ => Err(StateError::AttributeNotAllowed),
		}
	}

	fn put<O: BufMut>(&mut self, output: &mut O, data: &str) {
		output.put_slice(data.as_bytes());
		self.written = true;
	}

	fn put_escaped<O: BufMut>(&mut self, output: &mut O, data: &str) {
		let escaped = self.entities.encode(data);
		output.put_slice(escaped.as_bytes());
		self.written = true;
	}

	fn put_attribute<O: BufMut>(&mut self, output: &mut O, qname: &str, value: &str) {
		output.put_u8(b' ');
		output.put_slice(qname.as_bytes());
		output.put_slice(b"=\"");
		self.put_escaped(output, value);
		output.put_u8(b'"');
	}

	/// Close an open start tag, so that content can follow.
	fn enter_content<O: BufMut>(&mut self, output: &mut O) {
		match self.state {
			EncoderState::ElementHead => {
				output.put_u8(b'>');
				self.state = EncoderState::InsideElement;
			}
			EncoderState::Initial => self.state = EncoderState::AfterElement,
			_ => (),
		}
	}

	/// Write the line break and indentation in front of a markup token.
	fn indent_markup<O: BufMut>(&mut self, output: &mut O) {
		if !self.pretty || !self.written {
			return;
		}
		if self.frames.last().map_or(false, |f| f.had_text) {
			return;
		}
		self.newline(output, self.frames.len());
	}

	fn newline<O: BufMut>(&self, output: &mut O, depth: usize) {
		output.put_u8(b'\n');
		for _ in 0..depth {
			output.put_slice(self.indent.as_bytes());
		}
	}

	fn mark_text(&mut self) {
		if let Some(frame) = self.frames.last_mut() {
			frame.had_text = true;
		}
	}

	/// Write the XML declaration.
	///
	/// `encoding` defaults to [`WriterOptions::encoding`]. Only allowed as
	/// the very first call.
	pub fn start_document<O: BufMut>(
		&mut self,
		version: &str,
		encoding: Option<&str>,
		output: &mut O,
	) -> Result<()> {
		self.check_usable()?;
		if self.state != EncoderState::Initial {
			return Err(StateError::MisplacedStartDocument.into());
		}
		let encoding = encoding.unwrap_or(self.encoding.as_str()).to_string();
		let decl = format!("<?xml version=\"{}\" encoding=\"{}\"?>", version, encoding);
		self.put(output, &decl);
		self.state = EncoderState::AfterElement;
		Ok(())
	}

	/// Start an element.
	///
	/// Closes the start tag of the parent element if it is still open.
	/// Prefixed attribute names in `opts.attributes` must use a prefix
	/// which is bound at this point, or which is declared by the
	/// element itself.
	///
	/// Every namespace is declared at most once per start tag: a repeated
	/// declaration of the same URI is skipped, one with a different URI is
	/// a [`NamespaceError::ConflictingDeclaration`]. This covers
	/// declarations implied by `opts.uri` and [`WriterOptions::namespaces`].
	pub fn start_element<O: BufMut>(
		&mut self,
		local_name: &str,
		opts: ElementOptions,
		output: &mut O,
	) -> Result<()> {
		self.check_usable()?;
		let prefix = opts.prefix.as_deref().filter(|p| !p.is_empty());

		let mut head: Vec<(String, String)> = Vec::new();
		for (p, u) in self.doc_namespaces.iter().flatten() {
			let qname = decl_name(p);
			if check_unique(&head, &qname, u)? {
				head.push((qname, u.clone()));
			}
		}
		if let Some(uri) = opts.uri.as_deref() {
			let key = prefix.unwrap_or("");
			let own = head
				.iter()
				.chain(opts.attributes.iter())
				.find(|(k, _)| declared_prefix(k) == Some(key))
				.map(|(_, u)| u.as_str());
			if own.or_else(|| self.scopes.current().get(key)) != Some(uri) {
				let qname = decl_name(key);
				if check_unique(&head, &qname, uri)? {
					head.push((qname, uri.to_string()));
				}
			}
		}
		for (k, v) in opts.attributes.iter() {
			if check_unique(&head, k, v)? {
				head.push((k.clone(), v.clone()));
			}
		}
		let scope = self.scopes.derive(
			head.iter()
				.filter_map(|(k, v)| declared_prefix(k).map(|p| (p, v.as_str()))),
		);
		for (key, _) in head.iter() {
			if let (Some(p), local) = split_qname(key) {
				if p != PREFIX_XMLNS && !scope.is_declared(p) {
					return Err(NamespaceError::UndeclaredPrefix {
						prefix: p.to_string(),
						attribute: local.to_string(),
					}
					.into());
				}
			}
		}

		// validated, write
		self.doc_namespaces = None;
		self.enter_content(output);
		self.indent_markup(output);
		let qname = qualify(prefix, local_name);
		trace!("writing start tag <{}>", qname);
		output.put_u8(b'<');
		self.put(output, &qname);
		for (k, v) in head.iter() {
			self.put_attribute(output, k, v);
		}
		if opts.self_closing {
			output.put_slice(b"/>");
			self.state = EncoderState::AfterElement;
		} else {
			self.frames.push(Frame {
				qname,
				had_text: false,
			});
			self.scopes.push(scope);
			self.head = head;
			self.state = EncoderState::ElementHead;
		}
		Ok(())
	}

	/// Add an attribute to the open start tag.
	///
	/// A `prefix` must be bound on the element or one of its ancestors. The
	/// `xmlns` prefix declares a namespace instead, like
	/// [`Encoder::namespace()`].
	///
	/// An attribute name may occur only once per start tag. Namespace
	/// declarations follow the rules of [`Encoder::start_element()`].
	pub fn attribute<O: BufMut>(
		&mut self,
		local_name: &str,
		value: &str,
		prefix: Option<&str>,
		output: &mut O,
	) -> Result<()> {
		self.check_in_head()?;
		let qname = qualify(prefix, local_name);
		if !check_unique(&self.head, &qname, value)? {
			return Ok(());
		}
		match prefix.filter(|p| !p.is_empty()) {
			Some(PREFIX_XMLNS) => {
				self.scopes.current_mut().declare(local_name, value);
			}
			Some(p) => {
				if !self.scopes.current().is_declared(p) {
					return Err(NamespaceError::UndeclaredPrefix {
						prefix: p.to_string(),
						attribute: local_name.to_string(),
					}
					.into());
				}
			}
			None if local_name == PREFIX_XMLNS => {
				self.scopes.current_mut().declare("", value);
			}
			None => (),
		}
		self.put_attribute(output, &qname, value);
		self.head.push((qname, value.to_string()));
		Ok(())
	}

	/// Declare a namespace on the open start tag.
	///
	/// An empty `prefix` declares the default namespace. Declaring a prefix
	/// again with the same URI writes nothing.
	pub fn namespace<O: BufMut>(&mut self, prefix: &str, uri: &str, output: &mut O) -> Result<()> {
		self.check_in_head()?;
		let qname = decl_name(prefix);
		if !check_unique(&self.head, &qname, uri)? {
			return Ok(());
		}
		self.scopes.current_mut().declare(prefix, uri);
		self.put_attribute(output, &qname, uri);
		self.head.push((qname, uri.to_string()));
		Ok(())
	}

	/// Write text content, escaping it unless disabled.
	pub fn characters<O: BufMut>(&mut self, text: &str, output: &mut O) -> Result<()> {
		self.check_usable()?;
		self.enter_content(output);
		self.mark_text();
		self.put_escaped(output, text);
		Ok(())
	}

	/// Write a CDATA section.
	pub fn cdata<O: BufMut>(&mut self, text: &str, output: &mut O) -> Result<()> {
		self.check_usable()?;
		check_terminator(text, "CDATA section", "]]>")?;
		self.enter_content(output);
		self.mark_text();
		output.put_slice(b"<![CDATA[");
		self.put(output, text);
		output.put_slice(b"]]>");
		Ok(())
	}

	/// Write a comment.
	pub fn comment<O: BufMut>(&mut self, text: &str, output: &mut O) -> Result<()> {
		self.check_usable()?;
		check_terminator(text, "comment", "--")?;
		if text.ends_with('-') {
			return Err(ConstructError::ForbiddenSequence {
				construct: "comment",
				sequence: "-",
			}
			.into());
		}
		self.enter_content(output);
		self.indent_markup(output);
		output.put_slice(b"<!--");
		self.put(output, text);
		output.put_slice(b"-->");
		self.state = EncoderState::AfterElement;
		Ok(())
	}

	/// Write a processing instruction.
	pub fn processing_instruction<O: BufMut>(
		&mut self,
		target: &str,
		data: Option<&str>,
		output: &mut O,
	) -> Result<()> {
		self.check_usable()?;
		if target.is_empty() {
			return Err(ConstructError::EmptyTarget.into());
		}
		check_terminator(target, "processing instruction", "?>")?;
		if let Some(data) = data {
			check_terminator(data, "processing instruction", "?>")?;
		}
		self.enter_content(output);
		self.indent_markup(output);
		output.put_slice(b"<?");
		self.put(output, target);
		if let Some(data) = data.filter(|d| !d.is_empty()) {
			output.put_u8(b' ');
			self.put(output, data);
		}
		output.put_slice(b"?>");
		self.state = EncoderState::AfterElement;
		Ok(())
	}

	/// End the innermost open element.
	///
	/// If its start tag is still open, the element is written as
	/// `<name/>`.
	pub fn end_element<O: BufMut>(&mut self, output: &mut O) -> Result<()> {
		self.check_usable()?;
		let frame = match self.frames.pop() {
			Some(frame) => frame,
			None => return Err(StateError::NoOpenElement.into()),
		};
		self.scopes.pop();
		trace!("writing end tag </{}>", frame.qname);
		if self.state == EncoderState::ElementHead {
			output.put_slice(b"/>");
		} else {
			if self.pretty && !frame.had_text {
				self.newline(output, self.frames.len());
			}
			output.put_slice(b"</");
			self.put(output, &frame.qname);
			output.put_u8(b'>');
		}
		self.state = EncoderState::AfterElement;
		Ok(())
	}

	/// End all open elements and close the document.
	pub fn end_document<O: BufMut>(&mut self, output: &mut O) -> Result<()> {
		self.check_usable()?;
		while !self.frames.is_empty() {
			self.end_element(output)?;
		}
		trace!("document closed");
		self.state = EncoderState::Closed;
		Ok(())
	}

	/// Replay a parser event.
	///
	/// [`Event::StartDocument`] writes an XML declaration (if nothing has
	/// been written yet), attributes are written sorted by name, and
	/// [`Event::Error`] is returned as error.
	pub fn encode_event<O: BufMut>(&mut self, ev: &Event, output: &mut O) -> Result<()> {
		match ev {
			Event::StartDocument => {
				if self.state == EncoderState::Initial {
					self.start_document("1.0", None, output)?;
				}
				Ok(())
			}
			Event::EndDocument => self.end_document(output),
			Event::StartElement(el) => {
				let mut attributes: Vec<(String, String)> = el
					.attributes
					.iter()
					.map(|(k, v)| (k.clone(), v.clone()))
					.collect();
				attributes.sort();
				let opts = ElementOptions {
					prefix: el.name.prefix.as_ref().map(|p| p.to_string()),
					uri: None,
					attributes,
					self_closing: false,
				};
				self.start_element(&el.name.local_name, opts, output)
			}
			Event::EndElement(_) => self.end_element(output),
			Event::Characters(text) => self.characters(text, output),
			Event::CData(text) => self.cdata(text, output),
			Event::Error(e) => Err(e.clone()),
		}
	}
}

impl Default for Encoder {
	fn default() -> Self {
		Self::new()
	}
}
