/*!
# Incremental tokenizer

The [`Lexer`] accepts input in arbitrarily sized chunks via
[`Lexer::feed()`] and turns it into [`Event`]s. When the buffered input
ends inside of a construct, [`Lexer::read()`] returns an I/O error of kind
[`std::io::ErrorKind::WouldBlock`] and nothing is consumed; the construct
is scanned again once more input has arrived.

```
use staxml::{Event, Lexer};

let mut lexer = Lexer::new();
lexer.feed(b"<greeting>hello</gree");
assert_eq!(lexer.read().unwrap(), Some(Event::StartDocument));
assert!(matches!(lexer.read().unwrap(), Some(Event::StartElement(_))));
assert!(matches!(lexer.read().unwrap(), Some(Event::Characters(t)) if t == "hello"));
assert!(lexer.read().unwrap_err().is_wouldblock());
lexer.feed(b"ting>");
lexer.feed_eof();
assert!(matches!(lexer.read().unwrap(), Some(Event::EndElement(_))));
assert_eq!(lexer.read().unwrap(), Some(Event::EndDocument));
assert_eq!(lexer.read().unwrap(), None);
```
*/
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::mem;

use log::{debug, trace};
use memchr::memchr;

use crate::buffer::Buffer;
use crate::entities::EntityDecoder;
use crate::error::{Error, Result, StructuralError};
use crate::event::{Attribute, Event, ResolvedName, StartElement};
use crate::namespaces::{declared_prefix, resolve_attribute, resolve_element, ScopeStack};
use crate::options::ParserOptions;

pub mod scan;
pub mod utf8;

use scan::{Markup, Scan, TagProgress};
use utf8::Decoder;

/// Push-fed XML tokenizer.
///
/// The lexer keeps the stack of open elements and their namespace scopes,
/// so the events it emits are balanced and fully resolved.
pub struct Lexer {
	buf: Buffer,
	decoder: Decoder,
	entities: EntityDecoder,
	auto_decode: bool,
	queue: VecDeque<Event>,
	elements: Vec<ResolvedName>,
	scopes: ScopeStack,
	/// Text of the current run, entities not yet decoded.
	text: String,
	/// Offset (relative to the cursor) at which an interrupted terminator
	/// search continues.
	search_from: usize,
	tag_progress: TagProgress,
	started: bool,
	finished: bool,
	err: Option<Error>,
}

impl Lexer {
	/// Create a lexer with default options.
	pub fn new() -> Lexer {
		Lexer::with_options(ParserOptions::default())
	}

	/// Create a lexer with the given options.
	///
	/// If the decoder is not supported, the lexer starts out failed: the
	/// first call to [`Lexer::read()`] returns the [`Event::Error`].
	pub fn with_options(opts: ParserOptions) -> Lexer {
		let decoder = Decoder::for_label(&opts.decoder);
		let mut result = Lexer {
			buf: Buffer::new(opts.max_buffer_size, opts.enable_buffer_compaction),
			decoder: Decoder::Utf8,
			entities: EntityDecoder::new(&opts.entities),
			auto_decode: opts.auto_decode_entities,
			queue: VecDeque::new(),
			elements: Vec::new(),
			scopes: ScopeStack::new(),
			text: String::new(),
			search_from: 0,
			tag_progress: TagProgress::default(),
			started: false,
			finished: false,
			err: None,
		};
		match decoder {
			Ok(d) => result.decoder = d,
			Err(e) => {
				result.started = true;
				result.fail(e.into());
			}
		}
		result
	}

	/// Append a chunk of input.
	///
	/// Data fed after the end of input or after the lexer finished is
	/// ignored.
	pub fn feed(&mut self, data: &[u8]) {
		if self.finished || self.buf.eof_pushed() {
			debug!("ignoring {} bytes fed to a closed lexer", data.len());
			return;
		}
		self.buf.push(data);
	}

	/// Mark the end of the input.
	pub fn feed_eof(&mut self) {
		self.buf.push_eof();
	}

	/// Return true if the end of the input has been signalled.
	pub fn eof_fed(&self) -> bool {
		self.buf.eof_pushed()
	}

	/// Number of bytes received but not yet consumed.
	pub fn buffered(&self) -> usize {
		self.buf.len()
	}

	/// Nesting depth at the current position.
	pub fn depth(&self) -> usize {
		self.elements.len()
	}

	/// The terminal error, if the lexer failed.
	pub fn error(&self) -> Option<&Error> {
		self.err.as_ref()
	}

	/// Return true once the terminal event has been produced.
	pub fn is_finished(&self) -> bool {
		self.finished
	}

	/// Give memory which is not needed for the currently buffered input
	/// back to the allocator.
	pub fn release_temporaries(&mut self) {
		self.buf.release_temporaries();
		self.text.shrink_to_fit();
		self.queue.shrink_to_fit();
		self.elements.shrink_to_fit();
	}

	/// Read the next event.
	///
	/// Returns `Ok(None)` after the terminal event ([`Event::EndDocument`]
	/// or [`Event::Error`]) has been read. Returns an I/O error of kind
	/// [`std::io::ErrorKind::WouldBlock`] if more input is needed; that
	/// error is not terminal.
	pub fn read(&mut self) -> Result<Option<Event>> {
		loop {
			if let Some(ev) = self.queue.pop_front() {
				return Ok(Some(ev));
			}
			if self.finished {
				return Ok(None);
			}
			match self.step() {
				// a step may queue text before it runs out of input
				Ok(false) if self.queue.is_empty() => return Err(Error::wouldblock()),
				Ok(_) => continue,
				Err(e) => self.fail(e),
			}
		}
	}

	/// Terminate with an error.
	///
	/// Only the first error is kept and reported, as [`Event::Error`] after
	/// the events already queued.
	pub(crate) fn fail(&mut self, e: Error) {
		if self.finished {
			return;
		}
		debug!("parser failed: {}", e);
		self.finished = true;
		self.err = Some(e.clone());
		self.buf.clear();
		self.elements.clear();
		self.scopes.clear();
		self.text.clear();
		self.emit(Event::Error(e));
	}

	fn emit(&mut self, ev: Event) {
		trace!("emitting {:?}", ev);
		self.queue.push_back(ev);
	}

	fn need_more(&self, ctx: &'static str) -> Result<bool> {
		if self.buf.eof_pushed() {
			Err(Error::eof(ctx))
		} else {
			Ok(false)
		}
	}

	/// Make progress. Returns false if more input is required.
	fn step(&mut self) -> Result<bool> {
		if !self.started {
			self.started = true;
			self.emit(Event::StartDocument);
			return Ok(true);
		}
		let next = self.buf.unread().first().copied();
		match next {
			None if self.buf.eof_pushed() => {
				self.finish_document()?;
				Ok(true)
			}
			None => Ok(false),
			Some(b'<') => {
				self.flush_text();
				self.lex_markup()
			}
			Some(_) => self.absorb_text(),
		}
	}

	/// Move text up to the next `<` into the text run.
	fn absorb_text(&mut self) -> Result<bool> {
		let eof = self.buf.eof_pushed();
		let src = self.buf.unread();
		// `<` is never part of a multi-byte sequence
		let (end, complete) = match memchr(b'<', src) {
			Some(p) => (p, true),
			None => (src.len(), eof),
		};
		let (text, n) = self.decoder.decode_prefix(&src[..end], complete)?;
		self.text.push_str(text);
		self.buf.consume(n);
		Ok(n > 0)
	}

	fn flush_text(&mut self) {
		if self.text.is_empty() {
			return;
		}
		let raw = mem::take(&mut self.text);
		let text = if self.auto_decode && memchr(b'&', raw.as_bytes()).is_some() {
			self.entities.decode(&raw).into_owned()
		} else {
			raw
		};
		self.emit(Event::Characters(text));
	}

	fn finish_document(&mut self) -> Result<()> {
		if !self.elements.is_empty() {
			let names = self.elements.iter().map(|x| x.name.to_string()).collect();
			return Err(StructuralError::UnclosedElements(names).into());
		}
		self.flush_text();
		self.emit(Event::EndDocument);
		self.finished = true;
		Ok(())
	}

	fn lex_markup(&mut self) -> Result<bool> {
		let kind = match scan::classify(self.buf.unread()) {
			Scan::Complete(kind) => kind,
			Scan::Incomplete => return self.need_more("in markup"),
			Scan::Invalid(ctx) => return Err(Error::RestrictedXml(ctx)),
		};
		match kind {
			Markup::Comment => self.skip_construct(scan::COMMENT_START, scan::COMMENT_END, "in comment"),
			Markup::ProcessingInstruction => {
				self.skip_construct(scan::PI_START, scan::PI_END, "in processing instruction")
			}
			Markup::CData => self.lex_cdata(),
			Markup::Doctype => Err(Error::RestrictedXml("document type declarations")),
			Markup::EndTag => self.lex_end_tag(),
			Markup::StartTag => self.lex_start_tag(),
		}
	}

	/// Find `term` behind the `start` delimiter, resuming an earlier search.
	fn find_terminator(
		&mut self,
		start: &[u8],
		term: &[u8],
		ctx: &'static str,
	) -> Result<Option<usize>> {
		let src = self.buf.unread();
		let from = self.search_from.max(start.len());
		match scan::find_from(src, from, term) {
			Some(p) => {
				self.search_from = 0;
				Ok(Some(p))
			}
			None if self.buf.eof_pushed() => Err(Error::eof(ctx)),
			None => {
				self.search_from = scan::resume_offset(src, term).max(start.len());
				Ok(None)
			}
		}
	}

	fn skip_construct(&mut self, start: &[u8], term: &[u8], ctx: &'static str) -> Result<bool> {
		match self.find_terminator(start, term, ctx)? {
			Some(p) => {
				self.buf.consume(p + term.len());
				Ok(true)
			}
			None => Ok(false),
		}
	}

	fn lex_cdata(&mut self) -> Result<bool> {
		let start = scan::CDATA_START;
		let p = match self.find_terminator(start, scan::CDATA_END, "in CDATA section")? {
			Some(p) => p,
			None => return Ok(false),
		};
		let content = self
			.decoder
			.decode(&self.buf.unread()[start.len()..p])?
			.to_string();
		self.buf.consume(p + scan::CDATA_END.len());
		self.emit(Event::CData(content));
		Ok(true)
	}

	fn lex_end_tag(&mut self) -> Result<bool> {
		let (name, len) = match scan::scan_end_tag(self.buf.unread()) {
			Scan::Complete((range, len)) => {
				let name = self.decoder.decode(&self.buf.unread()[range])?;
				(name.to_string(), len)
			}
			Scan::Incomplete => return self.need_more("in closing tag"),
			Scan::Invalid(ctx) => return Err(Error::malformed(ctx)),
		};
		match self.elements.last() {
			None => return Err(StructuralError::UnexpectedEndTag(name).into()),
			Some(open) if open.name.as_str() != name => {
				return Err(StructuralError::MismatchedTag {
					expected: open.name.to_string(),
					found: name,
				}
				.into())
			}
			Some(_) => (),
		}
		self.buf.consume(len);
		self.scopes.pop();
		if let Some(open) = self.elements.pop() {
			self.emit(Event::EndElement(open));
		}
		Ok(true)
	}

	fn lex_start_tag(&mut self) -> Result<bool> {
		let tag = match scan::scan_start_tag(self.buf.unread(), &mut self.tag_progress) {
			Scan::Complete(tag) => tag,
			Scan::Incomplete => return self.need_more("in element"),
			Scan::Invalid(ctx) => return Err(Error::malformed(ctx)),
		};
		let src = self.buf.unread();
		let name = self.decoder.decode(&src[tag.name.clone()])?.to_string();
		let mut attributes: Vec<(String, String)> = Vec::with_capacity(tag.attributes.len());
		for (key, value) in tag.attributes.iter() {
			let key = self.decoder.decode(&src[key.clone()])?;
			if attributes.iter().any(|(k, _)| k == key) {
				return Err(Error::malformed("duplicate attribute"));
			}
			let raw = self.decoder.decode(&src[value.clone()])?;
			let value = if self.auto_decode {
				self.entities.decode(raw).into_owned()
			} else {
				raw.to_string()
			};
			attributes.push((key.to_string(), value));
		}
		self.buf.consume(tag.len);
		self.start_element(name, attributes, tag.self_closing);
		Ok(true)
	}

	fn start_element(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
		// the element's own declarations are in effect for its name
		let scope = self.scopes.derive(
			attrs
				.iter()
				.filter_map(|(k, v)| declared_prefix(k).map(|p| (p, v.as_str()))),
		);
		let resolved = resolve_element(&name, &scope);
		let mut attributes = HashMap::with_capacity(attrs.len());
		let mut attributes_with_prefix = HashMap::with_capacity(attrs.len());
		for (key, value) in attrs {
			let attr = resolve_attribute(&key, &scope);
			attributes_with_prefix.insert(
				attr.local_name.to_string(),
				Attribute {
					value: value.clone(),
					prefix: attr.prefix,
					uri: attr.uri,
				},
			);
			attributes.insert(key, value);
		}
		self.emit(Event::StartElement(StartElement {
			name: resolved.clone(),
			attributes,
			attributes_with_prefix,
		}));
		if self_closing {
			self.emit(Event::EndElement(resolved));
		} else {
			self.elements.push(resolved);
			self.scopes.push(scope);
		}
	}
}

impl Default for Lexer {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Lexer {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Lexer")
			.field("buffered", &self.buf.len())
			.field("depth", &self.elements.len())
			.field("queued", &self.queue.len())
			.field("finished", &self.finished)
			.field("err", &self.err)
			.finish()
	}
}
