/*!
Wrappers around the lexer to drive it.

For high-level parsing, [`FeedParser`] and [`PullParser`] are the things to
look at. The asynchronous counterpart lives in [`crate::future`].
*/

use std::io;

use log::debug;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::lexer::Lexer;
use crate::options::ParserOptions;

/**
# Source for individual XML events

This trait is implemented by the different parser frontends. It is analogous
to the [`std::io::Read`] trait, but for XML document events instead of bytes.

A parser reports its terminal error twice: [`EventRead::read()`] returns it
as [`Event::Error`], while [`EventRead::read_all()`] and
[`EventRead::read_all_eof()`] return it as `Err`.
*/
pub trait EventRead {
	/// Read a single event from the parser.
	///
	/// After the terminal event ([`Event::EndDocument`] or [`Event::Error`]),
	/// `None` is returned.
	///
	/// An I/O error of kind [`std::io::ErrorKind::WouldBlock`] means that the
	/// source has to supply more data first; it may be retried.
	fn read(&mut self) -> Result<Option<Event>>;

	/// Read all events which can be produced from the data source (at this
	/// point in time).
	///
	/// The given `cb` is invoked for each event except [`Event::Error`],
	/// which is returned as error instead.
	fn read_all<F>(&mut self, mut cb: F) -> Result<()>
	where
		F: FnMut(Event) -> (),
	{
		loop {
			match self.read()? {
				None => return Ok(()),
				Some(Event::Error(e)) => return Err(e),
				Some(ev) => cb(ev),
			}
		}
	}

	/// Read all events which can be produced from the data source (at this
	/// point in time).
	///
	/// The given `cb` is invoked for each event.
	///
	/// If the data source indicates that it needs to block to read further
	/// data, `false` is returned. If the end of the document is reached,
	/// `true` is returned.
	fn read_all_eof<F>(&mut self, cb: F) -> Result<bool>
	where
		F: FnMut(Event) -> (),
	{
		as_eof_flag(self.read_all(cb))
	}
}

/// Convert end-of-file-ness of a result to a boolean flag.
///
/// If the result is ok, return true (EOF). If the result is not ok, but the
/// error is an I/O error indicating that the data source would have to block
/// to read further data, return false ("Ok, but not at eof yet").
///
/// All other errors are passed through.
pub fn as_eof_flag(r: Result<()>) -> Result<bool> {
	match r {
		Err(Error::IO(ioerr)) if ioerr.kind() == io::ErrorKind::WouldBlock => Ok(false),
		Err(e) => Err(e),
		Ok(()) => Ok(true),
	}
}

/**
# Non-blocking parsing

The [`FeedParser`] allows parsing XML documents as they arrive in the
application, giving back control to the caller immediately when not enough
data is available for processing. This is especially useful when streaming
data from sockets.

To read events from the `FeedParser` after feeding data, use its [`EventRead`]
trait.

## Example

```
use staxml::{Error, Event, EventRead, FeedParser};
let doc = b"<hello>World!</hello>";
let mut fp = FeedParser::default();
fp.feed(&doc[..4]);
assert_eq!(fp.read().unwrap(), Some(Event::StartDocument));
// the start tag is not complete yet
assert!(fp.read().unwrap_err().is_wouldblock());

fp.feed(&doc[4..]);
fp.feed_eof();
let mut text = String::new();
fp.read_all(|ev| {
	if let Event::Characters(s) = ev {
		text.push_str(&s);
	}
}).unwrap();
assert_eq!(text, "World!");
```
*/
#[derive(Debug, Default)]
pub struct FeedParser {
	lexer: Lexer,
}

impl FeedParser {
	/// Create a new parser with default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a new parser with the given options.
	pub fn with_options(options: ParserOptions) -> Self {
		Self::wrap(Lexer::with_options(options))
	}

	/// Create a parser around an existing lexer.
	pub fn wrap(lexer: Lexer) -> Self {
		Self { lexer }
	}

	/// Feed a chunk of data to the parser.
	///
	/// This enqueues the data for processing, but does not process it right
	/// away.
	///
	/// To process data, call [`EventRead::read()`] or
	/// [`EventRead::read_all()`].
	pub fn feed<T: AsRef<[u8]>>(&mut self, data: T) {
		self.lexer.feed(data.as_ref());
	}

	/// Feed the eof marker to the parser.
	///
	/// This is a prerequisite for parsing to terminate with
	/// [`Event::EndDocument`]. Otherwise, the parser keeps asking for more
	/// data once the buffered input has been processed.
	///
	/// Data fed after the eof marker is ignored.
	pub fn feed_eof(&mut self) {
		self.lexer.feed_eof();
	}

	/// Return the amount of bytes which have not been read from the buffer
	/// yet.
	pub fn buffered(&self) -> usize {
		self.lexer.buffered()
	}

	/// Access the lexer
	pub fn get_lexer(&self) -> &Lexer {
		&self.lexer
	}

	/// Access the lexer, mutably
	pub fn get_lexer_mut(&mut self) -> &mut Lexer {
		&mut self.lexer
	}

	/// Decompose the parser into its lexer
	pub fn into_inner(self) -> Lexer {
		self.lexer
	}

	/// Release all temporary buffers
	///
	/// This is sensible to call when it is expected that no more data will be
	/// processed by the parser for a while and the memory is better used
	/// elsewhere.
	pub fn release_temporaries(&mut self) {
		self.lexer.release_temporaries();
	}
}

impl EventRead for FeedParser {
	/// Read a single event from the parser.
	///
	/// If the buffered data is not sufficient to create an event, an I/O
	/// error of [`std::io::ErrorKind::WouldBlock`] is returned.
	fn read(&mut self) -> Result<Option<Event>> {
		self.lexer.read()
	}
}

/**
# Blocking parsing

The [`PullParser`] allows parsing XML documents from a [`io::BufRead`]
blockingly. The parser will block until the backing [`io::BufRead`] has
enough data available (or returns an error).

The parser owns its source and drops it as soon as parsing terminates,
either at the end of the document or on the first error. I/O errors of the
source (other than [`std::io::ErrorKind::WouldBlock`] and
[`std::io::ErrorKind::Interrupted`]) terminate the parser like any other
error.

## Example

```
use staxml::{Event, EventRead, PullParser};
let doc = &b"<hello>World!</hello>"[..];
let mut pp = PullParser::new(doc);
assert_eq!(pp.read().unwrap(), Some(Event::StartDocument));
let ev = pp.read().unwrap().unwrap();
assert_eq!(ev.element_name().unwrap().name.as_str(), "hello");
```
*/
pub struct PullParser<T: io::BufRead> {
	inner: Option<T>,
	lexer: Lexer,
}

impl<T: io::BufRead> PullParser<T> {
	/// Create a new parser with default options, wrapping the given reader.
	pub fn new(inner: T) -> Self {
		Self::with_options(inner, ParserOptions::default())
	}

	/// Create a new parser while configuring the lexer with the given
	/// options.
	pub fn with_options(inner: T, options: ParserOptions) -> Self {
		Self::wrap(inner, Lexer::with_options(options))
	}

	/// Create a parser from a reader and a lexer.
	pub fn wrap(inner: T, lexer: Lexer) -> Self {
		Self {
			inner: Some(inner),
			lexer,
		}
	}

	/// Access the inner BufRead
	///
	/// Returns `None` once parsing has terminated.
	pub fn get_inner(&self) -> Option<&T> {
		self.inner.as_ref()
	}

	/// Access the inner BufRead, mutably
	pub fn get_inner_mut(&mut self) -> Option<&mut T> {
		self.inner.as_mut()
	}

	/// Access the lexer
	pub fn get_lexer(&self) -> &Lexer {
		&self.lexer
	}

	fn release_source(&mut self) {
		if self.inner.take().is_some() {
			debug!("parser terminated, dropping input source");
		}
	}
}

impl<T: io::BufRead> EventRead for PullParser<T> {
	/// Read a single event from the parser.
	///
	/// Blocks until the source supplies enough data for the next event.
	fn read(&mut self) -> Result<Option<Event>> {
		loop {
			match self.lexer.read() {
				Err(e) if e.is_wouldblock() => (),
				other => {
					if self.lexer.is_finished() {
						self.release_source();
					}
					return other;
				}
			}
			let inner = match self.inner.as_mut() {
				Some(inner) => inner,
				None => {
					self.lexer.feed_eof();
					continue;
				}
			};
			let n = match inner.fill_buf() {
				Ok(buf) => {
					if buf.is_empty() {
						self.lexer.feed_eof();
					} else {
						self.lexer.feed(buf);
					}
					buf.len()
				}
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Err(Error::io(e)),
				Err(e) => {
					self.lexer.fail(Error::io(e));
					continue;
				}
			};
			inner.consume(n);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::error::StructuralError;

	struct FailingReader {
		data: &'static [u8],
		fail_after: usize,
		pos: usize,
	}

	impl io::Read for FailingReader {
		fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
			unreachable!()
		}
	}

	impl io::BufRead for FailingReader {
		fn fill_buf(&mut self) -> io::Result<&[u8]> {
			if self.pos >= self.fail_after {
				return Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"));
			}
			let end = (self.pos + 1).min(self.data.len());
			Ok(&self.data[self.pos..end])
		}

		fn consume(&mut self, amt: usize) {
			self.pos += amt;
		}
	}

	#[test]
	fn as_eof_flag_converts_wouldblock() {
		assert_eq!(as_eof_flag(Ok(())).unwrap(), true);
		assert_eq!(as_eof_flag(Err(Error::wouldblock())).unwrap(), false);
		assert!(as_eof_flag(Err(Error::eof("x"))).is_err());
	}

	#[test]
	fn feed_parser_read_all_eof() {
		let mut fp = FeedParser::default();
		let mut events = Vec::new();
		fp.feed(b"<a>x</a");
		assert_eq!(fp.read_all_eof(|ev| events.push(ev)).unwrap(), false);
		assert_eq!(events.len(), 3);
		fp.feed(b">");
		fp.feed_eof();
		assert_eq!(fp.read_all_eof(|ev| events.push(ev)).unwrap(), true);
		assert_eq!(events.len(), 5);
		assert_eq!(events[4], Event::EndDocument);
		assert_eq!(fp.buffered(), 0);
	}

	#[test]
	fn feed_parser_read_all_returns_error() {
		let mut fp = FeedParser::default();
		fp.feed(b"<a><b></a>");
		fp.feed_eof();
		let mut events = Vec::new();
		let err = fp.read_all(|ev| events.push(ev)).unwrap_err();
		assert!(matches!(
			err,
			Error::Structural(StructuralError::MismatchedTag { .. })
		));
		assert!(events.iter().all(|ev| !matches!(ev, Event::Error(_))));
		// nothing after the terminal error
		assert_eq!(fp.read().unwrap(), None);
	}

	#[test]
	fn feed_parser_read_yields_error_event() {
		let mut fp = FeedParser::default();
		fp.feed(b"<a><b>");
		fp.feed_eof();
		let mut last = None;
		while let Some(ev) = fp.read().unwrap() {
			last = Some(ev);
		}
		assert!(matches!(
			last,
			Some(Event::Error(Error::Structural(StructuralError::UnclosedElements(_))))
		));
	}

	#[test]
	fn pull_parser_reads_whole_document() {
		let doc = &b"<root><a>1</a><b/></root>"[..];
		let mut pp = PullParser::new(io::BufReader::with_capacity(3, doc));
		let mut events = Vec::new();
		pp.read_all(|ev| events.push(ev)).unwrap();
		assert_eq!(events.len(), 9);
		assert_eq!(events.last(), Some(&Event::EndDocument));
		assert!(pp.get_inner().is_none());
	}

	#[test]
	fn pull_parser_source_error_is_terminal_event() {
		let reader = FailingReader {
			data: b"<root><a>",
			fail_after: 7,
			pos: 0,
		};
		let mut pp = PullParser::new(reader);
		let mut events = Vec::new();
		while let Some(ev) = pp.read().unwrap() {
			events.push(ev);
		}
		match events.last() {
			Some(Event::Error(Error::IO(e))) => {
				assert_eq!(e.kind(), io::ErrorKind::ConnectionReset)
			}
			other => panic!("unexpected last event: {:?}", other),
		}
		assert!(pp.get_inner().is_none());
		assert_eq!(pp.read().unwrap(), None);
	}

	#[test]
	fn pull_parser_drops_source_after_error() {
		let doc = &b"<a></b>trailing"[..];
		let mut pp = PullParser::new(doc);
		let err = pp.read_all(|_| ()).unwrap_err();
		assert!(matches!(err, Error::Structural(_)));
		assert!(pp.get_inner().is_none());
	}
}
