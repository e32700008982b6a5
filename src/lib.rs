/*!
# Streaming XML parsing and writing

This crate provides an incremental, pull-based (StAX-style) parser for XML
1.0 documents with namespacing, and a symmetric streaming writer.

## Features

* Input may arrive in chunks of any size, split at any byte (even inside a
  multi-byte UTF-8 sequence)
* Memory is bounded by the largest construct not yet parsed, not by the
  document
* Namespace resolution for elements and attributes
* The five predefined entities plus caller-supplied overrides
* No DTD, no external resources
* Comments and processing instructions are skipped by the parser, but can be
  written by the writer
* Can be driven push- and pull-based
* Tokio-based asynchronicity supported via the `async` feature and
  [`AsyncParser`] / [`AsyncWriter`].

## Example

```
use staxml::{Event, EventRead};
let doc = b"<?xml version='1.0'?><hello>World!</hello>";
let mut fp = staxml::FeedParser::new();
fp.feed(&doc[..]);
fp.feed_eof();
let mut events = Vec::new();
let result = fp.read_all_eof(|ev| {
	events.push(ev);
});
// true indicates eof
assert_eq!(result.unwrap(), true);
assert_eq!(events.first(), Some(&Event::StartDocument));
assert_eq!(events.last(), Some(&Event::EndDocument));
```

## High-level usage

### Push-based usage

The [`FeedParser`] allows to push bits of XML into the parser as they arrive
in the application and process the resulting [`Event`]s as they happen.

### Pull-based usage

If the parser should block while waiting for more data to arrive, a
[`PullParser`] can be used instead. The `PullParser` requires a source which
implements [`std::io::BufRead`].

### Usage with Tokio

Tokio is supported with the `async` feature. It offers the [`AsyncParser`]
and the [`AsyncEventRead`] trait, which work similar to the `PullParser`.
Instead of blocking, however, the async parser will yield control to other
tasks.

### Writing

The [`Encoder`] turns a sequence of calls into XML text, written to any
[`bytes::BufMut`]. It enforces the order of calls and takes care of
escaping, namespace declarations and indentation. The [`AsyncWriter`] wraps
an `Encoder` and a [`tokio::io::AsyncWrite`].
*/
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod buffer;
pub mod driver;
pub mod entities;
pub mod error;
pub mod event;
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub mod future;
pub mod lexer;
pub mod namespaces;
pub mod options;
pub mod writer;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use driver::{as_eof_flag, EventRead, FeedParser, PullParser};
#[doc(inline)]
pub use error::{
	ConstructError, EncodingError, Error, NamespaceError, Result, StateError, StructuralError,
};
#[doc(inline)]
pub use event::{Attribute, Event, Name, ResolvedName, StartElement};
#[doc(inline)]
pub use lexer::Lexer;
#[doc(inline)]
pub use options::{EntityDef, ParserOptions, WriterOptions};
#[doc(inline)]
pub use writer::{ElementOptions, Encoder, EncoderState};

#[cfg(feature = "async")]
#[doc(inline)]
pub use future::{AsyncEventRead, AsyncEventReadExt, AsyncParser};
#[cfg(feature = "async")]
#[doc(inline)]
pub use writer::AsyncWriter;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
