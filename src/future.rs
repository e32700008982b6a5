/*!
Asynchronous parsing on top of tokio.

The [`AsyncParser`] pulls chunks from a [`tokio::io::AsyncBufRead`] and
yields [`Event`]s. Every pull operation borrows the parser mutably, so at
most one read can be outstanding at any time.
*/
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::debug;
use tokio::io::AsyncBufRead;

#[cfg(feature = "stream")]
use futures_core::stream::Stream;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::lexer::Lexer;
use crate::options::ParserOptions;

use pin_project_lite::pin_project;

pin_project! {
	pub struct ReadEvent<T: ?Sized>{
		#[pin]
		inner: T,
	}
}

impl<T: AsyncEventRead + Unpin> Future for ReadEvent<T> {
	type Output = Result<Option<Event>>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.project().inner.poll_read(cx)
	}
}

pin_project! {
	pub struct ReadAll<T: ?Sized, F> {
		cb: F,
		#[pin]
		inner: T,
	}
}

impl<T: AsyncEventRead + Unpin, F: FnMut(Event) -> () + Send> Future for ReadAll<T, F> {
	type Output = Result<()>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
		let mut this = self.project();
		loop {
			match this.inner.as_mut().poll_read(cx) {
				Poll::Ready(Ok(Some(Event::Error(e)))) => return Poll::Ready(Err(e)),
				Poll::Ready(Ok(Some(ev))) => {
					(this.cb)(ev);
				}
				Poll::Ready(Ok(None)) => return Poll::Ready(Ok(())),
				Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
				Poll::Pending => return Poll::Pending,
			}
		}
	}
}

/**
Asynchronous source of individual XML events

This trait is implemented by the different parser frontends. It is analogous
to the [`tokio::io::AsyncRead`] trait, but for [`Event`]s instead of bytes.

Usually, one interacts with this trait through the helpers available in
[`AsyncEventReadExt`].
*/
pub trait AsyncEventRead {
	/// Poll for a single event from the parser.
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Event>>>;
}

impl<T: AsyncEventRead + Unpin + ?Sized> AsyncEventRead for &mut T {
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Event>>> {
		let this: &mut &mut T = Pin::into_inner(self);
		let this: &mut T = *this;
		let this = Pin::new(this);
		this.poll_read(cx)
	}
}

/**
Helper trait for asynchronous sources of individual XML events

This helper trait is automatically implemented for all [`AsyncEventRead`].
*/
pub trait AsyncEventReadExt: AsyncEventRead {
	/// Read a single event from the parser.
	///
	/// After the terminal event ([`Event::EndDocument`] or [`Event::Error`]),
	/// `None` is returned.
	///
	/// Equivalent to:
	///
	/// ```ignore
	/// async fn read(&mut self) -> Result<Option<Event>>;
	/// ```
	fn read(&mut self) -> ReadEvent<&mut Self> {
		ReadEvent { inner: self }
	}

	/// Read all events until the end of the document.
	///
	/// The given `cb` is invoked for each event except [`Event::Error`],
	/// which is returned as error instead.
	///
	/// Equivalent to:
	///
	/// ```ignore
	///     async fn read_all<F>(&mut self, mut cb: F) -> Result<()>
	///            where F: FnMut(Event) -> () + Send
	/// ```
	fn read_all<F>(&mut self, cb: F) -> ReadAll<&mut Self, F> {
		ReadAll { inner: self, cb }
	}
}

impl<T: AsyncEventRead> AsyncEventReadExt for T {}

/**
Tokio-compatible asynchronous parser

The [`AsyncParser`] allows parsing XML documents from a
[`tokio::io::AsyncBufRead`], asynchronously. It operates similarly as the
[`PullParser`] does, but instead of blocking the task, it will yield control
to other tasks if the source is not able to supply data immediately.

The source is dropped as soon as the parser terminates. Source I/O errors
terminate the parser with an [`Event::Error`].

Interaction with an `AsyncParser` should happen exclusively via the
[`AsyncEventReadExt`] trait.

## Example

```
use staxml::{AsyncEventReadExt, AsyncParser, Event};
# tokio_test::block_on(async {
let doc = &b"<hello>World!</hello>"[..];
let mut pp = AsyncParser::new(doc);
assert_eq!(pp.read().await.unwrap(), Some(Event::StartDocument));
let ev = pp.read().await.unwrap().unwrap();
assert_eq!(ev.element_name().unwrap().local_name.as_str(), "hello");
# })
```

   [`PullParser`]: crate::PullParser
*/
pub struct AsyncParser<T> {
	inner: Option<T>,
	lexer: Lexer,
}

impl<T: AsyncBufRead + Unpin> AsyncParser<T> {
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

	/// Access the inner AsyncBufRead
	///
	/// Returns `None` once parsing has terminated.
	pub fn get_inner(&self) -> Option<&T> {
		self.inner.as_ref()
	}

	/// Access the lexer
	pub fn get_lexer(&self) -> &Lexer {
		&self.lexer
	}

	/// Release temporary buffers and other ephemeral allocations.
	///
	/// This is sensible to call when it is expected that no more data will be
	/// processed by the parser for a while and the memory is better used
	/// elsewhere.
	#[inline(always)]
	pub fn release_temporaries(&mut self) {
		self.lexer.release_temporaries();
	}

	fn release_source(&mut self) {
		if self.inner.take().is_some() {
			debug!("parser terminated, dropping input source");
		}
	}
}

impl<T: AsyncBufRead + Unpin> AsyncEventRead for AsyncParser<T> {
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<Option<Event>>> {
		let this = Pin::into_inner(self);
		loop {
			match this.lexer.read() {
				Err(e) if e.is_wouldblock() => (),
				other => {
					if this.lexer.is_finished() {
						this.release_source();
					}
					return Poll::Ready(other);
				}
			}
			let mut inner = match this.inner.as_mut() {
				Some(inner) => Pin::new(inner),
				None => {
					this.lexer.feed_eof();
					continue;
				}
			};
			let n = match inner.as_mut().poll_fill_buf(cx) {
				Poll::Pending => return Poll::Pending,
				Poll::Ready(Ok(buf)) => {
					if buf.is_empty() {
						this.lexer.feed_eof();
					} else {
						this.lexer.feed(buf);
					}
					buf.len()
				}
				Poll::Ready(Err(e)) => {
					this.lexer.fail(Error::io(e));
					continue;
				}
			};
			inner.consume(n);
		}
	}
}

#[cfg(feature = "stream")]
#[cfg_attr(docsrs, doc(cfg(all(feature = "stream", feature = "async"))))]
impl<T: AsyncBufRead + Unpin> Stream for AsyncParser<T> {
	type Item = Result<Event>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		match self.poll_read(cx) {
			Poll::Pending => Poll::Pending,
			Poll::Ready(Ok(Some(v))) => Poll::Ready(Some(Ok(v))),
			Poll::Ready(Ok(None)) => Poll::Ready(None),
			Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
		}
	}
}
