use bytes::BytesMut;
use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{ElementOptions, Encoder, EncoderState};
use crate::error::{Error, Result, StateError};
use crate::event::Event;
use crate::options::WriterOptions;

/**
Tokio-compatible asynchronous writer

The [`AsyncWriter`] buffers the output of an [`Encoder`] and writes it to a
[`tokio::io::AsyncWrite`]. All calls except [`AsyncWriter::flush()`] and
[`AsyncWriter::end_document()`] only touch the buffer.

[`AsyncWriter::end_document()`] closes all open elements, writes and flushes
the remaining output, shuts the sink down and drops it. If the sink fails,
the writer is unusable afterwards.

## Example

```
use staxml::{AsyncWriter, ElementOptions};
# tokio_test::block_on(async {
let mut out = Vec::new();
let mut w = AsyncWriter::new(&mut out);
w.start_element("hello", ElementOptions::default()).unwrap();
w.characters("World!").unwrap();
w.end_document().await.unwrap();
drop(w);
assert_eq!(&out[..], b"<hello>World!</hello>");
# })
```
*/
pub struct AsyncWriter<W> {
	sink: Option<W>,
	encoder: Encoder,
	buf: BytesMut,
}

impl<W: AsyncWrite + Unpin> AsyncWriter<W> {
	/// Create a writer with default options.
	pub fn new(sink: W) -> Self {
		Self::with_options(sink, WriterOptions::default())
	}

	/// Create a writer with the given options.
	pub fn with_options(sink: W, options: WriterOptions) -> Self {
		Self::wrap(sink, Encoder::with_options(options))
	}

	/// Create a writer from a sink and an encoder.
	pub fn wrap(sink: W, encoder: Encoder) -> Self {
		Self {
			sink: Some(sink),
			encoder,
			buf: BytesMut::new(),
		}
	}

	/// Access the encoder
	pub fn get_encoder(&self) -> &Encoder {
		&self.encoder
	}

	/// Number of bytes buffered but not yet written to the sink.
	pub fn buffered(&self) -> usize {
		self.buf.len()
	}

	/// See [`Encoder::start_document()`].
	pub fn start_document(&mut self, version: &str, encoding: Option<&str>) -> Result<()> {
		self.encoder.start_document(version, encoding, &mut self.buf)
	}

	/// See [`Encoder::start_element()`].
	pub fn start_element(&mut self, local_name: &str, opts: ElementOptions) -> Result<()> {
		self.encoder.start_element(local_name, opts, &mut self.buf)
	}

	/// See [`Encoder::attribute()`].
	pub fn attribute(&mut self, local_name: &str, value: &str, prefix: Option<&str>) -> Result<()> {
		self.encoder
			.attribute(local_name, value, prefix, &mut self.buf)
	}

	/// See [`Encoder::namespace()`].
	pub fn namespace(&mut self, prefix: &str, uri: &str) -> Result<()> {
		self.encoder.namespace(prefix, uri, &mut self.buf)
	}

	/// See [`Encoder::characters()`].
	pub fn characters(&mut self, text: &str) -> Result<()> {
		self.encoder.characters(text, &mut self.buf)
	}

	/// See [`Encoder::cdata()`].
	pub fn cdata(&mut self, text: &str) -> Result<()> {
		self.encoder.cdata(text, &mut self.buf)
	}

	/// See [`Encoder::comment()`].
	pub fn comment(&mut self, text: &str) -> Result<()> {
		self.encoder.comment(text, &mut self.buf)
	}

	/// See [`Encoder::processing_instruction()`].
	pub fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
		self.encoder
			.processing_instruction(target, data, &mut self.buf)
	}

	/// See [`Encoder::end_element()`].
	pub fn end_element(&mut self) -> Result<()> {
		self.encoder.end_element(&mut self.buf)
	}

	/// See [`Encoder::encode_event()`].
	///
	/// [`Event::EndDocument`] only closes the encoder; call
	/// [`AsyncWriter::flush()`] or [`AsyncWriter::end_document()`]
	/// afterwards to get the output to the sink.
	pub fn encode_event(&mut self, ev: &Event) -> Result<()> {
		self.encoder.encode_event(ev, &mut self.buf)
	}

	fn fail(&mut self, e: std::io::Error) -> Error {
		debug!("output sink failed, dropping it: {}", e);
		self.encoder.poison();
		self.sink = None;
		self.buf.clear();
		Error::io(e)
	}

	/// Write all buffered output to the sink and flush it.
	pub async fn flush(&mut self) -> Result<()> {
		let sink = match self.sink.as_mut() {
			Some(sink) => sink,
			None => return Err(self.closed_error()),
		};
		let buf = &self.buf;
		let result = async {
			sink.write_all(&buf[..]).await?;
			sink.flush().await
		}
		.await;
		match result {
			Ok(()) => {
				self.buf.clear();
				Ok(())
			}
			Err(e) => Err(self.fail(e)),
		}
	}

	/// Close all open elements, write everything and close the sink.
	pub async fn end_document(&mut self) -> Result<()> {
		if self.sink.is_none() {
			return Err(self.closed_error());
		}
		if self.encoder.state() != EncoderState::Closed {
			self.encoder.end_document(&mut self.buf)?;
		}
		self.flush().await?;
		if let Some(mut sink) = self.sink.take() {
			if let Err(e) = sink.shutdown().await {
				return Err(self.fail(e));
			}
			debug!("document written, output sink closed");
		}
		Ok(())
	}

	fn closed_error(&self) -> Error {
		match self.encoder.state() {
			EncoderState::Error => StateError::Failed.into(),
			_ => StateError::Closed.into(),
		}
	}
}
