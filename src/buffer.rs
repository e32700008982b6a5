/*!
# Input buffer

Growable byte buffer holding input which has been received but not yet
consumed by the lexer. Consumed bytes are only dropped when the buffer is
compacted, which moves the unread bytes to the front.
*/
use log::debug;

/// Cursor position after which the buffer is always compacted.
pub const COMPACTION_THRESHOLD: usize = 8 * 1024;

/// Input bytes with a read cursor.
pub struct Buffer {
	data: Vec<u8>,
	cursor: usize,
	max_size: usize,
	compaction: bool,
	eof: bool,
}

impl Buffer {
	/// Create a new buffer.
	///
	/// `max_size` is a soft limit for compaction. The initial allocation
	/// is capped at [`COMPACTION_THRESHOLD`].
	pub fn new(max_size: usize, compaction: bool) -> Buffer {
		Buffer {
			data: Vec::with_capacity(max_size.min(COMPACTION_THRESHOLD)),
			cursor: 0,
			max_size,
			compaction,
			eof: false,
		}
	}

	/// Append a chunk.
	///
	/// If the chunk would not fit into the current allocation, the buffer is
	/// compacted first (if enabled), so that it only grows if the unread
	/// bytes really need the space.
	///
	/// # Panics
	///
	/// If [`Buffer::push_eof()`] has been called before.
	pub fn push(&mut self, chunk: &[u8]) {
		if self.eof {
			panic!("cannot push behind eof");
		}
		if self.compaction
			&& self.cursor > 0
			&& self.data.len() + chunk.len() > self.data.capacity()
		{
			self.compact();
		}
		self.data.extend_from_slice(chunk);
	}

	/// Mark the end of the input.
	pub fn push_eof(&mut self) {
		self.eof = true;
	}

	pub fn eof_pushed(&self) -> bool {
		self.eof
	}

	/// The bytes which have not been consumed yet.
	pub fn unread(&self) -> &[u8] {
		&self.data[self.cursor..]
	}

	/// Number of bytes which have not been consumed yet.
	pub fn len(&self) -> usize {
		self.data.len() - self.cursor
	}

	/// Offset of the first unread byte.
	pub fn cursor(&self) -> usize {
		self.cursor
	}

	/// Number of valid bytes in the buffer, consumed or not.
	pub fn valid_len(&self) -> usize {
		self.data.len()
	}

	/// Mark `n` bytes as consumed and compact if worthwhile.
	///
	/// # Panics
	///
	/// If `n` exceeds [`Buffer::len()`].
	pub fn consume(&mut self, n: usize) {
		if n > self.len() {
			panic!("attempt to consume beyond end of buffer");
		}
		self.cursor += n;
		if self.compaction && self.should_compact() {
			self.compact();
		}
	}

	fn should_compact(&self) -> bool {
		self.cursor > COMPACTION_THRESHOLD
			|| (self.data.len() > self.max_size && self.cursor > self.max_size / 4)
	}

	fn compact(&mut self) {
		debug!(
			"compacting input buffer: dropping {} consumed bytes, keeping {}",
			self.cursor,
			self.len()
		);
		self.data.drain(..self.cursor);
		self.cursor = 0;
	}

	/// Drop all buffered data.
	pub fn clear(&mut self) {
		self.data.clear();
		self.cursor = 0;
	}

	/// Compact and give excess memory back to the allocator.
	pub fn release_temporaries(&mut self) {
		if self.cursor > 0 {
			self.compact();
		}
		self.data.shrink_to_fit();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn buffer_len_grows_with_chunks() {
		let mut buf = Buffer::new(64, true);
		assert_eq!(buf.len(), 0);
		buf.push(b"foo");
		assert_eq!(buf.len(), 3);
		buf.push(b"bar");
		assert_eq!(buf.len(), 6);
		buf.push(b"2342");
		assert_eq!(buf.len(), 10);
		assert_eq!(buf.unread(), b"foobar2342");
	}

	#[test]
	fn consume_advances_cursor() {
		let mut buf = Buffer::new(64, true);
		buf.push(b"foobar");
		buf.consume(3);
		assert_eq!(buf.unread(), b"bar");
		assert_eq!(buf.cursor(), 3);
		assert_eq!(buf.valid_len(), 6);
	}

	#[test]
	#[should_panic(expected = "consume beyond")]
	fn consume_beyond_end_panics() {
		let mut buf = Buffer::new(64, true);
		buf.push(b"foo");
		buf.consume(4);
	}

	#[test]
	#[should_panic(expected = "behind eof")]
	fn push_after_eof_panics() {
		let mut buf = Buffer::new(64, true);
		buf.push_eof();
		buf.push(b"foo");
	}

	#[test]
	fn initial_allocation_is_capped() {
		let mut buf = Buffer::new(usize::MAX, true);
		assert!(buf.data.capacity() <= COMPACTION_THRESHOLD);
		buf.push(b"foo");
		buf.consume(1);
		assert_eq!(buf.unread(), b"oo");
	}

	#[test]
	fn compacts_after_threshold() {
		let mut buf = Buffer::new(64 * 1024, true);
		buf.push(&vec![b'x'; COMPACTION_THRESHOLD + 10][..]);
		buf.consume(COMPACTION_THRESHOLD + 1);
		assert_eq!(buf.cursor(), 0);
		assert_eq!(buf.len(), 9);
		assert_eq!(buf.valid_len(), 9);
	}

	#[test]
	fn compacts_when_over_max_size() {
		let mut buf = Buffer::new(16, true);
		buf.push(&[b'x'; 20][..]);
		buf.consume(4);
		assert_eq!(buf.cursor(), 4);
		buf.consume(1);
		assert_eq!(buf.cursor(), 0);
		assert_eq!(buf.len(), 15);
	}

	#[test]
	fn compaction_can_be_disabled() {
		let mut buf = Buffer::new(16, false);
		buf.push(&[b'x'; 20][..]);
		buf.consume(10);
		buf.push(&[b'y'; 20][..]);
		assert_eq!(buf.cursor(), 10);
		assert_eq!(buf.len(), 30);
	}

	#[test]
	fn compaction_does_not_change_unread_bytes() {
		let mut buf = Buffer::new(8, true);
		buf.push(b"0123456789");
		buf.consume(7);
		buf.push(b"abcdefgh");
		assert_eq!(buf.unread(), b"789abcdefgh");
	}

	#[test]
	fn eof_flag() {
		let mut buf = Buffer::new(8, true);
		assert!(!buf.eof_pushed());
		buf.push_eof();
		assert!(buf.eof_pushed());
	}
}
