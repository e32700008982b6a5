use crate::error::EncodingError;

/// Longest byte sequence of a single UTF-8 encoded character.
pub const MAX_SEQUENCE_LEN: usize = 4;

/// Byte-to-text decoder.
///
/// Only UTF-8 is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
	Utf8,
}

impl Decoder {
	/// Look up a decoder by its label (ASCII case-insensitive).
	pub fn for_label(label: &str) -> Result<Decoder, EncodingError> {
		if label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8") {
			Ok(Decoder::Utf8)
		} else {
			Err(EncodingError::UnsupportedEncoding(label.to_string()))
		}
	}

	/// Decode a slice which is known to be complete.
	pub fn decode<'a>(&self, src: &'a [u8]) -> Result<&'a str, EncodingError> {
		self.decode_prefix(src, true).map(|(s, _)| s)
	}

	/// Decode as much of `src` as possible.
	///
	/// Returns the text and the number of bytes it was decoded from.
	///
	/// If `complete` is false, `src` may end in the middle of a character
	/// (because the rest has not arrived yet). Up to
	/// `MAX_SEQUENCE_LEN - 1` trailing bytes are then left undecoded for
	/// the caller to retry with more data. Invalid bytes before that are an
	/// error either way.
	pub fn decode_prefix<'a>(
		&self,
		src: &'a [u8],
		complete: bool,
	) -> Result<(&'a str, usize), EncodingError> {
		let err = match std::str::from_utf8(src) {
			Ok(s) => return Ok((s, src.len())),
			Err(e) => e,
		};
		let valid = err.valid_up_to();
		if err.error_len().is_some() {
			return Err(EncodingError::InvalidSequence(src[valid]));
		}
		if complete {
			return Err(EncodingError::IncompleteSequence);
		}
		debug_assert!(src.len() - valid < MAX_SEQUENCE_LEN);
		let s = std::str::from_utf8(&src[..valid]).map_err(|_| EncodingError::IncompleteSequence)?;
		Ok((s, valid))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels() {
		assert_eq!(Decoder::for_label("utf-8").unwrap(), Decoder::Utf8);
		assert_eq!(Decoder::for_label("UTF8").unwrap(), Decoder::Utf8);
		assert!(matches!(
			Decoder::for_label("latin1"),
			Err(EncodingError::UnsupportedEncoding(l)) if l == "latin1"
		));
	}

	#[test]
	fn decodes_complete_input() {
		let d = Decoder::Utf8;
		assert_eq!(d.decode_prefix("café".as_bytes(), false).unwrap(), ("café", 5));
	}

	#[test]
	fn leaves_split_sequence_undecoded() {
		let d = Decoder::Utf8;
		let bytes = "café".as_bytes();
		assert_eq!(d.decode_prefix(&bytes[..4], false).unwrap(), ("caf", 3));
		let party = "Party 🎉".as_bytes();
		for cut in 7..party.len() {
			assert_eq!(d.decode_prefix(&party[..cut], false).unwrap(), ("Party ", 6));
		}
	}

	#[test]
	fn split_sequence_at_end_of_input_is_an_error() {
		let d = Decoder::Utf8;
		let bytes = "café".as_bytes();
		assert_eq!(
			d.decode_prefix(&bytes[..4], true).err().unwrap(),
			EncodingError::IncompleteSequence
		);
	}

	#[test]
	fn invalid_bytes_are_an_error_even_if_incomplete() {
		let d = Decoder::Utf8;
		assert_eq!(
			d.decode_prefix(b"ab\xffcd", false).err().unwrap(),
			EncodingError::InvalidSequence(0xff)
		);
		assert_eq!(
			d.decode(b"\xc3\x28").err().unwrap(),
			EncodingError::InvalidSequence(0xc3)
		);
	}
}
