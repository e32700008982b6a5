/*!
Cursor-based scanning of markup.

All functions take the unread input starting at a `<` and report whether
the construct is complete, needs more input, or can never become valid.
Ranges in the results are relative to the start of the input.
*/
use std::ops::Range;

use memchr::{memchr, memmem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<T> {
	/// The construct is complete.
	Complete(T),
	/// More input is needed to decide.
	Incomplete,
	/// The input cannot be completed into a valid construct.
	Invalid(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
	/// `<?...?>`, including the XML declaration
	ProcessingInstruction,
	/// `<!--...-->`
	Comment,
	/// `<![CDATA[...]]>`
	CData,
	/// `<!DOCTYPE ...>`
	Doctype,
	/// `</name>`
	EndTag,
	/// `<name ...>` or `<name .../>`
	StartTag,
}

pub const COMMENT_START: &[u8] = b"<!--";
pub const COMMENT_END: &[u8] = b"-->";
pub const CDATA_START: &[u8] = b"<![CDATA[";
pub const CDATA_END: &[u8] = b"]]>";
pub const PI_START: &[u8] = b"<?";
pub const PI_END: &[u8] = b"?>";
const DOCTYPE_START: &[u8] = b"<!DOCTYPE";

const DECLARATIONS: &[(&[u8], Markup)] = &[
	(COMMENT_START, Markup::Comment),
	(CDATA_START, Markup::CData),
	(DOCTYPE_START, Markup::Doctype),
];

#[inline]
pub fn is_space(b: u8) -> bool {
	matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

#[inline]
pub fn is_name_byte(b: u8) -> bool {
	!is_space(b) && !matches!(b, b'<' | b'>' | b'/' | b'=' | b'"' | b'\'' | b'?' | b'!')
}

#[inline]
pub fn is_name_start_byte(b: u8) -> bool {
	is_name_byte(b) && !matches!(b, b'-' | b'.' | b'0'..=b'9')
}

fn skip_matching<F: Fn(u8) -> bool>(src: &[u8], pos: usize, selector: F) -> usize {
	match src[pos..].iter().position(|b| !selector(*b)) {
		Some(n) => pos + n,
		None => src.len(),
	}
}

/// Decide which construct starts at `src[0]` (which must be `<`).
pub fn classify(src: &[u8]) -> Scan<Markup> {
	debug_assert_eq!(src.first(), Some(&b'<'));
	if src.len() < 2 {
		return Scan::Incomplete;
	}
	match src[1] {
		b'?' => Scan::Complete(Markup::ProcessingInstruction),
		b'/' => Scan::Complete(Markup::EndTag),
		b'!' => {
			let mut may_match = false;
			for (prefix, kind) in DECLARATIONS.iter() {
				if src.starts_with(prefix) {
					return Scan::Complete(*kind);
				}
				may_match |= prefix.starts_with(src);
			}
			if may_match {
				Scan::Incomplete
			} else {
				Scan::Invalid("unsupported markup declaration")
			}
		}
		_ => Scan::Complete(Markup::StartTag),
	}
}

/// Find `needle` in `src`, starting at `from`.
///
/// Returns the absolute offset of the match.
pub fn find_from(src: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
	if from >= src.len() {
		return None;
	}
	memmem::find(&src[from..], needle).map(|n| n + from)
}

/// Offset from which a failed search for `needle` in `src` has to be
/// resumed once more data arrived.
pub fn resume_offset(src: &[u8], needle: &[u8]) -> usize {
	src.len().saturating_sub(needle.len() - 1)
}

/// A complete start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStartTag {
	pub name: Range<usize>,
	pub attributes: Vec<(Range<usize>, Range<usize>)>,
	pub self_closing: bool,
	/// Number of bytes, including `<` and `>`.
	pub len: usize,
}

/// Where an incomplete start tag scan continues once more input arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagProgress {
	// name and attributes scanned so far
	tag: Option<RawStartTag>,
	// offset behind the name or the last complete attribute
	pos: usize,
	// offset from which the closing quote of the pending value is searched
	value_from: usize,
}

impl TagProgress {
	fn suspend(&mut self, tag: RawStartTag, pos: usize) -> Scan<RawStartTag> {
		self.tag = Some(tag);
		self.pos = pos;
		Scan::Incomplete
	}
}

/// Scan `<name (attr="value")* /?>`.
///
/// Attribute values may be quoted with `"` or `'`; anything but the quote
/// character is allowed inside them (including `>`).
///
/// After [`Scan::Incomplete`], `progress` remembers the name and the
/// complete attributes, so that the next call with the same (grown) input
/// does not scan them again. It is reset on any other result.
pub fn scan_start_tag(src: &[u8], progress: &mut TagProgress) -> Scan<RawStartTag> {
	let result = continue_start_tag(src, progress);
	if !matches!(result, Scan::Incomplete) {
		*progress = TagProgress::default();
	}
	result
}

fn continue_start_tag(src: &[u8], progress: &mut TagProgress) -> Scan<RawStartTag> {
	debug_assert_eq!(src.first(), Some(&b'<'));
	let len = src.len();
	let (mut tag, mut pos) = match progress.tag.take() {
		Some(tag) => (tag, progress.pos),
		None => {
			if len < 2 {
				return Scan::Incomplete;
			}
			if !is_name_start_byte(src[1]) {
				return Scan::Invalid("expected element name after '<'");
			}
			let name_end = skip_matching(src, 1, is_name_byte);
			if name_end >= len {
				return Scan::Incomplete;
			}
			let tag = RawStartTag {
				name: 1..name_end,
				attributes: Vec::new(),
				self_closing: false,
				len: 0,
			};
			(tag, name_end)
		}
	};
	loop {
		let checkpoint = pos;
		let ws_end = skip_matching(src, pos, is_space);
		let had_space = ws_end > pos;
		pos = ws_end;
		if pos >= len {
			return progress.suspend(tag, checkpoint);
		}
		match src[pos] {
			b'>' => {
				tag.len = pos + 1;
				return Scan::Complete(tag);
			}
			b'/' => {
				if pos + 1 >= len {
					return progress.suspend(tag, checkpoint);
				}
				if src[pos + 1] != b'>' {
					return Scan::Invalid("expected '>' after '/'");
				}
				tag.self_closing = true;
				tag.len = pos + 2;
				return Scan::Complete(tag);
			}
			b if !had_space => {
				return if is_name_byte(b) {
					Scan::Invalid("invalid byte in element name")
				} else {
					Scan::Invalid("expected whitespace before attribute")
				};
			}
			b if !is_name_start_byte(b) => return Scan::Invalid("expected attribute name"),
			_ => (),
		}

		let key_start = pos;
		pos = skip_matching(src, pos, is_name_byte);
		let key = key_start..pos;
		pos = skip_matching(src, pos, is_space);
		if pos >= len {
			return progress.suspend(tag, checkpoint);
		}
		if src[pos] != b'=' {
			return Scan::Invalid("expected '=' after attribute name");
		}
		pos = skip_matching(src, pos + 1, is_space);
		if pos >= len {
			return progress.suspend(tag, checkpoint);
		}
		let quote = src[pos];
		if quote != b'"' && quote != b'\'' {
			return Scan::Invalid("attribute values must be quoted");
		}
		let value_start = pos + 1;
		let from = value_start.max(progress.value_from);
		let value_end = match memchr(quote, &src[from..]) {
			Some(n) => from + n,
			None => {
				progress.value_from = len;
				return progress.suspend(tag, checkpoint);
			}
		};
		progress.value_from = 0;
		tag.attributes.push((key, value_start..value_end));
		pos = value_end + 1;
	}
}

/// Scan `</name>`, returning the name range and the total length.
pub fn scan_end_tag(src: &[u8]) -> Scan<(Range<usize>, usize)> {
	debug_assert!(src.starts_with(b"</"));
	let len = src.len();
	if len < 3 {
		return Scan::Incomplete;
	}
	if !is_name_start_byte(src[2]) {
		return Scan::Invalid("expected element name after '</'");
	}
	let name_end = skip_matching(src, 2, is_name_byte);
	let pos = skip_matching(src, name_end, is_space);
	if pos >= len {
		return Scan::Incomplete;
	}
	if src[pos] != b'>' {
		return Scan::Invalid("expected '>' in closing tag");
	}
	Scan::Complete((2..name_end, pos + 1))
}
