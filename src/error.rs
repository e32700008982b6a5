/*!
# Error types

This module holds the error types returned by the parser and the writer.

Parser-side errors ([`StructuralError`], [`EncodingError`]) are terminal: a
parser reports at most one of them and then stops. Writer-side errors
([`StateError`], [`NamespaceError`], [`ConstructError`]) are raised by the
offending call.
*/
use std::error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;

/// Violation of the document structure detected by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
	/// A closing tag did not match the innermost open element.
	MismatchedTag {
		/// Name of the innermost open element.
		expected: String,
		/// Name found in the closing tag.
		found: String,
	},

	/// A closing tag was found while no element was open.
	UnexpectedEndTag(String),

	/// The input ended while elements were still open.
	///
	/// Contains the names of the open elements, outermost first.
	UnclosedElements(Vec<String>),

	/// The input ended inside of a construct.
	///
	/// The contents are implementation details.
	InvalidEof(&'static str),

	/// A tag did not match the tag grammar.
	///
	/// The contents are implementation details.
	MalformedTag(&'static str),
}

impl fmt::Display for StructuralError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::MismatchedTag { expected, found } => write!(
				f,
				"mismatched closing tag: expected </{}>, found </{}>",
				expected, found
			),
			Self::UnexpectedEndTag(name) => {
				write!(f, "closing tag </{}> without open element", name)
			}
			Self::UnclosedElements(names) => write!(
				f,
				"unexpected end of document: not all elements closed ({})",
				names.join(", ")
			),
			Self::InvalidEof(ctx) => write!(f, "unexpected end of document {}", ctx),
			Self::MalformedTag(ctx) => write!(f, "malformed tag: {}", ctx),
		}
	}
}

impl error::Error for StructuralError {}

/// Bytes which could not be decoded into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
	/// The configured decoder is not supported.
	UnsupportedEncoding(String),

	/// An invalid byte sequence was found.
	///
	/// Contains the offending byte.
	InvalidSequence(u8),

	/// The input ended in the middle of a multi-byte sequence.
	IncompleteSequence,
}

impl fmt::Display for EncodingError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::UnsupportedEncoding(label) => write!(f, "unsupported encoding: {:?}", label),
			Self::InvalidSequence(b) => write!(f, "invalid utf-8 byte: \\x{:02x}", b),
			Self::IncompleteSequence => f.write_str("incomplete utf-8 sequence at end of input"),
		}
	}
}

impl error::Error for EncodingError {}

/// Writer call issued in a state which does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
	/// The document was already started (or content was already written).
	MisplacedStartDocument,

	/// Attribute or namespace declaration outside of an element start tag.
	AttributeNotAllowed,

	/// End of element requested without an open element.
	NoOpenElement,

	/// The document has been closed.
	Closed,

	/// A previous failure of the sink left the writer unusable.
	Failed,
}

impl fmt::Display for StateError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::MisplacedStartDocument => {
				f.write_str("start-document is allowed only once, at the start")
			}
			Self::AttributeNotAllowed => {
				f.write_str("attributes and namespaces are allowed only after start-element")
			}
			Self::NoOpenElement => f.write_str("no open element"),
			Self::Closed => f.write_str("document already closed"),
			Self::Failed => f.write_str("writer failed earlier"),
		}
	}
}

impl error::Error for StateError {}

/// Namespace-related misuse of the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceError {
	/// An attribute uses a prefix which is not declared.
	UndeclaredPrefix {
		/// The prefix in question.
		prefix: String,
		/// Local name of the attribute.
		attribute: String,
	},

	/// A start tag declares the same prefix for two different URIs.
	ConflictingDeclaration {
		/// The prefix in question (empty for the default namespace).
		prefix: String,
		/// The URI of the rejected declaration.
		uri: String,
	},
}

impl fmt::Display for NamespaceError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::UndeclaredPrefix { prefix, attribute } => write!(
				f,
				"namespace prefix {:?} of attribute {:?} is not declared",
				prefix, attribute
			),
			Self::ConflictingDeclaration { prefix, uri } => write!(
				f,
				"namespace prefix {:?} is already declared differently on this element, cannot bind it to {:?}",
				prefix, uri
			),
		}
	}
}

impl error::Error for NamespaceError {}

/// Content which cannot be represented by the requested construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructError {
	/// The content contains the terminator of the construct.
	ForbiddenSequence {
		/// Kind of construct (e.g. `"comment"`).
		construct: &'static str,
		/// The forbidden sequence.
		sequence: &'static str,
	},

	/// The processing instruction target is empty.
	EmptyTarget,

	/// An attribute name occurs twice in one start tag.
	DuplicateAttribute(String),
}

impl fmt::Display for ConstructError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::ForbiddenSequence {
				construct,
				sequence,
			} => write!(f, "{} must not contain {:?}", construct, sequence),
			Self::EmptyTarget => f.write_str("processing instruction target must not be empty"),
			Self::DuplicateAttribute(name) => write!(f, "duplicate attribute {:?}", name),
		}
	}
}

impl error::Error for ConstructError {}

/// [`std::sync::Arc`]-based around [`std::io::Error`] to allow cloning.
#[derive(Clone)]
pub struct IOErrorWrapper(Arc<io::Error>);

impl IOErrorWrapper {
	fn wrap(e: io::Error) -> IOErrorWrapper {
		IOErrorWrapper(Arc::new(e))
	}
}

impl fmt::Debug for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl fmt::Display for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&**self, f)
	}
}

impl PartialEq for IOErrorWrapper {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl AsRef<io::Error> for IOErrorWrapper {
	fn as_ref(&self) -> &io::Error {
		&*self.0
	}
}

impl Deref for IOErrorWrapper {
	type Target = io::Error;

	fn deref(&self) -> &io::Error {
		&*self.0
	}
}

/// Error types which may be returned from the parser or the writer.
///
/// With the exception of [`Error::IO`] with
/// [`std::io::ErrorKind::WouldBlock`], all parser errors are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// An I/O error was encountered.
	///
	/// Push-fed parsers use [`std::io::ErrorKind::WouldBlock`] to signal that
	/// more input is required; that is not fatal.
	IO(IOErrorWrapper),

	/// Unbalanced or malformed markup.
	Structural(StructuralError),

	/// Undecodable input.
	Encoding(EncodingError),

	/// Writer call in a forbidden state.
	State(StateError),

	/// Undeclared or conflicting namespace prefix in a start tag written by
	/// the writer.
	Namespace(NamespaceError),

	/// Content the writer cannot represent, such as a forbidden terminator
	/// inside a comment or a duplicate attribute.
	Construct(ConstructError),

	/// A construct which is deliberately not supported was encountered.
	///
	/// The string indicates the context and should not be interpreted by user
	/// code.
	RestrictedXml(&'static str),
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	pub fn io(e: io::Error) -> Error {
		Error::IO(IOErrorWrapper::wrap(e))
	}

	pub(crate) fn wouldblock() -> Error {
		Error::io(io::Error::new(
			io::ErrorKind::WouldBlock,
			"more input required",
		))
	}

	pub(crate) fn eof(ctx: &'static str) -> Error {
		Error::Structural(StructuralError::InvalidEof(ctx))
	}

	pub(crate) fn malformed(ctx: &'static str) -> Error {
		Error::Structural(StructuralError::MalformedTag(ctx))
	}

	/// Return true if this is the non-fatal "more input required" signal.
	pub fn is_wouldblock(&self) -> bool {
		matches!(self, Error::IO(e) if e.kind() == io::ErrorKind::WouldBlock)
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::io(e)
	}
}

impl From<StructuralError> for Error {
	fn from(e: StructuralError) -> Error {
		Error::Structural(e)
	}
}

impl From<EncodingError> for Error {
	fn from(e: EncodingError) -> Error {
		Error::Encoding(e)
	}
}

impl From<StateError> for Error {
	fn from(e: StateError) -> Error {
		Error::State(e)
	}
}

impl From<NamespaceError> for Error {
	fn from(e: NamespaceError) -> Error {
		Error::Namespace(e)
	}
}

impl From<ConstructError> for Error {
	fn from(e: ConstructError) -> Error {
		Error::Construct(e)
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::IO(e) => write!(f, "I/O error: {}", e),
			Error::Structural(e) => write!(f, "not-well-formed: {}", e),
			Error::Encoding(e) => write!(f, "encoding error: {}", e),
			Error::State(e) => write!(f, "invalid writer state: {}", e),
			Error::Namespace(e) => write!(f, "namespace error: {}", e),
			Error::Construct(e) => write!(f, "invalid construct: {}", e),
			Error::RestrictedXml(msg) => write!(f, "restricted xml: {}", msg),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::IO(e) => Some(&**e),
			Error::Structural(e) => Some(e),
			Error::Encoding(e) => Some(e),
			Error::State(e) => Some(e),
			Error::Namespace(e) => Some(e),
			Error::Construct(e) => Some(e),
			Error::RestrictedXml(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mismatched_tag_names_both_elements() {
		let e: Error = StructuralError::MismatchedTag {
			expected: "b".to_string(),
			found: "a".to_string(),
		}
		.into();
		let msg = e.to_string();
		assert!(msg.contains("</b>"));
		assert!(msg.contains("</a>"));
	}

	#[test]
	fn unclosed_elements_mentions_unexpected_end() {
		let e = StructuralError::UnclosedElements(vec!["a".to_string(), "b".to_string()]);
		assert!(e.to_string().starts_with("unexpected end of document"));
	}

	#[test]
	fn io_errors_compare_by_identity() {
		let e1 = Error::io(io::Error::new(io::ErrorKind::Other, "x"));
		let e2 = Error::io(io::Error::new(io::ErrorKind::Other, "x"));
		assert_eq!(e1, e1.clone());
		assert_ne!(e1, e2);
	}

	#[test]
	fn wouldblock_is_detected() {
		assert!(Error::wouldblock().is_wouldblock());
		assert!(!Error::eof("in comment").is_wouldblock());
	}
}
