/*!
# Parser events

The term *Event* is borrowed from SAX/StAX terminology. Each [`Event`]
refers to a piece of the XML document which has been parsed.
*/
use std::collections::HashMap;

use crate::error::Error;

/// Compact string used for element and attribute names and prefixes.
pub type Name = smartstring::alias::String;

/// A name together with its namespace resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedName {
	/// The qualified name as written in the document (`prefix:local`).
	pub name: Name,
	/// The part of the name after the first colon (or the whole name).
	pub local_name: Name,
	/// The part of the name before the first colon, if any.
	pub prefix: Option<Name>,
	/// The namespace URI the name resolves to, if any.
	pub uri: Option<String>,
}

/// An attribute value together with the namespace resolution of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	/// The attribute value, with entities decoded.
	pub value: String,
	/// The prefix of the attribute name, if any.
	pub prefix: Option<Name>,
	/// The namespace URI of the attribute, if any.
	///
	/// Unprefixed attributes never have a namespace URI.
	pub uri: Option<String>,
}

/// The start of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
	/// The resolved element name.
	pub name: ResolvedName,
	/// Attribute values keyed by the qualified attribute name, including
	/// namespace declarations.
	pub attributes: HashMap<String, String>,
	/// Attribute values with namespace information, keyed by local name.
	///
	/// If two attributes share a local name (with different prefixes), the
	/// one appearing later in the tag wins.
	pub attributes_with_prefix: HashMap<String, Attribute>,
}

/**
# Logical XML document parts

A well-formed document yields [`Event::StartDocument`], a balanced sequence
of element, text and CDATA events, and [`Event::EndDocument`]. A failing
parser yields a single [`Event::Error`] in place of any further events.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	/// First event of every document.
	StartDocument,

	/// Last event of a successfully parsed document.
	EndDocument,

	/// Start of an element.
	///
	/// A self-closing element (`<a/>`) is reported as a `StartElement`
	/// immediately followed by an [`Event::EndElement`].
	StartElement(StartElement),

	/// End of an element.
	EndElement(ResolvedName),

	/// Character data, with entities decoded.
	///
	/// A run of text between two pieces of markup is always reported as a
	/// single event, no matter how the input was chunked.
	Characters(String),

	/// Contents of a CDATA section, verbatim.
	CData(String),

	/// The terminal error of the parser.
	Error(Error),
}

impl Event {
	/// Return the element name for start and end element events.
	pub fn element_name(&self) -> Option<&ResolvedName> {
		match self {
			Self::StartElement(el) => Some(&el.name),
			Self::EndElement(name) => Some(name),
			_ => None,
		}
	}

	/// Return true for the events after which no further events follow.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::EndDocument | Self::Error(_))
	}
}
