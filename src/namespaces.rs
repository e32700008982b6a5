/*!
# Namespace scopes

A [`NamespaceScope`] maps prefixes to namespace URIs; the empty prefix holds
the default namespace. A [`ScopeStack`] holds one scope per open element.
Each element's scope is a copy of its parent's, updated with the element's
own `xmlns` and `xmlns:p` declarations.

The same machinery is used by the parser, to resolve names, and by the
writer, to check that attribute prefixes are declared.

```
use staxml::namespaces::{resolve_attribute, resolve_element, NamespaceScope};

let mut scope = NamespaceScope::new();
scope.declare("", "urn:default");
scope.declare("h", "urn:h");
let el = resolve_element("h:a", &scope);
assert_eq!(el.local_name.as_str(), "a");
assert_eq!(el.uri.as_deref(), Some("urn:h"));
// unprefixed elements get the default namespace ...
assert_eq!(resolve_element("b", &scope).uri.as_deref(), Some("urn:default"));
// ... unprefixed attributes never do
assert_eq!(resolve_attribute("b", &scope).uri, None);
```
*/
use std::collections::HashMap;
use std::sync::Arc;

use crate::event::{Name, ResolvedName};

/// XML core namespace URI (for the `xml:` prefix)
pub const XMLNS_XML: &'static str = "http://www.w3.org/XML/1998/namespace";
/// XML namespace URI (for the `xmlns:` prefix)
pub const XMLNS_XMLNS: &'static str = "http://www.w3.org/2000/xmlns/";

pub const PREFIX_XML: &'static str = "xml";
pub const PREFIX_XMLNS: &'static str = "xmlns";

/// Split a qualified name at its first colon.
///
/// Names with an empty side of the colon are treated as unprefixed.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
	match name.find(':') {
		Some(i) if i > 0 && i + 1 < name.len() => (Some(&name[..i]), &name[i + 1..]),
		_ => (None, name),
	}
}

/// Return the prefix declared by an attribute name, if it is a namespace
/// declaration.
///
/// `xmlns` declares the default namespace (returned as `""`), `xmlns:p`
/// declares `p`.
pub fn declared_prefix(attribute_name: &str) -> Option<&str> {
	if attribute_name == PREFIX_XMLNS {
		return Some("");
	}
	match split_qname(attribute_name) {
		(Some(PREFIX_XMLNS), prefix) => Some(prefix),
		_ => None,
	}
}

/// Prefix-to-URI bindings visible at one point of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceScope {
	bindings: HashMap<String, String>,
}

impl NamespaceScope {
	/// Create a root scope, which only binds `xml` and `xmlns`.
	pub fn new() -> Self {
		let mut bindings = HashMap::new();
		bindings.insert(PREFIX_XML.to_string(), XMLNS_XML.to_string());
		bindings.insert(PREFIX_XMLNS.to_string(), XMLNS_XMLNS.to_string());
		Self { bindings }
	}

	/// Bind `prefix` to `uri`.
	///
	/// An empty `prefix` sets the default namespace; an empty `uri` for the
	/// default namespace removes it.
	pub fn declare(&mut self, prefix: &str, uri: &str) {
		if prefix.is_empty() && uri.is_empty() {
			self.bindings.remove("");
			return;
		}
		self.bindings.insert(prefix.to_string(), uri.to_string());
	}

	/// Look up the URI bound to `prefix`.
	pub fn get(&self, prefix: &str) -> Option<&str> {
		self.bindings.get(prefix).map(|x| x.as_str())
	}

	/// Return true if `prefix` is bound.
	pub fn is_declared(&self, prefix: &str) -> bool {
		self.bindings.contains_key(prefix)
	}

	/// Return the default namespace URI, if any.
	pub fn default_namespace(&self) -> Option<&str> {
		self.get("")
	}
}

impl Default for NamespaceScope {
	fn default() -> Self {
		Self::new()
	}
}

/// Resolve an element name.
///
/// Unprefixed names resolve against the default namespace. Prefixed names
/// resolve to `None` if the prefix is not bound.
pub fn resolve_element(name: &str, scope: &NamespaceScope) -> ResolvedName {
	let (prefix, local_name) = split_qname(name);
	let uri = scope.get(prefix.unwrap_or(""));
	ResolvedName {
		name: Name::from(name),
		local_name: Name::from(local_name),
		prefix: prefix.map(Name::from),
		uri: uri.map(|x| x.to_string()),
	}
}

/// Resolve an attribute name.
///
/// Unlike elements, unprefixed attributes are never in a namespace.
pub fn resolve_attribute(name: &str, scope: &NamespaceScope) -> ResolvedName {
	let (prefix, local_name) = split_qname(name);
	let uri = prefix.and_then(|p| scope.get(p));
	ResolvedName {
		name: Name::from(name),
		local_name: Name::from(local_name),
		prefix: prefix.map(Name::from),
		uri: uri.map(|x| x.to_string()),
	}
}

/// One namespace scope per open element.
#[derive(Debug, Clone)]
pub struct ScopeStack {
	root: Arc<NamespaceScope>,
	stack: Vec<Arc<NamespaceScope>>,
}

impl ScopeStack {
	/// Create a stack whose outermost scope is [`NamespaceScope::new()`].
	pub fn new() -> Self {
		Self::with_root(NamespaceScope::new())
	}

	/// Create a stack with a custom outermost scope.
	pub fn with_root(root: NamespaceScope) -> Self {
		Self {
			root: Arc::new(root),
			stack: Vec::new(),
		}
	}

	/// The scope of the innermost open element (or the root scope).
	pub fn current(&self) -> &Arc<NamespaceScope> {
		self.stack.last().unwrap_or(&self.root)
	}

	/// Mutable access to the innermost scope.
	///
	/// The scope is copied first if it is shared with its parent.
	pub fn current_mut(&mut self) -> &mut NamespaceScope {
		match self.stack.last_mut() {
			Some(v) => Arc::make_mut(v),
			None => Arc::make_mut(&mut self.root),
		}
	}

	/// Compute the scope of a child element with the given `(prefix, uri)`
	/// declarations, without pushing it.
	///
	/// If there are no declarations, the parent's scope is shared instead of
	/// copied.
	pub fn derive<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(
		&self,
		decls: I,
	) -> Arc<NamespaceScope> {
		let mut decls = decls.into_iter().peekable();
		if decls.peek().is_none() {
			return self.current().clone();
		}
		let mut scope = (**self.current()).clone();
		for (prefix, uri) in decls {
			scope.declare(prefix, uri);
		}
		Arc::new(scope)
	}

	/// Enter an element.
	pub fn push(&mut self, scope: Arc<NamespaceScope>) {
		self.stack.push(scope);
	}

	/// Leave an element.
	pub fn pop(&mut self) -> Option<Arc<NamespaceScope>> {
		self.stack.pop()
	}

	/// Number of pushed scopes.
	pub fn depth(&self) -> usize {
		self.stack.len()
	}

	/// Drop all pushed scopes.
	pub fn clear(&mut self) {
		self.stack.clear();
	}
}

impl Default for ScopeStack {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn split_qname_at_first_colon() {
		assert_eq!(split_qname("a"), (None, "a"));
		assert_eq!(split_qname("h:a"), (Some("h"), "a"));
		assert_eq!(split_qname("h:a:b"), (Some("h"), "a:b"));
		assert_eq!(split_qname(":a"), (None, ":a"));
		assert_eq!(split_qname("a:"), (None, "a:"));
	}

	#[test]
	fn declared_prefix_recognizes_declarations() {
		assert_eq!(declared_prefix("xmlns"), Some(""));
		assert_eq!(declared_prefix("xmlns:h"), Some("h"));
		assert_eq!(declared_prefix("xmlnsx"), None);
		assert_eq!(declared_prefix("h:xmlns"), None);
	}

	#[test]
	fn element_without_prefix_uses_default() {
		let mut scope = NamespaceScope::new();
		assert_eq!(resolve_element("a", &scope).uri, None);
		scope.declare("", "urn:d");
		let r = resolve_element("a", &scope);
		assert_eq!(r.prefix, None);
		assert_eq!(r.uri.as_deref(), Some("urn:d"));
	}

	#[test]
	fn attribute_without_prefix_has_no_namespace() {
		let mut scope = NamespaceScope::new();
		scope.declare("", "urn:d");
		let r = resolve_attribute("a", &scope);
		assert_eq!(r.prefix, None);
		assert_eq!(r.uri, None);
	}

	#[test]
	fn undeclared_prefix_resolves_to_none() {
		let scope = NamespaceScope::new();
		let r = resolve_element("q:a", &scope);
		assert_eq!(r.prefix.as_deref(), Some("q"));
		assert_eq!(r.local_name.as_str(), "a");
		assert_eq!(r.uri, None);
	}

	#[test]
	fn xml_prefix_is_predeclared() {
		let scope = NamespaceScope::new();
		let r = resolve_attribute("xml:lang", &scope);
		assert_eq!(r.uri.as_deref(), Some(XMLNS_XML));
	}

	#[test]
	fn empty_default_declaration_undeclares() {
		let mut scope = NamespaceScope::new();
		scope.declare("", "urn:d");
		scope.declare("", "");
		assert_eq!(scope.default_namespace(), None);
	}

	#[test]
	fn derived_scope_inherits_and_overrides() {
		let mut stack = ScopeStack::new();
		let outer = stack.derive(vec![("h", "urn:1"), ("", "urn:d")]);
		stack.push(outer);
		let inner = stack.derive(vec![("h", "urn:2")]);
		assert_eq!(inner.get("h"), Some("urn:2"));
		assert_eq!(inner.get(""), Some("urn:d"));
		stack.push(inner);
		assert_eq!(stack.depth(), 2);
		stack.pop();
		assert_eq!(stack.current().get("h"), Some("urn:1"));
		stack.pop();
		assert_eq!(stack.current().get("h"), None);
	}

	#[test]
	fn derive_without_declarations_shares_parent() {
		let mut stack = ScopeStack::new();
		let outer = stack.derive(vec![("h", "urn:1")]);
		stack.push(outer);
		let inner = stack.derive(Vec::new());
		assert!(Arc::ptr_eq(&inner, stack.current()));
	}

	#[test]
	fn current_mut_does_not_leak_into_parent() {
		let mut stack = ScopeStack::new();
		let outer = stack.derive(vec![("h", "urn:1")]);
		stack.push(outer);
		let inner = stack.derive(Vec::new());
		stack.push(inner);
		stack.current_mut().declare("x", "urn:x");
		assert!(stack.current().is_declared("x"));
		stack.pop();
		assert!(!stack.current().is_declared("x"));
	}
}
