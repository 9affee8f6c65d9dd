/*!
The matcher-key DSL used by the lookup helpers and by converter dispatch.

Keys are built from [`StringMatcher`]s (over names and tags) and
[`TypeKey`]s (over value shapes). Most of the lookup methods accept
`impl Into<NodeKey>` or `impl Into<ValueKey>`, so plain strings and compiled
regexes work directly.
*/

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::value::{AnyValue, ValueKind};

/// A matcher over an optional string, used for both node/tag names and
/// value tags.
#[derive(Clone)]
pub enum StringMatcher {
    /// Matches anything, present or absent
    Any,

    /// Matches only absence. As a *name* matcher this succeeds
    /// unconditionally, since names are mandatory.
    Absent,

    /// Matches exactly this string
    Exact(String),

    /// Matches if the regex matches at the start of the string
    Regex(Regex),

    /// Matches if the predicate returns true
    Predicate(Arc<dyn Fn(Option<&str>) -> bool + Send + Sync>),
}

impl StringMatcher {
    /// Create a predicate matcher from a closure
    pub fn predicate(predicate: impl Fn(Option<&str>) -> bool + Send + Sync + 'static) -> Self {
        StringMatcher::Predicate(Arc::new(predicate))
    }

    /// Test this matcher against an optional string
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            StringMatcher::Any => true,
            StringMatcher::Absent => value.is_none(),
            StringMatcher::Exact(expected) => value == Some(expected.as_str()),
            StringMatcher::Regex(regex) => value
                .and_then(|value| regex.find(value))
                .is_some_and(|found| found.start() == 0),
            StringMatcher::Predicate(predicate) => predicate(value),
        }
    }

    /// Test this matcher against a mandatory name. `Absent` auto-succeeds
    /// here, since there is no absence to match.
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            StringMatcher::Absent => true,
            matcher => matcher.matches(Some(name)),
        }
    }
}

impl fmt::Debug for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringMatcher::Any => f.write_str("Any"),
            StringMatcher::Absent => f.write_str("Absent"),
            StringMatcher::Exact(expected) => f.debug_tuple("Exact").field(expected).finish(),
            StringMatcher::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            StringMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for StringMatcher {
    fn from(value: &str) -> Self {
        StringMatcher::Exact(value.to_owned())
    }
}

impl From<String> for StringMatcher {
    fn from(value: String) -> Self {
        StringMatcher::Exact(value)
    }
}

impl From<Regex> for StringMatcher {
    fn from(value: Regex) -> Self {
        StringMatcher::Regex(value)
    }
}

/// A key that matches nodes, by name and optionally by tag.
#[derive(Debug, Clone)]
pub struct NodeKey {
    /// The matcher for the node's tag
    pub tag: StringMatcher,

    /// The matcher for the node's name
    pub name: StringMatcher,
}

impl NodeKey {
    /// Create a key from a tag matcher and a name matcher
    pub fn new(tag: impl Into<StringMatcher>, name: impl Into<StringMatcher>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
        }
    }

    /// Create a key that matches any tag and the given name
    pub fn name(name: impl Into<StringMatcher>) -> Self {
        Self {
            tag: StringMatcher::Any,
            name: name.into(),
        }
    }

    /// Test this key against a node's tag and name
    pub fn matches(&self, tag: Option<&str>, name: &str) -> bool {
        self.tag.matches(tag) && self.name.matches_name(name)
    }
}

impl From<&str> for NodeKey {
    fn from(name: &str) -> Self {
        NodeKey::name(name)
    }
}

impl From<String> for NodeKey {
    fn from(name: String) -> Self {
        NodeKey::name(name)
    }
}

impl From<Regex> for NodeKey {
    fn from(name: Regex) -> Self {
        NodeKey::name(name)
    }
}

impl From<StringMatcher> for NodeKey {
    fn from(name: StringMatcher) -> Self {
        NodeKey::name(name)
    }
}

impl From<(StringMatcher, StringMatcher)> for NodeKey {
    fn from((tag, name): (StringMatcher, StringMatcher)) -> Self {
        NodeKey::new(tag, name)
    }
}

/// A key that matches a value's shape: either anything, or one specific
/// [`ValueKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKey {
    /// Matches any value
    Any,

    /// Matches values of one kind
    Kind(ValueKind),
}

impl TypeKey {
    /// Test this key against a value kind
    pub fn matches(&self, kind: ValueKind) -> bool {
        match self {
            TypeKey::Any => true,
            TypeKey::Kind(expected) => *expected == kind,
        }
    }
}

impl From<ValueKind> for TypeKey {
    fn from(kind: ValueKind) -> Self {
        TypeKey::Kind(kind)
    }
}

/// A key that matches values, by tag and optionally by type.
#[derive(Debug, Clone)]
pub struct ValueKey {
    /// The matcher for the value's tag
    pub tag: StringMatcher,

    /// The matcher for the value's type
    pub ty: TypeKey,
}

impl ValueKey {
    /// Create a key from a tag matcher and a type key
    pub fn new(tag: impl Into<StringMatcher>, ty: impl Into<TypeKey>) -> Self {
        Self {
            tag: tag.into(),
            ty: ty.into(),
        }
    }

    /// Create a key that matches the given tag and any type
    pub fn tag(tag: impl Into<StringMatcher>) -> Self {
        Self {
            tag: tag.into(),
            ty: TypeKey::Any,
        }
    }

    /// Test this key against a value
    pub fn matches(&self, value: &AnyValue) -> bool {
        self.matches_parts(value.tag(), value.kind())
    }

    pub(crate) fn matches_parts(&self, tag: Option<&str>, kind: ValueKind) -> bool {
        self.tag.matches(tag) && self.ty.matches(kind)
    }
}

impl From<&str> for ValueKey {
    fn from(tag: &str) -> Self {
        ValueKey::tag(tag)
    }
}

impl From<String> for ValueKey {
    fn from(tag: String) -> Self {
        ValueKey::tag(tag)
    }
}

impl From<Regex> for ValueKey {
    fn from(tag: Regex) -> Self {
        ValueKey::tag(tag)
    }
}

impl From<StringMatcher> for ValueKey {
    fn from(tag: StringMatcher) -> Self {
        ValueKey::tag(tag)
    }
}

impl From<ValueKind> for ValueKey {
    fn from(kind: ValueKind) -> Self {
        ValueKey::new(StringMatcher::Any, kind)
    }
}

impl From<(StringMatcher, TypeKey)> for ValueKey {
    fn from((tag, ty): (StringMatcher, TypeKey)) -> Self {
        Self { tag, ty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Literal, Value};

    #[test]
    fn exact() {
        let matcher = StringMatcher::from("node");
        assert!(matcher.matches(Some("node")));
        assert!(!matcher.matches(Some("other")));
        assert!(!matcher.matches(None));
    }

    #[test]
    fn absent() {
        let matcher = StringMatcher::Absent;
        assert!(matcher.matches(None));
        assert!(!matcher.matches(Some("node")));
        assert!(matcher.matches_name("node"));
    }

    #[test]
    fn regex_is_anchored_at_start() {
        let matcher = StringMatcher::from(Regex::new("ab+").unwrap());
        assert!(matcher.matches(Some("abb")));
        assert!(matcher.matches(Some("abb-and-more")));
        assert!(!matcher.matches(Some("xabb")));
        assert!(!matcher.matches(None));
    }

    #[test]
    fn predicate() {
        let matcher = StringMatcher::predicate(|name| matches!(name, Some(name) if name.len() == 3));
        assert!(matcher.matches(Some("abc")));
        assert!(!matcher.matches(Some("abcd")));
        assert!(!matcher.matches(None));
    }

    #[test]
    fn node_key_with_tag() {
        let key = NodeKey::new("widget", StringMatcher::Any);
        assert!(key.matches(Some("widget"), "anything"));
        assert!(!key.matches(None, "anything"));
        assert!(!key.matches(Some("gadget"), "anything"));
    }

    #[test]
    fn value_key_type_half() {
        let key = ValueKey::from(ValueKind::Number);
        assert!(key.matches(&Literal::from(5i64).into()));
        assert!(!key.matches(&Literal::from("five").into()));

        let tagged = ValueKey::new("m", ValueKind::Number);
        assert!(tagged.matches(&Value::tagged("m", Literal::from(5i64)).into()));
        assert!(!tagged.matches(&Literal::from(5i64).into()));
    }
}
