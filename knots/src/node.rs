/*!
The document tree: a [`Document`] is an ordered list of [`Node`]s, and each
node has a name, an optional tag, arguments, properties, and child nodes.
*/

use std::fmt::{self, Display, Formatter};
use std::ops::Index;

use indexmap::IndexMap;

use crate::{
    error::PrintError,
    key::{NodeKey, ValueKey},
    print::{self, PrintConfig},
    value::AnyValue,
};

/// A single KDL node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The parenthesized tag, if any
    pub tag: Option<String>,

    /// The node's name. Never empty.
    pub name: String,

    /// The positional arguments, in order
    pub args: Vec<AnyValue>,

    /// The properties. Iteration order is insertion order; re-assigning a
    /// property overwrites its value in place, so duplicate keys in a
    /// document keep the position of the first occurrence.
    pub props: IndexMap<String, AnyValue>,

    /// The child nodes, in order
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            tag: None,
            name: name.into(),
            args: Vec::new(),
            props: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Test this node against a key
    pub fn matches(&self, key: &NodeKey) -> bool {
        key.matches(self.tag.as_deref(), &self.name)
    }

    /// Get the first child node matching the key, if any
    pub fn get(&self, key: impl Into<NodeKey>) -> Option<&Node> {
        let key = key.into();
        self.children.iter().find(move |node| node.matches(&key))
    }

    /// Get every child node matching the key, in order
    pub fn get_all(&self, key: impl Into<NodeKey>) -> impl Iterator<Item = &Node> {
        let key = key.into();
        self.children.iter().filter(move |node| node.matches(&key))
    }

    /// Get every argument matching the key, in order
    pub fn get_args(&self, key: impl Into<ValueKey>) -> impl Iterator<Item = &AnyValue> {
        let key = key.into();
        self.args.iter().filter(move |value| value.matches(&key))
    }

    /// Get every property whose value matches the key, in insertion order
    pub fn get_props(&self, key: impl Into<ValueKey>) -> impl Iterator<Item = (&str, &AnyValue)> {
        let key = key.into();
        self.props
            .iter()
            .filter(move |(_, value)| value.matches(&key))
            .map(|(name, value)| (name.as_str(), value))
    }
}

/// Children can be looked up by name; panics if there is no matching child.
/// Use [`Node::get`] for the non-panicking form.
impl Index<&str> for Node {
    type Output = Node;

    fn index(&self, name: &str) -> &Node {
        match self.get(name) {
            Some(node) => node,
            None => panic!("key not found: {name:?}"),
        }
    }
}

/// An entire KDL document: an ordered list of nodes, plus an optional
/// printing configuration used when the document is stringified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// The document's nodes, in order
    pub nodes: Vec<Node>,

    /// Used by [`print`][Document::print] (and [`Display`]) in place of the
    /// default configuration
    pub print_config: Option<PrintConfig>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the first node matching the key, if any
    pub fn get(&self, key: impl Into<NodeKey>) -> Option<&Node> {
        let key = key.into();
        self.nodes.iter().find(move |node| node.matches(&key))
    }

    /// Get every node matching the key, in order
    pub fn get_all(&self, key: impl Into<NodeKey>) -> impl Iterator<Item = &Node> {
        let key = key.into();
        self.nodes.iter().filter(move |node| node.matches(&key))
    }

    /// Format this document as KDL text, using the attached
    /// [`PrintConfig`] if there is one
    pub fn print(&self) -> Result<String, PrintError> {
        match &self.print_config {
            Some(config) => print::print_document(self, config),
            None => print::print_document(self, &PrintConfig::default()),
        }
    }

    /// Format this document as KDL text with the given configuration
    pub fn print_with(&self, config: &PrintConfig) -> Result<String, PrintError> {
        print::print_document(self, config)
    }
}

/// Nodes can be looked up by name; panics if there is no matching node.
/// Use [`Document::get`] for the non-panicking form.
impl Index<&str> for Document {
    type Output = Node;

    fn index(&self, name: &str) -> &Node {
        match self.get(name) {
            Some(node) => node,
            None => panic!("key not found: {name:?}"),
        }
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let printed = self.print().map_err(|_| fmt::Error)?;
        f.write_str(&printed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::StringMatcher;
    use crate::value::{Literal, Value, ValueKind};

    fn sample() -> Document {
        let mut package = Node::new("package");
        package.props.insert("name".to_owned(), Literal::from("knots").into());

        let mut dep = Node::new("dependency");
        dep.args.push(Literal::from("nom").into());
        dep.args.push(Value::tagged("version", Literal::from("7.1")).into());

        let mut dev = Node::new("dependency");
        dev.tag = Some("dev".to_owned());
        dev.args.push(Literal::from("cool_asserts").into());

        package.children.push(dep);
        package.children.push(dev);

        Document {
            nodes: vec![package, Node::new("workspace")],
            print_config: None,
        }
    }

    #[test]
    fn get_first() {
        let doc = sample();
        assert_eq!(doc.get("package").unwrap().name, "package");
        assert!(doc.get("missing").is_none());
    }

    #[test]
    fn index_panics_on_missing() {
        let doc = sample();
        assert_eq!(doc["workspace"].name, "workspace");

        let result = std::panic::catch_unwind(|| doc["missing"].name.clone());
        assert!(result.is_err());
    }

    #[test]
    fn get_all_children() {
        let doc = sample();
        let deps: Vec<_> = doc["package"].get_all("dependency").collect();
        assert_eq!(deps.len(), 2);

        let dev_only: Vec<_> = doc["package"]
            .get_all(NodeKey::new("dev", "dependency"))
            .collect();
        assert_eq!(dev_only.len(), 1);
        assert_eq!(dev_only[0].tag.as_deref(), Some("dev"));

        let untagged: Vec<_> = doc["package"]
            .get_all(NodeKey::new(StringMatcher::Absent, "dependency"))
            .collect();
        assert_eq!(untagged.len(), 1);
    }

    #[test]
    fn get_args_by_key() {
        let doc = sample();
        let dep = &doc["package"]["dependency"];

        let versions: Vec<_> = dep.get_args("version").collect();
        assert_eq!(versions.len(), 1);

        let strings: Vec<_> = dep
            .get_args(ValueKey::new(StringMatcher::Any, ValueKind::String))
            .collect();
        assert_eq!(strings.len(), 2);
    }

    #[test]
    fn get_props_by_key() {
        let doc = sample();
        let props: Vec<_> = doc["package"].get_props(ValueKind::String).collect();
        assert_eq!(props, [("name", &AnyValue::from(Literal::from("knots")))]);
    }
}
