//! Nested container addressing.

use std::fmt;

/// Address of a container, possibly nested inside other containers.
///
/// The engine has flat tables, so each container maps to one table whose
/// name is the length-prefixed segments joined with `/`. Because every
/// segment carries its byte length, names never collide even when segments
/// contain `/` or `:` themselves, and a container's descendants are exactly
/// the tables whose name starts with `"{name}/"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerPath {
    segments: Vec<String>,
}

impl ContainerPath {
    /// A top-level container.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// A container nested inside this one.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Engine table name for this container.
    pub fn table_name(&self) -> String {
        let mut name = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                name.push('/');
            }
            name.push_str(&segment.len().to_string());
            name.push(':');
            name.push_str(segment);
        }
        name
    }

    /// Whether `table` names a container nested (at any depth) in this one.
    pub fn is_ancestor_of_table(&self, table: &str) -> bool {
        let own = self.table_name();
        table.len() > own.len() + 1 && table.starts_with(&own) && table[own.len()..].starts_with('/')
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_length_prefixed() {
        let path = ContainerPath::root("user").child("data");
        assert_eq!(path.table_name(), "4:user/4:data");
        assert_eq!(path.to_string(), "user/data");
    }

    #[test]
    fn separators_in_segments_do_not_collide() {
        let nested = ContainerPath::root("a").child("b");
        let flat = ContainerPath::root("a/b");
        assert_ne!(nested.table_name(), flat.table_name());

        let colon = ContainerPath::root("1:a");
        assert_ne!(colon.table_name(), ContainerPath::root("a").table_name());
    }

    #[test]
    fn descendants_detected() {
        let indexes = ContainerPath::root("t").child("indexes");
        let one = indexes.child("b");
        let deeper = one.child("x");

        assert!(indexes.is_ancestor_of_table(&one.table_name()));
        assert!(indexes.is_ancestor_of_table(&deeper.table_name()));
        assert!(!indexes.is_ancestor_of_table(&indexes.table_name()));
        assert!(!indexes.is_ancestor_of_table(&ContainerPath::root("t").child("data").table_name()));
    }
}
