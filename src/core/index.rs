//! Definition index keyed by `kind.name`.
//!
//! The same definition can be owned by many files (think `struct ifnet`
//! declared in both a donor and a compatibility header), so every key maps to
//! an ordered owner list rather than a single file.

use std::collections::{BTreeSet, HashMap};

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::definition::{definition_key, Definition, DefinitionKind};
use super::source_file::{normalize_path, Ecosystem, SourceFile};

/// Maps definition keys to the files that own them.
#[derive(Debug, Clone, Default)]
pub struct DefinitionIndex {
    /// Keys in first-seen order.
    keys: Vec<String>,
    owners: HashMap<String, Vec<String>>,
    /// Owning files in first-seen order.
    files: Vec<String>,
    /// Keys declared by each file, in declaration order, duplicates included.
    by_file: HashMap<String, Vec<String>>,
}

impl DefinitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a stream of definitions.
    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = Definition>,
    {
        let mut index = DefinitionIndex::new();
        for def in definitions {
            index.insert(&def.owning_file, def.kind, &def.name);
        }
        index
    }

    /// Build an index from a triple listing (`file kind name` per line).
    pub fn from_listing(text: &str) -> Self {
        Self::from_definitions(text.lines().filter_map(Definition::parse_triple))
    }

    /// Record that `file` owns `kind.name`.
    ///
    /// Re-inserting the file that was last added for the same key is a no-op
    /// for the owner list.
    pub fn insert(&mut self, file: &str, kind: DefinitionKind, name: &str) {
        let file = normalize_path(file);
        let key = definition_key(kind, name);

        if !self.by_file.contains_key(&file) {
            self.files.push(file.clone());
        }
        self.by_file
            .entry(file.clone())
            .or_default()
            .push(key.clone());

        match self.owners.get_mut(&key) {
            Some(owners) => {
                if owners.last() != Some(&file) {
                    owners.push(file);
                }
            }
            None => {
                self.keys.push(key.clone());
                self.owners.insert(key, vec![file]);
            }
        }
    }

    /// Owning files for a key, in insertion order.
    pub fn lookup(&self, key: &str) -> &[String] {
        self.owners.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.owners.contains_key(key)
    }

    /// All keys in the index.
    pub fn all_keys(&self) -> BTreeSet<&str> {
        self.keys.iter().map(String::as_str).collect()
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Owning files in first-seen order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Keys declared by a file in declaration order, duplicates included.
    pub fn declared_by(&self, file: &str) -> &[String] {
        self.by_file
            .get(&normalize_path(file))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The file as a [`SourceFile`] carrying every key it declared.
    pub fn source_file(&self, file: &str, ecosystem: Ecosystem) -> SourceFile {
        let mut source = SourceFile::new(file, ecosystem);
        for key in self.declared_by(file) {
            source.add_definition(key.clone());
        }
        source
    }

    /// Owners of every function definition, keyed by bare function name.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &[String])> {
        let prefix = DefinitionKind::Function.key_prefix();
        self.keys.iter().filter_map(move |key| {
            let name = key.strip_prefix(prefix)?.strip_prefix('.')?;
            Some((name, self.lookup(key)))
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Serializes as a `key -> [owners]` map in first-seen key order.
impl Serialize for DefinitionIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len()))?;
        for key in &self.keys {
            map.serialize_entry(key, self.lookup(key))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_preserves_every_owner() {
        let mut index = DefinitionIndex::new();
        let files = ["sys/mbuf.h", "compat/mbuf.h", "linux/skbuff.h", "net/mbuf_compat.h"];
        for file in files {
            index.insert(file, DefinitionKind::Struct, "mbuf");
        }

        assert_eq!(index.lookup("struct.mbuf"), files);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_immediate_reinsert_is_collapsed() {
        let mut index = DefinitionIndex::new();
        index.insert("sys/queue.h", DefinitionKind::Macro, "TAILQ_HEAD");
        index.insert("sys/queue.h", DefinitionKind::Macro, "TAILQ_HEAD");
        index.insert("compat/queue.h", DefinitionKind::Macro, "TAILQ_HEAD");
        index.insert("sys/queue.h", DefinitionKind::Macro, "TAILQ_HEAD");

        assert_eq!(
            index.lookup("macro.TAILQ_HEAD"),
            ["sys/queue.h", "compat/queue.h", "sys/queue.h"]
        );
        assert_eq!(index.declared_by("sys/queue.h").len(), 3);
    }

    #[test]
    fn test_lookup_missing_key_is_empty() {
        let index = DefinitionIndex::new();
        assert!(index.lookup("funcdef.nope").is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_from_listing_and_keys() {
        let listing = "\
# file kind name
./net/socket.c funcdef socket
net/socket.c funcdef bind
netinet/in.h struct in_addr
netinet/in.h enum bogus
";
        let index = DefinitionIndex::from_listing(listing);

        assert_eq!(index.lookup("funcdef.socket"), ["net/socket.c"]);
        assert_eq!(
            index.all_keys().into_iter().collect::<Vec<_>>(),
            vec!["funcdef.bind", "funcdef.socket", "struct.in_addr"]
        );
        assert_eq!(index.files().collect::<Vec<_>>(), vec!["net/socket.c", "netinet/in.h"]);
        assert_eq!(
            index.functions().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["socket", "bind"]
        );

        let json = serde_json::to_string(&index).unwrap();
        assert!(json.starts_with(r#"{"funcdef.socket":["net/socket.c"]"#));
    }
}
