//! Directory deduplication and result delivery
//!
//! A traversal pushes every record through a [`ResultSink`]. [`Streaming`]
//! hands records on the instant they are read; [`Buffered`] holds them until
//! the traversal completes and surfaces directories ahead of files.

use std::collections::HashSet;

use crate::error::Result;
use crate::traits::{DirectoryRecord, ObjectRecord, Record};

/// First-seen-order set of directory prefixes with O(1) membership checks
#[derive(Debug, Default, Clone)]
pub struct DirectorySet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl DirectorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a prefix; returns `false` if it was already present
    pub fn insert(&mut self, prefix: &str) -> bool {
        if self.seen.contains(prefix) {
            return false;
        }
        self.seen.insert(prefix.to_string());
        self.order.push(prefix.to_string());
        true
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.seen.contains(prefix)
    }

    /// Prefixes in first-seen order
    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Consumer of the records a traversal produces
pub trait ResultSink {
    /// Called once per unique directory
    fn directory(&mut self, record: DirectoryRecord) -> Result<()>;

    /// Called once per listed object
    fn object(&mut self, record: ObjectRecord) -> Result<()>;
}

/// Delivers each record to a callback as soon as it is read, in page order
pub struct Streaming<F> {
    on_record: F,
}

impl<F> Streaming<F>
where
    F: FnMut(Record) -> Result<()>,
{
    pub fn new(on_record: F) -> Self {
        Self { on_record }
    }
}

impl<F> ResultSink for Streaming<F>
where
    F: FnMut(Record) -> Result<()>,
{
    fn directory(&mut self, record: DirectoryRecord) -> Result<()> {
        (self.on_record)(Record::Directory(record))
    }

    fn object(&mut self, record: ObjectRecord) -> Result<()> {
        (self.on_record)(Record::Object(record))
    }
}

/// Accumulates every record; directories come first in the final collection
#[derive(Debug, Default)]
pub struct Buffered {
    directories: Vec<Record>,
    objects: Vec<Record>,
}

impl Buffered {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole result, directories ahead of files
    pub fn into_records(self) -> Vec<Record> {
        let mut records = self.directories;
        records.extend(self.objects);
        records
    }
}

impl ResultSink for Buffered {
    fn directory(&mut self, record: DirectoryRecord) -> Result<()> {
        self.directories.push(Record::Directory(record));
        Ok(())
    }

    fn object(&mut self, record: ObjectRecord) -> Result<()> {
        self.objects.push(Record::Object(record));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_directory_set_first_seen_order() {
        let mut dirs = DirectorySet::new();
        assert!(dirs.insert("b/"));
        assert!(dirs.insert("a/"));
        assert!(!dirs.insert("b/"));
        assert!(dirs.contains("a/"));
        assert_eq!(dirs.into_vec(), vec!["b/", "a/"]);
    }

    #[test]
    fn test_buffered_moves_directories_first() {
        let mut sink = Buffered::new();
        sink.object(ObjectRecord::new("c", 1)).unwrap();
        sink.directory(DirectoryRecord::new("a/")).unwrap();
        sink.object(ObjectRecord::new("d", 2)).unwrap();
        sink.directory(DirectoryRecord::new("b/")).unwrap();

        let names: Vec<_> = sink
            .into_records()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a/", "b/", "c", "d"]);
    }

    #[test]
    fn test_streaming_preserves_order() {
        let mut seen = Vec::new();
        {
            let mut sink = Streaming::new(|r: Record| {
                seen.push(r.name().to_string());
                Ok(())
            });
            sink.object(ObjectRecord::new("c", 1)).unwrap();
            sink.directory(DirectoryRecord::new("a/")).unwrap();
        }
        assert_eq!(seen, vec!["c", "a/"]);
    }

    #[test]
    fn test_streaming_propagates_consumer_error() {
        let mut sink = Streaming::new(|_| Err(Error::General("broken pipe".into())));
        assert!(sink.object(ObjectRecord::new("c", 1)).is_err());
    }
}
