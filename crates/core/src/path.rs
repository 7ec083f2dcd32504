//! Path parsing and mode resolution
//!
//! Handles parsing of selectors in the format: [sos://]bucket[/prefix]
//! and decides, per traversal, whether the backend groups keys on the
//! delimiter and whether the prefix names a single key.

use crate::error::{Error, Result};

/// Delimiter used to emulate directories over flat keys
pub const DELIMITER: &str = "/";

/// Optional scheme accepted in front of a selector
pub const SCHEME: &str = "sos://";

/// A bucket/prefix pair selecting the objects a command works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Bucket name
    pub bucket: String,
    /// Key prefix (empty for bucket root)
    pub prefix: String,
    /// Whether to descend below the first level
    pub recursive: bool,
}

impl Selector {
    /// Create a new Selector, normalizing a bare "/" prefix to the bucket root
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>, recursive: bool) -> Self {
        let mut prefix = prefix.into();
        if prefix == DELIMITER {
            prefix.clear();
        }
        Self {
            bucket: bucket.into(),
            prefix,
            recursive,
        }
    }

    /// Parse a `[sos://]bucket[/prefix]` argument, splitting on the first '/'
    pub fn parse(arg: &str, recursive: bool) -> Result<Self> {
        let arg = arg.strip_prefix(SCHEME).unwrap_or(arg);

        let (bucket, prefix) = match arg.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (arg, ""),
        };

        if bucket.is_empty() {
            return Err(Error::InvalidPath(format!(
                "Bucket name cannot be empty in '{arg}'. Use format: bucket[/prefix]"
            )));
        }

        Ok(Self::new(bucket, prefix, recursive))
    }

    /// Whether the prefix names a directory rather than a single key.
    /// The bucket root counts as a directory.
    pub fn is_dir(&self) -> bool {
        self.prefix.is_empty() || self.prefix.ends_with(DELIMITER)
    }

    /// The key the traversal must match exactly, if any
    ///
    /// Only non-recursive traversals over a prefix that doesn't end with the
    /// delimiter are exact-match traversals.
    pub fn exact_key(&self) -> Option<&str> {
        if self.recursive || self.is_dir() {
            None
        } else {
            Some(&self.prefix)
        }
    }

    /// Plan for a presentation listing: flat mode asks the backend to group
    /// on the delimiter, recursive mode enumerates every key.
    pub fn list_plan(&self) -> ListPlan {
        ListPlan {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            delimiter: (!self.recursive).then(|| DELIMITER.to_string()),
            exact_key: self.exact_key().map(str::to_string),
        }
    }

    /// Plan for a walk: the backend never groups, levels are split client-side
    pub fn walk_plan(&self) -> ListPlan {
        ListPlan {
            delimiter: None,
            ..self.list_plan()
        }
    }

    /// Classify a listed key relative to this selector for a manual-split walk
    pub fn classify(&self, key: &str) -> Placement {
        if self.recursive {
            return Placement::Match;
        }

        let rest = key.strip_prefix(self.prefix.as_str()).unwrap_or(key);
        if let Some((segment, _)) = rest.split_once(DELIMITER) {
            return Placement::Below(format!("{}{segment}{DELIMITER}", self.prefix));
        }

        match self.exact_key() {
            Some(exact) if key != exact => Placement::Outside,
            _ => Placement::Match,
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.prefix)
    }
}

/// Where a listed key falls relative to a non-recursive selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The key is selected
    Match,
    /// The key lives below the immediate level, inside this synthetic directory
    Below(String),
    /// The key shares the prefix but is not the exact key asked for
    Outside,
}

/// Resolved request parameters for one traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    pub bucket: String,
    pub prefix: String,
    /// Delimiter sent to the backend, `None` for full enumeration
    pub delimiter: Option<String>,
    /// Only this key may be emitted, and no directories
    pub exact_key: Option<String>,
}
