//! sos-core: Core library for the sos storage browser
//!
//! This crate provides the listing and copy engine, including:
//! - Selector parsing and flat/recursive mode resolution
//! - Cursor-driven pagination over the backend list call
//! - Directory deduplication and streaming/buffered result delivery
//! - A callback-driven object walker for mutation commands
//! - In-place copy that preserves headers, metadata and ACL
//! - Configuration management
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! allowing for easy testing and potential future support for other backends.

pub mod config;
pub mod copy;
pub mod error;
pub mod list;
pub mod path;
pub mod sink;
pub mod traits;
pub mod walk;

pub use config::{Alias, Config, ConfigManager};
pub use copy::{
    CopyInPlace, GrantHeaders, Header, HeaderOverrides, MetadataDirective, copy_in_place,
};
pub use error::{Error, Result};
pub use list::{CancelSignal, ListOptions, ListSummary, Pages, list_buffered, list_objects};
pub use path::{ListPlan, Placement, Selector};
pub use sink::{Buffered, DirectorySet, ResultSink, Streaming};
pub use traits::{
    Acl, CopyPlan, DirectoryRecord, Grant, Grantee, ListPage, ListRequest, ObjectHeaders,
    ObjectMeta, ObjectRecord, ObjectStore, Permission, Record,
};
pub use walk::{ObjectVisitor, WalkSummary, walk};
