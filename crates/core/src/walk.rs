//! Callback-driven object traversal for mutation commands
//!
//! The walker lists without backend grouping and splits keys client-side, so
//! every selected object reaches the visitor individually. Objects below the
//! immediate level of a non-recursive selector are skipped silently; only
//! their parent segment is recorded.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::list::{ListOptions, Pages};
use crate::path::{Placement, Selector};
use crate::sink::DirectorySet;
use crate::traits::{ObjectRecord, ObjectStore};

/// Action applied to each object a walk selects
#[async_trait]
pub trait ObjectVisitor: Send {
    async fn visit(&mut self, object: &ObjectRecord) -> Result<()>;
}

#[async_trait]
impl<F> ObjectVisitor for F
where
    F: FnMut(&ObjectRecord) -> Result<()> + Send,
{
    async fn visit(&mut self, object: &ObjectRecord) -> Result<()> {
        (self)(object)
    }
}

/// What a completed walk went through
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub pages: usize,
    pub visited: usize,
    /// Synthetic directories of skipped keys, first-seen order
    pub directories: Vec<String>,
}

/// Invoke `visitor` on every object `selector` names
///
/// Stops at the first visitor error and returns it wrapped in
/// `WalkAborted`. Work already done by earlier visits is left in place.
pub async fn walk<S, V>(
    store: &S,
    selector: &Selector,
    options: &ListOptions,
    visitor: &mut V,
) -> Result<WalkSummary>
where
    S: ObjectStore + ?Sized,
    V: ObjectVisitor + ?Sized,
{
    let plan = selector.walk_plan();
    let mut pages = Pages::new(store, &plan).with_options(options);
    let mut dirs = DirectorySet::new();
    let mut visited = 0;

    while let Some(page) = pages.next_page().await {
        for object in page?.objects {
            match selector.classify(&object.key) {
                Placement::Below(dir) => {
                    dirs.insert(&dir);
                    continue;
                }
                Placement::Outside => continue,
                Placement::Match => {}
            }

            visitor
                .visit(&object)
                .await
                .map_err(|e| Error::WalkAborted {
                    bucket: selector.bucket.clone(),
                    key: object.key.clone(),
                    source: Box::new(e),
                })?;
            visited += 1;
        }
    }

    let directories = dirs.into_vec();
    debug!(
        bucket = %selector.bucket,
        prefix = %selector.prefix,
        visited,
        skipped_dirs = directories.len(),
        "walk complete"
    );

    Ok(WalkSummary {
        pages: pages.fetched(),
        visited,
        directories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::tests::{page, paged_store};

    async fn visited_keys(
        store: &crate::traits::MockObjectStore,
        selector: Selector,
    ) -> (Vec<String>, WalkSummary) {
        let mut keys = Vec::new();
        let mut visitor = |o: &ObjectRecord| -> Result<()> {
            keys.push(o.key.clone());
            Ok(())
        };
        let summary = walk(store, &selector, &ListOptions::default(), &mut visitor)
            .await
            .unwrap();
        (keys, summary)
    }

    #[tokio::test]
    async fn test_walk_never_requests_grouping() {
        let mut store = crate::traits::MockObjectStore::new();
        store
            .expect_list_page()
            .withf(|req| req.delimiter.is_none() && req.prefix == "dir/")
            .times(1)
            .returning(|_| Ok(page(&["dir/a"], &[], None)));

        let (keys, _) = visited_keys(&store, Selector::new("b", "dir/", false)).await;
        assert_eq!(keys, vec!["dir/a"]);
    }

    #[tokio::test]
    async fn test_non_recursive_skips_deeper_objects() {
        let store = paged_store(vec![
            page(&["dir/a", "dir/sub/x", "dir/sub/y"], &[], Some("T1")),
            page(&["dir/b", "dir/sub/deeper/z", "dir/other/w"], &[], None),
        ]);

        let (keys, summary) = visited_keys(&store, Selector::new("b", "dir/", false)).await;
        assert_eq!(keys, vec!["dir/a", "dir/b"]);
        assert_eq!(summary.visited, 2);
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.directories, vec!["dir/sub/", "dir/other/"]);
    }

    #[tokio::test]
    async fn test_recursive_visits_everything_in_order() {
        let store = paged_store(vec![
            page(&["dir/a", "dir/sub/x"], &[], Some("T1")),
            page(&["dir/sub/deeper/z"], &[], None),
        ]);

        let (keys, summary) = visited_keys(&store, Selector::new("b", "dir/", true)).await;
        assert_eq!(keys, vec!["dir/a", "dir/sub/x", "dir/sub/deeper/z"]);
        assert!(summary.directories.is_empty());
    }

    #[tokio::test]
    async fn test_exact_key_walk() {
        let store = paged_store(vec![page(&["report", "report/q1", "reports"], &[], None)]);

        let (keys, summary) = visited_keys(&store, Selector::new("b", "report", false)).await;
        assert_eq!(keys, vec!["report"]);
        assert_eq!(summary.directories, vec!["report/"]);
    }

    #[tokio::test]
    async fn test_exact_key_walk_without_match_is_empty() {
        let store = paged_store(vec![page(&["reports"], &[], None)]);

        let (keys, summary) = visited_keys(&store, Selector::new("b", "report", false)).await;
        assert!(keys.is_empty());
        assert_eq!(summary.visited, 0);
    }

    #[tokio::test]
    async fn test_root_walk_visits_top_level() {
        let store = paged_store(vec![page(&["top", "a/x", "a/y"], &[], None)]);

        let (keys, summary) = visited_keys(&store, Selector::new("b", "/", false)).await;
        assert_eq!(keys, vec!["top"]);
        assert_eq!(summary.directories, vec!["a/"]);
    }

    #[tokio::test]
    async fn test_visitor_error_aborts_walk() {
        let store = paged_store(vec![
            page(&["k1", "k2"], &[], Some("T1")),
            page(&["k3", "k4", "k5"], &[], None),
        ]);

        let mut calls = Vec::new();
        let mut visitor = |o: &ObjectRecord| -> Result<()> {
            calls.push(o.key.clone());
            if calls.len() == 3 {
                return Err(Error::Network("copy refused".into()));
            }
            Ok(())
        };

        let selector = Selector::new("b", "", true);
        let err = walk(&store, &selector, &ListOptions::default(), &mut visitor)
            .await
            .unwrap_err();

        assert_eq!(calls, vec!["k1", "k2", "k3"]);
        match err {
            Error::WalkAborted {
                bucket,
                key,
                source,
            } => {
                assert_eq!(bucket, "b");
                assert_eq!(key, "k3");
                assert!(matches!(*source, Error::Network(ref m) if m == "copy refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_failure_is_not_wrapped() {
        let mut store = crate::traits::MockObjectStore::new();
        store
            .expect_list_page()
            .returning(|_| Err(Error::Auth("AccessDenied".into())));

        let mut visitor = |_: &ObjectRecord| -> Result<()> { Ok(()) };
        let err = walk(
            &store,
            &Selector::new("b", "", true),
            &ListOptions::default(),
            &mut visitor,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ListFailed { .. }));
        assert_eq!(err.exit_code(), 4);
    }
}
