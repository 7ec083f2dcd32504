//! Cursor-driven listing
//!
//! [`Pages`] drives repeated list calls until the backend stops reporting
//! truncation. [`list_objects`] layers mode resolution, directory
//! deduplication and delivery on top of it.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::path::{ListPlan, Placement, Selector};
use crate::sink::{Buffered, DirectorySet, ResultSink};
use crate::traits::{DirectoryRecord, ListPage, ListRequest, ObjectStore, Record};

/// Cancellation flag checked between page fetches
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options shared by listings and walks
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,

    /// Stop before the next page fetch once this is cancelled
    pub cancel: Option<CancelSignal>,
}

/// Lazy, finite, non-restartable sequence of listing pages
///
/// Each call sends the continuation token of the previous page. The sequence
/// ends when a page reports it is not truncated. A token handed out twice in
/// one traversal fails it instead of looping.
pub struct Pages<'a, S: ?Sized> {
    store: &'a S,
    request: ListRequest,
    cancel: Option<CancelSignal>,
    sent: HashSet<String>,
    fetched: usize,
    done: bool,
}

impl<'a, S> Pages<'a, S>
where
    S: ObjectStore + ?Sized,
{
    pub fn new(store: &'a S, plan: &ListPlan) -> Self {
        Self {
            store,
            request: ListRequest {
                bucket: plan.bucket.clone(),
                prefix: plan.prefix.clone(),
                delimiter: plan.delimiter.clone(),
                continuation_token: None,
                max_keys: None,
            },
            cancel: None,
            sent: HashSet::new(),
            fetched: 0,
            done: false,
        }
    }

    /// Continue a traversal from the cursor carried by a `ListFailed` error
    pub fn resume(store: &'a S, plan: &ListPlan, cursor: impl Into<String>) -> Self {
        let mut pages = Self::new(store, plan);
        pages.request.continuation_token = Some(cursor.into());
        pages
    }

    pub fn with_options(mut self, options: &ListOptions) -> Self {
        self.request.max_keys = options.max_keys;
        self.cancel = options.cancel.clone();
        self
    }

    /// Continuation token the next fetch will send
    pub fn cursor(&self) -> Option<&str> {
        self.request.continuation_token.as_deref()
    }

    /// Number of pages fetched so far
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Fetch the next page, or `None` once the listing is exhausted
    pub async fn next_page(&mut self) -> Option<Result<ListPage>> {
        if self.done {
            return None;
        }

        if let Some(cancel) = &self.cancel
            && cancel.is_cancelled()
        {
            self.done = true;
            return Some(Err(self.failed(Error::Interrupted)));
        }

        debug!(
            bucket = %self.request.bucket,
            prefix = %self.request.prefix,
            cursor = ?self.request.continuation_token,
            "listing page"
        );

        let page = match self.store.list_page(&self.request).await {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(self.failed(e)));
            }
        };
        self.fetched += 1;
        if let Some(token) = &self.request.continuation_token {
            self.sent.insert(token.clone());
        }

        if !page.is_truncated {
            self.done = true;
            return Some(Ok(page));
        }

        match page.next_continuation_token.as_deref() {
            None | Some("") => {
                warn!(
                    bucket = %self.request.bucket,
                    prefix = %self.request.prefix,
                    "truncated page without continuation token, ending listing"
                );
                self.done = true;
            }
            Some(token) if self.sent.contains(token) => {
                self.done = true;
                return Some(Err(self.failed(Error::General(format!(
                    "continuation token '{token}' was already sent"
                )))));
            }
            Some(token) => self.request.continuation_token = Some(token.to_string()),
        }

        Some(Ok(page))
    }

    fn failed(&self, source: Error) -> Error {
        Error::ListFailed {
            bucket: self.request.bucket.clone(),
            prefix: self.request.prefix.clone(),
            cursor: self.request.continuation_token.clone(),
            source: Box::new(source),
        }
    }
}

/// Totals of one listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListSummary {
    pub pages: usize,
    pub objects: usize,
    pub directories: usize,
    pub total_size_bytes: u64,
}

/// List the objects a selector names, delivering records to `sink`
///
/// Flat selectors use backend delimiter grouping; each common prefix becomes
/// one directory record the first time it is seen, and only keys at the
/// immediate level become object records. Records reach the sink in page
/// order, common prefixes of a page ahead of its objects.
pub async fn list_objects<S, K>(
    store: &S,
    selector: &Selector,
    options: &ListOptions,
    sink: &mut K,
) -> Result<ListSummary>
where
    S: ObjectStore + ?Sized,
    K: ResultSink + ?Sized,
{
    let plan = selector.list_plan();
    let mut pages = Pages::new(store, &plan).with_options(options);
    let mut dirs = DirectorySet::new();
    let mut summary = ListSummary::default();

    while let Some(page) = pages.next_page().await {
        let page = page?;

        if plan.exact_key.is_none() {
            for prefix in page.common_prefixes {
                if dirs.insert(&prefix) {
                    summary.directories += 1;
                    sink.directory(DirectoryRecord::new(prefix))?;
                }
            }
        }

        for object in page.objects {
            // Keys below the immediate level belong to a directory record.
            if selector.classify(&object.key) != Placement::Match || dirs.contains(&object.key) {
                continue;
            }
            summary.objects += 1;
            summary.total_size_bytes += object.size;
            sink.object(object)?;
        }
    }

    summary.pages = pages.fetched();
    Ok(summary)
}

/// List into a single collection, directories first
pub async fn list_buffered<S>(
    store: &S,
    selector: &Selector,
    options: &ListOptions,
) -> Result<(Vec<Record>, ListSummary)>
where
    S: ObjectStore + ?Sized,
{
    let mut sink = Buffered::new();
    let summary = list_objects(store, selector, options, &mut sink).await?;
    Ok((sink.into_records(), summary))
}
