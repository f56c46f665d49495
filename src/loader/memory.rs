//! In-process loader backed by a table of prepared sources.
//!
//! Useful for embedding the engine without a filesystem and for driving
//! completion order precisely: a gated entry stays in flight until its
//! [`Gate`] is opened or failed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use tokio::sync::oneshot;

use super::{FetchRequest, ResourceLoader, Source};
use crate::dlog_trace;
use crate::error::FetchError;

type Outcome = Result<Source, FetchError>;

enum Entry {
    Ready(Source),
    Failing(FetchError),
    Gated(oneshot::Receiver<Outcome>),
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    fetches: Vec<String>,
    allow_missing: bool,
}

/// Loader serving sources registered ahead of time.
///
/// Clones share the same table, so a test can keep a handle after giving
/// the loader to an engine.
#[derive(Clone, Default)]
pub struct MemoryLoader {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryLoader {
    /// Loader that fails unknown names with [`FetchError::NotFound`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve an empty source for unknown names instead of failing.
    ///
    /// Handy when modules are defined directly by the host and the fetch
    /// only has to complete.
    pub fn allow_missing(self) -> Self {
        self.inner.borrow_mut().allow_missing = true;
        self
    }

    /// Serve `source` for `name`.
    pub fn insert(&self, name: &str, source: Source) {
        self.inner
            .borrow_mut()
            .entries
            .insert(name.to_string(), Entry::Ready(source));
    }

    /// Fail the fetch of `name` with `error`.
    pub fn fail(&self, name: &str, error: FetchError) {
        self.inner
            .borrow_mut()
            .entries
            .insert(name.to_string(), Entry::Failing(error));
    }

    /// Hold the fetch of `name` open until the returned gate is resolved.
    pub fn gate(&self, name: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.inner
            .borrow_mut()
            .entries
            .insert(name.to_string(), Entry::Gated(rx));
        Gate {
            name: name.to_string(),
            tx,
        }
    }

    /// How many times `name` was fetched.
    pub fn fetch_count(&self, name: &str) -> usize {
        self.inner
            .borrow()
            .fetches
            .iter()
            .filter(|fetched| fetched.as_str() == name)
            .count()
    }

    /// Every fetched name, in request order.
    pub fn fetched(&self) -> Vec<String> {
        self.inner.borrow().fetches.clone()
    }
}

impl ResourceLoader for MemoryLoader {
    fn fetch(&self, request: &FetchRequest) -> LocalBoxFuture<'static, Outcome> {
        let mut inner = self.inner.borrow_mut();
        inner.fetches.push(request.name.clone());
        dlog_trace!("MemoryLoader::fetch {}", request.name);

        let entry = inner.entries.remove(&request.name);
        match entry {
            Some(Entry::Ready(source)) => future::ready(Ok(source)).boxed_local(),
            Some(Entry::Failing(error)) => future::ready(Err(error)).boxed_local(),
            Some(Entry::Gated(rx)) => {
                let name = request.name.clone();
                async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(FetchError::Rejected(format!("gate for {} was dropped", name)))
                    })
                }
                .boxed_local()
            }
            None if inner.allow_missing => future::ready(Ok(Source::new())).boxed_local(),
            None => {
                future::ready(Err(FetchError::NotFound(request.locator.clone()))).boxed_local()
            }
        }
    }
}

/// Completion handle for a gated fetch.
pub struct Gate {
    name: String,
    tx: oneshot::Sender<Outcome>,
}

impl Gate {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Complete the fetch with `source`.
    pub fn open(self, source: Source) {
        let _ = self.tx.send(Ok(source));
    }

    /// Complete the fetch with `error`.
    pub fn fail(self, error: FetchError) {
        let _ = self.tx.send(Err(error));
    }
}
