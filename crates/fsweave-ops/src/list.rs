//! Enumeration on the task engine.

use std::convert::Infallible;
use std::sync::Arc;

use fsweave_core::Backend;
use fsweave_scan::{Listing, enumerate};

use crate::task::{TaskEngine, TaskHandle};

/// Handle of a background listing. Listings report no progress.
pub type ListHandle = TaskHandle<Infallible, Listing>;

/// Enumerate `path` in the background and deliver the whole listing at once.
///
/// Failing to open the directory is the task's error. A failure part way
/// through is a successful [`Listing`] whose `error` is set.
pub fn start_list<B>(
    engine: &TaskEngine,
    backend: Arc<B>,
    path: &str,
    follow_symlinks: bool,
) -> ListHandle
where
    B: Backend + ?Sized,
{
    let path = path.to_string();
    engine.submit(move |_| Ok(enumerate(backend.as_ref(), &path, follow_symlinks)?.collect_listing()))
}
