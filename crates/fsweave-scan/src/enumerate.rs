//! Lazy enumeration of a directory's immediate children.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fsweave_core::{Backend, FileRecord, FsError, FsResult, Location, RawEntries};

use crate::snapshot::build_record;

/// Records gathered from one enumeration.
///
/// When the enumeration stopped on a failing entry, `records` holds every
/// entry produced before it and `error` holds the failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub records: Vec<FileRecord>,
    pub error: Option<FsError>,
}

impl Listing {
    /// True if every entry was enumerated.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the partial records and surface the failure, if any.
    pub fn into_result(self) -> FsResult<Vec<FileRecord>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.records),
        }
    }
}

/// Iterator over the children of one directory.
///
/// Yields records in backend order. After the first `Err` it yields
/// nothing more.
pub struct Enumerator<'a> {
    parent: Location,
    entries: RawEntries<'a>,
    produced: usize,
    done: bool,
}

impl<'a> Enumerator<'a> {
    fn new(parent: Location, entries: RawEntries<'a>) -> Self {
        Self {
            parent,
            entries,
            produced: 0,
            done: false,
        }
    }

    /// The directory being enumerated.
    pub fn parent(&self) -> &Location {
        &self.parent
    }

    /// Drain the enumerator, keeping any records produced before a failure.
    pub fn collect_listing(self) -> Listing {
        let mut listing = Listing::default();
        for item in self {
            match item {
                Ok(record) => listing.records.push(record),
                Err(err) => listing.error = Some(err),
            }
        }
        listing
    }
}

impl Iterator for Enumerator<'_> {
    type Item = FsResult<FileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.entries.next() {
            Some(Ok(raw)) => {
                self.produced += 1;
                Some(Ok(build_record(&self.parent, raw)))
            }
            Some(Err(err)) => {
                warn!(
                    parent = %self.parent,
                    produced = self.produced,
                    "enumeration stopped: {err}"
                );
                self.done = true;
                Some(Err(err))
            }
            None => {
                debug!(parent = %self.parent, count = self.produced, "enumeration finished");
                self.done = true;
                None
            }
        }
    }
}

impl FusedIterator for Enumerator<'_> {}

/// Enumerate the children of `path`, which may be a plain path or a URI.
///
/// Failing to parse or open the directory is an `Err` from this call;
/// per-entry failures are yielded by the returned iterator.
pub fn enumerate<'a, B>(backend: &'a B, path: &str, follow_symlinks: bool) -> FsResult<Enumerator<'a>>
where
    B: Backend + ?Sized,
{
    let location = Location::parse(path)?;
    enumerate_location(backend, location, follow_symlinks)
}

/// Enumerate the children of an already resolved location.
pub fn enumerate_location<B>(
    backend: &B,
    location: Location,
    follow_symlinks: bool,
) -> FsResult<Enumerator<'_>>
where
    B: Backend + ?Sized,
{
    debug!(parent = %location, follow_symlinks, "opening directory");
    let entries = backend.enumerate_children(&location, follow_symlinks)?;
    Ok(Enumerator::new(location, entries))
}

/// Count the immediate children of a directory.
///
/// A failing entry ends the count early; the children seen so far are
/// returned.
pub fn count_children<B>(backend: &B, location: &Location) -> FsResult<usize>
where
    B: Backend + ?Sized,
{
    let mut count = 0;
    for entry in backend.enumerate_children(location, false)? {
        if let Err(err) = entry {
            warn!(parent = %location, count, "count stopped early: {err}");
            break;
        }
        count += 1;
    }
    Ok(count)
}
