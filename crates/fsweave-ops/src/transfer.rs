//! Single-entry copy and move.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use fsweave_core::{
    Backend, CancelToken, CopyFlags, FsError, FsResult, Location, OverwritePolicy, RawFileType,
    TransferMode, TransferOutcome, TransferProgress, TransferResult,
};

use crate::task::{TaskEngine, TaskHandle, TaskId};

/// Handle of a running copy or move.
pub type TransferHandle = TaskHandle<TransferProgress, TransferOutcome>;

/// Turns cumulative byte counts into `{delta, cumulative, total}` ticks.
///
/// The reported cumulative value never decreases.
#[derive(Debug, Clone, Default)]
pub struct ProgressMeter {
    previous: u64,
    total: Option<u64>,
    ticks: u64,
}

impl ProgressMeter {
    /// Start a meter with an optionally known total.
    pub fn new(total: Option<u64>) -> Self {
        Self {
            previous: 0,
            total,
            ticks: 0,
        }
    }

    /// Fold one backend tick. A `total` of 0 leaves the known total alone.
    pub fn tick(&mut self, cumulative: u64, total: u64) -> TransferProgress {
        let cumulative = cumulative.max(self.previous);
        let delta = cumulative - self.previous;
        self.previous = cumulative;
        if total > 0 {
            self.total = Some(total);
        }
        self.ticks += 1;

        TransferProgress {
            delta,
            cumulative,
            total: self.total.unwrap_or(0),
        }
    }

    /// The single closing tick of an empty transfer the backend never
    /// reported on. Bytes the backend did not report are never invented.
    pub fn finish(&mut self) -> Option<TransferProgress> {
        if self.ticks > 0 || self.total != Some(0) {
            return None;
        }
        Some(self.tick(0, 0))
    }

    /// Bytes transferred so far.
    pub fn transferred(&self) -> u64 {
        self.previous
    }

    /// Total bytes, when known.
    pub fn total(&self) -> Option<u64> {
        self.total
    }
}

/// One in-flight copy or move.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub id: TaskId,
    pub source: Location,
    pub dest: Location,
    pub mode: TransferMode,
    pub policy: OverwritePolicy,
    pub token: CancelToken,
    meter: ProgressMeter,
}

impl TransferTask {
    pub fn new(
        id: TaskId,
        source: Location,
        dest: Location,
        mode: TransferMode,
        policy: OverwritePolicy,
        token: CancelToken,
    ) -> Self {
        Self {
            id,
            source,
            dest,
            mode,
            policy,
            token,
            meter: ProgressMeter::default(),
        }
    }

    /// Bytes transferred so far.
    pub fn bytes_transferred(&self) -> u64 {
        self.meter.transferred()
    }

    /// Total bytes, when known.
    pub fn bytes_total(&self) -> Option<u64> {
        self.meter.total()
    }

    /// Run the transfer to completion on the current thread.
    ///
    /// The token is marked complete once the result is known, so later
    /// cancellation requests are no-ops.
    pub fn run<B>(
        mut self,
        backend: &B,
        preserve_metadata: bool,
        emit: &mut dyn FnMut(TransferProgress),
    ) -> TransferResult
    where
        B: Backend + ?Sized,
    {
        debug!(
            task_id = %self.id,
            source = %self.source,
            dest = %self.dest,
            mode = %self.mode,
            "transfer started"
        );

        let result = self.execute(backend, preserve_metadata, emit);
        let result = match result {
            Err(_) if self.token.is_cancelled() => Err(FsError::Cancelled),
            other => other,
        };
        self.token.complete();

        match &result {
            Ok(outcome) => debug!(
                task_id = %self.id,
                bytes = outcome.bytes_transferred,
                "transfer finished"
            ),
            Err(err) => debug!(task_id = %self.id, "transfer failed: {err}"),
        }
        result
    }

    fn execute<B>(
        &mut self,
        backend: &B,
        preserve_metadata: bool,
        emit: &mut dyn FnMut(TransferProgress),
    ) -> TransferResult
    where
        B: Backend + ?Sized,
    {
        if self.token.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        let info = backend.query_info(&self.source, false)?;

        if self.mode != TransferMode::Move {
            if info.is_symlink {
                let target = info.symlink_target.ok_or_else(|| {
                    FsError::backend(format!("{}: symlink target is unreadable", self.source))
                })?;
                self.replace_or_refuse(backend)?;
                backend.make_symlink(&self.dest, Path::new(&target))?;
                return Ok(self.outcome());
            }

            if info.file_type == RawFileType::Directory {
                create_directory(backend, &self.dest, self.policy)?;
                return Ok(self.outcome());
            }
        }

        if !self.policy.allows_overwrite() && backend.exists(&self.dest)? {
            return Err(FsError::already_exists(&self.dest));
        }

        let sized = info.file_type == RawFileType::Regular && !info.is_symlink;
        self.meter = ProgressMeter::new(sized.then(|| u64::try_from(info.size).ok()).flatten());
        let flags = CopyFlags::new(self.policy, preserve_metadata);
        let task_id = self.id;
        let meter = &mut self.meter;
        let mut sink = |cumulative: u64, total: u64| {
            let progress = meter.tick(cumulative, total);
            trace!(
                task_id = %task_id,
                delta = progress.delta,
                cumulative = progress.cumulative,
                total = progress.total,
                "progress"
            );
            emit(progress);
        };

        match self.mode {
            TransferMode::Move => {
                backend.move_to(&self.source, &self.dest, flags, &self.token, &mut sink)?
            }
            TransferMode::Copy | TransferMode::BatchItem => {
                backend.copy(&self.source, &self.dest, flags, &self.token, &mut sink)?
            }
        }

        if let Some(last) = self.meter.finish() {
            emit(last);
        }
        Ok(self.outcome())
    }

    /// Clear an existing destination when overwriting, refuse otherwise.
    fn replace_or_refuse<B>(&self, backend: &B) -> FsResult<()>
    where
        B: Backend + ?Sized,
    {
        if !backend.exists(&self.dest)? {
            return Ok(());
        }
        if self.policy.allows_overwrite() {
            backend.delete(&self.dest)
        } else {
            Err(FsError::already_exists(&self.dest))
        }
    }

    fn outcome(&self) -> TransferOutcome {
        TransferOutcome {
            source: self.source.to_string(),
            dest: self.dest.to_string(),
            mode: self.mode,
            bytes_transferred: self.meter.transferred(),
            bytes_total: self.meter.total(),
        }
    }
}


/// Create `dest` for a directory source.
///
/// Overwriting accepts a directory already at `dest`; any other existing
/// entry there is still `AlreadyExists`.
pub(crate) fn create_directory<B>(
    backend: &B,
    dest: &Location,
    policy: OverwritePolicy,
) -> FsResult<()>
where
    B: Backend + ?Sized,
{
    match backend.make_directory_with_parents(dest) {
        Err(FsError::AlreadyExists { .. }) if policy.allows_overwrite() => {
            match backend.query_info(dest, true)?.file_type {
                RawFileType::Directory => Ok(()),
                _ => Err(FsError::already_exists(dest)),
            }
        }
        other => other,
    }
}

/// Start copying `source` to `dest`.
///
/// Directories are created at `dest` without their contents. Symlinks are
/// recreated with the same target. Regular files are copied with progress.
pub fn start_copy<B>(
    engine: &TaskEngine,
    backend: Arc<B>,
    source: &str,
    dest: &str,
    policy: OverwritePolicy,
    token: CancelToken,
) -> TransferHandle
where
    B: Backend + ?Sized,
{
    start_transfer(engine, backend, source, dest, TransferMode::Copy, policy, token)
}

/// Start moving `source` to `dest`. An existing destination is an error.
pub fn start_move<B>(
    engine: &TaskEngine,
    backend: Arc<B>,
    source: &str,
    dest: &str,
    token: CancelToken,
) -> TransferHandle
where
    B: Backend + ?Sized,
{
    start_transfer(
        engine,
        backend,
        source,
        dest,
        TransferMode::Move,
        OverwritePolicy::FailIfExists,
        token,
    )
}

fn start_transfer<B>(
    engine: &TaskEngine,
    backend: Arc<B>,
    source: &str,
    dest: &str,
    mode: TransferMode,
    policy: OverwritePolicy,
    token: CancelToken,
) -> TransferHandle
where
    B: Backend + ?Sized,
{
    let source = source.to_string();
    let dest = dest.to_string();
    let preserve_metadata = engine.config().preserve_metadata;

    engine.submit(move |progress| {
        let resolved = Location::parse(&source).and_then(|s| Ok((s, Location::parse(&dest)?)));
        let (source, dest) = match resolved {
            Ok(pair) => pair,
            Err(err) => {
                token.complete();
                return Err(err);
            }
        };

        let task = TransferTask::new(progress.task_id(), source, dest, mode, policy, token);
        task.run(backend.as_ref(), preserve_metadata, &mut |tick| {
            progress.emit(tick);
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_computes_deltas() {
        let mut meter = ProgressMeter::new(Some(100));
        assert_eq!(
            meter.tick(40, 100),
            TransferProgress {
                delta: 40,
                cumulative: 40,
                total: 100
            }
        );
        assert_eq!(meter.tick(100, 100).delta, 60);
        assert_eq!(meter.finish(), None);
    }

    #[test]
    fn test_meter_never_goes_backwards() {
        let mut meter = ProgressMeter::new(None);
        meter.tick(50, 0);
        let tick = meter.tick(30, 0);
        assert_eq!(tick.delta, 0);
        assert_eq!(tick.cumulative, 50);
    }

    #[test]
    fn test_meter_unknown_total_reports_zero() {
        let mut meter = ProgressMeter::new(None);
        assert_eq!(meter.tick(10, 0).total, 0);
        assert_eq!(meter.finish(), None);
    }

    #[test]
    fn test_meter_closes_empty_transfer() {
        let mut meter = ProgressMeter::new(Some(0));
        let last = meter.finish().unwrap();
        assert_eq!((last.delta, last.cumulative, last.total), (0, 0, 0));
        assert_eq!(meter.finish(), None);
    }

    #[test]
    fn test_meter_never_invents_bytes() {
        let mut meter = ProgressMeter::new(Some(100));
        meter.tick(90, 100);
        assert_eq!(meter.finish(), None);
        assert_eq!(meter.transferred(), 90);

        let mut silent = ProgressMeter::new(Some(1000));
        assert_eq!(silent.finish(), None);
        assert_eq!(silent.transferred(), 0);
    }

    #[test]
    fn test_backend_total_overrides_queried_size() {
        let mut meter = ProgressMeter::new(Some(10));
        assert_eq!(meter.tick(5, 20).total, 20);
        assert_eq!(meter.total(), Some(20));
    }
}
