//! Task engine and filesystem operations for fsweave.
//!
//! Long operations run on a [`TaskEngine`] and report back through a
//! [`TaskHandle`]: zero or more progress events followed by exactly one
//! terminal result.
//!
//! - [`start_copy`] / [`start_move`]: single transfers with byte progress
//!   and a [`CancelToken`](fsweave_core::CancelToken)
//! - [`start_copy_batch`]: sequential copies that keep going past failures
//! - [`start_list`]: a directory listing built off the caller's thread
//! - [`WatchRegistry`]: one change subscription per watched path
//! - [`list_mounts`]: volumes and mounts as one classified list

mod batch;
mod fs_ops;
mod list;
mod mounts;
mod task;
mod transfer;
mod watch;

pub use batch::{BatchEvent, BatchHandle, BatchItem, BatchSummary, start_copy_batch};
pub use fs_ops::{
    DeleteEvent, DeleteHandle, count_children, default_handler, delete, disk_usage, exists,
    is_dir, make_directory, set_executable, start_delete_batch, stat,
};
pub use list::{ListHandle, start_list};
pub use mounts::{correlate, list_mounts};
pub use task::{ProgressEmitter, TaskEngine, TaskEvent, TaskHandle, TaskId};
pub use transfer::{ProgressMeter, TransferHandle, TransferTask, start_copy, start_move};
pub use watch::WatchRegistry;
