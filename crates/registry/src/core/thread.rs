//! Thread identity and diagnostic reports for the shared-instance protocol.

use std::backtrace::Backtrace;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::bean_type::{BeanType, join_path};

/// Marker value for "no thread"; real ids start at 1.
pub(crate) const NO_THREAD: u64 = 0;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
	static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Returns a process-unique, non-zero id for the calling thread.
pub fn current_thread_id() -> u64 {
	THREAD_ID.with(|id| *id)
}

/// Snapshot of what a thread was doing, attached to creation diagnostics.
#[derive(Debug, Clone)]
pub struct ThreadReport {
	pub id: u64,
	pub name: Option<String>,
	/// Beans under construction on that thread, outermost first.
	pub creation_path: Vec<BeanType>,
	pub backtrace: Option<Arc<Backtrace>>,
}

impl ThreadReport {
	/// Captures the calling thread.
	pub(crate) fn capture_current(with_backtrace: bool) -> Self {
		Self {
			id: current_thread_id(),
			name: std::thread::current().name().map(str::to_owned),
			creation_path: crate::guard::creation_path(),
			backtrace: with_backtrace.then(|| Arc::new(Backtrace::force_capture())),
		}
	}

	/// Placeholder for a thread whose report is no longer available.
	pub(crate) fn unknown(id: u64) -> Self {
		Self {
			id,
			name: None,
			creation_path: Vec::new(),
			backtrace: None,
		}
	}
}

/// `{}` prints the header line; `{:#}` appends the backtrace when captured.
impl std::fmt::Display for ThreadReport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "thread #{}", self.id)?;
		if let Some(name) = &self.name {
			write!(f, " ({name})")?;
		}
		if !self.creation_path.is_empty() {
			write!(f, " building [{}]", join_path(&self.creation_path))?;
		}
		if f.alternate()
			&& let Some(bt) = &self.backtrace
		{
			write!(f, "\n{bt}")?;
		}
		Ok(())
	}
}
