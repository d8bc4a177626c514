/// Execution classes used for spawn logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work whose result the user is waiting on (evaluation calls, file browser round trips).
	Interactive,
	/// Follow-up work nobody blocks on (package refreshes, buffered file flushes).
	Background,
	/// Blocking disk I/O on the blocking pool (document persistence).
	IoBlocking,
	/// The evaluator itself, on its dedicated thread.
	CpuBlocking,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::IoBlocking => "io_blocking",
			Self::CpuBlocking => "cpu_blocking",
		}
	}
}
