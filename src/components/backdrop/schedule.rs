//! Frame-driven timers.
//!
//! Both timers are polled with the animation frame timestamp instead of
//! registering browser callbacks, which keeps them cancellable by plain
//! assignment and testable without a window.

/// Collapses a burst of events into one, delivered after a quiet period.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
	quiet_ms: f64,
	pending: Option<(T, f64)>,
}

impl<T> Debouncer<T> {
	pub fn new(quiet_ms: f64) -> Self {
		Self {
			quiet_ms,
			pending: None,
		}
	}

	/// Record an event, replacing any pending one and restarting the wait.
	pub fn trigger(&mut self, value: T, now_ms: f64) {
		self.pending = Some((value, now_ms));
	}

	pub fn is_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// Take the latest value once `quiet_ms` has passed since it was triggered.
	pub fn poll(&mut self, now_ms: f64) -> Option<T> {
		match &self.pending {
			Some((_, at)) if now_ms - *at >= self.quiet_ms => self.pending.take().map(|(v, _)| v),
			_ => None,
		}
	}
}

/// One-shot deadline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScheduledTask {
	due_ms: Option<f64>,
}

impl ScheduledTask {
	pub fn at(due_ms: f64) -> Self {
		Self { due_ms: Some(due_ms) }
	}

	pub fn schedule(&mut self, due_ms: f64) {
		self.due_ms = Some(due_ms);
	}

	pub fn cancel(&mut self) {
		self.due_ms = None;
	}

	pub fn is_scheduled(&self) -> bool {
		self.due_ms.is_some()
	}

	/// True exactly once, on the first poll at or after the deadline.
	pub fn poll(&mut self, now_ms: f64) -> bool {
		match self.due_ms {
			Some(due) if now_ms >= due => {
				self.due_ms = None;
				true
			}
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn burst_collapses_to_last_value() {
		let mut d = Debouncer::new(200.0);
		d.trigger((800, 600), 0.0);
		d.trigger((700, 600), 50.0);
		d.trigger((640, 480), 120.0);
		assert_eq!(d.poll(250.0), None);
		assert_eq!(d.poll(320.0), Some((640, 480)));
		assert_eq!(d.poll(1000.0), None);
		assert!(!d.is_pending());
	}

	#[test]
	fn task_fires_once() {
		let mut t = ScheduledTask::at(1500.0);
		assert!(!t.poll(1000.0));
		assert!(t.poll(1600.0));
		assert!(!t.poll(1700.0));
		assert!(!t.is_scheduled());
	}

	#[test]
	fn cancelled_task_never_fires() {
		let mut t = ScheduledTask::at(10.0);
		t.cancel();
		assert!(!t.poll(100.0));
		t.schedule(200.0);
		assert!(t.poll(200.0));
	}
}
