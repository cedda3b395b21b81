//! Monotonic counters behind sequence fields.

use parking_lot::Mutex;

#[derive(Debug)]
struct SequenceState {
	first: i64,
	current: i64,
	started: bool,
}

/// Thread-safe counter yielding `first`, `first + 1`, ... on successive
/// calls to [`next`](Sequence::next).
///
/// A factory owns one sequence per sequence field, shared by every
/// blueprint built from that factory.
#[derive(Debug)]
pub struct Sequence {
	state: Mutex<SequenceState>,
}

impl Sequence {
	pub fn new(first: i64) -> Self {
		Self {
			state: Mutex::new(SequenceState {
				first,
				current: first,
				started: false,
			}),
		}
	}

	pub fn first(&self) -> i64 {
		self.state.lock().first
	}

	/// Advances the counter and returns the new value.
	///
	/// Overflow past `i64::MAX` is not handled.
	pub fn next(&self) -> i64 {
		let mut state = self.state.lock();
		if state.started {
			state.current += 1;
		} else {
			state.current = state.first;
			state.started = true;
		}
		state.current
	}

	/// Returns the current value without advancing.
	pub fn peek(&self) -> i64 {
		let state = self.state.lock();
		if state.started {
			state.current
		} else {
			state.first
		}
	}

	/// Resets to the unstarted state, so the next call yields `first` again.
	///
	/// Meant for isolating test cases; callers racing with `next` may
	/// observe a value twice.
	pub fn rewind(&self) {
		let mut state = self.state.lock();
		state.current = state.first;
		state.started = false;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashSet;
	use std::sync::Arc;

	#[rstest]
	#[case(1)]
	#[case(0)]
	#[case(-5)]
	fn test_next_counts_up_from_first(#[case] first: i64) {
		let seq = Sequence::new(first);
		let values: Vec<i64> = (0..4).map(|_| seq.next()).collect();
		assert_eq!(values, vec![first, first + 1, first + 2, first + 3]);
	}

	#[rstest]
	fn test_peek_does_not_advance() {
		let seq = Sequence::new(10);
		assert_eq!(seq.peek(), 10);
		assert_eq!(seq.next(), 10);
		assert_eq!(seq.peek(), 10);
		assert_eq!(seq.next(), 11);
		assert_eq!(seq.peek(), 11);
	}

	#[rstest]
	fn test_rewind_restarts_at_first() {
		let seq = Sequence::new(1);
		seq.next();
		seq.next();
		seq.rewind();
		assert_eq!(seq.peek(), 1);
		assert_eq!(seq.next(), 1);
		assert_eq!(seq.next(), 2);
	}

	#[rstest]
	fn test_concurrent_next_has_no_duplicates_or_gaps() {
		let seq = Arc::new(Sequence::new(1));
		let threads = 8;
		let per_thread = 250;

		let seen: Vec<i64> = std::thread::scope(|scope| {
			let handles: Vec<_> = (0..threads)
				.map(|_| {
					let seq = Arc::clone(&seq);
					scope.spawn(move || (0..per_thread).map(|_| seq.next()).collect::<Vec<_>>())
				})
				.collect();
			handles
				.into_iter()
				.flat_map(|h| h.join().unwrap())
				.collect()
		});

		let unique: HashSet<i64> = seen.iter().copied().collect();
		let total = (threads * per_thread) as i64;
		assert_eq!(unique.len() as i64, total);
		assert_eq!(unique.iter().min(), Some(&1));
		assert_eq!(unique.iter().max(), Some(&total));
	}
}
