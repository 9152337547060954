//! Round-robin rotation cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared rotation cursor.
/// Holds the index of the most recently selected backend.
#[derive(Debug)]
pub struct RotationCursor {
    position: AtomicUsize,
    len: usize,
}

impl RotationCursor {
    /// Create a cursor over `len` backends. The first `advance()` returns 0.
    ///
    /// `len` must be at least 1; `BackendRegistry` guarantees this.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "rotation over an empty backend set");
        Self {
            position: AtomicUsize::new(len - 1),
            len,
        }
    }

    /// Move to the next backend and return its index.
    ///
    /// The read-modify-write is a single compare-and-swap loop, so concurrent
    /// callers observe one global sequence and never share a value within a
    /// cycle.
    pub fn advance(&self) -> usize {
        let mut prev = self.position.load(Ordering::Relaxed);
        loop {
            let next = (prev + 1) % self.len;
            match self.position.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(x) => prev = x,
            }
        }
    }

    /// Index handed out by the most recent `advance()`.
    pub fn current(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_round_robin() {
        let cursor = RotationCursor::new(3);
        let picks: Vec<usize> = (0..7).map(|_| cursor.advance()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(cursor.current(), 0);
    }

    #[test]
    fn follows_cycle_from_any_start() {
        let cursor = RotationCursor::new(4);
        cursor.advance();
        cursor.advance();
        let start = cursor.current();

        for k in 1..=10 {
            assert_eq!(cursor.advance(), (start + k) % 4);
        }
    }

    #[test]
    fn even_coverage() {
        let n = 3;
        let m = 11;
        let cursor = RotationCursor::new(n);
        let mut counts = vec![0usize; n];
        for _ in 0..m {
            counts[cursor.advance()] += 1;
        }
        for c in counts {
            assert!(c == m / n || c == m / n + 1, "uneven count {}", c);
        }
    }

    #[test]
    fn single_backend() {
        let cursor = RotationCursor::new(1);
        for _ in 0..5 {
            assert_eq!(cursor.advance(), 0);
        }
    }

    #[test]
    fn concurrent_advances_form_whole_cycles() {
        let n = 4;
        let threads = 8;
        let per_thread = 250;
        let cursor = Arc::new(RotationCursor::new(n));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cursor = cursor.clone();
                std::thread::spawn(move || {
                    (0..per_thread).map(|_| cursor.advance()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts = vec![0usize; n];
        for h in handles {
            for index in h.join().unwrap() {
                counts[index] += 1;
            }
        }

        // 2000 selections over 4 backends: exactly 500 each
        assert!(counts.iter().all(|&c| c == threads * per_thread / n));
        assert_eq!(cursor.current(), (threads * per_thread - 1) % n);
    }
}
