//! Bounded accumulator for metric paths awaiting a status update

/// An ordered batch of metric paths, bounded by `capacity`.
///
/// Paths are kept in insertion order. Once `push` reports the batch as full the
/// caller is expected to `take` it before pushing again.
#[derive(Debug)]
pub struct PathBatch {
    paths: Vec<String>,
    capacity: usize,
}

impl PathBatch {
    /// Create an empty batch.
    ///
    /// # Arguments
    /// * `capacity` - Number of paths that makes the batch full (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            paths: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a path. Returns `true` when the batch has reached capacity.
    pub fn push(&mut self, path: String) -> bool {
        self.paths.push(path);
        self.is_full()
    }

    /// Take the accumulated paths, leaving an empty batch of the same capacity.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::replace(&mut self.paths, Vec::with_capacity(self.capacity))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.paths.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut batch = PathBatch::new(2);

        assert!(!batch.push("m1".to_string()));
        assert!(batch.push("m2".to_string()));
        assert_eq!(batch.take(), vec!["m1".to_string(), "m2".to_string()]);
    }

    #[test]
    fn test_take_resets_batch() {
        let mut batch = PathBatch::new(3);
        batch.push("a".to_string());
        batch.push("b".to_string());

        assert_eq!(batch.take(), vec!["a".to_string(), "b".to_string()]);
        assert!(batch.is_empty());
        assert!(batch.take().is_empty());

        // Capacity survives the take.
        assert!(!batch.push("c".to_string()));
        assert!(!batch.push("d".to_string()));
        assert!(batch.push("e".to_string()));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut batch = PathBatch::new(0);
        assert!(batch.push("only".to_string()));
    }
}
