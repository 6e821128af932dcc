// Candidate motion vectors, in search order.

use super::config::MAX_SEARCH_RADIUS;

/// Number of candidates for radius 10: the full 21x21 square.
pub const VECTOR_COUNT: usize = ((2 * MAX_SEARCH_RADIUS + 1) * (2 * MAX_SEARCH_RADIUS + 1)) as usize;

/// Ordered candidate offsets.
///
/// Entry 0 is `(0, 0)`; then each ring `s = 1..=10` (points with
/// `max(|x|, |y|) == s`) in row-major order, `y` outer and `x` inner. The
/// order decides ties and which candidates fit in the search budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorTable {
    vectors: Vec<(i32, i32)>,
}

impl VectorTable {
    pub fn new() -> Self {
        let mut vectors = Vec::with_capacity(VECTOR_COUNT);
        vectors.push((0, 0));
        for s in 1..=MAX_SEARCH_RADIUS {
            for y in -s..=s {
                for x in -s..=s {
                    if x.abs() == s || y.abs() == s {
                        vectors.push((x, y));
                    }
                }
            }
        }
        Self { vectors }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(i32, i32)> {
        self.vectors.get(index).copied()
    }

    /// Candidates after the zero vector.
    pub fn candidates(&self) -> &[(i32, i32)] {
        &self.vectors[1..]
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.vectors.iter().copied()
    }
}

impl Default for VectorTable {
    fn default() -> Self {
        Self::new()
    }
}
