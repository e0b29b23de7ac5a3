use rayon::prelude::*;

/// Whether the search may fan out over the rayon pool.
///
/// The pool itself is set up by the caller from `n_threads`; this flag only
/// picks between a parallel and a plain iterator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// - 0 = auto (parallel if the current pool has more than one thread)
    /// - 1 = sequential
    /// - >1 = parallel
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over `items`, preserving input order in the output.
    pub fn maybe_par_map<T, B, F>(self, items: &[T], f: F) -> Vec<B>
    where
        T: Sync,
        B: Send,
        F: Fn(&T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }
}
