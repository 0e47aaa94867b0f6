//! Ordered construction of sub-entities (timers, steps, ingredients).

use std::num::NonZeroUsize;
use std::thread;

/// When and how wide sub-entity assembly fans out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyConfig {
    /// Inputs shorter than this are assembled on the calling thread.
    pub parallel_threshold: usize,
    /// Worker threads used above the threshold.
    pub workers: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 64,
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
        }
    }
}

/// Maps inputs to outputs, preserving input order.
///
/// Large inputs are split into contiguous chunks; each worker owns the slots
/// of its chunk exclusively and the result is read only after every worker
/// has joined.
#[derive(Clone, Debug, Default)]
pub struct Assembler {
    config: AssemblyConfig,
}

impl Assembler {
    pub fn new(config: AssemblyConfig) -> Self {
        Self { config }
    }

    /// Map every input; the output has exactly `inputs.len()` entries in input order.
    pub fn map_ordered<T, U, F>(&self, inputs: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        let workers = self.config.workers.max(1);
        if inputs.is_empty() || workers == 1 || inputs.len() < self.config.parallel_threshold {
            return inputs.iter().map(f).collect();
        }

        let chunk = inputs.len().div_ceil(workers);
        let mut slots: Vec<Option<U>> = Vec::with_capacity(inputs.len());
        slots.resize_with(inputs.len(), || None);

        let f = &f;
        thread::scope(|scope| {
            for (chunk_in, chunk_out) in inputs.chunks(chunk).zip(slots.chunks_mut(chunk)) {
                scope.spawn(move || {
                    for (input, slot) in chunk_in.iter().zip(chunk_out.iter_mut()) {
                        *slot = Some(f(input));
                    }
                });
            }
        });

        slots.into_iter().flatten().collect()
    }

    /// Like [`map_ordered`](Self::map_ordered), failing with the first error in input order.
    pub fn try_map_ordered<T, U, E, F>(&self, inputs: &[T], f: F) -> Result<Vec<U>, E>
    where
        T: Sync,
        U: Send,
        E: Send,
        F: Fn(&T) -> Result<U, E> + Sync,
    {
        self.map_ordered(inputs, f).into_iter().collect()
    }
}
