//! [`OperationList`]: an ordered set of operations applied atomically to
//! every chunk that passes through the consumer.

use facq_core::Result;
use facq_stream_data::StreamData;

use crate::traits::Operation;
use facq_buffer::Chunk;

/// An ordered list of [`Operation`]s, started and stopped as a unit.
///
/// [`Self::start`] is transactional: if operation `k` fails to start,
/// operations `0..k` are rolled back (each has [`Operation::stop`] called on
/// it) before the error is returned, and no operation beyond `k` is started.
/// [`Self::stop`] always stops every operation regardless of individual
/// failures, surfacing only the first error encountered.
#[derive(Default)]
pub struct OperationList {
    operations: Vec<Box<dyn Operation>>,
}

impl OperationList {
    /// Builds an empty list.
    pub fn new() -> Self {
        OperationList::default()
    }

    /// Appends an operation to the end of the list.
    pub fn push(&mut self, operation: Box<dyn Operation>) {
        self.operations.push(operation);
    }

    /// Number of operations in the list.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Starts every operation in order. On the first failure, stops every
    /// operation started so far (in order) and returns the original error.
    pub fn start(&mut self, stream_data: &StreamData) -> Result<()> {
        for started in 0..self.operations.len() {
            if let Err(err) = self.operations[started].start(stream_data) {
                for rollback in (0..started).rev() {
                    let _ = self.operations[rollback].stop(stream_data);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Stops every operation, even if some fail. Returns the first error
    /// encountered, if any.
    pub fn stop(&mut self, stream_data: &StreamData) -> Result<()> {
        let mut first_err = None;
        for operation in self.operations.iter_mut() {
            if let Err(err) = operation.stop(stream_data) {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Applies every operation, in insertion order, to `chunk`. Stops at the
    /// first failure and returns it, naming the failing operation.
    pub fn apply(&mut self, chunk: &mut Chunk, stream_data: &StreamData) -> Result<()> {
        for operation in self.operations.iter_mut() {
            operation
                .apply(chunk, stream_data)
                .map_err(|err| err.into_operation(operation.name().to_string()))?;
        }
        Ok(())
    }
}
