//! Iterator adapter over the drive protocol

use super::errors::GeneratorError;
use super::object::{GeneratorObject, GeneratorRef};
use super::signal::{DriveResult, ResumeSignal};
use super::Host;
use crate::runtime::value::Value;

/// Drive once with `Value(None)`: `Some` for a produced value, `None` on completion
pub fn step<H: Host + ?Sized>(
    generator: &mut GeneratorObject,
    host: &mut H,
) -> Result<Option<Value>, GeneratorError> {
    generator.advance(host).map(DriveResult::into_item)
}

/// [`step`] through a shared handle, as `for` loops and `list()` drive
/// generator values
pub fn step_shared<H: Host + ?Sized>(
    generator: &GeneratorRef,
    host: &mut H,
) -> Result<Option<Value>, GeneratorError> {
    generator
        .drive_with(host, ResumeSignal::none())
        .map(DriveResult::into_item)
}

/// Yields every produced value; a drive error is yielded once, then the
/// iterator is exhausted. The completion value is discarded.
pub struct GeneratorIter<'a, H: Host + ?Sized> {
    generator: GeneratorObject,
    host: &'a mut H,
    done: bool,
}

impl<'a, H: Host + ?Sized> GeneratorIter<'a, H> {
    pub fn new(generator: GeneratorObject, host: &'a mut H) -> Self {
        GeneratorIter {
            generator,
            host,
            done: false,
        }
    }

    pub fn generator(&self) -> &GeneratorObject {
        &self.generator
    }

    /// Give the generator object back, e.g. to terminate it early
    pub fn into_inner(self) -> GeneratorObject {
        self.generator
    }
}

impl<H: Host + ?Sized> Iterator for GeneratorIter<'_, H> {
    type Item = Result<Value, GeneratorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match step(&mut self.generator, &mut *self.host) {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<H: Host + ?Sized> std::iter::FusedIterator for GeneratorIter<'_, H> {}
