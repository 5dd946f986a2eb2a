//! Per-activation slot storage
//!
//! A [`Frame`] holds one optional value per slot of a descriptor's
//! [`SlotTable`](crate::generator::descriptor::SlotTable). Slots start
//! unbound; reading an unbound slot is an `UnboundLocalError`, never a value.

use super::exception::Exception;
use super::value::Value;
use crate::generator::ir::SlotId;

/// Local variable storage for one function or generator activation
#[derive(Debug, Clone, Default)]
pub struct Frame {
    slots: Vec<Option<Value>>,
}

impl Frame {
    /// A frame with `size` unbound slots
    pub fn new(size: usize) -> Self {
        Frame {
            slots: vec![None; size],
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&Value> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Read a slot, raising `UnboundLocalError` when it has no value
    pub fn load(&self, slot: SlotId, name: &str) -> Result<Value, Exception> {
        self.get(slot)
            .cloned()
            .ok_or_else(|| Exception::unbound_local(name))
    }

    pub fn set(&mut self, slot: SlotId, value: Value) {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }
        self.slots[slot] = Some(value);
    }

    pub fn clear(&mut self, slot: SlotId) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, Option<&Value>)> {
        self.slots.iter().enumerate().map(|(i, v)| (i, v.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::exception::ExceptionKind;

    #[test]
    fn test_unbound_slot_raises() {
        let frame = Frame::new(2);
        let err = frame.load(1, "y").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::UnboundLocalError);
        assert!(err.message.unwrap().contains("'y'"));
    }

    #[test]
    fn test_set_then_clear() {
        let mut frame = Frame::new(1);
        frame.set(0, Value::Int(4));
        assert!(matches!(frame.load(0, "x"), Ok(Value::Int(4))));
        frame.clear(0);
        assert!(frame.get(0).is_none());
    }
}
