//! Activation records for the RoboBASIC evaluator.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// The storage location a variable binding denotes.
///
/// A by-reference parameter holds a [`Slot::share`] of the caller's slot,
/// so both bindings read and write the same value. Slots are deliberately
/// not `Clone`: sharing must be spelled out.
#[derive(Debug)]
pub struct Slot(Rc<RefCell<Value>>);

impl Slot {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Another handle to the same storage.
    pub fn share(&self) -> Slot {
        Slot(Rc::clone(&self.0))
    }

    /// Whether both handles denote the same storage.
    pub fn same_storage(&self, other: &Slot) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    /// Mutate the stored value in place.
    pub fn update<T>(&self, f: impl FnOnce(&mut Value) -> T) -> T {
        f(&mut self.0.borrow_mut())
    }
}

/// A single activation record.
#[derive(Debug)]
struct Frame {
    function: String,
    /// Line of the call that created this frame.
    call_line: u32,
    bindings: BTreeMap<String, Slot>,
}

/// Saved contents of the top frame; see [`CallStack::snapshot`].
#[derive(Debug)]
pub struct FrameSnapshot {
    entries: Vec<(String, Slot, Value)>,
}

/// Activation records with push/pop semantics.
///
/// Variables resolve in the top frame only: the language has no lexical
/// nesting, so a callee never sees its caller's locals except through
/// reference parameters.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame for `function`, called from `caller_line`.
    pub fn push_frame(&mut self, function: &str, caller_line: u32) {
        self.frames.push(Frame {
            function: function.to_string(),
            call_line: caller_line,
            bindings: BTreeMap::new(),
        });
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the top frame. An existing binding is overwritten in
    /// place, so every binding sharing its slot observes the new value.
    pub fn define_variable(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            match frame.bindings.get(name) {
                Some(slot) => slot.set(value),
                None => {
                    frame.bindings.insert(name.to_string(), Slot::new(value));
                }
            }
        }
    }

    /// Bind `name` in the top frame to an existing slot.
    pub fn bind_slot(&mut self, name: &str, slot: Slot) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name.to_string(), slot);
        }
    }

    pub fn get_variable(&self, name: &str) -> EvalResult<Value> {
        self.lookup(name).map(Slot::get)
    }

    /// A shared handle to the slot bound to `name`.
    pub fn slot(&self, name: &str) -> EvalResult<Slot> {
        self.lookup(name).map(Slot::share)
    }

    /// `name[index] = element`, creating the array when `name` is unbound.
    pub fn assign_element(&mut self, name: &str, index: i64, element: &Value) -> EvalResult<()> {
        match self.lookup(name) {
            Ok(slot) => slot.update(|array| array.set_element(index, element)),
            Err(_) => {
                let mut array = Value::array_for(element)?;
                array.set_element(index, element)?;
                self.define_variable(name, array);
                Ok(())
            }
        }
    }

    fn lookup(&self, name: &str) -> EvalResult<&Slot> {
        self.frames
            .last()
            .and_then(|frame| frame.bindings.get(name))
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    /// Save every binding of the top frame together with its current value.
    pub fn snapshot(&self) -> FrameSnapshot {
        let entries = self
            .frames
            .last()
            .map(|frame| {
                frame
                    .bindings
                    .iter()
                    .map(|(name, slot)| (name.clone(), slot.share(), slot.get()))
                    .collect()
            })
            .unwrap_or_default();
        FrameSnapshot { entries }
    }

    /// Put the top frame back the way [`snapshot`](Self::snapshot) found it:
    /// same names, same slots, same values.
    pub fn restore(&mut self, snapshot: FrameSnapshot) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings = snapshot
                .entries
                .into_iter()
                .map(|(name, slot, value)| {
                    slot.set(value);
                    (name, slot)
                })
                .collect();
        }
    }

    /// Render a backtrace, most recent frame first: `name (line N)` per
    /// frame. With `limit`, only the `limit` most recent frames are shown.
    pub fn stack_trace(&self, current_line: u32, limit: Option<usize>) -> String {
        let mut lines = Vec::with_capacity(self.frames.len());
        let mut line = current_line;
        for frame in self.frames.iter().rev() {
            lines.push(format!("{} (line {})", frame.function, line));
            line = frame.call_line;
        }
        if let Some(limit) = limit {
            if lines.len() > limit {
                lines.truncate(limit);
                lines.push("...".to_string());
            }
        }
        lines.join("\n")
    }
}
