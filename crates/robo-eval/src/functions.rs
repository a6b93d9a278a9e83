//! Function lookup table built once per program.

use crate::error::{EvalError, RuntimeError};
use robo_types::ast::{Function, Program};
use std::collections::BTreeMap;

/// Name → declaration map borrowing from the program. Declaration order is
/// kept for prepared-block emission.
#[derive(Debug)]
pub struct FunctionTable<'p> {
    by_name: BTreeMap<&'p str, &'p Function>,
    order: Vec<&'p Function>,
}

impl<'p> FunctionTable<'p> {
    /// Index every function of `program`. A second declaration of a name
    /// fails at its own line.
    pub fn build(program: &'p Program) -> Result<Self, RuntimeError> {
        let mut by_name = BTreeMap::new();
        let mut order = Vec::with_capacity(program.functions.len());
        for function in &program.functions {
            let name = function.name.name.as_str();
            if by_name.insert(name, function).is_some() {
                return Err(RuntimeError::new(
                    EvalError::DuplicateDefinition(name.to_string()),
                    function.span.start_line,
                ));
            }
            order.push(function);
        }
        Ok(Self { by_name, order })
    }

    pub fn get(&self, name: &str) -> Option<&'p Function> {
        self.by_name.get(name).copied()
    }

    /// Functions in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = &'p Function> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
