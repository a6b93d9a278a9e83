//! Nested call trace.
//!
//! One line per call and one per return:
//!
//! ```text
//! main() <entry point>
//! |   swap(&a=1, &b=2) <line 4>
//! |   return, &a=2, &b=1 <line 9>
//! return <line 5>
//! ```

use crate::error::EvalResult;
use crate::stack::Slot;
use crate::value::Value;
use robo_types::ast::Function;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const NESTING_MARK: &str = "|   ";

/// Writes the call trace to a sink. The sink is flushed and dropped once
/// the entry-point function returns.
pub struct Tracer {
    out: Option<Box<dyn Write>>,
    nesting: i64,
}

impl Tracer {
    pub fn new(out: impl Write + 'static) -> Self {
        Self {
            out: Some(Box::new(out)),
            nesting: -1,
        }
    }

    /// Trace into a newly created file at `path`.
    pub fn create(path: &Path) -> EvalResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }

    pub fn is_closed(&self) -> bool {
        self.out.is_none()
    }

    /// Record entry into `function` with its bound arguments.
    pub fn call(&mut self, function: &Function, args: &[Slot], line: u32) -> EvalResult<()> {
        self.nesting += 1;
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        let params: Vec<String> = function
            .params
            .iter()
            .zip(args)
            .map(|(param, slot)| {
                let amp = if param.is_reference() { "&" } else { "" };
                format!("{amp}{}={}", param.name.name, slot.get())
            })
            .collect();
        let site = if self.nesting == 0 {
            "<entry point>".to_string()
        } else {
            format!("<line {line}>")
        };
        writeln!(
            out,
            "{}{}({}) {site}",
            NESTING_MARK.repeat(self.nesting.max(0) as usize),
            function.name.name,
            params.join(", ")
        )?;
        Ok(())
    }

    /// Record the return from `function`: its result when non-void and the
    /// final values of its reference parameters.
    pub fn ret(
        &mut self,
        function: &Function,
        result: &Value,
        args: &[Slot],
        line: u32,
    ) -> EvalResult<()> {
        let indent = NESTING_MARK.repeat(self.nesting.max(0) as usize);
        self.nesting -= 1;
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        let mut text = format!("{indent}return");
        if !result.is_void() {
            text.push_str(&format!(" {result}"));
        }
        for (param, slot) in function.params.iter().zip(args) {
            if param.is_reference() {
                text.push_str(&format!(", &{}={}", param.name.name, slot.get()));
            }
        }
        writeln!(out, "{text} <line {line}>")?;
        if self.nesting < 0 {
            out.flush()?;
            self.out = None;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("nesting", &self.nesting)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robo_types::ast::{Block, Ident, Param};
    use robo_types::Span;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn function(name: &str, params: Vec<Param>) -> Function {
        Function {
            name: Ident::new(name, Span::line(1)),
            params,
            returns: None,
            body: Block::new(vec![]),
            span: Span::line(1),
        }
    }

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::line(1))
    }

    #[test]
    fn nested_call_and_return() {
        let sink = Shared::default();
        let mut tracer = Tracer::new(sink.clone());
        let main = function("main", vec![]);
        let swap = function(
            "swap",
            vec![Param::by_reference(ident("a")), Param::by_value(ident("b"))],
        );

        tracer.call(&main, &[], 1).unwrap();
        let a = Slot::new(Value::integer(1));
        let args = [a.share(), Slot::new(Value::integer(2))];
        tracer.call(&swap, &args, 4).unwrap();
        a.set(Value::integer(7));
        tracer.ret(&swap, &Value::integer(3), &args, 9).unwrap();
        tracer.ret(&main, &Value::void(), &[], 5).unwrap();

        assert_eq!(
            sink.text(),
            "main() <entry point>\n\
             |   swap(&a=1, b=2) <line 4>\n\
             |   return 3, &a=7 <line 9>\n\
             return <line 5>\n"
        );
        assert!(tracer.is_closed());
    }

    #[test]
    fn writes_after_close_are_dropped() {
        let sink = Shared::default();
        let mut tracer = Tracer::new(sink.clone());
        let main = function("main", vec![]);
        tracer.call(&main, &[], 1).unwrap();
        tracer.ret(&main, &Value::void(), &[], 2).unwrap();
        let before = sink.text();
        tracer.call(&main, &[], 1).unwrap();
        assert_eq!(sink.text(), before);
    }
}
