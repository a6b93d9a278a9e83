//! Core statement and expression evaluator.
//!
//! Evaluation executes the program and, at the same time, writes its
//! RoboBASIC translation to the instruction log. What a node does is
//! governed by the [`Phase`] carried in its [`Cursor`]: `Live` nodes run
//! and emit, `Silent` nodes only run (callee bodies, loop iterations after
//! the first) and `Dry` nodes only emit (branches not taken, prepared
//! function bodies). Call markers are the exception: every executed call
//! writes one, whatever its phase.

use crate::config::Config;
use crate::emitter::{infix, joined, negated, Cursor, Emitter, Phase};
use crate::error::{EvalError, EvalResult, RuntimeError};
use crate::functions::FunctionTable;
use crate::input::InputTokens;
use crate::stack::{CallStack, Slot};
use crate::tracer::Tracer;
use crate::value::Value;
use robo_types::ast::*;
use std::io::{BufRead, Write};
use tracing::{debug, trace};

/// `Some` once a `return` has executed; executing blocks stop at the first one.
type Flow = Option<Value>;

/// Per-run evaluation context threaded through every call.
struct Cx<'t> {
    /// Line of the construct being evaluated.
    line: u32,
    trace: Option<&'t mut Tracer>,
}

/// Evaluates one program and accumulates its instruction log.
///
/// ```ignore
/// let mut interp = Interpreter::new(&program, Config::default())?;
/// interp.prepare_functions()?;
/// interp.run()?;
/// for line in interp.instruction_log() {
///     println!("{line}");
/// }
/// ```
pub struct Interpreter<'p> {
    functions: FunctionTable<'p>,
    stack: CallStack,
    log: Emitter,
    input: InputTokens,
    tracer: Option<Tracer>,
    config: Config,
    /// Line reached by the last run, kept for error reporting.
    line: u32,
    prepared: bool,
}

impl<'p> Interpreter<'p> {
    /// Load `program`. Duplicate function names fail here, before anything
    /// runs. Opens the trace file when one is configured.
    pub fn new(program: &'p Program, config: Config) -> Result<Self, RuntimeError> {
        let functions = FunctionTable::build(program)?;
        debug!(functions = functions.len(), "function table built");
        let tracer = match &config.trace {
            Some(path) => Some(Tracer::create(path).map_err(|e| RuntimeError::new(e, 0))?),
            None => None,
        };
        Ok(Self {
            functions,
            stack: CallStack::new(),
            log: Emitter::new(config.indent_width),
            input: InputTokens::stdin(),
            tracer,
            config,
            line: 0,
            prepared: false,
        })
    }

    /// Read `read` tokens from `reader` instead of standard input.
    pub fn with_input(mut self, reader: impl BufRead + 'static) -> Self {
        self.input = InputTokens::from_reader(reader);
        self
    }

    /// Write the call trace to `out`, replacing any configured trace file.
    pub fn with_trace_writer(mut self, out: impl Write + 'static) -> Self {
        self.tracer = Some(Tracer::new(out));
        self
    }

    // ══════════════════════════════════════════════════════════════════════
    // Public operations
    // ══════════════════════════════════════════════════════════════════════

    /// Execute `main` with no arguments. Its translation is bracketed by
    /// `MainProgram:` and `End`.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        debug!("run started");
        let mut tracer = self.tracer.take();
        let mut cx = Cx {
            line: self.line,
            trace: tracer.as_mut(),
        };
        let result = self.run_main(&mut cx);
        self.line = cx.line;
        self.tracer = tracer;
        result.map_err(|kind| self.fail(kind))?;
        debug!(instructions = self.log.len(), "run finished");
        Ok(())
    }

    fn run_main(&mut self, cx: &mut Cx<'_>) -> EvalResult<()> {
        self.log.label("MainProgram:");
        let main = self
            .functions
            .get("main")
            .ok_or_else(|| EvalError::UndeclaredFunction("main".to_string()))?;
        self.invoke(cx, main, Vec::new(), Cursor::body(Phase::Live))?;
        self.log.label("End");
        Ok(())
    }

    /// Serialize every function except `main` as a `<name>:` block closed
    /// by `Return`, in declaration order. Only the first call has effect.
    pub fn prepare_functions(&mut self) -> Result<(), RuntimeError> {
        if self.prepared {
            return Ok(());
        }
        self.prepared = true;
        debug!("preparing functions");
        let mut cx = Cx {
            line: self.line,
            trace: None,
        };
        let result = self.prepare_all(&mut cx);
        self.line = cx.line;
        result.map_err(|kind| self.fail(kind))?;
        debug!(instructions = self.log.len(), "functions prepared");
        Ok(())
    }

    fn prepare_all(&mut self, cx: &mut Cx<'_>) -> EvalResult<()> {
        let functions: Vec<&'p Function> = self
            .functions
            .declared()
            .filter(|f| f.name.name != "main")
            .collect();
        for function in functions {
            let name = function.name.name.as_str();
            trace!(function = name, "prepare");
            self.log.label(format!("{name}:"));
            self.stack.push_frame(name, cx.line);
            cx.line = function.span.start_line;
            for param in &function.params {
                let placeholder = Value::placeholder(param.kind, &param.name.name);
                self.stack.define_variable(&param.name.name, placeholder);
            }
            self.exec_block(cx, &function.body, Cursor::body(Phase::Dry))?;
            self.stack.pop_frame();
            self.log.label("Return");
        }
        Ok(())
    }

    /// Every instruction emitted so far.
    pub fn instruction_log(&self) -> &[String] {
        self.log.lines()
    }

    /// Line being executed when the last run stopped.
    pub fn current_line(&self) -> u32 {
        self.line
    }

    /// Value of `name` in the innermost live frame.
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.stack.get_variable(name).ok()
    }

    /// Backtrace of the frames still live, most recent first. A failed run
    /// leaves its frames in place so they can be reported.
    pub fn stack_trace(&self, limit: Option<usize>) -> String {
        self.stack
            .stack_trace(self.line, limit.or(self.config.backtrace_limit))
    }

    fn fail(&self, kind: EvalError) -> RuntimeError {
        let err = RuntimeError::new(kind, self.line);
        debug!(line = err.line, error = %err.kind, "evaluation failed");
        err
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    /// Run `function` in a fresh frame with `args` bound to its parameters.
    fn invoke(
        &mut self,
        cx: &mut Cx<'_>,
        function: &'p Function,
        args: Vec<Slot>,
        body: Cursor,
    ) -> EvalResult<Value> {
        let name = function.name.name.as_str();
        let call_line = cx.line;
        trace!(function = name, depth = self.stack.depth(), line = call_line, "enter");
        if let Some(tracer) = cx.trace.as_deref_mut() {
            tracer.call(function, &args, call_line)?;
        }
        self.stack.push_frame(name, call_line);
        cx.line = function.span.start_line;
        for (param, slot) in function.params.iter().zip(&args) {
            self.stack.bind_slot(&param.name.name, slot.share());
        }
        let result = self
            .exec_block(cx, &function.body, body)?
            .unwrap_or_else(Value::void);
        let return_line = cx.line;
        if let Some(tracer) = cx.trace.as_deref_mut() {
            tracer.ret(function, &result, &args, return_line)?;
        }
        self.stack.pop_frame();
        cx.line = call_line;
        trace!(function = name, "exit");
        Ok(result)
    }

    /// Evaluate a call site. The `name()` marker is written once the
    /// arguments are bound, for every call that runs as well as for dry
    /// ones. A dry call does not run the callee and yields a placeholder of
    /// its declared result kind.
    fn call(&mut self, cx: &mut Cx<'_>, call: &Call, at: Cursor) -> EvalResult<Value> {
        let name = call.name.name.as_str();
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UndeclaredFunction(name.to_string()))?;
        let args = self.gather_arguments(cx, function, &call.args, at)?;
        let marker = format!("{name}()");
        self.log.mark(at, &marker);
        if !at.phase.executes() {
            let kind = function.returns.unwrap_or(TypeKind::Integer);
            return Ok(Value::placeholder(kind, marker));
        }
        let result = self.invoke(cx, function, args, at.callee())?;
        Ok(result.with_text(marker))
    }

    fn gather_arguments(
        &mut self,
        cx: &mut Cx<'_>,
        function: &Function,
        args: &[Expr],
        at: Cursor,
    ) -> EvalResult<Vec<Slot>> {
        if args.len() != function.params.len() {
            return Err(EvalError::ArityMismatch {
                function: function.name.name.clone(),
                expected: function.params.len(),
                found: args.len(),
            });
        }
        let mut slots = Vec::with_capacity(args.len());
        for (param, arg) in function.params.iter().zip(args) {
            let slot = if param.is_reference() {
                let var = arg.as_identifier().ok_or_else(|| EvalError::InvalidArgument {
                    function: function.name.name.clone(),
                    param: param.name.name.clone(),
                })?;
                match self.stack.slot(var) {
                    Err(EvalError::UndefinedVariable(_)) if at.phase == Phase::Dry => {
                        Slot::new(Value::placeholder(param.kind, var))
                    }
                    other => other?,
                }
            } else {
                Slot::new(self.eval_expr(cx, arg, at)?)
            };
            slots.push(slot);
        }
        Ok(slots)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    /// Run `block` with its statements one level below `at`.
    fn exec_block(&mut self, cx: &mut Cx<'_>, block: &Block, at: Cursor) -> EvalResult<Flow> {
        self.exec_stmts(cx, &block.stmts, at.nested())
    }

    /// Run `stmts` at `at`. A live `return` still serializes the statements
    /// after it; a dry walk serializes the whole sequence.
    fn exec_stmts(&mut self, cx: &mut Cx<'_>, stmts: &[Stmt], at: Cursor) -> EvalResult<Flow> {
        for (i, stmt) in stmts.iter().enumerate() {
            let Some(value) = self.exec_stmt(cx, stmt, at)? else {
                continue;
            };
            match at.phase {
                Phase::Dry => continue,
                Phase::Live => self.dry_walk(cx, &stmts[i + 1..], at)?,
                Phase::Silent => {}
            }
            return Ok(Some(value));
        }
        Ok(None)
    }

    fn exec_stmt(&mut self, cx: &mut Cx<'_>, stmt: &Stmt, at: Cursor) -> EvalResult<Flow> {
        if stmt.span().is_known() {
            cx.line = stmt.line();
        }
        match stmt {
            Stmt::Assign(assign) => self.exec_assign(cx, assign, at)?,
            Stmt::If(if_stmt) => return self.exec_if(cx, if_stmt, at),
            Stmt::While(while_stmt) => return self.exec_while(cx, while_stmt, at),
            Stmt::Return(ret) => return self.exec_return(cx, ret, at).map(Some),
            Stmt::Read(read) => self.exec_read(read, at)?,
            Stmt::Write(write) => {
                let value = self.eval_expr(cx, &write.value, at)?;
                // a dry value is a placeholder, so print what computes it
                let shown = match at.phase {
                    Phase::Dry => value.text().to_string(),
                    Phase::Live | Phase::Silent => value.to_string(),
                };
                self.log.emit(at, format!("print {shown}"));
            }
            Stmt::Actuate(actuate) => self.exec_actuate(cx, actuate, at)?,
            Stmt::Paint(paint) => {
                let color = self.eval_expr(cx, &paint.color, at)?;
                color.as_color()?;
                self.log.emit(at, format!("rPen {}", color.text()));
            }
            Stmt::Pen(pen) => {
                let state = if pen.down { "Down" } else { "Up" };
                self.log.emit(at, format!("rPen {state}"));
            }
            Stmt::Sense(sense) => {
                let reading = self.sense(cx, &sense.sensor, at)?;
                self.log.emit(at, reading.text());
            }
            Stmt::Call(call) => {
                self.call(cx, call, at)?;
            }
        }
        Ok(None)
    }

    fn exec_assign(&mut self, cx: &mut Cx<'_>, assign: &AssignStmt, at: Cursor) -> EvalResult<()> {
        let value = self.eval_expr(cx, &assign.value, at)?;
        match &assign.target {
            AssignTarget::Variable(var) => {
                self.log.emit(at, format!("{} = {}", var.name, value.text()));
                self.stack.define_variable(&var.name, value);
            }
            AssignTarget::Element { array, index } => {
                let index = self.eval_expr(cx, index, at)?;
                let i = index.as_int()?;
                self.log.emit(
                    at,
                    format!("{}[{}] = {}", array.name, index.text(), value.text()),
                );
                let stored = self.stack.assign_element(&array.name, i, &value);
                absorb(at.phase, stored, || ())?;
            }
        }
        Ok(())
    }

    /// Conditional. Only the taken branch executes, but both are written
    /// to the log between `if`, `else` and `endif`.
    fn exec_if(&mut self, cx: &mut Cx<'_>, if_stmt: &IfStmt, at: Cursor) -> EvalResult<Flow> {
        let condition = self.eval_expr(cx, &if_stmt.condition, at)?;
        let taken = condition.as_bool()?;
        self.log.emit(at, format!("if {}", condition.text()));
        let mut flow = self.exec_branch(cx, &if_stmt.then_block, at, taken)?;
        if let Some(else_block) = &if_stmt.else_block {
            self.log.emit(at, "else");
            let other = self.exec_branch(cx, else_block, at, !taken)?;
            flow = flow.or(other);
        }
        self.log.emit(at, "endif");
        Ok(flow)
    }

    fn exec_branch(
        &mut self,
        cx: &mut Cx<'_>,
        block: &Block,
        at: Cursor,
        taken: bool,
    ) -> EvalResult<Flow> {
        match at.phase {
            Phase::Dry => {
                self.exec_block(cx, block, at)?;
                Ok(None)
            }
            _ if taken => self.exec_block(cx, block, at),
            Phase::Live => {
                self.dry_walk(cx, &block.stmts, at.nested())?;
                Ok(None)
            }
            Phase::Silent => Ok(None),
        }
    }

    /// Loop. The condition is re-evaluated before every iteration; only the
    /// first iteration is written to the log, between `while` and `wend`.
    fn exec_while(
        &mut self,
        cx: &mut Cx<'_>,
        while_stmt: &WhileStmt,
        at: Cursor,
    ) -> EvalResult<Flow> {
        let condition = self.eval_expr(cx, &while_stmt.condition, at)?;
        let mut running = condition.as_bool()?;
        self.log.emit(at, format!("while {}", condition.text()));
        let flow = match at.phase {
            Phase::Dry => {
                self.exec_block(cx, &while_stmt.body, at)?;
                None
            }
            Phase::Live if !running => {
                self.dry_walk(cx, &while_stmt.body.stmts, at.nested())?;
                None
            }
            _ => {
                let mut body_at = at;
                let mut flow = None;
                while running {
                    flow = self.exec_block(cx, &while_stmt.body, body_at)?;
                    if flow.is_some() {
                        break;
                    }
                    body_at = at.with_phase(Phase::Silent);
                    running = self
                        .eval_expr(cx, &while_stmt.condition, body_at)?
                        .as_bool()?;
                }
                flow
            }
        };
        self.log.emit(at, "wend");
        Ok(flow)
    }

    fn exec_return(&mut self, cx: &mut Cx<'_>, ret: &ReturnStmt, at: Cursor) -> EvalResult<Value> {
        match &ret.value {
            Some(expr) => {
                let value = self.eval_expr(cx, expr, at)?;
                self.log.emit(at, format!("Return {}", value.text()));
                Ok(value)
            }
            None => {
                self.log.emit(at, "Return");
                Ok(Value::void())
            }
        }
    }

    /// Bind the next input integer. A dry walk binds a placeholder and
    /// leaves the input untouched.
    fn exec_read(&mut self, read: &ReadStmt, at: Cursor) -> EvalResult<()> {
        let value = if at.phase.executes() {
            Value::integer(self.input.next_integer()?)
        } else {
            Value::placeholder(TypeKind::Integer, &read.target.name)
        };
        self.stack.define_variable(&read.target.name, value);
        Ok(())
    }

    fn exec_actuate(
        &mut self,
        cx: &mut Cx<'_>,
        actuate: &ActuateStmt,
        at: Cursor,
    ) -> EvalResult<()> {
        let mut texts = Vec::with_capacity(actuate.args.len());
        for arg in &actuate.args {
            let value = self.eval_expr(cx, arg, at)?;
            value.as_int()?;
            texts.push(value.text().to_string());
        }
        // retrocedeix is a forward move by the negated distance
        if actuate.actuator == Actuator::Backward {
            if let Some(distance) = texts.first_mut() {
                *distance = negated(distance);
            }
        }
        self.log
            .emit(at, format!("{} {}", actuate.actuator.mnemonic(), joined(&texts)));
        Ok(())
    }

    /// Serialize `stmts` at `at` without lasting effect on the top frame,
    /// the input or the call trace.
    fn dry_walk(&mut self, cx: &mut Cx<'_>, stmts: &[Stmt], at: Cursor) -> EvalResult<()> {
        let snapshot = self.stack.snapshot();
        let line = cx.line;
        let walked = self.exec_stmts(cx, stmts, at.with_phase(Phase::Dry));
        self.stack.restore(snapshot);
        walked?;
        cx.line = line;
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn eval_expr(&mut self, cx: &mut Cx<'_>, expr: &Expr, at: Cursor) -> EvalResult<Value> {
        let outer = cx.line;
        if expr.span.is_known() {
            cx.line = expr.span.start_line;
        }
        let value = match &expr.kind {
            ExprKind::IntLit(n) => Value::integer(*n),
            ExprKind::BoolLit(b) => Value::boolean(*b),
            ExprKind::StringLit(s) => Value::string(s.clone()),
            ExprKind::ColorLit(c) => Value::color(*c),

            ExprKind::Identifier(name) => {
                let value = absorb(at.phase, self.stack.get_variable(name), || {
                    Value::placeholder(TypeKind::Integer, name)
                })?;
                value.with_text(name)
            }
            ExprKind::Index { array, index } => self.eval_index(cx, array, index, at)?,
            ExprKind::Call(call) => {
                let value = self.call(cx, call, at)?;
                if value.is_void() {
                    return Err(EvalError::VoidResultUsed(call.name.name.clone()));
                }
                value
            }
            ExprKind::Sense(sensor) => self.sense(cx, sensor, at)?,

            ExprKind::Binary { left, op, right } => self.eval_binary(cx, left, *op, right, at)?,
            ExprKind::Unary { op, operand } => self.eval_expr(cx, operand, at)?.unary(*op)?,
            ExprKind::Paren(inner) => {
                let value = self.eval_expr(cx, inner, at)?;
                let text = format!("({})", value.text());
                value.with_text(text)
            }
        };
        cx.line = outer;
        Ok(value)
    }

    fn eval_index(
        &mut self,
        cx: &mut Cx<'_>,
        array: &Ident,
        index: &Expr,
        at: Cursor,
    ) -> EvalResult<Value> {
        let index = self.eval_expr(cx, index, at)?;
        let i = index.as_int()?;
        let text = format!("{}[{}]", array.name, index.text());
        let items = absorb(at.phase, self.stack.get_variable(&array.name), || {
            Value::placeholder(TypeKind::ArrayInt, "")
        })?;
        let element_kind = match items.kind() {
            TypeKind::ArrayBool => TypeKind::Boolean,
            _ => TypeKind::Integer,
        };
        let element = absorb(at.phase, items.element(i), || {
            Value::placeholder(element_kind, "")
        })?;
        Ok(element.with_text(text))
    }

    fn eval_binary(
        &mut self,
        cx: &mut Cx<'_>,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        at: Cursor,
    ) -> EvalResult<Value> {
        if matches!(op, BinOp::And | BinOp::Or) {
            return self.eval_logical(cx, left, op, right, at);
        }
        let lhs = self.eval_expr(cx, left, at)?;
        let rhs = self.eval_expr(cx, right, at)?;
        if op.is_arithmetic() {
            let text = infix(lhs.text(), op.as_str(), rhs.text());
            absorb(at.phase, lhs.arithmetic(op, &rhs), || {
                Value::placeholder(TypeKind::Integer, text)
            })
        } else if op.is_relational() {
            lhs.compare(op, &rhs)
        } else {
            lhs.bitwise(op, &rhs)
        }
    }

    /// `&&` and `||`. The right operand is not evaluated at all, so it
    /// neither emits nor traces, once the left one decides the result.
    fn eval_logical(
        &mut self,
        cx: &mut Cx<'_>,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        at: Cursor,
    ) -> EvalResult<Value> {
        let lhs = self.eval_expr(cx, left, at)?;
        let l = lhs.as_bool()?;
        let decided = match op {
            BinOp::And => !l,
            _ => l,
        };
        if decided {
            return Ok(lhs);
        }
        let rhs = self.eval_expr(cx, right, at)?;
        let r = rhs.as_bool()?;
        Ok(Value::boolean(r).with_text(infix(lhs.text(), op.as_str(), rhs.text())))
    }

    /// Sensor readings are fixed placeholders; the text is the instruction
    /// that performs the real reading on the robot.
    fn sense(&mut self, cx: &mut Cx<'_>, sensor: &Sensor, at: Cursor) -> EvalResult<Value> {
        let reading = match sensor {
            Sensor::Feel => Value::integer(0).with_text("rFeel()"),
            Sensor::Infrared => Value::integer(0).with_text("rSense()"),
            Sensor::Bumper => Value::boolean(true).with_text("rBumper()"),
            Sensor::Compass => Value::integer(0).with_text("rCompass()"),
            Sensor::Beacon(color) => Value::integer(0).with_text(format!("rBeacon({color})")),
            Sensor::Look(direction) => {
                let direction = self.eval_expr(cx, direction, at)?;
                direction.as_int()?;
                Value::color(Color::Green).with_text(format!("rLook({})", direction.text()))
            }
        };
        Ok(reading)
    }
}

/// Inside a dry walk, faults that only arise from placeholder data are
/// replaced by `fallback`. Everywhere else they stay fatal.
fn absorb<T>(phase: Phase, result: EvalResult<T>, fallback: impl FnOnce() -> T) -> EvalResult<T> {
    match result {
        Err(
            EvalError::DivisionByZero
            | EvalError::IndexOutOfBounds { .. }
            | EvalError::UndefinedVariable(_),
        ) if phase == Phase::Dry => Ok(fallback()),
        other => other,
    }
}

impl std::fmt::Debug for Interpreter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("functions", &self.functions.len())
            .field("depth", &self.stack.depth())
            .field("instructions", &self.log.len())
            .field("line", &self.line)
            .field("prepared", &self.prepared)
            .finish()
    }
}
