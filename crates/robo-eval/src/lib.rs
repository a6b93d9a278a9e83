//! RoboBASIC tree-walking evaluator.
//!
//! Executes a program from its AST and, while doing so, translates it into
//! the RoboBASIC instruction log consumed by the robot runtime. Sensor
//! readings are placeholders: the run is a deterministic preview, the log
//! is the program that performs the real readings.
//!
//! ```ignore
//! use robo_eval::{Config, Interpreter};
//!
//! let mut interp = Interpreter::new(&program, Config::default())?;
//! interp.prepare_functions()?;
//! interp.run()?;
//! assert_eq!(interp.instruction_log().last().map(String::as_str), Some("End"));
//! ```

pub mod config;
pub mod emitter;
pub mod error;
pub mod functions;
pub mod input;
pub mod interpreter;
pub mod stack;
pub mod tracer;
pub mod value;

pub use config::Config;
pub use emitter::{Cursor, Emitter, Phase};
pub use error::{EvalError, EvalResult, RuntimeError};
pub use functions::FunctionTable;
pub use input::InputTokens;
pub use interpreter::Interpreter;
pub use stack::{CallStack, Slot};
pub use tracer::Tracer;
pub use value::{Payload, Value};
