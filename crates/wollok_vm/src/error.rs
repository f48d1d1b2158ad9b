//! Host-level failures.
//!
//! These are bugs in the interpreter or an invalid linked program, never
//! language-level exceptions: those travel through the interruption
//! machinery as heap objects. A `VmError` leaves the evaluation in an
//! undefined state; the driver reports it together with a state snapshot.

use thiserror::Error;

use crate::heap::Id;
use crate::instruction::Interruption;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("no frame on the stack")]
    EmptyFrameStack,

    #[error("frame has no instructions left to execute")]
    ExhaustedInstructions,

    #[error("undefined instance {0}")]
    UndefinedInstance(Id),

    #[error("{module} has no field `{field}`")]
    UndefinedField { module: String, field: String },

    #[error("no local `{0}` in any frame")]
    MissingLocal(String),

    #[error("unhandled {0:?} interruption")]
    UnhandledInterruption(Interruption),

    #[error("jump to {target} escapes a sequence of {length} instructions")]
    JumpOutOfBounds { target: usize, length: usize },

    #[error("resume set admits more than one interruption, cannot infer which to re-raise")]
    AmbiguousResume,

    #[error("module `{0}` is not defined in the environment")]
    UnknownModule(String),

    #[error("{module} does not declare a constructor of arity {arity}")]
    MissingConstructor { module: String, arity: usize },

    #[error("{module} does not understand {message}/{arity} and declares no messageNotUnderstood")]
    UnknownMessage { module: String, message: String, arity: usize },

    #[error("native method {method}/{arity} is not registered")]
    MissingNative { method: String, arity: usize },

    #[error("method {0} has no body and is not native")]
    MissingMethodBody(String),

    #[error("native {0} received a wrong number of arguments")]
    NativeArity(&'static str),

    #[error("node {0} is not compilable")]
    Uncompilable(wollok_model::NodeId),
}
