//! Stack-machine instruction set.
//!
//! Instruction sequences are immutable and shared by reference: the compiler
//! memoizes them per node and frames (including cloned evaluations) alias the
//! same `Rc<[Instruction]>`.

use std::rc::Rc;

use crate::heap::{Id, InnerValue};

/// Local holding the receiver inside method and constructor frames.
pub const SELF: &str = "self";
/// Local the catch and always frames stash the in-flight value under.
pub const EXCEPTION_LOCAL: &str = "<exception>";
pub const PREVIOUS_INTERRUPTION_LOCAL: &str = "<previous_interruption>";

pub type InstructionSeq = Rc<[Instruction]>;

/// A non-local control-flow event that unwinds frames until one resumes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interruption {
    Return,
    Exception,
    Result,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Push the id bound to the name in the nearest enclosing frame.
    Load(Rc<str>),
    /// Pop a value and bind it; with `lookup`, prefer a frame that already
    /// binds the name.
    Store(Rc<str>, bool),
    Push(Id),
    /// Pop a receiver and push one of its fields.
    Get(Rc<str>),
    /// Pop a value, pop a receiver, write the field.
    Set(Rc<str>),
    Swap,
    Instantiate(Rc<str>, Option<InnerValue>),
    /// Pop a receiver and push whether its module inherits from the named one.
    Inherits(Rc<str>),
    /// Pop a boolean; advance the program counter when it is false.
    ConditionalJump(usize),
    Call {
        message: Rc<str>,
        arity: usize,
        lookup_start: Option<Rc<str>>,
    },
    Init {
        arity: usize,
        lookup_start: Rc<str>,
        init_fields: bool,
    },
    IfThenElse {
        then_branch: InstructionSeq,
        else_branch: InstructionSeq,
    },
    TryCatchAlways {
        body: InstructionSeq,
        catch: InstructionSeq,
        always: InstructionSeq,
    },
    /// Pop a value and unwind until a frame resumes the interruption.
    Interrupt(Interruption),
    /// Pop a value and re-raise the one interruption kind missing from the
    /// current frame's resume set.
    ResumeInterruption,
}
