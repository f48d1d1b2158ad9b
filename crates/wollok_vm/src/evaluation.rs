//! The whole VM state: a frame stack and a heap over a shared environment.

use std::fmt::Write as _;
use std::rc::Rc;

use wollok_model::lang::STRING_MODULE;
use wollok_model::Environment;

use crate::compiler::Compiler;
use crate::error::VmError;
use crate::frame::Frame;
use crate::heap::{Heap, Id, InnerValue};
use crate::instruction::Interruption;

pub struct Evaluation {
    environment: Rc<Environment>,
    compiler: Rc<Compiler>,
    pub frame_stack: Vec<Frame>,
    pub heap: Heap,
}

impl Evaluation {
    pub fn new(
        environment: Rc<Environment>,
        compiler: Rc<Compiler>,
        heap: Heap,
        root: Frame,
    ) -> Self {
        Self { environment, compiler, frame_stack: vec![root], heap }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn current_frame(&self) -> Result<&Frame, VmError> {
        self.frame_stack.last().ok_or(VmError::EmptyFrameStack)
    }

    pub fn current_frame_mut(&mut self) -> Result<&mut Frame, VmError> {
        self.frame_stack.last_mut().ok_or(VmError::EmptyFrameStack)
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frame_stack.push(frame);
    }

    /// The binding for `name` in the nearest enclosing frame that has one.
    pub fn lookup_local(&self, name: &str) -> Option<Id> {
        self.frame_stack
            .iter()
            .rev()
            .find_map(|frame| frame.locals.get(name).copied())
    }

    /// Bind `name` in the current frame, or — when `lookup` — in the nearest
    /// enclosing frame that already binds it.
    pub fn store_local(&mut self, name: Rc<str>, value: Id, lookup: bool) -> Result<(), VmError> {
        if lookup {
            for frame in self.frame_stack.iter_mut().rev() {
                if let Some(slot) = frame.locals.get_mut(&name) {
                    *slot = value;
                    return Ok(());
                }
            }
        }
        self.current_frame_mut()?.locals.insert(name, value);
        Ok(())
    }

    /// Unwind frames until one resumes `kind`, consume that capability and
    /// hand the frame the in-flight value.
    pub fn interrupt(&mut self, kind: Interruption, value: Id) -> Result<(), VmError> {
        while let Some(frame) = self.frame_stack.last_mut() {
            if frame.resume.contains(kind) {
                frame.resume.remove(kind);
                frame.push_operand(value);
                return Ok(());
            }
            self.frame_stack.pop();
        }
        if kind == Interruption::Exception {
            self.log_escaped_exception(value);
        }
        Err(VmError::UnhandledInterruption(kind))
    }

    /// Raise a language-level exception of the given module carrying a
    /// message string.
    pub fn raise_exception(&mut self, module: &str, message: &str) -> Result<(), VmError> {
        let text = self
            .heap
            .allocate(STRING_MODULE, Some(InnerValue::String(message.into())));
        let exception = self.heap.allocate(module, None);
        self.heap.get_mut(exception)?.fields.insert("message".into(), text);
        self.interrupt(Interruption::Exception, exception)
    }

    fn log_escaped_exception(&self, value: Id) {
        let Ok(exception) = self.heap.get(value) else { return };
        let module = exception.module.clone();
        let message = exception
            .field("message")
            .and_then(|id| self.heap.get(id).ok())
            .and_then(|m| m.string().cloned());
        match message {
            Some(message) => {
                tracing::error!(module = %module, message = %message, "uncaught exception")
            }
            None => tracing::error!(module = %module, "uncaught exception"),
        }
    }

    /// Duplicate the mutable state; the environment and the compiled
    /// instruction sequences stay shared.
    pub fn deep_clone(&self) -> Evaluation {
        Evaluation {
            environment: Rc::clone(&self.environment),
            compiler: Rc::clone(&self.compiler),
            frame_stack: self.frame_stack.clone(),
            heap: self.heap.deep_clone(),
        }
    }

    /// Diagnostic rendering of the evaluation state, environment excluded.
    pub fn snapshot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "frames ({}):", self.frame_stack.len());
        for (depth, frame) in self.frame_stack.iter().enumerate().rev() {
            let _ = writeln!(
                out,
                "  [{depth}] pc {}/{} resume {:?}",
                frame.next_instruction,
                frame.instructions.len(),
                frame.resume,
            );
            let operands: Vec<String> =
                frame.operand_stack.iter().map(|id| id.to_string()).collect();
            let _ = writeln!(out, "      operands: [{}]", operands.join(", "));
            let mut locals: Vec<String> = frame
                .locals
                .iter()
                .map(|(name, id)| format!("{name} = {id}"))
                .collect();
            locals.sort();
            let _ = writeln!(out, "      locals: {{{}}}", locals.join(", "));
        }
        let _ = writeln!(out, "heap: {} instances", self.heap.len());
        out
    }
}
