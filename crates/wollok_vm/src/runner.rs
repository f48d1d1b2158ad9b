//! The evaluation driver.
//!
//! Builds the initial evaluation (reserved objects plus pre-seeded global
//! singletons, with a root frame holding their initialization sequence),
//! drives instruction loops, and runs test suites over per-test deep clones.

use std::rc::Rc;

use wollok_model::{Environment, NodeId, NodeKind, RefTarget};

use crate::compiler::Compiler;
use crate::error::VmError;
use crate::evaluation::Evaluation;
use crate::frame::Frame;
use crate::heap::{Heap, Id, RuntimeObject};
use crate::instruction::Instruction;
use crate::natives::NativeRegistry;
use crate::step::step;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct TestReport {
    pub name: String,
    pub outcome: TestOutcome,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }
}

/// Create the initial evaluation: the heap holds the reserved objects and
/// one uninitialized instance per global singleton (under its definition
/// node id), and the root frame holds the compiled singleton `INIT`
/// sequence, not yet stepped.
pub fn build_evaluation_for(environment: Rc<Environment>) -> Result<Evaluation, VmError> {
    let compiler = Rc::new(Compiler::new(Rc::clone(&environment)));
    let mut heap = Heap::with_reserved();

    let mut locals = wollok_model::fast_map_new();
    locals.insert("null".into(), Id::Null);
    locals.insert("void".into(), Id::Void);
    locals.insert("true".into(), Id::True);
    locals.insert("false".into(), Id::False);

    let mut instructions: Vec<Instruction> = Vec::new();
    for singleton in environment.global_singletons() {
        let fqn = environment.fully_qualified_name(singleton);
        let id = Id::Singleton(singleton);
        heap.seed(id, &fqn, None);
        locals.insert(fqn.into(), id);

        let (supercall_args, superclass_ref) = match &environment.node(singleton).kind {
            NodeKind::Singleton(s) => (s.supercall_args.clone(), s.superclass),
            _ => continue,
        };
        for &arg in &supercall_args {
            let compiled = compiler.compile(arg)?;
            instructions.extend(compiled.iter().cloned());
        }
        instructions.push(Instruction::Push(id));
        let superclass = match environment.resolve_target(superclass_ref) {
            RefTarget::Module(module) => module,
            _ => return Err(VmError::UnknownModule(fqn_of(&environment, singleton))),
        };
        instructions.push(Instruction::Init {
            arity: supercall_args.len(),
            lookup_start: environment.fully_qualified_name(superclass).into(),
            init_fields: true,
        });
    }

    let root = Frame::with_locals(instructions.into(), locals);
    Ok(Evaluation::new(environment, compiler, heap, root))
}

fn fqn_of(environment: &Environment, node: NodeId) -> String {
    environment.fully_qualified_name(node)
}

/// Drive the root frame to exhaustion, initializing every global singleton.
pub fn bootstrap(evaluation: &mut Evaluation, natives: &NativeRegistry) -> Result<(), VmError> {
    while !(evaluation.frame_stack.len() == 1 && evaluation.current_frame()?.is_exhausted()) {
        step(evaluation, natives)?;
    }
    Ok(())
}

/// Push a frame executing `body`, step until it completes, and return the
/// instance it left on top of its operand stack. On a host failure the
/// evaluation snapshot is logged before the error propagates.
pub fn run(
    evaluation: &mut Evaluation,
    natives: &NativeRegistry,
    body: NodeId,
) -> Result<RuntimeObject, VmError> {
    match execute_body(evaluation, natives, body) {
        Ok(result) => Ok(evaluation.heap.get(result)?.clone()),
        Err(error) => {
            tracing::error!(error = %error, snapshot = %evaluation.snapshot(), "evaluation failed");
            Err(error)
        }
    }
}

fn execute_body(
    evaluation: &mut Evaluation,
    natives: &NativeRegistry,
    body: NodeId,
) -> Result<Id, VmError> {
    let base = evaluation.frame_stack.len();
    let compiled = evaluation.compiler().compile(body)?;
    let mut instructions = Vec::with_capacity(compiled.len() + 1);
    // A body whose trailing sentence leaves no operand still yields a value.
    instructions.push(Instruction::Push(Id::Void));
    instructions.extend(compiled.iter().cloned());
    evaluation.push_frame(Frame::new(instructions.into()));

    while !(evaluation.frame_stack.len() == base + 1
        && evaluation.current_frame()?.is_exhausted())
    {
        step(evaluation, natives)?;
    }
    let result = evaluation.current_frame_mut()?.pop_operand()?;
    evaluation.frame_stack.pop();
    Ok(result)
}

/// Initialize an evaluation for the environment, then run every test on its
/// own deep clone of the bootstrapped state.
pub fn run_tests(
    environment: &Rc<Environment>,
    natives: &NativeRegistry,
) -> Result<Vec<TestReport>, VmError> {
    let mut evaluation = build_evaluation_for(Rc::clone(environment))?;
    bootstrap(&mut evaluation, natives)?;

    let mut reports = Vec::new();
    for test in environment.tests() {
        let (name, body) = match &environment.node(test).kind {
            NodeKind::Test(t) => (t.name.clone(), t.body),
            _ => continue,
        };
        let mut isolated = evaluation.deep_clone();
        let outcome = match run(&mut isolated, natives, body) {
            Ok(_) => {
                tracing::info!(test = %name, "test passed");
                TestOutcome::Passed
            }
            Err(error) => {
                tracing::warn!(test = %name, error = %error, "test failed");
                TestOutcome::Failed(error.to_string())
            }
        };
        reports.push(TestReport { name, outcome });
    }
    Ok(reports)
}
