#![allow(dead_code)]

use std::rc::Rc;

use wollok_model::{lang, EnvironmentBuilder, NodeId};
use wollok_vm::{
    bootstrap, build_evaluation_for, run, Evaluation, NativeRegistry, RuntimeObject, VmError,
};

/// Build an environment around the `wollok.lang` skeleton, bootstrap an
/// evaluation, run the returned body, and hand back both for inspection.
pub fn run_session(
    build: impl FnOnce(&mut EnvironmentBuilder) -> NodeId,
) -> (Evaluation, Result<RuntimeObject, VmError>) {
    let mut b = EnvironmentBuilder::new();
    lang::install(&mut b);
    let body = build(&mut b);
    let environment = Rc::new(b.link().expect("environment must link"));
    let natives = NativeRegistry::with_lang();
    let mut evaluation =
        build_evaluation_for(Rc::clone(&environment)).expect("initial evaluation");
    bootstrap(&mut evaluation, &natives).expect("singleton bootstrap");
    let result = run(&mut evaluation, &natives, body);
    (evaluation, result)
}

pub fn run_body(
    build: impl FnOnce(&mut EnvironmentBuilder) -> NodeId,
) -> Result<RuntimeObject, VmError> {
    run_session(build).1
}

pub fn number_of(object: &RuntimeObject) -> f64 {
    object.number().expect("expected a number payload")
}
