//! Driver-level behavior: test discovery, per-test isolation, and failure
//! reporting.

use std::rc::Rc;

use wollok_model::lang::{self, EXCEPTION_MODULE, OBJECT_MODULE};
use wollok_model::EnvironmentBuilder;
use wollok_vm::{run_tests, NativeRegistry, TestOutcome, TestReport};

/// A test body that trips if singleton state from a previous test leaked in:
///
/// ```text
/// if (registry.hit()) { throw new Boom() } else {}
/// registry.mark()
/// 42
/// ```
fn leak_detecting_body(b: &mut EnvironmentBuilder) -> wollok_model::NodeId {
    let target = b.reference("registry");
    let check = b.send(target, "hit", vec![]);
    let then_body = {
        let boom = b.new_instance("suite.Boom", vec![]);
        let throw = b.throw_expr(boom);
        b.body(vec![throw])
    };
    let else_body = b.body(vec![]);
    let branch = b.if_expr(check, then_body, else_body);
    let target = b.reference("registry");
    let mark = b.send(target, "mark", vec![]);
    let fortytwo = b.number(42.0);
    b.body(vec![branch, mark, fortytwo])
}

fn suite_environment(b: &mut EnvironmentBuilder) -> wollok_model::NodeId {
    lang::install(b);
    let pkg = b.package("suite");
    let registry = b.singleton(pkg, "registry", OBJECT_MODULE, vec![]);
    let falsity = b.boolean(false);
    b.field(registry, "hit", falsity);
    let getter = {
        let field = b.reference("hit");
        let ret = b.return_value(field);
        b.body(vec![ret])
    };
    b.method(registry, "hit", vec![], Some(getter));
    let marker = {
        let target = b.reference("hit");
        let truth = b.boolean(true);
        let assign = b.assignment(target, truth);
        b.body(vec![assign])
    };
    b.method(registry, "mark", vec![], Some(marker));
    b.class(pkg, "Boom", Some(EXCEPTION_MODULE));
    pkg
}

#[test]
fn each_test_runs_on_a_fresh_clone_of_the_bootstrapped_state() {
    let mut b = EnvironmentBuilder::new();
    let pkg = suite_environment(&mut b);
    let body = leak_detecting_body(&mut b);
    b.test(pkg, "first mark", body);
    let body = leak_detecting_body(&mut b);
    b.test(pkg, "second mark", body);
    let environment = Rc::new(b.link().unwrap());

    let natives = NativeRegistry::with_lang();
    let reports = run_tests(&environment, &natives).unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(TestReport::passed), "{reports:?}");
    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["first mark", "second mark"]);
}

#[test]
fn a_failing_test_is_reported_without_aborting_the_suite() {
    let mut b = EnvironmentBuilder::new();
    let pkg = suite_environment(&mut b);
    let failing = {
        let boom = b.new_instance("suite.Boom", vec![]);
        let throw = b.throw_expr(boom);
        b.body(vec![throw])
    };
    b.test(pkg, "explodes", failing);
    let passing = {
        let n = b.number(1.0);
        b.body(vec![n])
    };
    b.test(pkg, "survives", passing);
    let environment = Rc::new(b.link().unwrap());

    let natives = NativeRegistry::with_lang();
    let reports = run_tests(&environment, &natives).unwrap();
    assert_eq!(reports.len(), 2);
    assert!(matches!(reports[0].outcome, TestOutcome::Failed(_)));
    assert_eq!(reports[1].outcome, TestOutcome::Passed);
}
