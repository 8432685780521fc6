//! Environment lifetime: deferred and infinite teardown, the error path,
//! code-generation blocking, and filename attribution.

use std::thread::sleep;
use std::time::Duration;

use browser_vm as vm;
use vm::boa_engine::JsValue;

fn seed(source: &str) -> JsValue {
    vm::dom::eval_in_window(source).expect("seed must evaluate")
}

#[test]
fn test_deferred_teardown_keeps_frame_until_timer_fires() {
    let context = vm::create_context(&seed("({})"), vm::ContextOptions::default()).unwrap();
    let options = vm::RunOptions {
        timeout: Some(20),
        ..vm::RunOptions::default()
    };
    vm::run_in_context("a = 1", &context.as_value(), options).unwrap();

    // The environment is still attached, but reads flush its state anyway.
    assert_eq!(vm::dom::frame_count(), 1);
    assert_eq!(context.get("a").unwrap().as_number(), Some(1.0));
    assert_eq!(vm::dom::frame_count(), 1);

    sleep(Duration::from_millis(30));
    vm::dom::run_due_timers();
    assert_eq!(vm::dom::frame_count(), 0);
    assert_eq!(context.get("a").unwrap().as_number(), Some(1.0));
}

#[test]
fn test_infinite_timeout_requires_explicit_close() {
    let context = vm::create_context(&seed("({})"), vm::ContextOptions::default()).unwrap();
    let options = vm::RunOptions {
        timeout: Some(vm::TIMEOUT_INFINITE),
        ..vm::RunOptions::default()
    };
    vm::run_in_context("a = 1", &context.as_value(), options).unwrap();

    sleep(Duration::from_millis(5));
    vm::dom::run_due_timers();
    assert_eq!(vm::dom::frame_count(), 1);

    context.close();
    assert_eq!(vm::dom::frame_count(), 0);
    assert_eq!(context.get("a").unwrap().as_number(), Some(1.0));
}

#[test]
fn test_pending_environments_reconcile_in_run_order() {
    let context = vm::create_context(&seed("({})"), vm::ContextOptions::default()).unwrap();
    let options = || vm::RunOptions {
        timeout: Some(vm::TIMEOUT_INFINITE),
        ..vm::RunOptions::default()
    };
    vm::run_in_context("x = 1", &context.as_value(), options()).unwrap();
    vm::run_in_context("x = 2", &context.as_value(), options()).unwrap();
    assert_eq!(vm::dom::frame_count(), 2);

    // Later runs win key by key.
    context.close();
    assert_eq!(vm::dom::frame_count(), 0);
    assert_eq!(context.get("x").unwrap().as_number(), Some(2.0));
}

#[test]
fn test_error_tears_down_immediately_without_reconciling() {
    let context = vm::create_context(&seed("({a: 1})"), vm::ContextOptions::default()).unwrap();
    let options = vm::RunOptions {
        timeout: Some(10_000),
        ..vm::RunOptions::default()
    };
    let err = vm::run_in_context("a = 5; missing()", &context.as_value(), options)
        .expect_err("the run throws");
    assert!(matches!(err, vm::VmError::Evaluation { .. }));

    // No deferred environment survives an error, and the partial write to
    // `a` inside the environment was discarded.
    assert_eq!(vm::dom::frame_count(), 0);
    assert_eq!(context.get("a").unwrap().as_number(), Some(1.0));
}

#[test]
fn test_error_carries_the_run_filename() {
    let context = vm::create_context(&seed("({})"), vm::ContextOptions::default()).unwrap();
    let err = vm::run_in_context("throw new Error(\"boom\")", &context.as_value(), "script.js")
        .expect_err("the run throws");
    let text = err.to_string();
    assert!(text.starts_with("script.js:"), "unexpected message: {text}");
    assert!(text.contains("boom"), "unexpected message: {text}");
}

#[test]
fn test_script_filename_is_fixed_unless_overridden() {
    let context = vm::create_context(&seed("({})"), vm::ContextOptions::default()).unwrap();
    let script = vm::Script::with_options("throw new Error(\"boom\")", "built.js");
    assert_eq!(script.filename(), "built.js");

    let err = script
        .run_in_context(&context.as_value(), vm::RunOptions::default())
        .expect_err("the run throws");
    assert!(err.to_string().starts_with("built.js:"));

    let err = script
        .run_in_context(&context.as_value(), "override.js")
        .expect_err("the run throws");
    assert!(err.to_string().starts_with("override.js:"));
}

#[test]
fn test_blocked_code_generation() {
    let options = vm::NewContextOptions {
        context_code_generation: Some(vm::CodeGeneration { strings: false }),
        ..vm::NewContextOptions::default()
    };
    let err = vm::run_in_new_context("eval(\"1 + 1\")", None, options.clone())
        .expect_err("eval is stubbed out");
    assert!(matches!(err, vm::VmError::EvalDisallowed { .. }));

    let err = vm::run_in_new_context("new Function(\"a\", \"return a\")", None, options)
        .expect_err("dynamic function construction is stubbed out");
    assert!(matches!(err, vm::VmError::EvalDisallowed { .. }));
}

#[test]
fn test_code_generation_allowed_by_default() {
    let result =
        vm::run_in_new_context("eval(\"1 + 1\")", None, vm::NewContextOptions::default()).unwrap();
    assert_eq!(result.as_number(), Some(2.0));
}

#[test]
fn test_is_context() {
    assert!(!vm::is_context(&JsValue::from(1)));
    assert!(!vm::is_context(&JsValue::undefined()));
    assert!(!vm::is_context(&seed("({})")));

    let context = vm::create_context(&seed("({})"), vm::ContextOptions::default()).unwrap();
    assert!(vm::is_context(&context.as_value()));
}

#[test]
fn test_context_options_are_recorded() {
    let options = vm::ContextOptions {
        name: Some("worker".to_string()),
        code_generation: Some(vm::CodeGeneration { strings: false }),
    };
    let context = vm::create_context(&seed("({})"), options).unwrap();
    assert_eq!(context.name(), "worker");
    assert!(!context.code_generation().strings);
}

#[test]
fn test_environment_name_defaults_to_context_name() {
    // The frame's `name` global reflects the context label, and stays with
    // the environment unless the context owns the key.
    let options = vm::NewContextOptions {
        context_name: Some("labelled".to_string()),
        ..vm::NewContextOptions::default()
    };
    let result = vm::run_in_new_context("name", None, options).unwrap();
    assert_eq!(
        result.as_string().map(|s| s.to_std_string_escaped()),
        Some("labelled".to_string())
    );
}
