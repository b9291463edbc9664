//! Unit tests for module merging and the whole-program view

use super::*;
use swirl_common::{ModuleFailure, SwirlError};

fn int() -> IrType {
    IrType::new("Int")
}

fn fn_type() -> IrType {
    IrType::new("() -> Int")
}

/// `name` returning a literal, after calling every function in `calls`
fn defined(name: &str, literal: i128, calls: &[&str]) -> Function {
    let mut builder = FunctionBuilder::new(name, Linkage::Linked, fn_type());
    builder.create_block(BlockId::new("bb0"), vec![]).unwrap();
    builder.switch_to(&BlockId::new("bb0")).unwrap();
    for (i, callee) in calls.iter().enumerate() {
        let reference = builder.define(&format!("f{i}"), fn_type()).unwrap();
        builder
            .push(Instruction::FunctionRef {
                result: reference.clone(),
                function: callee.to_string(),
            })
            .unwrap();
        builder
            .push(Instruction::Apply {
                result: None,
                function: reference,
                args: vec![],
            })
            .unwrap();
    }
    let value = builder.define("r", int()).unwrap();
    builder
        .push(Instruction::IntegerLiteral {
            result: value.clone(),
            value: literal,
        })
        .unwrap();
    builder
        .push(Instruction::Return { value: Some(value) })
        .unwrap();
    builder.finish()
}

fn module(name: &str, functions: Vec<Function>) -> Module {
    let mut module = Module::new(name);
    for function in functions {
        module.add_function(function).unwrap();
    }
    module
}

#[test]
fn test_body_beats_stub_in_either_order() {
    let stub_first = merge_results(
        "p",
        vec![
            Ok(module("a", vec![Function::stub("f", fn_type())])),
            Ok(module("b", vec![defined("f", 1, &[])])),
        ],
    );
    let body_first = merge_results(
        "p",
        vec![
            Ok(module("b", vec![defined("f", 1, &[])])),
            Ok(module("a", vec![Function::stub("f", fn_type())])),
        ],
    );
    for report in [stub_first, body_first] {
        assert!(report.is_clean());
        assert_eq!(report.group.functions.len(), 1);
        let f = report.group.lookup_function("f").unwrap();
        assert!(f.has_body());
        assert_eq!(f.linkage, Linkage::Linked);
    }
}

#[test]
fn test_identical_bodies_merge_silently() {
    let report = merge_results(
        "p",
        vec![
            Ok(module("a", vec![defined("f", 1, &[])])),
            Ok(module("b", vec![defined("f", 1, &[])])),
        ],
    );
    assert!(report.is_clean());
    assert_eq!(report.group.all_functions().len(), 1);
}

#[test]
fn test_conflicting_bodies_are_reported() {
    let report = merge_results(
        "p",
        vec![
            Ok(module("a", vec![defined("f", 1, &[])])),
            Ok(module("b", vec![defined("f", 2, &[]), defined("g", 3, &[])])),
        ],
    );
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.module, "b");
    assert!(matches!(failure.error, SwirlError::Merge { ref name, .. } if name == "f"));

    // The first definition stays and the rest of module b still merges.
    assert_eq!(report.group.lookup_function("f"), Some(&defined("f", 1, &[])));
    assert!(report.group.lookup_function("g").is_some());
    assert_eq!(report.group.modules, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_failed_modules_are_forwarded() {
    let failure = ModuleFailure::new("bad", SwirlError::unresolved("%9", "function 'x'"));
    let report = merge_results(
        "p",
        vec![Err(failure.clone()), Ok(module("good", vec![defined("main", 0, &[])]))],
    );
    assert_eq!(report.failures, vec![failure]);
    assert!(report.group.lookup_function("main").is_some());
}

#[test]
fn test_unresolved_references_get_model_stubs() {
    let report = merge_results(
        "p",
        vec![
            Ok(module("a", vec![defined("main", 0, &["helper", "print", "print"])])),
            Ok(module("b", vec![defined("helper", 1, &["print"])])),
        ],
    );
    let names: Vec<_> = report.group.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "helper", "print"]);

    let print = report.group.lookup_function("print").unwrap();
    assert_eq!(print.linkage, Linkage::Model);
    assert!(!print.has_body());
    assert_eq!(print.ty, fn_type());
}

#[test]
fn test_globals_unify_on_first_declaration() {
    let mut a = Module::new("a");
    a.globals.declare("g", int(), Some(Literal::Int(1)));
    let mut b = Module::new("b");
    b.globals.declare("g", IrType::new("Float"), Some(Literal::Float(FloatValue(2.0))));
    b.globals.declare("h", int(), None);

    let mut builder = FunctionBuilder::new("reader", Linkage::Linked, fn_type());
    builder.create_block(BlockId::new("bb0"), vec![]).unwrap();
    builder.switch_to(&BlockId::new("bb0")).unwrap();
    let address = builder.define("0", IrType::new("*Float")).unwrap();
    builder
        .push(Instruction::GlobalAddr {
            result: address,
            global: b.globals.get("g").unwrap().clone(),
        })
        .unwrap();
    builder.push(Instruction::Return { value: None }).unwrap();
    b.add_function(builder.finish()).unwrap();

    let report = merge_results("p", vec![Ok(a), Ok(b)]);
    let group = &report.group;
    assert_eq!(group.lookup_global("g"), Some(&Value::global("g", int())));
    assert_eq!(group.globals.initializer("g"), Some(&Literal::Int(1)));
    assert!(group.lookup_global("h").is_some());

    let reader = group.lookup_function("reader").unwrap();
    match &reader.blocks[0].instructions[0].instruction {
        Instruction::GlobalAddr { global, .. } => assert_eq!(global.ty, int()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_group_serializes_to_json() {
    let report = merge_results("p", vec![Ok(module("a", vec![defined("f", 1, &["g"])]))]);
    let json = serde_json::to_string(&report.group).unwrap();
    let back: ModuleGroup = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report.group);
    assert_eq!(back.lookup_function("f").unwrap().values.len(), 2);
}

#[test]
fn test_group_prints_in_module_format() {
    let report = merge_results("program", vec![Ok(module("a", vec![defined("f", 1, &[])]))]);
    let text = Printer::default().print_group(&report.group);
    assert!(text.starts_with("module `program`\n"));
    let reparsed = parse_module(&text, "program.swirl").unwrap();
    assert_eq!(reparsed.get_function("f"), report.group.lookup_function("f"));
}
