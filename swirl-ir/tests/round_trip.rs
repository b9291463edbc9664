//! Round-trip tests for the simplified dialect: print(parse(text)) == text and
//! parse(print(module)) == module.

use indoc::indoc;
use pretty_assertions::assert_eq;
use swirl_common::SourceLocation;
use swirl_ir::passes::{assign_line_numbers, prune_module};
use swirl_ir::{
    parse_module, print_module, verify_module, BlockId, FloatValue, Function, FunctionBuilder, Instruction,
    IrType, Linkage, Literal, Module, Printer, PrinterOptions,
};

/// Every instruction form, block arguments, globals of every literal kind, a stub
const FIXTURE: &str = indoc! {r#"
    module `fixture`

    global @`counter` : $`Int` = 0
    global @`pi` : $`Double` = 2.5
    global @`greeting` : $`String` = "hi\n"
    global @`empty` : $`Any`

    func [linked] @`main` : $`@convention(thin) (Int32, Builtin.RawPointer) -> Int` {
    bb0(%0 : $`Int32`, %1 : $`Builtin.RawPointer`):
      %2 := new : $`Point`
      %3 := integer_literal -42 : $`Builtin.Int64`
      %4 := float_literal 1.5e-7 : $`Builtin.FPIEEE64`
      %5 := string_literal "a \"quoted\" string" : $`Builtin.RawPointer`
      %6 := function_ref @`helper` : $`@convention(thin) (Int) -> Int`
      %7 := global_addr @`counter` : $`*Int`
      %8 := dynamic_ref %2, `#Point.norm` : $`(Point) -> Double`
      %9 := dynamic_ref `#Protocol.requirement` : $`() -> ()`
      %10 := assign %0 : $`Int32`
      %11 := load %7 : $`Int`
      %12 := aggregate (%3, %11) : $`(Int, Int)`
      %13 := array_read %12[1] : $`Int`
      %14 := field_read %2, `x` : $`Int`
      %15 := binary_op `add` %13, %14 : $`Int`
      %16 := unary_op `neg` %15 : $`Int`
      %17 := partial_apply %6(%16) : $`() -> Int`
      %18 := apply %6(%16) : $`Int`
      apply %17()
      %19 := builtin `int_trap`() : $`()`
      builtin `once`(%1)
      %20 := opaque `mark_dependence`(%2, %1) : $`Point`
      opaque `fix_lifetime`(%20)
      store %18 to %7
      field_write %18 to %2, `y`
      array_write %18 to %12[0]
      cond_fail %3
      %21 := integer_literal 1 : $`Builtin.Int1`
      cond_br %21, bb1(%18), bb2
    bb1(%22 : $`Int`):
      switch %22, case `#Optional.some!enumelt`: bb3, case `0`: bb2, default bb4
    bb2:
      try_apply %6(%15), normal bb5, error bb6
    bb3:
      yield (%22, %15), resume bb4, unwind bb6
    bb4:
      br bb5(%22)
    bb5(%23 : $`Int`):
      return %23
    bb6(%24 : $`Error`):
      throw %24
    }

    func [model] @`print` : $`(Any) -> ()`

    func [linked] @`helper` : $`@convention(thin) (Int) -> Int` {
    bb0(%0 : $`Int`):
      %1 := integer_literal 0 : $`Builtin.Int1`
      cond_br %1, bb1, bb2
    bb1:
      unreachable
    bb2:
      return
    }
"#};

#[test]
fn test_print_parse_is_identity_on_text() {
    let module = parse_module(FIXTURE, "fixture.swirl").unwrap();
    assert_eq!(print_module(&module), FIXTURE);
}

#[test]
fn test_parse_print_is_identity_on_modules() {
    let module = parse_module(FIXTURE, "fixture.swirl").unwrap();
    verify_module(&module).unwrap();
    let reparsed = parse_module(&print_module(&module), "again.swirl").unwrap();
    assert_eq!(reparsed, module);
}

#[test]
fn test_fixture_contents() {
    let module = parse_module(FIXTURE, "fixture.swirl").unwrap();
    let names: Vec<_> = module.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "print", "helper"]);
    assert_eq!(module.globals.initializer("pi"), Some(&Literal::Float(FloatValue(2.5))));
    assert_eq!(
        module.globals.initializer("greeting"),
        Some(&Literal::Str("hi\n".to_string()))
    );
    assert_eq!(module.globals.initializer("empty"), None);

    let main = module.get_function("main").unwrap();
    assert_eq!(main.blocks.len(), 7);
    assert_eq!(main.values.len(), 25);
    assert!(!module.get_function("print").unwrap().has_body());
}

#[test]
fn test_round_trip_with_metadata_comments() {
    let mut module = parse_module(FIXTURE, "fixture.swirl").unwrap();
    assign_line_numbers(&mut module);
    if let Some(main) = module.get_function_mut("main") {
        main.blocks[0].instructions[1].metadata.position =
            Some(SourceLocation::new("main.swift", 12, 4));
    }

    let printer = Printer::new(PrinterOptions {
        line_numbers: true,
        source_positions: true,
    });
    let text = printer.print_module(&module);
    assert!(text.contains("  %2 := new : $`Point` ; #10\n"));
    assert!(text.contains("  %3 := integer_literal -42 : $`Builtin.Int64` ; #11 loc \"main.swift\":12:4\n"));

    let reparsed = parse_module(&text, "annotated.swirl").unwrap();
    assert_eq!(printer.print_module(&reparsed), text);
    assert_eq!(reparsed, module);

    // Canonical printing ignores the annotations.
    assert_eq!(print_module(&reparsed), FIXTURE);
}

#[test]
fn test_round_trip_after_pruning() {
    let mut module = parse_module(FIXTURE, "fixture.swirl").unwrap();
    let removed = prune_module(&mut module).unwrap();
    // Only the unused pure results of main go.
    assert_eq!(removed, 5);

    let text = print_module(&module);
    for pruned in ["%4 :=", "%5 :=", "%8 :=", "%9 :=", "%10 :="] {
        assert!(!text.contains(pruned), "{pruned} survived");
    }
    assert_eq!(parse_module(&text, "pruned.swirl").unwrap(), module);
}

#[test]
fn test_quoted_names_round_trip() {
    let mut module = Module::new("odd `names`");
    module
        .globals
        .declare("back\\slash", IrType::new("$`T`"), Some(Literal::Float(FloatValue(f64::INFINITY))));

    let mut builder = FunctionBuilder::new("we`ird", Linkage::Model, IrType::new("() -> ()"));
    builder.create_block(BlockId::new("entry"), vec![]).unwrap();
    builder.switch_to(&BlockId::new("entry")).unwrap();
    let result = builder.define("s", IrType::new("String")).unwrap();
    builder
        .push(Instruction::StringLiteral {
            result,
            value: "tab\tquote\"nul\0".to_string(),
        })
        .unwrap();
    builder.push(Instruction::Unreachable).unwrap();
    module.add_function(builder.finish()).unwrap();
    module
        .add_function(Function::new("linked stub", Linkage::Linked, IrType::any()))
        .unwrap();

    let text = print_module(&module);
    let reparsed = parse_module(&text, "odd.swirl").unwrap();
    assert_eq!(reparsed, module);
    assert_eq!(print_module(&reparsed), text);
}
