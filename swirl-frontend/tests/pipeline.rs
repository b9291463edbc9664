//! End-to-end translation of low-level dumps into a merged program

use pretty_assertions::assert_eq;
use swirl_common::{SourceLocation, SwirlError};
use swirl_frontend::{Dialect, Frontend, PipelineOptions, SourceUnit};
use swirl_ir::{
    parse_module, Instruction, Linkage, Literal, ModuleGroup, Printer, PrinterOptions, ProgramView,
};

const MAIN: &str = include_str!("fixtures/main.sil");
const HELPER: &str = include_str!("fixtures/helper.sil");
const SHAPES: &str = include_str!("fixtures/shapes.sil");

const HELPER_NAME: &str = "$s4main6helperyS2iF";
const DESCRIBE_NAME: &str = "$s4main5ShapeC8describeySSSbF";
const STRING_INIT_NAME: &str = "$sSS21_builtinStringLiteralSSBp_tcfC";

fn units() -> Vec<SourceUnit> {
    vec![
        SourceUnit::new("main", "main.sil", MAIN, Dialect::Sil),
        SourceUnit::new("helper", "helper.sil", HELPER, Dialect::Sil),
        SourceUnit::new("shapes", "shapes.sil", SHAPES, Dialect::Sil),
    ]
}

fn sorted_names(group: &ModuleGroup) -> Vec<String> {
    let mut names: Vec<String> = group.functions().map(|f| f.name.clone()).collect();
    names.sort();
    names
}

#[test]
fn test_build_program() {
    let report = Frontend::build_program("program", &units(), &PipelineOptions::default());
    assert!(report.is_clean(), "{:?}", report.failures);
    let group = &report.group;

    let names: Vec<&str> = group.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", HELPER_NAME, DESCRIBE_NAME, STRING_INIT_NAME]);
    assert_eq!(group.modules, vec!["main", "helper", "shapes"]);

    // The declaration in main.sil is replaced by helper.sil's body.
    let helper = group.lookup_function(HELPER_NAME).unwrap();
    assert_eq!(helper.linkage, Linkage::Linked);
    assert!(helper.has_body());

    // Nothing defines the string initializer, so it becomes a model stub.
    let stub = group.lookup_function(STRING_INIT_NAME).unwrap();
    assert_eq!(stub.linkage, Linkage::Model);
    assert!(!stub.has_body());

    assert_eq!(group.globals.initializer("$s4main7counterSivp"), Some(&Literal::Int(0)));
    assert_eq!(
        group.lookup_global("$s4main7counterSivp").map(|g| g.ty.as_str()),
        Some("Int")
    );
}

#[test]
fn test_lowered_main() {
    let module = Frontend::translate_sil(MAIN, "main", "main.sil", &PipelineOptions::default()).unwrap();
    let main = module.get_function("main").unwrap();
    assert_eq!(main.blocks.len(), 1);
    let opcodes: Vec<&str> = main.blocks[0].iter().map(Instruction::opcode).collect();
    assert_eq!(
        opcodes,
        vec![
            "global_addr",
            "integer_literal",
            "aggregate",
            "store",
            "function_ref",
            "assign",
            "load",
            "apply",
            "integer_literal",
            "aggregate",
            "return",
        ]
    );

    let literal = &main.blocks[0].instructions[1];
    assert_eq!(literal.metadata.position, Some(SourceLocation::new("main.swift", 1, 15)));
    match &main.blocks[0].instructions[7].instruction {
        Instruction::Apply { result: Some(result), .. } => assert_eq!(result.ty.as_str(), "Int"),
        other => panic!("expected an apply, found {other:?}"),
    }
}

#[test]
fn test_dead_values_are_pruned() {
    let options = PipelineOptions::default();
    let pruned = Frontend::translate_sil(HELPER, "helper", "helper.sil", &options).unwrap();
    let kept = Frontend::translate_sil(
        HELPER,
        "helper",
        "helper.sil",
        &PipelineOptions {
            prune: false,
            ..options
        },
    )
    .unwrap();

    let helper = pruned.get_function(HELPER_NAME).unwrap();
    assert_eq!(kept.get_function(HELPER_NAME).unwrap().instruction_count(), 10);
    // The unused string and the overflow flag operand go.
    assert_eq!(helper.instruction_count(), 8);
    assert!(!helper.values.contains("9"));
    assert!(!helper.values.contains("4"));
    assert!(helper.blocks[0]
        .iter()
        .any(|instr| matches!(instr, Instruction::BinaryOp { operator, .. } if operator == "sadd_with_overflow")));
}

#[test]
fn test_result_is_independent_of_order_and_parallelism() {
    let forward = Frontend::build_program("program", &units(), &PipelineOptions::default());
    let mut reversed_units = units();
    reversed_units.reverse();
    let reversed = Frontend::build_program(
        "program",
        &reversed_units,
        &PipelineOptions {
            parallel: false,
            ..PipelineOptions::default()
        },
    );

    assert_eq!(sorted_names(&forward.group), sorted_names(&reversed.group));
    for function in forward.group.functions() {
        assert_eq!(reversed.group.lookup_function(&function.name), Some(function));
    }
}

#[test]
fn test_line_numbers_point_into_printed_program() {
    let report = Frontend::build_program("program", &units(), &PipelineOptions::default());
    let printer = Printer::new(PrinterOptions {
        line_numbers: true,
        source_positions: false,
    });
    let text = printer.print_group(&report.group);

    let mut numbered = 0;
    for (index, line) in text.lines().enumerate() {
        if let Some((_, number)) = line.rsplit_once(" ; #") {
            assert_eq!(number.parse::<usize>().unwrap(), index + 1, "{line}");
            numbered += 1;
        }
    }
    let instructions: usize = report.group.functions().map(|f| f.instruction_count()).sum();
    assert_eq!(numbered, instructions);
}

#[test]
fn test_printed_program_parses_back() {
    let report = Frontend::build_program("program", &units(), &PipelineOptions::default());
    let text = Printer::default().print_group(&report.group);
    let module = parse_module(&text, "program.swirl").unwrap();
    for function in report.group.functions() {
        assert_eq!(module.get_function(&function.name), Some(function));
    }
}

#[test]
fn test_failed_units_are_reported_and_skipped() {
    let broken = "sil @broken : $() -> () {\nbb0:\n  %1 = copy_value %0 : $C\n  unreachable\n}\n";
    let mut units = units();
    units.push(SourceUnit::new("broken", "broken.sil", broken, Dialect::Sil));

    let report = Frontend::build_program("program", &units, &PipelineOptions::default());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].module, "broken");
    assert_eq!(
        report.failures[0].error,
        SwirlError::unresolved("%0", "function 'broken'")
    );
    assert!(report.group.lookup_function("main").is_some());
    assert!(report.group.lookup_function("broken").is_none());
}

#[test]
fn test_dialects_mix() {
    let simplified = "module `extra`\n\nfunc [linked] @`$s4main5ShapeC8describeySSSbF` : $`() -> ()` {\nbb0:\n  unreachable\n}\n";
    let mut units = units();
    units.push(SourceUnit::new("extra", "extra.swirl", simplified, Dialect::Swirl));

    let report = Frontend::build_program("program", &units, &PipelineOptions::default());
    // A second, different body for describe is a merge conflict against extra.
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].module, "extra");
    assert!(matches!(report.failures[0].error, SwirlError::Merge { .. }));
    assert_eq!(report.group.modules.len(), 4);
}
