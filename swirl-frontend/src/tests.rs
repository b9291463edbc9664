//! Unit tests for the translation facade

use super::*;
use indoc::indoc;
use std::path::PathBuf;
use swirl_common::SwirlError;
use swirl_ir::{print_module, Linkage};

const COUNTER: &str = indoc! {r#"
    sil_stage canonical

    sil_global @total : $Int = {
      %0 = integer_literal $Builtin.Int64, 3
      %initval = struct $Int (%0 : $Builtin.Int64)
    }

    sil @bump : $@convention(thin) () -> () {
    bb0:
      %0 = global_addr @total : $*Int
      %1 = integer_literal $Builtin.Int64, 1
      %2 = struct $Int (%1 : $Builtin.Int64)
      store %2 to [trivial] %0 : $*Int
      %4 = tuple ()
      return %4 : $()
    }

    sil @log : $@convention(thin) (Int) -> ()
"#};

#[test]
fn test_translate_sil_prints_simplified_dialect() {
    let module = Frontend::translate_sil(COUNTER, "counter", "counter.sil", &PipelineOptions::default()).unwrap();
    let expected = indoc! {"
        module `counter`

        global @`total` : $`Int` = 3

        func [linked] @`bump` : $`@convention(thin) () -> ()` {
        bb0:
          %0 := global_addr @`total` : $`*Int`
          %1 := integer_literal 1 : $`Builtin.Int64`
          %2 := aggregate (%1) : $`Int`
          store %2 to %0
          %4 := aggregate () : $`()`
          return %4
        }

        func [model] @`log` : $`@convention(thin) (Int) -> ()`
    "};
    pretty_assertions::assert_eq!(print_module(&module), expected);
    assert_eq!(module.get_function("log").map(|f| f.linkage), Some(Linkage::Model));
}

#[test]
fn test_line_numbers_follow_options() {
    let numbered = Frontend::translate_sil(COUNTER, "counter", "counter.sil", &PipelineOptions::default()).unwrap();
    let bump = numbered.get_function("bump").unwrap();
    assert_eq!(bump.blocks[0].instructions[0].metadata.line, Some(7));

    let options = PipelineOptions {
        line_numbers: false,
        ..PipelineOptions::default()
    };
    let plain = Frontend::translate_sil(COUNTER, "counter", "counter.sil", &options).unwrap();
    let bump = plain.get_function("bump").unwrap();
    assert!(bump.blocks[0].instructions.iter().all(|node| node.metadata.line.is_none()));
}

#[test]
fn test_translate_unit_wraps_errors() {
    let unit = SourceUnit::new("bad", "bad.sil", "sil @f : $() -> () {\n", Dialect::Sil);
    let failure = Frontend::translate_unit(&unit, &PipelineOptions::default()).unwrap_err();
    assert_eq!(failure.module, "bad");
    assert!(matches!(failure.error, SwirlError::Syntax { .. }));
}

#[test]
fn test_translate_units_keeps_input_order() {
    let units: Vec<SourceUnit> = (0..8)
        .map(|i| {
            let text = format!("sil @f{i} : $() -> () {{\nbb0:\n  unreachable\n}}\n");
            SourceUnit::new(format!("m{i}"), format!("m{i}.sil"), text, Dialect::Sil)
        })
        .collect();
    let results = Frontend::translate_units(&units, &PipelineOptions::default());
    let names: Vec<String> = results
        .into_iter()
        .map(|result| result.unwrap().name)
        .collect();
    let expected: Vec<String> = (0..8).map(|i| format!("m{i}")).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_swirl_units_parse_directly() {
    let text = print_module(
        &Frontend::translate_sil(COUNTER, "counter", "counter.sil", &PipelineOptions::default()).unwrap(),
    );
    let unit = SourceUnit::from_file(&PathBuf::from("out/counter.swirl"), text);
    assert_eq!(unit.dialect, Dialect::Swirl);
    assert_eq!(unit.name, "counter");
    let module = Frontend::translate_unit(&unit, &PipelineOptions::default()).unwrap();
    assert!(module.get_function("bump").is_some());
}

#[test]
fn test_dialect_from_path() {
    assert_eq!(Dialect::from_path(&PathBuf::from("a.swirl")), Dialect::Swirl);
    assert_eq!(Dialect::from_path(&PathBuf::from("a.sil")), Dialect::Sil);
    assert_eq!(Dialect::from_path(&PathBuf::from("dump")), Dialect::Sil);
}

#[test]
fn test_pipeline_options_from_partial_json() {
    let options: PipelineOptions = serde_json::from_str(r#"{"prune": false, "printer": {"line_numbers": true}}"#).unwrap();
    assert!(!options.prune);
    assert!(options.line_numbers);
    assert!(options.parallel);
    assert!(options.printer.line_numbers);
    assert!(!options.printer.source_positions);
}

const PICK: &str = indoc! {"
    sil @pick : $@convention(thin) (Builtin.Int64) -> () {
    bb0(%0 : $Builtin.Int64):
      %1 = integer_literal $Builtin.Int64, 1
      %2 = integer_literal $Builtin.Int64, 2
      switch_value %0 : $Builtin.Int64, case %1: bb1, case %2: bb2, default bb3
    bb1:
      br bb3
    bb2:
      br bb3
    bb3:
      %6 = tuple ()
      return %6 : $()
    }
"};

#[test]
fn test_switch_value_cases_survive_pruning() {
    let module = Frontend::translate_sil(PICK, "pick", "pick.sil", &PipelineOptions::default()).unwrap();
    let pick = module.get_function("pick").unwrap();
    assert!(pick.values.contains("1"));
    assert!(pick.values.contains("2"));

    let text = print_module(&module);
    assert!(text.contains("  %1 := integer_literal 1 : $`Builtin.Int64`\n"));
    assert!(text.contains("  switch %0, case %1: bb1, case %2: bb2, default bb3\n"));
    assert_eq!(swirl_ir::parse_module(&text, "pick.swirl").unwrap(), module);
}

const NAN: &str = indoc! {"
    sil shared @nan : $@convention(thin) () -> Double {
    bb0:
      %0 = float_literal $Builtin.FPIEEE64, 0x7FF8000000000000 // nan
      %1 = struct $Double (%0 : $Builtin.FPIEEE64)
      return %1 : $Double
    }
"};

#[test]
fn test_identical_nan_bodies_merge_cleanly() {
    let units = vec![
        SourceUnit::new("a", "a.sil", NAN, Dialect::Sil),
        SourceUnit::new("b", "b.sil", NAN, Dialect::Sil),
    ];
    let report = Frontend::build_program("program", &units, &PipelineOptions::default());
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.group.functions.len(), 1);
}

#[test]
fn test_nan_literals_round_trip() {
    let module = Frontend::translate_sil(NAN, "nan", "nan.sil", &PipelineOptions::default()).unwrap();
    let text = print_module(&module);
    assert!(text.contains("%0 := float_literal NaN : $`Builtin.FPIEEE64`"));
    assert_eq!(swirl_ir::parse_module(&text, "nan.swirl").unwrap(), module);
}
