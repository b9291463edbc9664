//! Simplified dialect printer
//!
//! Pure recursive traversal of a module; the output is the exact text the
//! simplified-dialect parser accepts. Alongside the text the printer reports
//! the 1-based line of every instruction, in program order.

use serde::{Deserialize, Serialize};
use crate::function::Function;
use crate::instructions::{InstructionNode, Metadata};
use crate::merge::ModuleGroup;
use crate::module::Module;
use crate::types::{quote, quote_string};
use crate::values::GlobalValueTable;

/// Printer verbosity. Defaults give the canonical text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterOptions {
    /// Emit `#<line>` comments for numbered instructions
    pub line_numbers: bool,
    /// Emit `loc "<file>":<line>:<col>` comments for instructions with a source position
    pub source_positions: bool,
}

/// Printed text plus the output line of each instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedUnit {
    pub text: String,
    pub lines: Vec<u32>,
}

/// Line-counting output buffer
struct Output {
    text: String,
    line: u32,
}

impl Output {
    fn new() -> Self {
        Self {
            text: String::new(),
            line: 0,
        }
    }

    /// Write one line and return its 1-based number
    fn line(&mut self, content: &str) -> u32 {
        self.text.push_str(content);
        self.text.push('\n');
        self.line += 1;
        self.line
    }
}

#[derive(Debug, Clone, Default)]
pub struct Printer {
    options: PrinterOptions,
}

impl Printer {
    pub fn new(options: PrinterOptions) -> Self {
        Self { options }
    }

    pub fn print_module(&self, module: &Module) -> String {
        self.render_module(module).text
    }

    pub fn print_group(&self, group: &ModuleGroup) -> String {
        self.render_group(group).text
    }

    pub fn render_module(&self, module: &Module) -> PrintedUnit {
        self.render(&module.name, &module.globals, module.functions())
    }

    pub fn render_group(&self, group: &ModuleGroup) -> PrintedUnit {
        self.render(&group.name, &group.globals, group.functions.iter())
    }

    fn render<'a>(
        &self,
        name: &str,
        globals: &GlobalValueTable,
        functions: impl Iterator<Item = &'a Function>,
    ) -> PrintedUnit {
        let mut out = Output::new();
        let mut lines = Vec::new();

        out.line(&format!("module {}", quote(name)));

        if !globals.is_empty() {
            out.line("");
            for global in globals.iter() {
                let mut decl = format!("global {} : {}", global.value, global.value.ty);
                if let Some(initializer) = &global.initializer {
                    decl.push_str(&format!(" = {initializer}"));
                }
                out.line(&decl);
            }
        }

        for function in functions {
            out.line("");
            self.render_function(function, &mut out, &mut lines);
        }

        PrintedUnit {
            text: out.text,
            lines,
        }
    }

    fn render_function(&self, function: &Function, out: &mut Output, lines: &mut Vec<u32>) {
        let header = format!(
            "func [{}] @{} : {}",
            function.linkage,
            quote(&function.name),
            function.ty
        );
        if !function.has_body() {
            out.line(&header);
            return;
        }
        out.line(&format!("{header} {{"));
        for block in &function.blocks {
            let mut label = block.id.to_string();
            if !block.arguments.is_empty() {
                let arguments: Vec<String> = block
                    .arguments
                    .iter()
                    .map(|arg| format!("{arg} : {}", arg.ty))
                    .collect();
                label.push_str(&format!("({})", arguments.join(", ")));
            }
            label.push(':');
            out.line(&label);

            for node in &block.instructions {
                lines.push(out.line(&self.render_instruction(node)));
            }
        }
        out.line("}");
    }

    fn render_instruction(&self, node: &InstructionNode) -> String {
        let mut text = format!("  {}", node.instruction);
        let comment = self.render_metadata(&node.metadata);
        if !comment.is_empty() {
            text.push_str(" ; ");
            text.push_str(&comment);
        }
        text
    }

    fn render_metadata(&self, metadata: &Metadata) -> String {
        let mut parts = Vec::new();
        if self.options.line_numbers {
            if let Some(line) = metadata.line {
                parts.push(format!("#{line}"));
            }
        }
        if self.options.source_positions {
            if let Some(position) = &metadata.position {
                parts.push(format!(
                    "loc {}:{}:{}",
                    quote_string(&position.filename),
                    position.line,
                    position.column
                ));
            }
        }
        parts.join(" ")
    }
}

/// Print with default (canonical) options
pub fn print_module(module: &Module) -> String {
    Printer::default().print_module(module)
}
