//! Simplification passes run over finished modules

mod line_numbers;
mod prune;

pub use self::line_numbers::{assign_group_line_numbers, assign_line_numbers};
pub use self::prune::{prune_function, prune_module};
