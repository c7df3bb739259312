//! Item list to [`Program`] conversion.

use codecrawl_types::NodeItem;

use crate::instruction::{Instruction, Program};
use crate::parser;

/// Convert the player's ordered items into a program.
///
/// Each item contributes exactly one instruction, in order. Items whose
/// kind is known (attached at creation or by [`parser::hydrate`]) and items
/// whose label still resolves become typed instructions; anything else
/// falls back to its stored instruction text, or its label when it has
/// none, and is decoded when executed.
pub fn transpile(items: &[NodeItem]) -> Program {
    Program::new(items.iter().map(instruction_for))
}

fn instruction_for(item: &NodeItem) -> Instruction {
    if let Some(kind) = item.kind.or_else(|| parser::parse_item(&item.label)) {
        return kind.into();
    }
    tracing::debug!(id = %item.id, label = %item.label, "transpiling opaque item");
    Instruction::Raw(item.code.clone().unwrap_or_else(|| item.label.clone()))
}
