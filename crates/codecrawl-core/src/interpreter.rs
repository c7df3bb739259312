//! Turn interpreter: structural validation and program execution.
//!
//! [`validate`] runs before anything executes. It rejects programs that read
//! the enemy type before sensing it and programs whose blocks do not
//! balance. [`execute`] then walks the program with a program counter, a
//! block frame stack and a precomputed opener-to-`end` jump table. Every
//! effect is applied before the pacing delay that follows it, and a fault
//! ends execution without undoing anything already applied.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

use codecrawl_items::{BlockEffect, Instruction, ParseError, Program, Variable};
use codecrawl_types::{Element, Entity, GamePlayStats};

use crate::combat::{attack_damage, effectiveness};
use crate::config::PacingConfig;
use crate::narration::{NarrationSink, say};

/// Upper bound on instructions executed in one turn.
pub const MAX_STEPS: usize = 10_000;

/// A structural authoring error. The turn is skipped.
///
/// Positions are 1-based item numbers within the player's program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// An `if enemyType=T` runs before any `enemyType=searchEnemyTypes()`.
    #[error(
        "enemyType is checked at item {position} before enemyType=searchEnemyTypes() sets it"
    )]
    EnemyTypeUnset {
        /// The offending conditional.
        position: usize,
    },

    /// An `end` closes a block that was never opened.
    #[error("`end` at item {position} has no matching `n.times do` or `if`")]
    UnexpectedEnd {
        /// The offending `end`.
        position: usize,
    },

    /// Blocks are still open when the program ends.
    #[error("{open} block(s) are never closed with `end`")]
    UnclosedBlocks {
        /// Nesting depth at the end of the program.
        open: usize,
    },
}

/// A runtime fault. The player's turn ends where it happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionFault {
    /// Raw instruction text could not be decoded.
    #[error("item {position}: {source}")]
    Decode {
        /// Item number of the instruction.
        position: usize,
        /// The decode error.
        source: ParseError,
    },

    /// Control flow reached a block with no matching partner.
    #[error("item {position}: block structure is broken")]
    UnmatchedBlock {
        /// Item number of the opener or `end`.
        position: usize,
    },

    /// The program ran too many instructions.
    #[error("stopped after {limit} steps")]
    StepBudgetExhausted {
        /// The step limit.
        limit: usize,
    },
}

/// The mutable state a program runs against.
#[derive(Debug)]
pub struct CombatContext<'a> {
    /// The player.
    pub player: &'a mut Entity,
    /// The current enemy.
    pub enemy: &'a mut Entity,
    /// Cumulative statistics.
    pub stats: &'a mut GamePlayStats,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check program structure before execution.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found. The enemy type guard is
/// checked over the whole program before the block balance guard.
pub fn validate(program: &Program) -> Result<(), ValidationError> {
    let mut sensed = false;
    for (index, instruction) in program.body().enumerate() {
        if instruction.senses_enemy_type() {
            sensed = true;
        }
        if instruction.reads_enemy_type() && !sensed {
            return Err(ValidationError::EnemyTypeUnset {
                position: index.saturating_add(1),
            });
        }
    }

    let mut depth: usize = 0;
    for (index, instruction) in program.body().enumerate() {
        match instruction.block_effect() {
            BlockEffect::Open => depth = depth.saturating_add(1),
            BlockEffect::Close => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ValidationError::UnexpectedEnd {
                        position: index.saturating_add(1),
                    })?;
            }
            BlockEffect::None => {}
        }
    }
    if depth != 0 {
        return Err(ValidationError::UnclosedBlocks { open: depth });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Variables {
    counter: u32,
    enemy_type: Option<Element>,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Repeat { body: usize, iteration: u32 },
    Conditional,
}

/// Map each block opener to the index of its `end`.
fn match_blocks(instructions: &[Instruction]) -> BTreeMap<usize, usize> {
    let mut jumps = BTreeMap::new();
    let mut open = Vec::new();
    for (pc, instruction) in instructions.iter().enumerate() {
        match instruction.block_effect() {
            BlockEffect::Open => open.push(pc),
            BlockEffect::Close => {
                if let Some(opener) = open.pop() {
                    jumps.insert(opener, pc);
                }
            }
            BlockEffect::None => {}
        }
    }
    jumps
}

/// Item number of a program counter, ignoring the prelude.
const fn item_number(pc: usize) -> usize {
    pc.saturating_sub(Program::PRELUDE_LEN).saturating_add(1)
}

/// The instruction after the `end` matching the opener at `pc`.
fn skip_block(jumps: &BTreeMap<usize, usize>, pc: usize) -> Result<usize, ExecutionFault> {
    jumps
        .get(&pc)
        .map(|end| end.saturating_add(1))
        .ok_or(ExecutionFault::UnmatchedBlock {
            position: item_number(pc),
        })
}

pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Run a program against the combat context.
///
/// Call [`validate`] first; a structurally broken program faults when
/// control reaches the broken block.
///
/// # Errors
///
/// Returns an [`ExecutionFault`] if an instruction cannot run. Effects
/// applied before the fault stay applied.
pub async fn execute<S: NarrationSink + ?Sized>(
    program: &Program,
    ctx: &mut CombatContext<'_>,
    pacing: &PacingConfig,
    sink: &mut S,
) -> Result<(), ExecutionFault> {
    let instructions = program.instructions();
    let jumps = match_blocks(instructions);
    let mut vars = Variables::default();
    let mut frames: Vec<Frame> = Vec::new();
    let mut pc = 0_usize;
    let mut steps = 0_usize;

    while let Some(instruction) = instructions.get(pc) {
        steps = steps.saturating_add(1);
        if steps > MAX_STEPS {
            return Err(ExecutionFault::StepBudgetExhausted { limit: MAX_STEPS });
        }

        let step: Cow<'_, Instruction> = match instruction {
            Instruction::Raw(text) => Cow::Owned(Instruction::decode(text).map_err(|source| {
                ExecutionFault::Decode {
                    position: item_number(pc),
                    source,
                }
            })?),
            other => Cow::Borrowed(other),
        };
        let next = pc.saturating_add(1);

        pc = match &*step {
            Instruction::Declare(Variable::Counter) => {
                vars.counter = 0;
                next
            }
            Instruction::Declare(Variable::EnemyType) => {
                vars.enemy_type = None;
                next
            }
            Instruction::SetCounter(value) => {
                vars.counter = *value;
                next
            }
            Instruction::Repeat => {
                if vars.counter == 0 {
                    skip_block(&jumps, pc)?
                } else {
                    frames.push(Frame::Repeat {
                        body: next,
                        iteration: 0,
                    });
                    next
                }
            }
            Instruction::IfEnemyType(element) => {
                if vars.enemy_type == Some(*element) {
                    frames.push(Frame::Conditional);
                    next
                } else {
                    skip_block(&jumps, pc)?
                }
            }
            Instruction::End => match frames.pop() {
                Some(Frame::Repeat { body, iteration }) => {
                    let iteration = iteration.saturating_add(1);
                    if iteration < vars.counter {
                        frames.push(Frame::Repeat { body, iteration });
                        body
                    } else {
                        next
                    }
                }
                Some(Frame::Conditional) => next,
                None => {
                    return Err(ExecutionFault::UnmatchedBlock {
                        position: item_number(pc),
                    });
                }
            },
            Instruction::Attack => {
                attack(ctx, sink);
                pause(pacing.attack_delay()).await;
                next
            }
            Instruction::AtkUp(value) => {
                ctx.player.atk = ctx.player.atk.saturating_add(*value);
                say(sink, format!("ATK rose by {value}! (ATK: {})", ctx.player.atk));
                pause(pacing.effect_delay()).await;
                next
            }
            Instruction::BpUp(value) => {
                ctx.player.bp = ctx.player.bp.saturating_add_unsigned(*value);
                say(sink, format!("BP+{value} (BP: {})", ctx.player.bp));
                pause(pacing.effect_delay()).await;
                next
            }
            Instruction::Heal(value) => {
                ctx.player.heal(*value);
                say(
                    sink,
                    format!(
                        "Recovered {value} HP! (HP: {}/{})",
                        ctx.player.hp, ctx.player.max_hp
                    ),
                );
                pause(pacing.effect_delay()).await;
                next
            }
            Instruction::SenseEnemyType => {
                vars.enemy_type = ctx.enemy.element;
                let name = ctx.enemy.element.map_or("unknown", Element::as_str);
                say(sink, format!("Enemy type checked: {name}"));
                pause(pacing.effect_delay()).await;
                next
            }
            Instruction::SetAtkType(element) => {
                ctx.player.atk_type = Some(*element);
                say(sink, format!("Attack type set to {element}"));
                pause(pacing.effect_delay()).await;
                next
            }
            Instruction::Raw(text) => {
                return Err(ExecutionFault::Decode {
                    position: item_number(pc),
                    source: ParseError::UnknownInstruction { text: text.clone() },
                });
            }
        };
    }
    Ok(())
}

/// One `atk()`: spend a behavior point, then strike.
fn attack<S: NarrationSink + ?Sized>(ctx: &mut CombatContext<'_>, sink: &mut S) {
    ctx.player.bp = ctx.player.bp.saturating_sub(1);
    if ctx.player.bp < 0 {
        let penalty = ctx.player.bp.unsigned_abs();
        ctx.enemy.bp = ctx.enemy.bp.saturating_add_unsigned(penalty);
        say(sink, format!("Out of BP! The enemy gains {penalty} BP."));
    }

    let matchup = effectiveness(ctx.player.atk_type, ctx.enemy.element);
    if let Some(line) = matchup.narration() {
        say(sink, line);
    }
    let damage = attack_damage(ctx.player.atk, matchup);
    say(sink, format!("Player attacks! {damage} damage."));
    let dealt = ctx.enemy.take_damage(damage);
    ctx.stats.total_damage_dealt = ctx.stats.total_damage_dealt.saturating_add(u64::from(dealt));
}
