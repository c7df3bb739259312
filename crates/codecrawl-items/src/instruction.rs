//! The executable instruction model.
//!
//! A [`Program`] is a flat list of [`Instruction`]s. Each instruction
//! renders to a line of script-like text for display, and legacy items that
//! only carry such text are decoded back through [`Instruction::decode`].

use core::fmt;

use codecrawl_types::{Element, ItemKind};

use crate::catalog::DEFAULT_VALUE;
use crate::error::ParseError;
use crate::parser::parse_digits;

/// Variables implicitly declared at the top of every program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// The loop counter `n`, initialized to 0.
    Counter,
    /// The sensed enemy element, initially unset.
    EnemyType,
}

/// How an instruction affects block nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEffect {
    /// Opens a block (`n.times do`, `if enemyType=T`).
    Open,
    /// Closes the innermost block (`end`).
    Close,
    /// No effect on nesting.
    None,
}

/// One executable step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Implicit variable declaration.
    Declare(Variable),
    /// Assign the loop counter.
    SetCounter(u32),
    /// Repeat the enclosed block `n` times.
    Repeat,
    /// Attack the enemy.
    Attack,
    /// Raise attack power.
    AtkUp(u32),
    /// Close the innermost block.
    End,
    /// Gain behavior points.
    BpUp(u32),
    /// Heal.
    Heal(u32),
    /// Read the enemy element into `enemyType`.
    SenseEnemyType,
    /// Run the enclosed block only if `enemyType` equals the element.
    IfEnemyType(Element),
    /// Declare the player's attack element.
    SetAtkType(Element),
    /// Unresolved instruction text from a legacy item, decoded when run.
    Raw(String),
}

impl From<ItemKind> for Instruction {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::AssignCounter { value } => Self::SetCounter(value),
            ItemKind::RepeatCounter => Self::Repeat,
            ItemKind::Attack => Self::Attack,
            ItemKind::AtkUp { value } => Self::AtkUp(value),
            ItemKind::End => Self::End,
            ItemKind::BpUp { value } => Self::BpUp(value),
            ItemKind::Heal { value } => Self::Heal(value),
            ItemKind::SenseEnemyType => Self::SenseEnemyType,
            ItemKind::IfEnemyType { element } => Self::IfEnemyType(element),
            ItemKind::SetAtkType { element } => Self::SetAtkType(element),
        }
    }
}

impl Instruction {
    /// Decode instruction text, accepting both current and legacy shapes.
    ///
    /// Whitespace is insignificant and a trailing `;` is optional. Calls
    /// without an argument (`heal()`) use the default value.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownInstruction`] for anything else.
    pub fn decode(text: &str) -> Result<Self, ParseError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let statement = compact.strip_suffix(';').unwrap_or(&compact);

        let decoded = match statement {
            "letn=0" => Some(Self::Declare(Variable::Counter)),
            "letenemyType" | "letenemyType=null" => Some(Self::Declare(Variable::EnemyType)),
            "for(leti=0;i<n;i++){" => Some(Self::Repeat),
            "awaitatk()" | "atk()" => Some(Self::Attack),
            "}" => Some(Self::End),
            "enemyType=searchEnemyTypes()" => Some(Self::SenseEnemyType),
            _ => None,
        };

        decoded
            .or_else(|| decode_parameterized(statement))
            .ok_or_else(|| ParseError::UnknownInstruction {
                text: text.to_owned(),
            })
    }

    /// Nesting effect, looking through decodable raw text.
    pub fn block_effect(&self) -> BlockEffect {
        match self {
            Self::Repeat | Self::IfEnemyType(_) => BlockEffect::Open,
            Self::End => BlockEffect::Close,
            Self::Raw(text) => match Self::decode(text) {
                Ok(Self::Raw(_)) | Err(_) => BlockEffect::None,
                Ok(decoded) => decoded.block_effect(),
            },
            _ => BlockEffect::None,
        }
    }

    /// Whether this reads the sensed enemy element.
    pub fn reads_enemy_type(&self) -> bool {
        match self {
            Self::IfEnemyType(_) => true,
            Self::Raw(text) => matches!(Self::decode(text), Ok(Self::IfEnemyType(_))),
            _ => false,
        }
    }

    /// Whether this writes the sensed enemy element.
    pub fn senses_enemy_type(&self) -> bool {
        match self {
            Self::SenseEnemyType => true,
            Self::Raw(text) => matches!(Self::decode(text), Ok(Self::SenseEnemyType)),
            _ => false,
        }
    }

    /// Whether a pacing delay follows this instruction.
    pub const fn is_timed(&self) -> bool {
        matches!(
            self,
            Self::Attack
                | Self::AtkUp(_)
                | Self::BpUp(_)
                | Self::Heal(_)
                | Self::SenseEnemyType
                | Self::SetAtkType(_)
        )
    }
}

fn decode_parameterized(statement: &str) -> Option<Instruction> {
    if let Some(value) = statement.strip_prefix("n=") {
        return parse_digits(value).map(Instruction::SetCounter);
    }
    if let Some(value) = call_value(statement, "atk_inc") {
        return value.map(Instruction::AtkUp);
    }
    if let Some(value) = call_value(statement, "bp_inc") {
        return value.map(Instruction::BpUp);
    }
    if let Some(value) = call_value(statement, "heal") {
        return value.map(Instruction::Heal);
    }
    if let Some(tag) = statement
        .strip_prefix("if(enemyType===")
        .and_then(|rest| rest.strip_suffix("){"))
    {
        return unquote(tag)?.parse().ok().map(Instruction::IfEnemyType);
    }
    if let Some(tag) = statement
        .strip_prefix("setAtkType(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return unquote(tag)?.parse().ok().map(Instruction::SetAtkType);
    }
    None
}

/// `name(<digits>?)`. The outer option says whether `name(...)` matched,
/// the inner one whether its argument was valid.
fn call_value(statement: &str, name: &str) -> Option<Option<u32>> {
    let arg = statement
        .strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')?;
    if arg.is_empty() {
        return Some(Some(DEFAULT_VALUE));
    }
    Some(parse_digits(arg))
}

fn unquote(tag: &str) -> Option<&str> {
    tag.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .or_else(|| tag.strip_prefix('"').and_then(|t| t.strip_suffix('"')))
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declare(Variable::Counter) => f.write_str("let n = 0;"),
            Self::Declare(Variable::EnemyType) => f.write_str("let enemyType;"),
            Self::SetCounter(value) => write!(f, "n = {value};"),
            Self::Repeat => f.write_str("for (let i = 0; i < n; i++) {"),
            Self::Attack => f.write_str("await atk();"),
            Self::AtkUp(value) => write!(f, "atk_inc({value});"),
            Self::End => f.write_str("}"),
            Self::BpUp(value) => write!(f, "bp_inc({value});"),
            Self::Heal(value) => write!(f, "heal({value});"),
            Self::SenseEnemyType => f.write_str("enemyType = searchEnemyTypes();"),
            Self::IfEnemyType(element) => write!(f, "if (enemyType === '{element}') {{"),
            Self::SetAtkType(element) => write!(f, "setAtkType('{element}');"),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

/// A transpiled program: two implicit declarations followed by one
/// instruction per item, in item order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Number of implicit leading declarations.
    pub const PRELUDE_LEN: usize = 2;

    /// Build a program from the per-item instructions.
    pub fn new(body: impl IntoIterator<Item = Instruction>) -> Self {
        let mut instructions = vec![
            Instruction::Declare(Variable::Counter),
            Instruction::Declare(Variable::EnemyType),
        ];
        instructions.extend(body);
        Self { instructions }
    }

    /// All instructions including the prelude.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The per-item instructions, without the prelude.
    pub fn body(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().skip(Self::PRELUDE_LEN)
    }

    /// Total instruction count including the prelude.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program has no instructions at all.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}
