//! The item catalog: a static, ordered registry of item definitions.
//!
//! Order matters. Label resolution walks the catalog front to back and the
//! first definition whose label (or label pattern) matches wins.

use codecrawl_types::{Element, ItemCategory, ItemKind, ItemType};

use crate::parser::Parameters;

/// Default numeric argument for parameterized items.
pub const DEFAULT_VALUE: u32 = 1;

/// Default elemental argument for parameterized items.
pub const DEFAULT_ELEMENT: Element = Element::Water;

/// Fallback text for labels the catalog does not know.
pub const NO_DESCRIPTION: &str = "No description is available for this item.";

/// Typed parameter declared by a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSpec {
    /// A numeric value; rewards draw it from `1..=3`.
    Value,
    /// One of the elemental tags.
    Element,
}

/// A catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct ItemDefinition {
    /// Stable identifier.
    pub id: &'static str,
    /// Display label. Parameterized labels carry an `=X` or `=T` placeholder.
    pub label: &'static str,
    /// Player-facing description.
    pub description: &'static str,
    /// Catalog grouping.
    pub category: ItemCategory,
    /// Parameter, if the label is parameterized.
    pub parameter: Option<ParameterSpec>,
    /// Builds the resolved kind from extracted parameters.
    build: fn(&Parameters) -> ItemKind,
}

impl ItemDefinition {
    /// Whether the label contains a placeholder.
    pub const fn is_parameterized(&self) -> bool {
        self.parameter.is_some()
    }

    /// Resolve to a concrete kind, filling missing parameters with defaults.
    pub fn build(&self, params: &Parameters) -> ItemKind {
        (self.build)(params)
    }

    /// The card category of items built from this definition.
    pub fn item_type(&self) -> ItemType {
        self.build(&Parameters::default()).item_type()
    }
}

/// All item definitions in resolution order.
pub static CATALOG: [ItemDefinition; 10] = [
    ItemDefinition {
        id: "n_assign",
        label: "n=X",
        description: "Declares the variable n.",
        category: ItemCategory::Syntax,
        parameter: Some(ParameterSpec::Value),
        build: |p| ItemKind::AssignCounter {
            value: p.value.unwrap_or(DEFAULT_VALUE),
        },
    },
    ItemDefinition {
        id: "n_times_do",
        label: "n.times do",
        description: "Repeats n times. Use together with `end`.",
        category: ItemCategory::Syntax,
        parameter: None,
        build: |_| ItemKind::RepeatCounter,
    },
    ItemDefinition {
        id: "atk_call",
        label: "atk()",
        description: "Calls the attack function. Damage depends on the player's atk and the \
                      type matchup.",
        category: ItemCategory::Attack,
        parameter: None,
        build: |_| ItemKind::Attack,
    },
    ItemDefinition {
        id: "atk_increase",
        label: "atk+=X",
        description: "Raises the player's attack power.",
        category: ItemCategory::Attack,
        parameter: Some(ParameterSpec::Value),
        build: |p| ItemKind::AtkUp {
            value: p.value.unwrap_or(DEFAULT_VALUE),
        },
    },
    ItemDefinition {
        id: "end",
        label: "end",
        description: "Closes a conditional or a loop.",
        category: ItemCategory::Syntax,
        parameter: None,
        build: |_| ItemKind::End,
    },
    ItemDefinition {
        id: "bp_increase",
        label: "bp+=X",
        description: "Gains behavior points.",
        category: ItemCategory::Behavior,
        parameter: Some(ParameterSpec::Value),
        build: |p| ItemKind::BpUp {
            value: p.value.unwrap_or(DEFAULT_VALUE),
        },
    },
    ItemDefinition {
        id: "hp_increase",
        label: "hp+=X",
        description: "Raises your own HP. In other words, heals.",
        category: ItemCategory::Heal,
        parameter: Some(ParameterSpec::Value),
        build: |p| ItemKind::Heal {
            value: p.value.unwrap_or(DEFAULT_VALUE),
        },
    },
    ItemDefinition {
        id: "search_enemy_type",
        label: "enemyType=searchEnemyTypes()",
        description: "Stores the result of searchEnemyTypes, the enemy's element, in enemyType.",
        category: ItemCategory::Element,
        parameter: None,
        build: |_| ItemKind::SenseEnemyType,
    },
    ItemDefinition {
        id: "if_enemy_type",
        label: "if enemyType=T",
        description: "Branches on the enemy's element.",
        category: ItemCategory::Syntax,
        parameter: Some(ParameterSpec::Element),
        build: |p| ItemKind::IfEnemyType {
            element: p.element.unwrap_or(DEFAULT_ELEMENT),
        },
    },
    ItemDefinition {
        id: "atk_type_assign",
        label: "atkType=T",
        description: "Declares the player's attack element.",
        category: ItemCategory::Attack,
        parameter: Some(ParameterSpec::Element),
        build: |p| ItemKind::SetAtkType {
            element: p.element.unwrap_or(DEFAULT_ELEMENT),
        },
    },
];

/// Look up a definition by its stable id.
pub fn by_id(id: &str) -> Option<&'static ItemDefinition> {
    CATALOG.iter().find(|def| def.id == id)
}
