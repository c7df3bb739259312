//! Error types for the codecrawl-core crate.
//!
//! [`GameError`] covers actions that are not allowed in the current state
//! of a run. Structural and runtime faults inside a turn are not errors at
//! this level; they are reported in the turn report and the turn still
//! resolves.

use codecrawl_items::ParseError;
use codecrawl_types::GameState;

/// Errors returned by run-state operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Another turn is still running.
    #[error("a turn is already in progress")]
    TurnInFlight,

    /// The program and inventory are read-only in the final cycle's battles.
    #[error("editing is locked during battles in the final cycle")]
    EditingLocked,

    /// The action is not available in the current game state.
    #[error("cannot {action} while in {state:?}")]
    WrongState {
        /// The attempted action.
        action: &'static str,
        /// The current state.
        state: GameState,
    },

    /// The traversal direction is fixed once chosen.
    #[error("traversal direction has already been chosen")]
    DirectionAlreadyChosen,

    /// The map cannot advance before a direction is chosen.
    #[error("no traversal direction has been chosen")]
    NoDirection,

    /// A presentation is waiting to be dismissed.
    #[error("a reward, upgrade or result is waiting to be dismissed")]
    PresentationOpen,

    /// The action needs a presentation that is not showing.
    #[error("no {expected} is being presented")]
    NotPresenting {
        /// The presentation the action needs.
        expected: &'static str,
    },

    /// A container index is out of range.
    #[error("{container} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Which container.
        container: &'static str,
        /// The requested index.
        index: usize,
        /// The container length.
        len: usize,
    },

    /// No item with the given id.
    #[error("no item with id {id}")]
    ItemNotFound {
        /// The requested id.
        id: String,
    },

    /// A trade was requested before selecting a shop item.
    #[error("no shop item is selected")]
    NoShopSelection,

    /// There is no living enemy to fight.
    #[error("there is no enemy to fight")]
    NoEncounter,

    /// The player is dead or the boss is beaten.
    #[error("the run is over")]
    RunOver,

    /// An item operation failed.
    #[error("item error: {source}")]
    Item {
        /// The underlying item error.
        #[from]
        source: ParseError,
    },
}
