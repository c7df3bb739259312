//! Error types for the codecrawl-items crate.

/// Errors produced while resolving labels or decoding instruction text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No catalog definition matches the label.
    #[error("unknown item label: {label:?}")]
    UnknownLabel {
        /// The rejected label.
        label: String,
    },

    /// Raw instruction text is not one of the known instruction shapes.
    #[error("unrecognized instruction: {text:?}")]
    UnknownInstruction {
        /// The rejected instruction text.
        text: String,
    },

    /// The item has no upgraded form.
    #[error("item cannot be upgraded: {label}")]
    NotUpgradable {
        /// Label of the item.
        label: String,
    },
}
