//! An error type for all formcheck-related operations.

use failure::Fail;

/// An enum of possible errors that can emerge from this crate.
///
/// Validation *findings* are not represented here. A list of
/// [`ValidationError`](../validator/struct.ValidationError.html)s is the
/// successful result of validating; these variants mean validation (or schema
/// construction) could not be carried out at all.
#[derive(Debug, Fail, PartialEq, Clone, Eq, Hash)]
pub enum FormError {
    /// A schema definition was not a mapping where a schema node was expected.
    ///
    /// Every node of a schema, including the root field map, must be a JSON
    /// object. `properties` must map names to nodes and `items` must be a
    /// single node.
    #[fail(display = "invalid schema node: {}", reason)]
    InvalidNode { reason: String },

    /// The maximum depth during evaluation was exceeded.
    ///
    /// This means the instance is nested deeper than the configured
    /// `max_depth` allows.
    #[fail(display = "maximum depth of {} exceeded during validation", max_depth)]
    MaxDepthExceeded { max_depth: usize },

    /// A schema file does not exist.
    #[fail(display = "Error loading schema: File not found - {}", path)]
    SchemaNotFound { path: String },

    /// A schema file exists but could not be read or parsed.
    #[fail(display = "Error loading schema: {} - {}", reason, path)]
    SchemaUnreadable { path: String, reason: String },
}
