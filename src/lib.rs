//! `formcheck` validates nested form data (anything representable as a
//! `serde_json::Value`) against a declarative schema, and reports every
//! problem it finds, each tagged with the dotted path of the offending field.
//!
//! # Validating data
//!
//! A schema maps top-level field names to nodes. A node may declare a `type`
//! (`object`, `string`, `array`, `number`, `boolean` or `null`), child
//! `properties`, array `items`, a string `pattern`, a named `format` (`date`
//! and `email` are built in), and a `required` marker:
//!
//! ```
//! use failure::Error;
//! use formcheck::{ErrorKind, Schema, Validator};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Error> {
//!     let schema: Schema = r#"
//!         {
//!             "name": { "type": "string", "required": true },
//!             "email": { "type": "string", "format": "email" },
//!             "tags": {
//!                 "type": "array",
//!                 "items": { "type": "string" }
//!             }
//!         }
//!     "#
//!     .parse()?;
//!
//!     let validator = Validator::new(schema);
//!     let input_ok = json!({
//!         "name": "Ada Lovelace",
//!         "email": "ada@example.com",
//!         "tags": ["math", "engines"]
//!     });
//!
//!     assert!(validator.validate_schema(&input_ok, "root")?.is_empty());
//!
//!     let input_bad = json!({
//!         "email": "ada",
//!         "tags": ["math", 42]
//!     });
//!
//!     // Errors come out in the order the schema declares its fields.
//!     let errors = validator.validate_schema(&input_bad, "root")?;
//!     assert_eq!(errors.len(), 3);
//!
//!     // "name" is required
//!     assert_eq!(errors[0].path(), "root.name");
//!     assert_eq!(errors[0].kind(), ErrorKind::Required);
//!     assert_eq!(errors[0].to_string(), "Field root.name is required");
//!
//!     // "email" has no "@"
//!     assert_eq!(errors[1].path(), "root.email");
//!     assert_eq!(errors[1].kind(), ErrorKind::Format);
//!
//!     // "tags[1]" has the wrong type
//!     assert_eq!(errors[2].path(), "root.tags.1");
//!     assert_eq!(errors[2].kind(), ErrorKind::Schema);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Logging
//!
//! The validator logs through [`tracing`](https://docs.rs/tracing): one
//! `trace` event per field visited, and a `debug` summary per form. Install a
//! subscriber to see them.

mod serde;
mod vm;

pub mod errors;
pub mod format;
pub mod registry;
pub mod response;
pub mod schema;
pub mod validator;

pub use crate::errors::FormError;
pub use crate::format::{DateRule, EmailRule, FormatError, FormatRule};
pub use crate::registry::FormatRegistry;
pub use crate::response::Response;
pub use crate::schema::{Pattern, Schema, SchemaNode, Type};
pub use crate::serde::SerdeSchema;
pub use crate::validator::{Config, ErrorKind, ValidationError, Validator};
