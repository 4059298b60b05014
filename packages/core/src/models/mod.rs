//! Data Models
//!
//! - `Node` - the single entity of the ordered tree
//! - `MutationOutcome` - tagged result of update, delete and move

mod node;
mod outcome;

pub use node::{Node, ValidationError};
pub use outcome::MutationOutcome;
