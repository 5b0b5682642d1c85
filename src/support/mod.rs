//! External collaborator contracts: permissions, expressions, id generation.

pub mod expression;
pub mod id;
pub mod permission;

pub use expression::{ExpressionEvaluator, SimpleEvaluator};
pub use id::{IdGenerator, SequenceIds, UuidGenerator};
pub use permission::{Action, PermissionChecker, StaticPermissions};
