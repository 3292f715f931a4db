//! Expression engine
//!
//! MSBuild values are expressions: literal text mixed with `$(Property)`,
//! `@(Item)` and `%(Metadata)` references, property functions, and lists.
//! Conditions add comparisons and boolean operators on top.
//!
//! ```text
//! text ──► parse_expression ──► ExprNode tree (ranges into the source)
//!                 │                   │
//!                 │                   ├─► trigger states (completion)
//!                 │                   └─► evaluate (import paths)
//!                 └─ CONDITION ──► logos token stream ──► condition parser
//! ```

mod ast;
mod condition;
mod evaluate;
mod parser;
mod trigger;

pub use ast::{CompareOp, ExprKind, ExprNode, ExpressionErrorKind, InvocationKind, Literal};
pub use condition::{ConditionToken, Delimiter, Token, tokenize as tokenize_condition};
pub use evaluate::{
    EvaluationContext, EvaluationError, evaluate, find_file_above, native_path, normalize, unescape,
};
pub use parser::{ExpressionOptions, parse_expression};
pub use trigger::{
    ConditionTriggerResult, ListKind, ListPermission, TriggerResult, TriggerState, get_condition_trigger_state,
    get_trigger_state, validate_list_permitted,
};
