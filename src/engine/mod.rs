//! Metric evaluation and level escalation
//!
//! A cycle fetches every configured metric, resolves the active escalation
//! level, composes a message per destination of that level and dispatches
//! it. Cycles are triggered by [`CycleWorker`] on a timer and by the HTTP
//! trigger endpoint on demand.

pub mod comparator;
pub mod composer;
pub mod cycle;
pub mod resolver;
pub mod template;
pub mod worker;

pub use comparator::{compare, exceeds, Comparison, ParseError};
pub use composer::compose;
pub use cycle::{CycleOutcome, CycleReport, Engine};
pub use resolver::{resolve, LevelEvaluation, Metric, Resolution};
pub use template::{Template, TemplateError};
pub use worker::CycleWorker;
