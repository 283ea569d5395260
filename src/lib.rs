//! cc-safety-net - pre-execution shell command policy engine.
//!
//! Statically analyzes the shell commands a coding agent is about to run
//! and denies destructive ones: recursive deletes outside the project,
//! history-destroying git operations, `find -delete`, and the same commands
//! hidden behind wrappers, `sh -c`, `xargs` or GNU `parallel`.

pub mod analysis;
pub mod audit;
pub mod config;
pub mod decision;
pub mod hook;
pub mod output;
pub(crate) mod paths;
pub mod rules;
pub mod shell;

pub use analysis::{AnalysisContext, AnalysisResult, analyze_command};
pub use config::{Config, CustomRule, EffectiveRuleSet};
pub use decision::Decision;
pub use output::format_blocked_message;
