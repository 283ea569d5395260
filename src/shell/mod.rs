//! Shell command parsing.

mod splitter;
mod tokenizer;
mod wrappers;

pub use splitter::{CommandSegment, Operator, split_commands};
pub use tokenizer::{Tokenized, tokenize, tokenize_with_status};
pub use wrappers::{
    EnvAssignments, WrapperStripping, extract_short_opts, get_basename, normalize_command_token,
    parse_env_assignment, strip_env_assignments, strip_wrappers, strip_wrappers_with_info,
};
