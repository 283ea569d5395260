//! Built-in detectors, recursive dispatchers and custom rules.

mod custom;
mod find;
mod git;
mod parallel;
mod rm;
mod text;
mod xargs;

pub use custom::check_custom_rules;
pub use find::{analyze_find, find_has_delete};
pub use git::{analyze_git, checkout_positional_args, extract_git_subcommand_and_rest};
pub use parallel::{
    ParallelCommand, analyze_parallel, extract_parallel_child_command, parse_parallel_command,
};
pub use rm::{
    REASON_RM_RF, REASON_RM_RF_ROOT_HOME, RmOptions, analyze_rm, has_recursive_force,
    is_home_directory, is_temp_value,
};
pub use text::{REASON_INTERPRETER_CODE, scan_interpreter_code, scan_shell_text};
pub use xargs::{
    XargsChild, analyze_xargs, extract_xargs_child_command, extract_xargs_child_command_with_info,
};
