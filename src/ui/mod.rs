//! Terminal output for lazyinstall
//!
//! Uses `cliclack` for styled output on interactive terminals, with plain
//! `[OK]`/`[WARN]` lines in CI and when output is piped. Install commands
//! write straight to the terminal, so nothing here draws spinners.

mod context;
mod output;
mod prompts;

pub use context::UiContext;
pub use output::{intro, outro_success, remark, step_info, step_ok, step_warn};
pub use prompts::confirm;
