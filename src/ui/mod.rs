//! Terminal presentation
//!
//! Uses `cliclack` for prompts and framing, `indicatif` for upload
//! spinners, and falls back to plain lines in CI or when piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use linkpost::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Loading feed...");
//! // ... fetch ...
//! spinner.stop("12 posts");
//!
//! ui::step_warn_hint(&ctx, "Not logged in", "Run: linkpost login");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    comment_line, intro, key_value, note, outro_success, post_block, remark, section, step_info,
    step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{TaskSpinner, UploadProgress};
pub use prompts::{confirm, input, password, select};
pub use theme::{init_theme, LinkpostTheme};
