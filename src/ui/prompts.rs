//! Interactive prompts with CI/non-interactive fallback
//!
//! cliclack blocks on the terminal, so every prompt runs on tokio's
//! blocking pool.

use super::context::UiContext;
use crate::error::{FeedError, FeedResult};

/// Ask for confirmation; `--yes` approves, non-interactive takes `default`
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> FeedResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    blocking("Confirm", move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
}

/// Ask for a line of text
///
/// Non-interactive sessions cannot answer, so a missing value is an error
/// naming the flag that supplies it.
pub async fn input(
    ctx: &UiContext,
    message: &str,
    placeholder: &str,
    flag: &str,
) -> FeedResult<String> {
    if !ctx.is_interactive() {
        return Err(missing(flag));
    }

    let message = message.to_string();
    let placeholder = placeholder.to_string();
    blocking("Input", move || {
        cliclack::input(&message)
            .placeholder(&placeholder)
            .interact::<String>()
    })
    .await
}

/// Ask for a secret without echoing it
pub async fn password(ctx: &UiContext, message: &str, flag: &str) -> FeedResult<String> {
    if !ctx.is_interactive() {
        return Err(missing(flag));
    }

    let message = message.to_string();
    blocking("Password", move || {
        cliclack::password(&message).mask('▪').interact()
    })
    .await
}

/// Pick one of `options`; non-interactive takes the first
pub async fn select<T: Clone + Send + Eq + 'static>(
    ctx: &UiContext,
    message: &str,
    options: &[(T, &str, &str)], // (value, label, hint)
) -> FeedResult<T> {
    let Some((first, _, _)) = options.first() else {
        return Err(FeedError::Internal(format!("{} has no options", message)));
    };
    if !ctx.is_interactive() || ctx.auto_yes() {
        return Ok(first.clone());
    }

    let message = message.to_string();
    let items: Vec<(T, String, String)> = options
        .iter()
        .map(|(v, l, h)| (v.clone(), l.to_string(), h.to_string()))
        .collect();

    blocking("Select", move || {
        let mut select = cliclack::select(&message);
        for (value, label, hint) in items {
            select = select.item(value, label, hint);
        }
        select.interact()
    })
    .await
}

async fn blocking<T, F>(what: &str, prompt: F) -> FeedResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(prompt)
        .await
        .map_err(|e| FeedError::User(format!("{} task failed: {}", what, e)))?
        .map_err(|e| FeedError::User(format!("{} failed: {}", what, e)))
}

fn missing(flag: &str) -> FeedError {
    FeedError::User(format!("{} is required when not running interactively", flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn confirm_auto_yes() {
        let ctx = UiContext::non_interactive().with_auto_yes(true);
        assert!(confirm(&ctx, "Delete?", false).await.unwrap());
    }

    #[tokio::test]
    async fn confirm_non_interactive_default() {
        let ctx = UiContext::non_interactive();
        assert!(confirm(&ctx, "Delete?", true).await.unwrap());
        assert!(!confirm(&ctx, "Delete?", false).await.unwrap());
    }

    #[tokio::test]
    async fn input_without_terminal_names_the_flag() {
        let ctx = UiContext::non_interactive();
        let err = input(&ctx, "Email", "you@example.com", "--email")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--email"));

        let err = password(&ctx, "Password", "--password-stdin")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--password-stdin"));
    }

    #[tokio::test]
    async fn select_non_interactive_first() {
        let ctx = UiContext::non_interactive();
        let options = vec![("male", "Male", ""), ("female", "Female", "")];
        assert_eq!(select(&ctx, "Gender", &options).await.unwrap(), "male");
    }
}
