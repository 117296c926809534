//! Custom theme for cliclack prompts

use cliclack::ThemeState;
use console::Style;

/// Blue branding for prompts and spinners
#[derive(Debug, Clone, Default)]
pub struct LinkpostTheme;

impl cliclack::Theme for LinkpostTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().blue().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

/// Initialize the global theme
pub fn init_theme() {
    cliclack::set_theme(LinkpostTheme);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliclack::Theme;

    #[test]
    fn error_state_is_red() {
        let theme = LinkpostTheme;
        let error = ThemeState::Error("bad".to_string());
        assert_eq!(
            theme.bar_color(&error).apply_to("x").to_string(),
            Style::new().red().apply_to("x").to_string()
        );
    }
}
