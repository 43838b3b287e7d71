use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for CLI status lines. Record data is never styled.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub dim: Style,
}

impl Theme {
    /// Colored on a terminal unless `NO_COLOR` is set.
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        if no_color || !console::Term::stderr().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow(),
            dim: Style::new().dimmed(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            header: none.clone(),
            success: none.clone(),
            error: none.clone(),
            warn: none.clone(),
            dim: none,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
