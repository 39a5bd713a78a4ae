//! Terminal styles for the CLI.
//!
//! Status lines on stderr and tables on stdout are colored independently, so
//! `stockroom list > out.txt` stays plain while errors still show in color.

use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for one output stream
#[derive(Debug, Clone)]
pub struct Palette {
    pub heading: Style,
    pub accepted: Style,
    pub rejected: Style,
    pub caution: Style,
    pub note: Style,
    pub label: Style,
    /// Products with nothing left in stock
    pub sold_out: Style,
}

impl Palette {
    pub fn colored() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            accepted: Style::new().green().bold(),
            rejected: Style::new().red().bold(),
            caution: Style::new().yellow().bold(),
            note: Style::new().magenta(),
            label: Style::new().white().dimmed(),
            sold_out: Style::new().red(),
        }
    }

    pub fn plain() -> Self {
        Self {
            heading: Style::new(),
            accepted: Style::new(),
            rejected: Style::new(),
            caution: Style::new(),
            note: Style::new(),
            label: Style::new(),
            sold_out: Style::new(),
        }
    }

    fn pick(enabled: bool) -> Self {
        if enabled { Self::colored() } else { Self::plain() }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    /// Tables, headers and listings
    pub out: Palette,
    /// Errors and warnings
    pub err: Palette,
}

impl Theme {
    /// Honors `NO_COLOR`/`CLICOLOR` and whether each stream is a terminal
    pub fn detect() -> Self {
        Self {
            out: Palette::pick(console::colors_enabled()),
            err: Palette::pick(console::colors_enabled_stderr()),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_palette_adds_no_escapes() {
        let palette = Palette::plain();
        assert_eq!("SOLD OUT".style(palette.sold_out).to_string(), "SOLD OUT");
        assert_eq!("Stats".style(palette.heading).to_string(), "Stats");
    }

    #[test]
    fn test_colored_palette_styles_text() {
        let styled = "WIDGET".style(Palette::colored().sold_out).to_string();
        assert!(styled.contains("WIDGET"));
        assert_ne!(styled, "WIDGET");
    }
}
