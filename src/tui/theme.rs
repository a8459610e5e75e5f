//! Console Theme - Visual Design System
//!
//! Violet/amber on dark, with green and red reserved for status.

use ratatui::style::{Color, Modifier, Style};

use super::status::{StatusKind, StatusMessage};
use crate::model::Entity;

/// Console color palette
pub struct ConsoleTheme {
    // Primary palette
    pub violet: Color,
    pub amber: Color,
    pub cyan: Color,
    pub star_white: Color,

    // Status colors
    pub success_green: Color,
    pub warning_orange: Color,
    pub error_red: Color,

    pub dim_violet: Color,
}

impl Default for ConsoleTheme {
    fn default() -> Self {
        Self {
            violet: Color::Rgb(138, 43, 226),      // #8A2BE2
            amber: Color::Rgb(255, 191, 0),        // #FFBF00
            cyan: Color::Rgb(0, 255, 255),         // #00FFFF
            star_white: Color::Rgb(230, 237, 243), // #E6EDF3

            success_green: Color::Rgb(63, 185, 80),   // #3FB950
            warning_orange: Color::Rgb(210, 153, 34), // #D29922
            error_red: Color::Rgb(248, 81, 73),       // #F85149

            dim_violet: Color::Rgb(88, 28, 143),
        }
    }
}

impl ConsoleTheme {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Styles
    // ─────────────────────────────────────────────────────────────────────

    pub fn text(&self) -> Style {
        Style::default().fg(self.star_white)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(Color::Rgb(128, 128, 128))
    }

    /// Bold header style
    pub fn header(&self) -> Style {
        Style::default().fg(self.violet).add_modifier(Modifier::BOLD)
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.amber)
    }

    /// Selected row
    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.cyan)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success_green)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning_orange)
    }

    pub fn error(&self) -> Style {
        Style::default()
            .fg(self.error_red)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.dim_violet)
    }

    /// Border of a modal form or dialog
    pub fn modal_border(&self) -> Style {
        Style::default().fg(self.amber).add_modifier(Modifier::BOLD)
    }

    pub fn status(&self, status: &StatusMessage) -> Style {
        match status.kind {
            StatusKind::Success => self.success(),
            StatusKind::Error => self.error(),
        }
    }

    /// Protected records are drawn in the warning color
    pub fn entity(&self, entity: &Entity) -> Style {
        if entity.is_protected() {
            self.warning()
        } else {
            self.text()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Icons and Symbols
// ─────────────────────────────────────────────────────────────────────────────

pub mod icons {
    pub const SELECTED: &str = "▶ ";
    pub const LOCKED: &str = "🔒";
    pub const FOLDER: &str = "▸";
    pub const SUCCESS: &str = "✓";
    pub const ERROR: &str = "✗";
    pub const CURSOR: &str = "▏";
}
