use ratatui::style::Color;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Colors the shell renders with for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheme {
    pub background: Color,
    pub surface: Color,
    pub foreground: Color,
    pub muted: Color,
    pub primary: Color,
}

impl Theme {
    pub fn from_flag(is_dark: bool) -> Self {
        if is_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Theme::Dark)
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn scheme(self) -> Scheme {
        match self {
            Theme::Light => Scheme {
                background: Color::Rgb(0xF5, 0xF5, 0xF5),
                surface: Color::Rgb(0xFF, 0xFF, 0xFF),
                foreground: Color::Rgb(0x00, 0x00, 0x00),
                muted: Color::Rgb(0x75, 0x75, 0x75),
                primary: Color::Rgb(0x62, 0x00, 0xEE),
            },
            Theme::Dark => Scheme {
                background: Color::Rgb(0x12, 0x12, 0x12),
                surface: Color::Rgb(0x1E, 0x1E, 0x1E),
                foreground: Color::Rgb(0xFF, 0xFF, 0xFF),
                muted: Color::Rgb(0x9E, 0x9E, 0x9E),
                primary: Color::Rgb(0xBB, 0x86, 0xFC),
            },
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = super::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(super::DomainError::InvalidTheme(other.to_string())),
        }
    }
}
