use colored::Colorize;

pub struct Theme {
    pub prompt: String,
    pub error_symbol: String,
    pub welcome_message: String,
    pub exit_message: String,
    pub error_style: Box<dyn Fn(String) -> String>,
    pub status_style: Box<dyn Fn(String) -> String>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            prompt: "minish$ ".bright_cyan().to_string(),
            error_symbol: "✗".red().to_string(),
            welcome_message: "minish: type a command, Ctrl-D to leave".bright_green().to_string(),
            exit_message: "bye".bright_blue().to_string(),
            error_style: Box::new(|s| s.bright_red().to_string()),
            status_style: Box::new(|s| s.dimmed().to_string()),
        }
    }
}

impl Theme {
    pub fn load_theme(theme_name: &str) -> Theme {
        match theme_name {
            "dark" => Theme {
                prompt: "minish ➤ ".bright_purple().to_string(),
                error_symbol: "✗".red().to_string(),
                welcome_message: "minish: type a command, Ctrl-D to leave".bright_magenta().to_string(),
                exit_message: "bye".bright_purple().to_string(),
                error_style: Box::new(|s| s.red().to_string()),
                status_style: Box::new(|s| s.magenta().to_string()),
            },
            _ => Theme::default(),
        }
    }

    pub fn status_line(&self, status: i32) -> String {
        let line = format!("Exit status: {}", status);
        if status == 0 {
            (self.status_style)(line)
        } else {
            format!("{} {}", self.error_symbol, (self.error_style)(line))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        colored::control::set_override(false);
        let theme = Theme::load_theme("default");
        assert_eq!(theme.status_line(0), "Exit status: 0");
        assert_eq!(theme.status_line(127), "✗ Exit status: 127");
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        colored::control::set_override(false);
        assert_eq!(Theme::load_theme("nope").prompt, "minish$ ");
        assert_eq!(Theme::load_theme("dark").prompt, "minish ➤ ");
    }
}
