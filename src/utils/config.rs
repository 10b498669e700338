use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

pub struct Config {
    pub name: String,
    pub config_dir: PathBuf,
    pub theme: String,
    pub history_file: PathBuf,
    pub editor_mode: String,
    pub logger_level: String,
    pub logger_dir: PathBuf,
    /// Pass the interpreter's own environment to spawned programs.
    pub inherit_env: bool,
    /// Print `Exit status: N` after each line. Unset means on for a
    /// one-shot line and off for the interactive prompt.
    pub show_status: Option<bool>,
}

fn expand_path(value: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(value).as_ref())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if env::var("HOME").is_ok() {
            expand_path("~/.config/minish")
        } else {
            PathBuf::from("tmp")
        }
    }

    fn defaults() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: String::from(env!("CARGO_PKG_NAME")),
            theme: String::from("default"),
            history_file: config_dir.join(".minish_history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("warn"),
            logger_dir: config_dir.join("logs"),
            inherit_env: false,
            show_status: None,
            config_dir,
        }
    }

    pub fn new() -> io::Result<Self> {
        // dotenv never overrides variables that are already set
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        let mut config = Config::defaults();
        config.apply_overrides(|key| env::var(key).ok());

        if let Some(parent) = config.history_file.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(theme) = lookup("MINISH_THEME") {
            self.theme = theme;
        }

        if let Some(editor) = lookup("MINISH_EDITOR") {
            self.editor_mode = editor;
        }

        if let Some(history) = lookup("MINISH_HISTORY") {
            self.history_file = expand_path(&history);
        }

        if let Some(level) = lookup("MINISH_LOG_LEVEL") {
            self.logger_level = level;
        }

        if let Some(dir) = lookup("MINISH_LOG_DIR") {
            self.logger_dir = expand_path(&dir);
        }

        if let Some(flag) = lookup("MINISH_INHERIT_ENV") {
            self.inherit_env = parse_flag(&flag);
        }

        if let Some(flag) = lookup("MINISH_SHOW_STATUS") {
            self.show_status = Some(parse_flag(&flag));
        }
    }

    pub fn status_enabled(&self, one_shot: bool) -> bool {
        self.show_status.unwrap_or(one_shot)
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}
