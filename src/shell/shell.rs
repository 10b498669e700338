use log::{debug, error, warn};
use std::env;
use std::error::Error;

use crate::shell::executor::Executor;
use crate::shell::interpreter::Interpreter;
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::utils::config::Config;
use crate::utils::theme::Theme;

pub struct Shell<'a> {
    config: &'a Config,
    theme: Theme,
    interpreter: Interpreter,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config) -> Self {
        let mut executor = Executor::new();
        if config.inherit_env {
            executor.set_env(env::vars().collect());
        }

        Self {
            config,
            theme: Theme::load_theme(&config.theme),
            interpreter: Interpreter::with_executor(executor),
        }
    }

    /// Interprets a single line from the command line and returns its status.
    pub fn run_once(&mut self, line: &str) -> i32 {
        self.run_line(line, true)
    }

    fn run_line(&mut self, line: &str, one_shot: bool) -> i32 {
        let status = self.interpreter.interpret(line);
        if self.config.status_enabled(one_shot) {
            println!("{}", self.theme.status_line(status));
        }
        status
    }

    pub fn run(&mut self) -> Result<i32, Box<dyn Error>> {
        debug!("starting interactive session");
        let mut readline = ReadlineManager::new(self.config)?;
        readline.load_history();

        println!("{}", self.theme.welcome_message);
        let status = self.run_loop(&mut readline)?;
        readline.save_history();

        println!("{}", self.theme.exit_message);
        debug!("leaving interactive session");
        Ok(status)
    }

    fn run_loop(&mut self, readline: &mut ReadlineManager<'_>) -> Result<i32, Box<dyn Error>> {
        let mut last_status = 0;
        loop {
            match readline.readline(&self.theme.prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    readline.add_history(&line)?;
                    last_status = self.run_line(&line, false);
                }
                Err(ReadlineError::Eof) => {
                    debug!("EOF received");
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    warn!("line discarded on interrupt");
                }
                Err(err) => {
                    error!("readline failed: {}", err);
                    eprintln!(
                        "{} {}",
                        self.theme.error_symbol,
                        (self.theme.error_style)(err.to_string())
                    );
                    return Err(err.into());
                }
            }
        }
        Ok(last_status)
    }
}
