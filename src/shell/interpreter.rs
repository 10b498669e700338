use log::debug;

use crate::shell::executor::{Executor, ForkSpawner, Spawner};
use crate::shell::parser::{parse, tokenize};

/// Status for a line rejected by the lexer. Lies outside the
/// 0..=255 range of process exit codes.
pub const SYNTAX_ERROR: i32 = 258;

/// Runs one line at a time through lexer, parser and executor.
pub struct Interpreter<S: Spawner = ForkSpawner> {
    executor: Executor<S>,
}

impl Interpreter<ForkSpawner> {
    pub fn new() -> Self {
        Self::with_executor(Executor::new())
    }
}

impl<S: Spawner> Interpreter<S> {
    pub fn with_executor(executor: Executor<S>) -> Self {
        Self { executor }
    }

    pub fn interpret(&mut self, line: &str) -> i32 {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!("tokens before error: {:?}", e.tokens);
                eprintln!("minish: {}", e);
                return SYNTAX_ERROR;
            }
        };
        debug!("tokens: {:?}", tokens);

        if tokens.first().map_or(true, |tok| tok.is_end()) {
            return 0;
        }

        // A missing redirection target is reported, then what was parsed still runs.
        let tree = match parse(&tokens) {
            Ok(tree) => tree,
            Err(e) => {
                eprintln!("minish: {}", e);
                e.partial
            }
        };
        debug!("tree: {:?}", tree);

        let status = self.executor.execute(&tree);
        debug!("exit status: {}", status);
        status
    }
}

impl Default for Interpreter<ForkSpawner> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shell::executor::{ChildHandle, SpawnError, SpawnRequest, COMMAND_NOT_FOUND};
    use crate::utils::path::PathResolver;
    use std::fs;

    #[derive(Default)]
    struct CountingSpawner {
        spawned: usize,
        last: Option<SpawnRequest>,
    }

    impl Spawner for CountingSpawner {
        fn spawn(&mut self, request: &SpawnRequest) -> Result<ChildHandle, SpawnError> {
            self.spawned += 1;
            self.last = Some(request.clone());
            Ok(ChildHandle(self.spawned as i32))
        }

        fn wait(&mut self, _child: ChildHandle) -> Result<i32, SpawnError> {
            Ok(0)
        }
    }

    fn counting() -> Interpreter<CountingSpawner> {
        Interpreter::with_executor(Executor::with_spawner(
            CountingSpawner::default(),
            PathResolver::from_env(),
        ))
    }

    #[test]
    fn test_blank_line() {
        let mut interpreter = counting();
        assert_eq!(interpreter.interpret(""), 0);
        assert_eq!(interpreter.interpret(" \t "), 0);
        assert_eq!(interpreter.executor.spawner().spawned, 0);
    }

    #[test]
    fn test_unclosed_quote_is_syntax_error() {
        let mut interpreter = counting();
        assert_eq!(interpreter.interpret("echo 'abc"), SYNTAX_ERROR);
        assert_eq!(interpreter.executor.spawner().spawned, 0);
    }

    #[test]
    fn test_missing_filename_runs_partial_command() {
        let mut interpreter = counting();
        assert_eq!(interpreter.interpret("echo hi >"), 0);

        let spawner = interpreter.executor.spawner();
        assert_eq!(spawner.spawned, 1);
        let request = spawner.last.as_ref().unwrap();
        assert_eq!(request.argv, vec!["echo", "hi"]);
        assert!(request.fd_actions.is_empty());
    }

    #[test]
    fn test_missing_filename_keeps_earlier_pipe_stages() {
        let mut interpreter = counting();
        assert_eq!(interpreter.interpret("echo hi | cat <"), 0);
        assert_eq!(interpreter.executor.spawner().spawned, 2);
    }

    #[test]
    fn test_error_does_not_stick() {
        let mut interpreter = counting();
        assert_eq!(interpreter.interpret("echo \"oops"), SYNTAX_ERROR);
        assert_eq!(interpreter.interpret("true"), 0);
        assert_eq!(interpreter.executor.spawner().spawned, 1);
    }

    #[test]
    fn test_command_not_found() {
        let mut interpreter = counting();
        assert_eq!(interpreter.interpret("no-such-command-minish"), COMMAND_NOT_FOUND);
        assert_eq!(interpreter.executor.spawner().spawned, 0);
    }

    #[test]
    fn test_real_line() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hello.txt");

        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.interpret(&format!("echo hello 'a  b' | cat >{}", out.display())), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello a  b\n");
        assert_eq!(interpreter.interpret("sh -c 'exit 9'"), 9);
    }
}
