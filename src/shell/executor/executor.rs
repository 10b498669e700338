use std::os::unix::io::{AsRawFd, RawFd};

use log::{debug, error};
use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use crate::shell::parser::ast::{Node, SimpleCommand};
use crate::utils::path::PathResolver;

use super::spawner::{ChildHandle, FdAction, ForkSpawner, SpawnError, SpawnRequest, Spawner};

pub const COMMAND_NOT_FOUND: i32 = 127;
pub const GENERAL_FAILURE: i32 = 1;

#[derive(Debug)]
enum Stage {
    Running(ChildHandle),
    Finished(i32),
}

#[derive(Debug, Clone, Copy, Default)]
struct StageIo {
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
}

pub struct Executor<S: Spawner = ForkSpawner> {
    spawner: S,
    resolver: PathResolver,
    env: Vec<(String, String)>,
}

impl Executor<ForkSpawner> {
    pub fn new() -> Self {
        Self::with_spawner(ForkSpawner, PathResolver::from_env())
    }
}

impl<S: Spawner> Executor<S> {
    pub fn with_spawner(spawner: S, resolver: PathResolver) -> Self {
        Self {
            spawner,
            resolver,
            env: Vec::new(),
        }
    }

    /// Environment handed to every spawned program. Empty unless set.
    pub fn set_env(&mut self, env: Vec<(String, String)>) {
        self.env = env;
    }

    #[cfg(test)]
    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Runs the tree and returns the status of its rightmost stage.
    pub fn execute(&mut self, node: &Node) -> i32 {
        let mut stages = Vec::new();
        let launched = self.launch(node, StageIo::default(), &mut stages);

        let status = self.wait_all(stages);
        match launched {
            Ok(()) => status,
            Err(e) => {
                eprintln!("minish: {}", e);
                GENERAL_FAILURE
            }
        }
    }

    fn launch(&mut self, node: &Node, io: StageIo, stages: &mut Vec<Stage>) -> Result<(), SpawnError> {
        match node {
            Node::Simple(command) => {
                let stage = self.launch_simple(command, io)?;
                stages.push(stage);
            }
            Node::Pipe(left, right) => {
                let (reader, writer) = pipe2(OFlag::O_CLOEXEC).map_err(SpawnError::Pipe)?;
                debug!("pipe {} -> {}", writer.as_raw_fd(), reader.as_raw_fd());

                self.launch(
                    left,
                    StageIo {
                        stdin: io.stdin,
                        stdout: Some(writer.as_raw_fd()),
                    },
                    stages,
                )?;
                self.launch(
                    right,
                    StageIo {
                        stdin: Some(reader.as_raw_fd()),
                        stdout: io.stdout,
                    },
                    stages,
                )?;
                // Both ends close here so the reader sees EOF once the writer exits.
            }
            Node::And(..) | Node::Or(..) | Node::Sequence(..) => {
                error!("unsupported node type: {}", node.name());
                eprintln!("minish: unsupported node type: {}", node.name());
                stages.push(Stage::Finished(GENERAL_FAILURE));
            }
        }
        Ok(())
    }

    fn launch_simple(&mut self, command: &SimpleCommand, io: StageIo) -> Result<Stage, SpawnError> {
        let Some(name) = command.words.first() else {
            debug!("empty command, nothing to run");
            return Ok(Stage::Finished(0));
        };

        let Some(program) = self.resolver.resolve(name) else {
            eprintln!("minish: {}: command not found", name);
            return Ok(Stage::Finished(COMMAND_NOT_FOUND));
        };

        let mut fd_actions = Vec::with_capacity(command.redirects.len() + 2);
        if let Some(fd) = io.stdin {
            fd_actions.push(FdAction::Dup {
                from: fd,
                to: libc::STDIN_FILENO,
            });
        }
        if let Some(fd) = io.stdout {
            fd_actions.push(FdAction::Dup {
                from: fd,
                to: libc::STDOUT_FILENO,
            });
        }
        fd_actions.extend(command.redirects.iter().cloned().map(FdAction::Open));

        let request = SpawnRequest {
            program,
            argv: command.words.clone(),
            env: self.env.clone(),
            fd_actions,
        };
        debug!("spawning {:?}", request);
        self.spawner.spawn(&request).map(Stage::Running)
    }

    // Waits in creation order, not completion order.
    fn wait_all(&mut self, stages: Vec<Stage>) -> i32 {
        let mut status = 0;
        for stage in stages {
            status = match stage {
                Stage::Finished(code) => code,
                Stage::Running(child) => match self.spawner.wait(child) {
                    Ok(code) => code,
                    Err(e) => {
                        error!("failed to wait for pid {}: {}", child.0, e);
                        GENERAL_FAILURE
                    }
                },
            };
        }
        status
    }
}

impl Default for Executor<ForkSpawner> {
    fn default() -> Self {
        Self::new()
    }
}
