use std::fmt;
use std::os::unix::io::RawFd;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectKind {
    Input,  // <
    Output, // >
    Append, // >>
}

impl RedirectKind {
    pub fn default_fd(self) -> RawFd {
        match self {
            RedirectKind::Input => libc::STDIN_FILENO,
            RedirectKind::Output | RedirectKind::Append => libc::STDOUT_FILENO,
        }
    }
}

impl fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            RedirectKind::Input => "<",
            RedirectKind::Output => ">",
            RedirectKind::Append => ">>",
        };
        f.write_str(op)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirection {
    pub target_fd: RawFd,
    pub filename: String,
    pub kind: RedirectKind,
}

impl Redirection {
    pub fn new(kind: RedirectKind, filename: impl Into<String>) -> Self {
        Self {
            target_fd: kind.default_fd(),
            filename: filename.into(),
            kind,
        }
    }
}

/// Words in order, and redirections in the order they are applied.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SimpleCommand {
    pub words: Vec<String>,
    pub redirects: Vec<Redirection>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Node {
    Simple(SimpleCommand),
    Pipe(Box<Node>, Box<Node>),
    // Representable but never produced by the parser.
    #[allow(dead_code)]
    And(Box<Node>, Box<Node>),
    #[allow(dead_code)]
    Or(Box<Node>, Box<Node>),
    #[allow(dead_code)]
    Sequence(Box<Node>, Box<Node>),
}

impl Node {
    pub fn pipe(left: Node, right: Node) -> Self {
        Node::Pipe(Box::new(left), Box::new(right))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Node::Simple(_) => "simple command",
            Node::Pipe(..) => "pipe",
            Node::And(..) => "and",
            Node::Or(..) => "or",
            Node::Sequence(..) => "sequence",
        }
    }
}
