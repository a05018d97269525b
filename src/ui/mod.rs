pub mod console;
pub mod notify;

pub use notify::Notifier;

/// Line commands read from stdin during `watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Clear,
    Export,
    List,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Some(Self::Start),
            "stop" | "x" => Some(Self::Stop),
            "clear" => Some(Self::Clear),
            "export" | "copy" => Some(Self::Export),
            "list" | "ls" => Some(Self::List),
            "quit" | "exit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }
}
