use colored::Colorize;

/// Severity of a log message.
///
/// Several levels share a rank: `Output` is shown whenever `Info` is,
/// `Ok` whenever `Warn` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Output,
    Ok,
    Warn,
    Error,
    Critical,
}

impl Level {
    /// Rank compared against the configured verbosity threshold.
    pub fn rank(self) -> u8 {
        match self {
            Level::Debug => 0,
            Level::Info | Level::Output => 1,
            Level::Ok | Level::Warn => 2,
            Level::Error => 3,
            Level::Critical => 4,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Level::Debug => "[DEBUG]",
            Level::Info => "[INFO]",
            Level::Output => "[OUTPUT]",
            Level::Ok => "[OK]",
            Level::Warn => "[WARN]",
            Level::Error => "[ERROR]",
            Level::Critical => "[FATAL]",
        }
    }

    fn colored_tag(self) -> String {
        let tag = self.tag();
        match self {
            Level::Debug => tag.white().on_blue().to_string(),
            Level::Info => tag.black().on_white().to_string(),
            Level::Output => tag.white().bold().on_black().to_string(),
            Level::Ok => tag.black().bold().on_green().to_string(),
            Level::Warn => tag.black().bold().on_yellow().to_string(),
            Level::Error => tag.white().bold().on_red().to_string(),
            Level::Critical => tag.bright_white().bold().on_bright_red().to_string(),
        }
    }
}

/// Default verbosity: warnings, successes and above.
pub const DEFAULT_VERBOSITY: u8 = 2;

/// Logging context shared by reference with every component.
///
/// Lower verbosity means more output: `0` shows everything, `4` only fatal
/// messages.
#[derive(Debug, Clone, Copy)]
pub struct Logger {
    verbosity: u8,
    ansi: bool,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(DEFAULT_VERBOSITY, true)
    }
}

impl Logger {
    pub fn new(verbosity: u8, ansi: bool) -> Self {
        Self {
            verbosity: verbosity.min(Level::Critical.rank()),
            ansi,
        }
    }

    /// A logger that only lets fatal messages through, for tests and embedding.
    pub fn quiet() -> Self {
        Self::new(Level::Critical.rank(), false)
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn enabled(&self, level: Level) -> bool {
        level == Level::Critical || level.rank() >= self.verbosity
    }

    /// Formats a message for `level`, or `None` when it is filtered out.
    pub fn line(&self, level: Level, message: &str) -> Option<String> {
        if !self.enabled(level) {
            return None;
        }
        let tag = if self.ansi {
            level.colored_tag()
        } else {
            level.tag().to_string()
        };
        Some(format!("{} {}", tag, message.trim_end()))
    }

    pub fn log(&self, level: Level, message: &str) {
        if let Some(line) = self.line(level, message) {
            eprintln!("{line}");
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::Info, message.as_ref());
    }

    /// Captured output of an external tool.
    pub fn output(&self, message: impl AsRef<str>) {
        self.log(Level::Output, message.as_ref());
    }

    pub fn ok(&self, message: impl AsRef<str>) {
        self.log(Level::Ok, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::Error, message.as_ref());
    }

    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(Level::Critical, message.as_ref());
    }
}
