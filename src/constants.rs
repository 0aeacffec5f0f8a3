//! Option sets shared by the preferences form and the daemon configuration
//! schema. The string values are what daemons accept verbatim, so they must
//! not drift.

/// Default action a daemon takes on connections nobody answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultAction {
    #[default]
    Allow,
    Deny,
    Reject,
}

impl DefaultAction {
    pub const ALL: [DefaultAction; 3] =
        [DefaultAction::Allow, DefaultAction::Deny, DefaultAction::Reject];

    /// Validates input action and returns enum variant.
    pub fn new(s: &str) -> Result<DefaultAction, BadOption> {
        match s {
            "allow" => Ok(DefaultAction::Allow),
            "deny" => Ok(DefaultAction::Deny),
            "reject" => Ok(DefaultAction::Reject),
            _ => Err(BadOption {
                input: s.to_string(),
            }),
        }
    }

    /// Enum as string for the daemon.
    #[must_use]
    pub fn get_str(&self) -> &str {
        match self {
            DefaultAction::Allow => "allow",
            DefaultAction::Deny => "deny",
            DefaultAction::Reject => "reject",
        }
    }
}

/// Durations for firewall rules to be applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Duration {
    #[default]
    UntilRestart,
    Always,
    Once,
    Hours12,
    Hours1,
    Minutes30,
    Minutes15,
    Minutes5,
    Seconds30,
}

impl Duration {
    pub const ALL: [Duration; 9] = [
        Duration::UntilRestart,
        Duration::Always,
        Duration::Once,
        Duration::Hours12,
        Duration::Hours1,
        Duration::Minutes30,
        Duration::Minutes15,
        Duration::Minutes5,
        Duration::Seconds30,
    ];

    /// Validates input duration and returns enum variant.
    pub fn new(s: &str) -> Result<Duration, BadOption> {
        match s {
            "until restart" => Ok(Duration::UntilRestart),
            "always" => Ok(Duration::Always),
            "once" => Ok(Duration::Once),
            "12h" => Ok(Duration::Hours12),
            "1h" => Ok(Duration::Hours1),
            "30m" => Ok(Duration::Minutes30),
            "15m" => Ok(Duration::Minutes15),
            "5m" => Ok(Duration::Minutes5),
            "30s" => Ok(Duration::Seconds30),
            _ => Err(BadOption {
                input: s.to_string(),
            }),
        }
    }

    /// Enum as string for the daemon.
    #[must_use]
    pub fn get_str(&self) -> &str {
        match self {
            Duration::UntilRestart => "until restart",
            Duration::Always => "always",
            Duration::Once => "once",
            Duration::Hours12 => "12h",
            Duration::Hours1 => "1h",
            Duration::Minutes30 => "30m",
            Duration::Minutes15 => "15m",
            Duration::Minutes5 => "5m",
            Duration::Seconds30 => "30s",
        }
    }
}

/// What a popup rule targets by default. Persisted as a plain index, so the
/// variant order is part of the settings format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Executable,
    Command,
    DstPort,
    DstIp,
    UserId,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Executable,
        Target::Command,
        Target::DstPort,
        Target::DstIp,
        Target::UserId,
    ];

    /// Variant for a stored index.
    pub fn from_index(i: u32) -> Result<Target, BadOption> {
        match i {
            0 => Ok(Target::Executable),
            1 => Ok(Target::Command),
            2 => Ok(Target::DstPort),
            3 => Ok(Target::DstIp),
            4 => Ok(Target::UserId),
            _ => Err(BadOption {
                input: i.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        match self {
            Target::Executable => 0,
            Target::Command => 1,
            Target::DstPort => 2,
            Target::DstIp => 3,
            Target::UserId => 4,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn get_str(&self) -> &str {
        match self {
            Target::Executable => "by executable path",
            Target::Command => "by command line",
            Target::DstPort => "by destination port",
            Target::DstIp => "by destination ip",
            Target::UserId => "by user id",
        }
    }
}

/// Process monitoring backends a daemon can run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorMethod {
    #[default]
    Proc,
    Ftrace,
    Audit,
    Ebpf,
}

impl MonitorMethod {
    pub const ALL: [MonitorMethod; 4] = [
        MonitorMethod::Proc,
        MonitorMethod::Ftrace,
        MonitorMethod::Audit,
        MonitorMethod::Ebpf,
    ];

    /// Validates input method and returns enum variant.
    pub fn new(s: &str) -> Result<MonitorMethod, BadOption> {
        match s {
            "proc" => Ok(MonitorMethod::Proc),
            "ftrace" => Ok(MonitorMethod::Ftrace),
            "audit" => Ok(MonitorMethod::Audit),
            "ebpf" => Ok(MonitorMethod::Ebpf),
            _ => Err(BadOption {
                input: s.to_string(),
            }),
        }
    }

    /// Enum as string for the daemon.
    #[must_use]
    pub fn get_str(&self) -> &str {
        match self {
            MonitorMethod::Proc => "proc",
            MonitorMethod::Ftrace => "ftrace",
            MonitorMethod::Audit => "audit",
            MonitorMethod::Ebpf => "ebpf",
        }
    }
}

/// Daemon log verbosity. Carried as an integer in both the node metadata and
/// the config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Debug,
    Info,
    Important,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Important,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    /// Variant for a stored index.
    pub fn from_index(i: u32) -> Result<LogLevel, BadOption> {
        match i {
            0 => Ok(LogLevel::Debug),
            1 => Ok(LogLevel::Info),
            2 => Ok(LogLevel::Important),
            3 => Ok(LogLevel::Warning),
            4 => Ok(LogLevel::Error),
            5 => Ok(LogLevel::Fatal),
            _ => Err(BadOption {
                input: i.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Important => 2,
            LogLevel::Warning => 3,
            LogLevel::Error => 4,
            LogLevel::Fatal => 5,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn get_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Important => "IMPORTANT",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

/// Steps through `all` from `current`, wrapping around in either direction.
/// An unknown `current` restarts at the first variant.
pub fn step<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    let next = if forward {
        (idx + 1) % all.len()
    } else {
        (idx + all.len() - 1) % all.len()
    };
    all[next]
}

/// Error type for bad option provided to enum constructor.
#[derive(Debug, Clone)]
pub struct BadOption {
    pub input: String,
}

impl std::fmt::Display for BadOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bad Option: {}", self.input)
    }
}

impl std::error::Error for BadOption {}
