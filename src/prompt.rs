use std::{
    env,
    fmt::Display,
    io::{self, Write},
    os::fd::AsRawFd,
    path::Path,
};

use nix::unistd::gethostname;
use termion::{color, style};

use crate::{config::Config, env::Vars};

const BANNER: &str = "
+--------------------------------------------+
|            Welcome to mysh!                |
|                                            |
|  Type 'help' for available commands        |
|  Pipes, redirection and background jobs    |
|  Example: ls | grep txt                    |
+--------------------------------------------+
";

/// Color is only used when asked for and `stream` is a terminal.
pub fn use_color<T: AsRawFd>(wanted: bool, stream: &T) -> bool {
    wanted && termion::is_tty(stream)
}

/// Wraps `text` in a color escape when `enabled`.
pub fn paint<C: color::Color>(text: impl Display, fg: C, enabled: bool) -> String {
    if enabled {
        format!("{}{}{text}{}", style::Bold, color::Fg(fg), style::Reset)
    } else {
        text.to_string()
    }
}

/// Formats `user@host:dir<symbol>`, with the home directory shortened to `~`.
pub fn render(
    user: &str,
    host: &str,
    cwd: &Path,
    home: Option<&Path>,
    symbol: &str,
    color: bool,
) -> String {
    let dir = match home.and_then(|home| cwd.strip_prefix(home).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_owned(),
        Some(rest) => format!("~/{}", rest.display()),
        None => cwd.display().to_string(),
    };

    format!(
        "{}:{}{symbol}",
        paint(format_args!("{user}@{host}"), color::Green, color),
        paint(dir, color::Blue, color),
    )
}

/// The prompt for the current process state.
pub fn current<V: Vars + ?Sized>(vars: &V, config: &Config) -> String {
    let user = vars.var("USER").unwrap_or_else(|| "user".into());
    let host = gethostname()
        .map(|host| host.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".into());
    let cwd = env::current_dir().unwrap_or_else(|_| "unknown".into());
    let home = vars.var("HOME");

    render(
        &user,
        &host,
        &cwd,
        home.as_deref().map(Path::new),
        &config.prompt_symbol,
        config.color,
    )
}

pub fn print<W: Write, V: Vars + ?Sized>(
    out: &mut W,
    vars: &V,
    config: &Config,
) -> io::Result<()> {
    write!(out, "{}", current(vars, config))?;
    out.flush()
}

pub fn banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{BANNER}")
}
