use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

/// Human-facing output. Status lines go to stderr so stdout carries only
/// search hits, dumps and reports.
pub struct Ui {
    palette: Palette,
    quiet: bool,
}

#[derive(Clone, Copy)]
enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Ui {
    pub fn new(quiet: bool) -> Self {
        let paint = !quiet && std::io::stderr().is_terminal();

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        Self {
            palette: Palette::new(paint),
            quiet,
        }
    }

    /// Aligned `key: value` rows under a heading, on stdout.
    pub fn section<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        let rows: Vec<(&str, String)> = rows
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        self.heading(title);
        for (key, value) in rows {
            let label = format!("{key:>width$}:");
            println!("  {} {value}", self.palette.accent.paint(label));
        }
    }

    /// Bulleted lines under a heading; prints nothing for an empty list.
    pub fn list<I>(&self, title: &str, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            return;
        }
        self.heading(title);
        for entry in entries {
            println!("  - {entry}");
        }
    }

    pub fn info(&self, message: &str) {
        self.status(Level::Info, message);
    }

    pub fn success(&self, message: &str) {
        self.status(Level::Success, message);
    }

    pub fn warn(&self, message: &str) {
        self.status(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.status(Level::Error, message);
    }

    /// Spinner on stderr until the guard is finished or dropped.
    pub fn task(&self, label: impl Into<String>) -> TaskGuard<'_> {
        let label = label.into();
        let spinner = (!self.quiet).then(|| {
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            let spinner = ProgressBar::new_spinner().with_style(style);
            spinner.set_message(label.clone());
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        });
        TaskGuard {
            ui: self,
            label,
            start: Some(Instant::now()),
            spinner,
        }
    }

    fn status(&self, level: Level, message: &str) {
        let (style, tag) = match level {
            Level::Info | Level::Success if self.quiet => return,
            Level::Info => (self.palette.info, "info"),
            Level::Success => (self.palette.success, "done"),
            Level::Warn => (self.palette.warn, "warning"),
            Level::Error => (self.palette.error, "error"),
        };
        eprintln!("{} {message}", style.paint(format!("{tag}:")));
    }

    fn heading(&self, title: &str) {
        println!("{}", self.palette.heading.paint(title));
    }
}

pub struct TaskGuard<'a> {
    ui: &'a Ui,
    label: String,
    start: Option<Instant>,
    spinner: Option<ProgressBar>,
}

impl TaskGuard<'_> {
    pub fn progress(&self, detail: impl Display) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format!("{} ({detail})", self.label));
        }
    }

    /// Stops the spinner and returns the elapsed time.
    pub fn finish(mut self) -> Duration {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.start
            .take()
            .map_or(Duration::ZERO, |start| start.elapsed())
    }
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        let Some(start) = self.start.take() else {
            return;
        };
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        let elapsed = format_duration(start.elapsed());
        self.ui
            .warn(&format!("{} interrupted after {elapsed}", self.label));
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 1.0 {
        format!("{secs:.2}s")
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Styles are all plain when stderr is not a terminal.
#[derive(Clone, Copy, Default)]
struct Palette {
    heading: Style,
    accent: Style,
    info: Style,
    success: Style,
    warn: Style,
    error: Style,
}

impl Palette {
    fn new(paint: bool) -> Self {
        if !paint {
            return Self::default();
        }
        Self {
            heading: Style::new().bold().underline(),
            accent: Style::new().fg(Color::LightBlue),
            info: Style::new().fg(Color::Cyan),
            success: Style::new().fg(Color::Green).bold(),
            warn: Style::new().fg(Color::Yellow).bold(),
            error: Style::new().fg(Color::Red).bold(),
        }
    }
}
