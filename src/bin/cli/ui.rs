use clap::ValueEnum;
use nu_ansi_term::{Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Theme {
    Auto,
    Plain,
}

pub struct Ui {
    palette: Palette,
    paint: bool,
}

impl Ui {
    pub fn new(theme: Theme) -> Self {
        let paint = match theme {
            Theme::Plain => false,
            Theme::Auto => std::io::stdout().is_terminal(),
        };

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = if paint {
            Palette::dark()
        } else {
            Palette::plain()
        };
        Self { palette, paint }
    }

    pub fn section<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        let rows: Vec<(String, String)> = rows
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        if rows.is_empty() {
            return;
        }

        self.heading(title);
        let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows {
            if self.paint {
                println!(
                    "  {} {}",
                    self.palette.key.paint(format!("{key:>key_width$}:")),
                    self.palette.value.paint(value)
                );
            } else {
                println!("  {key:>key_width$}: {value}");
            }
        }
    }

    /// Numbered entries; match rows are easier to cross-reference by index.
    pub fn list<I>(&self, title: &str, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        let entries: Vec<String> = entries.into_iter().collect();
        self.heading(title);
        if entries.is_empty() {
            println!("  (none)");
            return;
        }
        let width = entries.len().to_string().len();
        for (idx, entry) in entries.iter().enumerate() {
            let marker = format!("{:>width$}.", idx + 1);
            if self.paint {
                println!("  {} {entry}", self.palette.bullet.paint(marker));
            } else {
                println!("  {marker} {entry}");
            }
        }
    }

    /// Preformatted text such as an explain tree, indented under a heading.
    pub fn block(&self, title: &str, text: &str) {
        self.heading(title);
        let gutter = if self.paint {
            self.palette.bullet.paint("|").to_string()
        } else {
            "|".to_owned()
        };
        for line in text.lines() {
            println!("  {gutter} {line}");
        }
    }

    fn heading(&self, title: &str) {
        let formatted = format!("{HEADING_ICON} {title}");
        if self.paint {
            println!("{}", self.palette.heading.paint(formatted));
        } else {
            println!("{formatted}");
        }
    }
}

/// Prints `[code] message` to stderr, highlighted when stderr is a terminal.
pub fn report_error(code: &str, message: &str) {
    if std::io::stderr().is_terminal() {
        let prefix = Style::new().fg(Color::Red).bold().paint(format!("[{code}]"));
        eprintln!("{prefix} {message}");
    } else {
        eprintln!("[{code}] {message}");
    }
}

struct Palette {
    heading: Style,
    key: Style,
    value: Style,
    bullet: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            heading: Style::new().fg(Color::Purple).bold(),
            key: Style::new().fg(Color::LightBlue).bold(),
            value: Style::new().fg(Color::White),
            bullet: Style::new().fg(Color::LightBlue),
        }
    }

    fn plain() -> Self {
        Self {
            heading: Style::new(),
            key: Style::new(),
            value: Style::new(),
            bullet: Style::new(),
        }
    }
}

const HEADING_ICON: &str = "▸";
