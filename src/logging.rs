use colored::{Color, ColoredString, Colorize};
use log::{Level, LevelFilter, Metadata};

/// Workspace crates, with the tag and colour their records are shown with
const LOCAL_CRATES: [(&str, &str, Color); 3] = [
    ("mememachine", "MAIN", Color::Blue),
    ("mememachine_admin", "ADMIN", Color::BrightMagenta),
    ("mememachine_server", "SERVER", Color::BrightGreen),
];

pub fn init_logger() {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let time = chrono::Local::now().format("%H:%M:%S").to_string();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_badge(record.level()),
                time.bright_black(),
                target_tag(record.target()),
                message
            ))
        })
        .filter(is_enabled)
        .chain(std::io::stdout())
        .apply()
        .expect("logging is initialized")
}

fn local_crate(target: &str) -> Option<(&'static str, Color)> {
    let name = crate_name(target);

    LOCAL_CRATES
        .iter()
        .find(|(local, ..)| *local == name)
        .map(|&(_, tag, color)| (tag, color))
}

fn crate_name(target: &str) -> &str {
    target.split("::").next().unwrap_or_default()
}

/// Our crates log from info up, dependencies only warnings and errors
fn is_enabled(meta: &Metadata<'_>) -> bool {
    let max = match local_crate(meta.target()) {
        Some(_) => LevelFilter::Info,
        None => LevelFilter::Warn,
    };

    meta.level() <= max
}

fn target_tag(target: &str) -> ColoredString {
    match local_crate(target) {
        Some((tag, color)) => tag.color(color),
        None => crate_name(target).clear(),
    }
}

fn level_badge(level: Level) -> ColoredString {
    let (label, foreground, background) = match level {
        Level::Error => ("ERR", Color::Black, Color::Red),
        Level::Warn => ("WRN", Color::Black, Color::Yellow),
        Level::Info => ("INF", Color::Black, Color::Blue),
        Level::Debug => ("DBG", Color::White, Color::Black),
        Level::Trace => ("TRC", Color::White, Color::BrightBlack),
    };

    format!(" {label} ")
        .as_str()
        .color(foreground)
        .on_color(background)
        .bold()
}
