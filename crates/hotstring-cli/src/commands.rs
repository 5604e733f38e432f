use crate::cli::Commands;
use hotstring_core::placeholders::ESCAPES;
use hotstring_core::{
    is_daemon_running, ClipboardService, ImportMode, MemoryClipboard, PlaceholderExpander, Result,
    Settings, SystemClipboard, Trigger, TriggerDatabase, PLACEHOLDERS,
};
use hotstring_daemon::process::verify_process_running;
use hotstring_daemon::{daemon_status, run_daemon_worker, start_daemon, stop_daemon};
use tracing::{debug, warn};

/// Widest output preview shown by `list`
const PREVIEW_WIDTH: usize = 56;

pub fn handle_command(command: Commands) -> Result<()> {
    let database = TriggerDatabase::open_default();
    debug!(path = %database.path().display(), "Trigger database");

    match command {
        Commands::Add {
            trigger,
            output,
            category,
        } => {
            let mut new_trigger = Trigger::new(trigger, output);
            if let Some(category) = category {
                new_trigger = new_trigger.with_category(category);
            }
            database
                .add(new_trigger)
                .map(|_| println!("Trigger added successfully"))
        }
        Commands::Update {
            trigger,
            output,
            category,
        } => database
            .update(&trigger, output, category)
            .map(|_| println!("Trigger updated successfully")),
        Commands::Delete { trigger } => database
            .delete(&trigger)
            .map(|_| println!("Trigger deleted successfully")),
        Commands::List { category } => list_triggers(&database, category.as_deref()),
        Commands::Import { path, replace } => {
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Merge
            };
            let added = database.import(&path, mode)?;
            println!("Imported {} trigger(s) from {}", added, path.display());
            Ok(())
        }
        Commands::Export { path } => {
            let count = database.export(&path)?;
            println!("Exported {} trigger(s) to {}", count, path.display());
            Ok(())
        }
        Commands::Placeholders => {
            print!("{}", placeholder_help());
            Ok(())
        }
        Commands::Preview { template } => {
            println!("{}", preview(&template));
            Ok(())
        }
        Commands::Enable => set_enabled(true),
        Commands::Disable => set_enabled(false),
        Commands::Speed { value } => trigger_speed(value),
        Commands::Run => run_daemon_worker(),
        Commands::Start => start_daemon(),
        Commands::Stop => stop_daemon(),
        Commands::Status => daemon_status(),
    }
}

fn list_triggers(database: &TriggerDatabase, category: Option<&str>) -> Result<()> {
    let mut triggers = database.load()?;
    if let Some(category) = category {
        triggers.retain(|t| t.category.eq_ignore_ascii_case(category));
    }

    if triggers.is_empty() {
        println!("No triggers found");
        return Ok(());
    }

    triggers.sort_by(|a, b| a.category.cmp(&b.category).then(a.input.cmp(&b.input)));
    let width = triggers.iter().map(Trigger::input_len).max().unwrap_or(0);
    for trigger in &triggers {
        println!("{}", format_trigger_line(trigger, width));
    }
    Ok(())
}

/// One row of `list` output: input padded to `width`, category, output preview
pub fn format_trigger_line(trigger: &Trigger, width: usize) -> String {
    format!(
        "{:<width$}  [{}]  {}",
        trigger.input,
        trigger.category,
        truncate_output(&trigger.output),
        width = width
    )
}

/// First non-empty line of `text`, cut at the preview width.
/// An ellipsis marks anything left out.
pub fn truncate_output(text: &str) -> String {
    let mut lines = text.split(['\r', '\n']).filter(|line| !line.is_empty());
    let first = lines.next().unwrap_or("");
    let more_lines = lines.next().is_some();

    if first.chars().count() > PREVIEW_WIDTH {
        let cut: String = first.chars().take(PREVIEW_WIDTH).collect();
        return format!("{}...", cut);
    }
    if more_lines {
        return format!("{}...", first);
    }
    first.to_string()
}

pub fn placeholder_help() -> String {
    let width = PLACEHOLDERS
        .iter()
        .chain(ESCAPES)
        .map(|(token, _)| token.len())
        .max()
        .unwrap_or(0);

    let mut help = String::from("Placeholders:\n");
    for (token, description) in PLACEHOLDERS {
        help.push_str(&format!("  {:<width$}  {}\n", token, description, width = width));
    }
    help.push_str("\nEscapes:\n");
    for (escape, description) in ESCAPES {
        help.push_str(&format!("  {:<width$}  {}\n", escape, description, width = width));
    }
    help
}

fn preview(template: &str) -> String {
    let clipboard: Box<dyn ClipboardService> = match SystemClipboard::new() {
        Ok(clipboard) => Box::new(clipboard),
        Err(e) => {
            warn!(error = %e, "Clipboard unavailable, {{{{clipboard}}}} expands to nothing");
            Box::new(MemoryClipboard::new(None))
        }
    };
    PlaceholderExpander::new(clipboard.as_ref()).expand(template)
}

fn set_enabled(enabled: bool) -> Result<()> {
    let mut settings = Settings::load();
    settings.enabled = enabled;
    settings.save()?;

    if enabled {
        println!("Expansion enabled");
    } else {
        println!("Expansion disabled");
    }
    Ok(())
}

fn trigger_speed(value: Option<u8>) -> Result<()> {
    let mut settings = Settings::load();

    if let Some(speed) = value {
        settings.set_trigger_speed(speed)?;
        settings.save()?;
    }

    let daemon_running = is_daemon_running()?.is_some_and(verify_process_running);
    println!("{}", speed_summary(&settings, value.is_some() && daemon_running));
    Ok(())
}

/// Describe the trigger speed, noting when a running daemon still uses the old one
pub fn speed_summary(settings: &Settings, needs_restart: bool) -> String {
    let mut summary = format!(
        "Trigger speed: {} ({} ms between keystrokes)",
        settings.trigger_speed,
        settings.key_delay().as_millis()
    );
    if needs_restart {
        summary.push_str(
            "\nThe running daemon keeps its current speed until restarted \
             ('hotstring stop' then 'hotstring start')",
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_shown_whole() {
        assert_eq!(truncate_output("hello world"), "hello world");
    }

    #[test]
    fn long_line_is_cut() {
        let long = "x".repeat(80);
        let shown = truncate_output(&long);
        assert_eq!(shown, format!("{}...", "x".repeat(PREVIEW_WIDTH)));
    }

    #[test]
    fn multi_line_output_shows_first_line() {
        assert_eq!(truncate_output("Regards,\r\nMe"), "Regards,...");
        assert_eq!(truncate_output("\n\nonly"), "only");
        assert_eq!(truncate_output(""), "");
    }

    #[test]
    fn list_line_pads_the_input() {
        let trigger = Trigger::new(":hi", "hello world");
        assert_eq!(
            format_trigger_line(&trigger, 5),
            ":hi    [General]  hello world"
        );
    }

    #[test]
    fn speed_change_mentions_restart_only_when_needed() {
        let settings = Settings::default();
        assert_eq!(
            speed_summary(&settings, false),
            "Trigger speed: 5 (18 ms between keystrokes)"
        );

        let summary = speed_summary(&settings, true);
        assert!(summary.starts_with("Trigger speed: 5 (18 ms between keystrokes)\n"));
        assert!(summary.contains("until restarted"));
    }

    #[test]
    fn help_lists_every_placeholder_and_escape() {
        let help = placeholder_help();
        for (token, _) in PLACEHOLDERS.iter().chain(ESCAPES) {
            assert!(help.contains(token), "missing {}", token);
        }
    }
}
