//! UI utilities for the terminal front-ends

use colored::*;
use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use municode_core::Result;

use crate::markdown::render_terminal;

/// Display startup banner
pub fn display_banner(title: &str, service: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(32);
    let inner = banner_width - 2;

    let fit = |text: &str| -> String {
        let used = text.chars().count() + 2;
        format!("  {}{}", text, " ".repeat(inner.saturating_sub(used)))
    };

    println!();
    println!("{}", format!("┌{}┐", "─".repeat(inner)).blue());
    println!("{}{}{}", "│".blue(), fit(title).bold(), "│".blue());
    println!("{}{}{}", "│".blue(), fit("").normal(), "│".blue());
    let service_line = format!("Querying service: {}", service);
    println!("{}{}{}", "│".blue(), fit(&service_line).dimmed(), "│".blue());
    println!("{}", format!("└{}┘", "─".repeat(inner)).blue());
    println!();
    println!(
        "{}",
        "💡 Tip: type 'help' for commands, 'exit' to quit".dimmed()
    );
    println!();
}

/// Print renderer output to the terminal
pub fn print_markdown(markdown: &str) {
    println!("{}", render_terminal(markdown));
}

/// Shows "Thinking..." while a blocking call runs; cleared on drop
pub struct ThinkingIndicator {
    active: bool,
}

impl ThinkingIndicator {
    pub fn start() -> Self {
        let active = io::stdout().is_terminal();
        if active {
            print!("{} {}", "❄️".cyan(), "Thinking...".dimmed());
            let _ = io::stdout().flush();
        }
        Self { active }
    }
}

impl Drop for ThinkingIndicator {
    fn drop(&mut self) {
        if self.active {
            let _ = execute!(io::stdout(), MoveToColumn(0), Clear(ClearType::CurrentLine));
        }
    }
}

fn redraw(prompt: &str, input: &str) -> Result<()> {
    execute!(io::stdout(), MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    print!("{} {}", prompt.green().bold(), input);
    io::stdout().flush()?;
    Ok(())
}

/// Handle input with history navigation
///
/// Returns `None` at end of input (Ctrl-D, Ctrl-C or closed stdin).
pub async fn handle_input_with_history(prompt: &str, history: &mut Vec<String>) -> Result<Option<String>> {
    // Piped input is read line by line without raw mode
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    enable_raw_mode()?;
    let result = read_line_raw(prompt, history);
    disable_raw_mode()?;
    println!();
    result
}

fn read_line_raw(prompt: &str, history: &mut Vec<String>) -> Result<Option<String>> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    redraw(prompt, &input)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            KeyCode::Enter => {
                let line = input.trim().to_string();
                if !line.is_empty() {
                    history.push(line.clone());
                }
                return Ok(Some(line));
            }
            KeyCode::Char('c') | KeyCode::Char('d')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Ok(None);
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up => {
                if !history.is_empty() {
                    let new_index = match history_index {
                        None => history.len() - 1,
                        Some(idx) => idx.saturating_sub(1),
                    };
                    history_index = Some(new_index);
                    input = history[new_index].clone();
                }
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                }
            }
            KeyCode::Esc => {
                history_index = None;
                input.clear();
            }
            _ => continue,
        }

        redraw(prompt, &input)?;
    }
}

/// Display chat help
pub fn print_chat_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question about the municipal code", "<question>".green());
    println!("  {} - Switch the completion model", "/model <name>".green());
    println!("  {} - Number of context chunks to retrieve (1-10)", "/chunks <n>".green());
    println!("  {} - Show the conversation so far", "/history".green());
    println!("  {} - Clear the conversation", "/reset".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  How many dogs can I keep at home?");
    println!("  /model llama3.1-70b");
}

/// Display search help
pub fn print_search_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Search the municipal code", "<query>".green());
    println!("  {} - Maximum number of results", "/limit <n>".green());
    println!("  {} - Excerpt length (100, 200, 400, 800, 1600)", "/context <n>".green());
    println!("  {} - Restrict results to an attribute value", "/filter COLUMN=VALUE".green());
    println!("  {} - Treat a column as multi-valued", "/array <column>".green());
    println!("  {} - Remove all filters", "/filters clear".green());
    println!("  {} - Show the full text of result n", "/full <n>".green());
    println!("  {} - Show current settings", "/settings".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  animal control regulations");
    println!("  /filter CHAPTER=Chapter 4");
}

/// Print a failed interaction without ending the session
pub fn print_error(error: &dyn std::fmt::Display) {
    println!("{} {}", "❌".red(), error);
}
