//! Search REPL

use colored::*;
use tracing::debug;

use municode_core::{Result, SearchClient};
use municode_rag::{SearchResultsView, SearchSession};

use crate::commands::SearchCommand;
use crate::ui::{
    ThinkingIndicator, display_banner, handle_input_with_history, print_error, print_markdown,
    print_search_help,
};

fn print_description<S: SearchClient>(session: &SearchSession<S>) {
    let description = session.description();
    println!(
        "{} search column {} · attribute columns {}",
        "🗂️".dimmed(),
        description.search_column.cyan(),
        if description.attribute_columns.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            description.attribute_columns.join(", ").cyan().to_string()
        }
    );
}

fn print_settings<S: SearchClient>(session: &SearchSession<S>) {
    let form = session.form();
    println!("{} limit {} · context length {}", "⚙️".dimmed(), form.limit(), form.context_length());
    for (column, values) in form.attributes.iter() {
        let mode = if form.array_attributes.contains(column) { "contains" } else { "equals" };
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        println!("  {} {} {}", column.green(), mode.dimmed(), values.join(" | "));
    }
}

fn warn_unknown_columns<S: SearchClient>(session: &SearchSession<S>) {
    for column in session.unknown_filter_columns() {
        println!(
            "{} '{}' is not an attribute column of this service",
            "⚠️".yellow(),
            column
        );
    }
}

/// How to reveal the full text of a truncated result
pub(crate) fn full_text_hint(number: usize, interactive: bool) -> String {
    if interactive {
        format!("Show full context for Result {}: /full {}", number, number)
    } else {
        format!("Show full context for Result {}: rerun with --full {}", number, number)
    }
}

fn print_results(view: &SearchResultsView, interactive: bool) {
    if view.is_empty() {
        print_markdown(&view.to_markdown());
        return;
    }

    print_markdown("### Search Results");
    for card in &view.cards {
        print_markdown(&card.to_markdown());
        if card.truncated {
            println!("{}\n", full_text_hint(card.number, interactive).dimmed());
        }
    }
    print_markdown(&view.references);
}

fn print_full_text<S: SearchClient>(session: &SearchSession<S>, number: usize) {
    match session.full_text(number) {
        Some(text) => {
            println!("{}", format!("Result {}", number).bold());
            println!("{} {}", "Full Excerpt:".bold(), text);
            println!();
        }
        None => print_error(&format!(
            "no result {} (last search returned {})",
            number,
            session.results().len()
        )),
    }
}

async fn run_query<S: SearchClient>(session: &mut SearchSession<S>, interactive: bool) -> Result<()> {
    warn_unknown_columns(session);

    let view = {
        let _thinking = ThinkingIndicator::start();
        session.run().await?
    };

    if let Some(view) = view {
        print_results(&view, interactive);
    }
    Ok(())
}

/// Run the search front-end
///
/// A query already set on the form is run once and the function returns,
/// printing the full text of result `full` when given. Otherwise an
/// interactive session reads queries and form changes.
pub async fn run_search<S: SearchClient>(
    session: &mut SearchSession<S>,
    full: Option<usize>,
) -> Result<()> {
    if !session.form().query.trim().is_empty() {
        run_query(session, false).await?;
        if let Some(number) = full {
            print_full_text(session, number);
        }
        return Ok(());
    }

    display_banner("📘 Municipal Code Search", &session.service_name());
    print_description(session);
    print_settings(session);
    println!();

    let mut input_history = Vec::new();

    loop {
        let Some(line) = handle_input_with_history("search>", &mut input_history).await? else {
            break;
        };

        let command = match SearchCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                print_error(&e);
                continue;
            }
        };
        debug!(?command, "search command");

        let outcome = match command {
            SearchCommand::Empty => continue,
            SearchCommand::Exit => break,
            SearchCommand::Help => {
                print_search_help();
                Ok(())
            }
            SearchCommand::Settings => {
                print_settings(session);
                Ok(())
            }
            SearchCommand::Limit(n) => session.form_mut().set_limit(n),
            SearchCommand::Context(n) => session.form_mut().set_context_length(n),
            SearchCommand::Filter(pair) => session.form_mut().attributes.select_pair(&pair),
            SearchCommand::ArrayAttribute(column) => {
                session.form_mut().array_attributes.insert(column);
                Ok(())
            }
            SearchCommand::ClearFilters => {
                session.form_mut().attributes.clear();
                Ok(())
            }
            SearchCommand::Full(n) => {
                print_full_text(session, n);
                Ok(())
            }
            SearchCommand::Query(query) => {
                session.form_mut().query = query;
                run_query(session, true).await
            }
        };

        if let Err(e) = outcome {
            print_error(&e);
        }
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}
