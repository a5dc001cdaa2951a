//! Chat REPL

use colored::*;
use tracing::debug;

use municode_core::{GenerationClient, Result, Role, SearchClient};
use municode_rag::{ChatEngine, ChatSession};

use crate::commands::ChatCommand;
use crate::ui::{
    ThinkingIndicator, display_banner, handle_input_with_history, print_chat_help, print_error,
    print_markdown,
};

fn avatar(role: Role) -> &'static str {
    match role {
        Role::Assistant => "❄️",
        Role::User => "👤",
    }
}

fn print_history(session: &ChatSession) {
    if session.messages().is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }
    for message in session.messages() {
        println!("{} {}", avatar(message.role), message.role.as_str().bold());
        print_markdown(&message.content);
    }
}

async fn answer<S: SearchClient, G: GenerationClient>(
    engine: &ChatEngine<S, G>,
    session: &mut ChatSession,
    question: &str,
) -> Result<()> {
    println!("{} {}", avatar(Role::User), question);

    let turn = {
        let _thinking = ThinkingIndicator::start();
        engine.ask(session, question).await?
    };

    if let Some(turn) = turn {
        println!("{}", avatar(Role::Assistant));
        print_markdown(&turn.rendered);
    }
    Ok(())
}

/// Run the chat front-end
///
/// With `question` set, answers it once and returns any backend failure.
/// Otherwise runs an interactive session where failures are reported and
/// the session continues.
pub async fn run_chat<S: SearchClient, G: GenerationClient>(
    engine: &ChatEngine<S, G>,
    session: &mut ChatSession,
    question: Option<String>,
) -> Result<()> {
    if let Some(question) = question {
        return answer(engine, session, &question).await;
    }

    display_banner("📘 Municipal Code Chatbot", &engine.service_name());
    println!(
        "{} model {} · {} context chunks",
        "⚙️".dimmed(),
        session.model().to_string().cyan(),
        session.num_chunks()
    );
    println!();

    let mut input_history = Vec::new();

    loop {
        session.apply_pending_reset();

        let Some(line) = handle_input_with_history("chat>", &mut input_history).await? else {
            break;
        };

        let command = match ChatCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                print_error(&e);
                continue;
            }
        };
        debug!(?command, "chat command");

        match command {
            ChatCommand::Empty => continue,
            ChatCommand::Exit => break,
            ChatCommand::Help => print_chat_help(),
            ChatCommand::History => print_history(session),
            ChatCommand::Reset => {
                session.request_reset();
                println!("{} Conversation cleared", "🧹".cyan());
            }
            ChatCommand::Model(model) => {
                session.set_model(model);
                println!("{} Using model {}", "✅".green(), model.to_string().cyan());
            }
            ChatCommand::Chunks(n) => match session.set_num_chunks(n) {
                Ok(()) => println!("{} Retrieving {} context chunks", "✅".green(), n),
                Err(e) => print_error(&e),
            },
            ChatCommand::Question(question) => {
                if let Err(e) = answer(engine, session, &question).await {
                    print_error(&e);
                }
            }
        }
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}
