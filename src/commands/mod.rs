/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat`  — Interactive moderated chat session
- `cache` — Response-cache inspection and maintenance

These handlers are intentionally small and use the library components:
providers, the moderation gate, the cache, and the session registry.
*/

use crate::cache::{InvestigateSpec, ResponseCache};
use crate::config::Config;
use crate::error::{ParlanceError, Result};
use crate::moderation::OpenAiModerationGate;
use crate::providers::{create_client, Message};
use std::sync::Arc;

/// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Instantiates the completion client, moderation gate, and cache,
    //! creates a session under the requested id, and runs a readline-based
    //! loop that submits user input as moderated turns.

    use super::*;
    use crate::providers::Role;
    use crate::session::{PromptRole, SessionFilter, SessionRegistry, TurnOutcome};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::str::FromStr;

    /// Start an interactive chat session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `session` - Id of the session to create; generated when omitted
    /// * `no_moderate` - If true, skip the moderation gate on every turn
    pub async fn run_chat(config: Config, session: Option<String>, no_moderate: bool) -> Result<()> {
        let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::info!("Starting interactive chat: session={}", session_id);

        let client = create_client(&config.provider)?;
        let gate = Arc::new(OpenAiModerationGate::new(config.moderation.clone())?);
        let cache = if config.cache.enabled {
            Some(Arc::new(ResponseCache::open(config.cache.resolved_path()?)?))
        } else {
            None
        };
        let auto_moderate = config.moderation.enabled && !no_moderate;

        let mut registry = SessionRegistry::new(client, gate, cache);
        registry.create(&session_id);

        if let Some(seed) = &config.chat.system_prompt {
            if let Some(session) = registry.find_mut(&session_id) {
                session.append(Role::System, seed.clone());
            }
        }

        let mut rl = DefaultEditor::new()
            .map_err(|e| ParlanceError::Config(format!("Failed to initialize readline: {}", e)))?;

        print_welcome(&session_id, auto_moderate);

        loop {
            match rl.readline(&format!("{} ", "parlance>".cyan())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match trimmed {
                        "exit" | "quit" => break,
                        "help" => {
                            print_help();
                            continue;
                        }
                        "back" => {
                            if let Some(session) = registry.find_mut(&session_id) {
                                session.rollback();
                                println!("Removed the last message\n");
                            }
                            continue;
                        }
                        "reset" => {
                            if let Some(session) = registry.find_mut(&session_id) {
                                session.clear();
                                println!("Cleared the conversation\n");
                            }
                            continue;
                        }
                        "show" => {
                            if let Some(session) = registry.find(&session_id) {
                                println!("\n{}\n", session.render_as_text());
                            }
                            continue;
                        }
                        "api" | "retry" => {
                            if let Some(session) = registry.find_mut(&session_id) {
                                request_and_append(session).await;
                            }
                            continue;
                        }
                        _ => {}
                    }

                    if let Some(rest) = trimmed.strip_prefix("add ") {
                        if let Some(session) = registry.find_mut(&session_id) {
                            handle_add(session, rest);
                        }
                        continue;
                    }

                    if let Some(rest) = trimmed.strip_prefix("find ") {
                        handle_find(&registry, rest);
                        continue;
                    }

                    let session = match registry.find_mut(&session_id) {
                        Some(session) => session,
                        None => break,
                    };
                    match session.talk(PromptRole::User, trimmed, auto_moderate).await {
                        Ok(TurnOutcome::Reply(reply)) => {
                            println!("\n{}\n", reply);
                        }
                        Ok(TurnOutcome::Blocked { reason }) => {
                            println!("{}\n", reason.yellow());
                        }
                        Err(e) => {
                            // The prompt stays in the log; `retry` re-requests a reply.
                            eprintln!("{}\n", format!("Error: {}", e).red());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Append a message without requesting a reply
    ///
    /// Input form is `<role> <content>`, e.g. `add system be terse`.
    fn handle_add(session: &mut crate::session::ConversationSession, rest: &str) {
        let (role_str, content) = match rest.split_once(' ') {
            Some(parts) => parts,
            None => {
                eprintln!("{}\n", "Usage: add <user|system> <content>".yellow());
                return;
            }
        };
        match PromptRole::from_str(role_str) {
            Ok(role) => {
                session.append(role.into(), content);
                println!("Appended {} message\n", role_str);
            }
            Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
        }
    }

    /// Print the ids of sessions matching a keyed filter
    ///
    /// Input form is `<key> <value>`, e.g. `find general_match weather` or
    /// `find role_match user=hello`.
    fn handle_find(registry: &SessionRegistry, rest: &str) {
        let (key, value) = match rest.split_once(' ') {
            Some(parts) => parts,
            None => {
                eprintln!(
                    "{}\n",
                    "Usage: find <general_match|role_match> <value>".yellow()
                );
                return;
            }
        };
        match find_session_ids(registry, key, value) {
            Ok(ids) if ids.is_empty() => println!("No matching sessions\n"),
            Ok(ids) => println!("Matching sessions: {}\n", ids.join(", ")),
            Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
        }
    }

    /// Resolve a string-keyed filter and return the ids of matching sessions
    ///
    /// Unknown keys and malformed values are hard errors.
    fn find_session_ids(registry: &SessionRegistry, key: &str, value: &str) -> Result<Vec<String>> {
        let mut filter = SessionFilter::new();
        filter.set_keyed(key, value)?;
        Ok(registry
            .find_by(&filter)
            .iter()
            .map(|session| session.id().to_string())
            .collect())
    }

    /// Request a reply for the current log and append it
    async fn request_and_append(session: &mut crate::session::ConversationSession) {
        match session.request_reply().await {
            Ok(Some(reply)) => {
                session.append(Role::Assistant, reply.clone());
                println!("\n{}\n", reply);
            }
            Ok(None) => println!("{}\n", "The log is empty; nothing to reply to".yellow()),
            Err(e) => eprintln!("{}\n", format!("Error: {}", e).red()),
        }
    }

    fn print_welcome(session_id: &str, auto_moderate: bool) {
        println!("\nParlance interactive chat — session '{}'", session_id);
        if !auto_moderate {
            println!("{}", "Moderation is disabled for this session".yellow());
        }
        println!("Type 'help' for available commands, 'exit' to quit\n");
    }

    fn print_help() {
        println!("\nCommands:");
        println!("  add <role> <text>  Append a message without requesting a reply");
        println!("  back               Remove the most recent message");
        println!("  reset              Clear the conversation, keeping the session");
        println!("  show               Print the conversation so far");
        println!("  find <key> <val>   List sessions matching a keyed filter");
        println!("  api                Request a reply for the current log");
        println!("  retry              Same as 'api'; use after a failed turn");
        println!("  help               Show this help");
        println!("  exit               Leave the chat\n");
        println!("Any other input is sent as a moderated user turn.\n");
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::test_utils::{stub_client, stub_gate};

        #[test]
        fn test_find_session_ids_by_keyed_filter() {
            let mut registry = SessionRegistry::new(stub_client("ok"), stub_gate(false), None);
            registry.create("greeter");
            registry
                .find_mut("greeter")
                .unwrap()
                .append(Role::User, "hello world");
            registry.create("other");
            registry
                .find_mut("other")
                .unwrap()
                .append(Role::User, "goodbye");

            let ids = find_session_ids(&registry, "general_match", "hello").unwrap();
            assert_eq!(ids, vec!["greeter".to_string()]);

            let ids = find_session_ids(&registry, "role_match", "user=goodbye").unwrap();
            assert_eq!(ids, vec!["other".to_string()]);
        }

        #[test]
        fn test_find_session_ids_rejects_unknown_key() {
            let registry = SessionRegistry::new(stub_client("ok"), stub_gate(false), None);
            assert!(find_session_ids(&registry, "fuzzy_match", "hello").is_err());
        }
    }
}

/// Cache maintenance command handlers
pub mod cache {
    //! Inspection and maintenance of the response cache.
    //!
    //! Entry inputs are given as JSON arrays of `{role, content}` messages,
    //! matching the on-disk form of the store.

    use super::*;

    /// Print all entries matching the given filters
    ///
    /// With neither filter active nothing matches; this mirrors the
    /// library's investigate semantics rather than listing everything.
    pub fn investigate(
        config: &Config,
        contains: Option<String>,
        all_of: Vec<String>,
    ) -> Result<()> {
        let cache = open_cache(config)?;

        let mut spec = InvestigateSpec::new();
        if let Some(term) = contains {
            spec = spec.simple_match(term);
        }
        if !all_of.is_empty() {
            spec = spec.multi_match(all_of);
        }

        let entries = cache.investigate(&spec)?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        tracing::info!(
            "Investigate matched {} of {} entries",
            entries.len(),
            cache.len()?
        );
        Ok(())
    }

    /// Replace the output of the first entry with the given input
    pub fn edit(config: &Config, input: &str, output: &str) -> Result<()> {
        let cache = open_cache(config)?;
        let input = parse_input(input)?;

        if cache.edit(&input, output)? {
            println!("Entry updated");
        } else {
            println!("No entry matches the given input");
        }
        Ok(())
    }

    /// Delete the first entry with the given input
    pub fn delete(config: &Config, input: &str) -> Result<()> {
        let cache = open_cache(config)?;
        let input = parse_input(input)?;

        if cache.delete(&input)? {
            println!("Entry deleted");
        } else {
            println!("No entry matches the given input");
        }
        Ok(())
    }

    fn open_cache(config: &Config) -> Result<ResponseCache> {
        ResponseCache::open(config.cache.resolved_path()?)
    }

    fn parse_input(raw: &str) -> Result<Vec<Message>> {
        serde_json::from_str(raw).map_err(|e| {
            ParlanceError::Cache(format!(
                "Input must be a JSON array of {{role, content}} messages: {}",
                e
            ))
            .into()
        })
    }

}
