//! Implementations of the `ragchat` subcommands.
//!
//! Each `run_*` function takes the loaded [`Config`], performs one command
//! and prints its result to stdout. Diagnostics go through `tracing`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use walkdir::WalkDir;

use crate::cache::CacheStore;
use crate::client::HttpRagClient;
use crate::codec;
use crate::config::Config;
use crate::kv::{self, SqliteKvStore};
use crate::models::{Language, Message};
use crate::pipeline::{Session, SubmitOutcome};

/// Open the configured persistence backend and load the cache from it.
pub async fn open_cache(config: &Config) -> Result<CacheStore> {
    let store = kv::open(&config.cache).await?;
    Ok(CacheStore::load(store, config.cache.key.clone()).await)
}

/// Build a session against the configured HTTP endpoints.
pub async fn open_session(config: &Config, language: Language) -> Result<Session> {
    let cache = open_cache(config).await?;
    let backend = HttpRagClient::new(&config.endpoints)?;
    Ok(Session::new(Arc::new(backend), cache, language))
}

/// Resolve `--language`, falling back to `[session].language`.
pub fn resolve_language(config: &Config, flag: Option<&str>) -> Result<Language> {
    match flag {
        Some(tag) => tag.parse::<Language>().map_err(anyhow::Error::msg),
        None => config.language(),
    }
}

pub async fn run_init(config: &Config) -> Result<()> {
    match (config.cache.backend.as_str(), &config.cache.path) {
        ("sqlite", Some(path)) => {
            SqliteKvStore::open(path)
                .await
                .with_context(|| format!("Failed to initialize {}", path.display()))?;
            println!("Cache initialized at {}.", path.display());
        }
        _ => println!("Cache backend is '{}'; nothing to initialize.", config.cache.backend),
    }
    Ok(())
}

/// Add files to the cache. Directories are walked recursively in name order.
pub async fn run_add(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let files = collect_files(paths)?;
    if files.is_empty() {
        bail!("No files found to add");
    }

    let mut cache = open_cache(config).await?;
    for file in &files {
        cache.add_file(file).await?;
        println!("added: {}", file.display());
    }
    println!("{} document(s) cached.", cache.len());
    Ok(())
}

fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }
    Ok(files)
}

pub async fn run_list(config: &Config) -> Result<()> {
    let cache = open_cache(config).await?;
    if cache.is_empty() {
        println!("No cached documents.");
        return Ok(());
    }

    println!("{:<6} {:<40} {:>10}", "INDEX", "NAME", "BYTES");
    for (i, doc) in cache.list().iter().enumerate() {
        let size = codec::decode(&doc.content).map(|b| b.len()).unwrap_or(0);
        println!("{:<6} {:<40} {:>10}", i, doc.name, size);
    }
    Ok(())
}

pub async fn run_remove(config: &Config, index: usize) -> Result<()> {
    let mut cache = open_cache(config).await?;
    match cache.remove(index).await? {
        Some(doc) => println!("removed: {}", doc.name),
        None => println!("No document at index {} ({} cached).", index, cache.len()),
    }
    Ok(())
}

pub async fn run_clear(config: &Config) -> Result<()> {
    let mut cache = open_cache(config).await?;
    let count = cache.len();
    cache.clear().await?;
    println!("Cleared {} document(s).", count);
    Ok(())
}

pub fn run_languages() {
    for language in Language::ALL {
        println!("{:<12} {}", language.tag(), language.label());
    }
}

/// Submit one question and print the resulting transcript.
pub async fn run_ask(config: &Config, question: &str, language: Language) -> Result<()> {
    let session = open_session(config, language).await?;
    let outcome = session.submit(question, language).await;
    if let SubmitOutcome::Invalid(e) = outcome {
        bail!("{}", e);
    }
    for message in session.transcript() {
        print_message(&message);
    }
    Ok(())
}

/// Line-oriented interactive session on stdin.
pub async fn run_chat(config: &Config, language: Language) -> Result<()> {
    let session = open_session(config, language).await?;
    println!(
        "Language: {}. {} document(s) cached. Type /help for commands.",
        language.label(),
        session.documents().await.len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut printed = 0;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match parse_chat_line(line) {
            ChatCommand::Quit => break,
            ChatCommand::Help => print_chat_help(),
            ChatCommand::List => {
                let docs = session.documents().await;
                if docs.is_empty() {
                    println!("No cached documents.");
                }
                for (i, doc) in docs.iter().enumerate() {
                    println!("  [{}] {}", i, doc.name);
                }
            }
            ChatCommand::Add(path) => match session.add_file(Path::new(path)).await {
                Ok(()) => println!("added: {}", path),
                Err(e) => println!("error: {:#}", e),
            },
            ChatCommand::Remove(arg) => match arg.parse::<usize>() {
                Ok(index) => match session.remove_document(index).await {
                    Ok(Some(doc)) => println!("removed: {}", doc.name),
                    Ok(None) => println!("No document at index {}.", index),
                    Err(e) => println!("error: {:#}", e),
                },
                Err(_) => println!("usage: /remove <index>"),
            },
            ChatCommand::Clear => match session.clear_cache().await {
                Ok(()) => println!("cache cleared"),
                Err(e) => println!("error: {:#}", e),
            },
            ChatCommand::Language(tag) => match tag.parse::<Language>() {
                Ok(l) => {
                    session.select_language(l);
                    println!("Language: {}", l.label());
                }
                Err(e) => println!("{}", e),
            },
            ChatCommand::Unknown(cmd) => println!("unknown command {}. Type /help.", cmd),
            ChatCommand::Ask(text) => {
                session.set_draft(text);
                if let SubmitOutcome::Invalid(e) = session.submit_draft().await {
                    println!("{}", e);
                }
                let transcript = session.transcript();
                for message in &transcript[printed..] {
                    print_message(message);
                }
                printed = transcript.len();
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand<'a> {
    Quit,
    Help,
    List,
    Clear,
    Add(&'a str),
    Remove(&'a str),
    Language(&'a str),
    Unknown(&'a str),
    Ask(&'a str),
}

fn parse_chat_line(line: &str) -> ChatCommand<'_> {
    if !line.starts_with('/') {
        return ChatCommand::Ask(line);
    }
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };
    match cmd {
        "/quit" | "/exit" => ChatCommand::Quit,
        "/help" => ChatCommand::Help,
        "/list" => ChatCommand::List,
        "/clear" => ChatCommand::Clear,
        "/add" => ChatCommand::Add(arg),
        "/remove" => ChatCommand::Remove(arg),
        "/lang" => ChatCommand::Language(arg),
        other => ChatCommand::Unknown(other),
    }
}

fn print_chat_help() {
    println!("  /add <path>      cache a file");
    println!("  /remove <index>  remove a cached file");
    println!("  /list            list cached files");
    println!("  /clear           remove all cached files");
    println!("  /lang <tag>      change response language");
    println!("  /quit            leave the session");
    println!("  anything else is sent as a question");
}

pub fn print_message(message: &Message) {
    println!("{}: {}", message.role, message.content);
    if !message.sources.is_empty() {
        println!("  Sources: {}", message.sources.join(", "));
    }
}
