//! DeltaAI in the terminal: chat about Roblox Lua scripts, generate and
//! explain them.

#[macro_use]
extern crate tracing;

mod command;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use delta_assistant_core::{
    CompletionClient, Locale, LocaleStrings, Role, SessionBuilder, Submission,
};
use delta_assistant_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::command::{Command, HELP};

enum SessionEvent {
    Reply(String),
    Idle,
}

type InputLines = Lines<BufReader<Stdin>>;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("GEMINI_API_KEY").or_else(|_| env::var("API_KEY"))
    else {
        eprintln!("GEMINI_API_KEY environment variable is not set");
        return;
    };
    let mut config = GeminiConfigBuilder::with_api_key(api_key);
    if let Ok(model) = env::var("GEMINI_MODEL") {
        config = config.with_model(model);
    }
    if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    let config = config.build();
    debug!("using {config:?}");
    let client = CompletionClient::new(GeminiProvider::new(config));

    let mut lines = BufReader::new(io::stdin()).lines();
    let Some(locale) = choose_locale(&mut lines).await else {
        return;
    };
    let strings = locale.strings();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = SessionBuilder::with_completion_client(client.clone())
        .with_locale(locale)
        .on_message({
            let event_tx = event_tx.clone();
            move |msg| {
                if msg.role() == Role::Assistant {
                    event_tx
                        .send(SessionEvent::Reply(msg.content().to_owned()))
                        .ok();
                }
            }
        })
        .on_idle(move || {
            event_tx.send(SessionEvent::Idle).ok();
        })
        .build();

    print_reply(strings.greeting);
    println!("{}", strings.warning.dimmed());
    println!("{}\n{}", strings.placeholder.dimmed(), HELP.dimmed());

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("\n> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line(&mut lines).await else {
            break;
        };

        match Command::parse(&line) {
            Command::Chat(text) => {
                match session.submit(text).await {
                    Ok(Submission::Accepted) => {}
                    Ok(Submission::Rejected(reason)) => {
                        trace!("input rejected: {reason:?}");
                        continue;
                    }
                    Err(err) => {
                        error!("{err}");
                        break;
                    }
                }

                let replies = with_spinner(&progress_style, async {
                    let mut replies = vec![];
                    while let Some(event) = event_rx.recv().await {
                        match event {
                            SessionEvent::Reply(reply) => replies.push(reply),
                            SessionEvent::Idle => return Some(replies),
                        }
                    }
                    None
                })
                .await;
                let Some(replies) = replies else {
                    break;
                };
                for reply in replies {
                    print_reply(&reply);
                }
            }
            Command::Generate(prompt) => {
                let result = with_spinner(
                    &progress_style,
                    client.generate_script(prompt),
                )
                .await;
                print_auxiliary_result(result, strings);
            }
            Command::Explain(code) => {
                let result =
                    with_spinner(&progress_style, client.explain_script(code))
                        .await;
                print_auxiliary_result(result, strings);
            }
            Command::Transcript => {
                let Ok(transcript) = session.transcript().await else {
                    break;
                };
                match serde_json::to_string_pretty(&transcript) {
                    Ok(json) => println!("{json}"),
                    Err(err) => error!("failed to serialize transcript: {err}"),
                }
            }
            Command::Quit => break,
            Command::Invalid(line) => {
                eprintln!("{} {line}\n{HELP}", "Unknown command:".bright_red());
            }
        }
    }
}

/// Takes the language from `DELTA_LANG`, or asks for it.
async fn choose_locale(lines: &mut InputLines) -> Option<Locale> {
    if let Ok(lang) = env::var("DELTA_LANG") {
        match lang.parse() {
            Ok(locale) => return Some(locale),
            Err(err) => warn!("ignoring DELTA_LANG: {err}"),
        }
    }

    let prompt = language_prompt();
    loop {
        print!("{prompt}");
        std::io::stdout().flush().unwrap();

        let line = read_line(lines).await?;
        let line = line.trim();
        if line.is_empty() {
            return Some(Locale::default());
        }
        match line.parse() {
            Ok(locale) => return Some(locale),
            Err(err) => eprintln!("{err}"),
        }
    }
}

fn language_prompt() -> String {
    format!(
        "Language / Lingua [{}] ({}): ",
        Locale::ALL.map(Locale::code).join("/"),
        Locale::default()
    )
}

async fn read_line(lines: &mut InputLines) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

/// Runs `fut` while showing a spinner.
async fn with_spinner<F: Future>(style: &ProgressStyle, fut: F) -> F::Output {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style.clone());
    progress_bar.set_message("🤔 Thinking...");

    let mut fut = pin!(fut);
    let output = loop {
        select! {
            output = &mut fut => break output,
            _ = sleep(Duration::from_millis(100)) => progress_bar.inc(1),
        }
    };

    // Finish the progress bar before printing anything else.
    progress_bar.finish_and_clear();
    output
}

fn print_auxiliary_result<E: std::error::Error>(
    result: Result<String, E>,
    strings: &LocaleStrings,
) {
    match result {
        Ok(text) => print_reply(&text),
        Err(err) => {
            warn!("{err}");
            print_reply(strings.failure);
        }
    }
}

fn print_reply(text: &str) {
    let bar = BAR_CHAR.bright_cyan();
    let mut lines = text.lines();
    println!("{bar}🤖 {}", lines.next().unwrap_or_default().bright_white());
    for line in lines {
        println!("{bar}   {}", line.bright_white());
    }
}
