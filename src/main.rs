//! Lectio - headless reader driver
//!
//! Loads the configured translations and reads commands from stdin. Plain
//! text submits a search; `:help` lists the rest.

use anyhow::Result;
use lectio_lib::preferences::BASE_FONT_SCALE;
use lectio_lib::query::parse_book_filter;
use lectio_lib::{
    navigation, AppState, LectioConfig, LectioError, LoadState, SearchController, SearchScope,
    SearchStatus, TokioScheduler, TranslationLoader,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

type Controller = SearchController<TokioScheduler>;

const HELP: &str = "\
<text>              search enabled translations
:scope all|old|new  restrict to a division
:book <n>|none      restrict to one canonical book (overrides scope)
:show <id>          show a translation (kor, kjv, ja, ita)
:hide <id>          hide a translation
:allow <id>         allow downloading an optional translation
:deny <id>          revoke it
:open <k>           go to result k
:jump <b> <c> [v]   go to book b, chapter c, verse v
:next / :prev       step chapters
:close              close search and clear it
:font +|-|reset     adjust text size
:theme              switch between light and dark
:furigana           toggle furigana
:wakelock           toggle keeping the screen awake
:status             print search status
:quit";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let config = LectioConfig::from_env()?;
    info!(data_dir = %config.data_dir.display(), base_url = %config.base_url, "starting");

    let mut state = AppState::new(config)?;
    let (loader, mut load_rx) =
        TranslationLoader::new(state.config.base_url.clone(), state.config.data_dir.clone())?;
    request_pending(&mut state, &loader)?;

    let (scheduler, mut fired_rx) = TokioScheduler::new();
    let mut controller = state.search_controller(scheduler);
    controller.open(&state.registry);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(event) = load_rx.recv() => {
                if let LoadState::Failed(reason) = &event.state {
                    warn!(translation = %event.id, reason = %reason, "translation unavailable");
                }
                let id = event.id.clone();
                if let Err(e) = state.apply_load_event(event) {
                    warn!(translation = %id, error = %e, "ignoring load event");
                }
                controller.on_registry_changed(&state.registry);
                if state.registry.state(&id).is_some_and(|s| s.is_ready()) {
                    println!("{} ready", id);
                }
            }
            Some(task) = fired_rx.recv() => {
                if controller.on_task_fired(task, &state.registry) {
                    print_results(&controller);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_command(line.trim(), &mut state, &mut controller, &loader) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("{}", e),
                }
            }
        }
    }

    Ok(())
}

fn request_pending(state: &mut AppState, loader: &TranslationLoader) -> Result<(), LectioError> {
    for id in state.registry.pending_loads() {
        state.registry.set_state(&id, LoadState::Loading)?;
        loader.request(&id);
    }
    Ok(())
}

/// Returns `Ok(false)` when the driver should exit.
fn handle_command(
    line: &str,
    state: &mut AppState,
    controller: &mut Controller,
    loader: &TranslationLoader,
) -> Result<bool, LectioError> {
    if line.is_empty() {
        return Ok(true);
    }
    let Some(command) = line.strip_prefix(':') else {
        if !controller.is_open() {
            controller.open(&state.registry);
        }
        controller.set_term(line);
        if !controller.submit(&state.registry) {
            print_results(controller);
        }
        return Ok(true);
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((command, ""));

    match name {
        "quit" | "q" => return Ok(false),
        "help" => println!("{}", HELP),
        "status" => print_results(controller),
        "scope" => {
            let scope: SearchScope = arg.parse()?;
            controller.set_scope(scope, &state.registry);
            state.save_search_filters(scope, controller.query().book_filter)?;
        }
        "book" => {
            let book = parse_book_filter(arg)?;
            controller.set_book_filter(book, &state.registry);
            state.save_search_filters(controller.query().scope, book)?;
        }
        "show" | "hide" => {
            state.set_shown(arg, name == "show")?;
            controller.on_registry_changed(&state.registry);
        }
        "allow" | "deny" => {
            state.set_allowed(arg, name == "allow")?;
            request_pending(state, loader)?;
            controller.on_registry_changed(&state.registry);
        }
        "open" => {
            let k: usize = arg
                .parse()
                .map_err(|_| {
                    LectioError::InvalidQuery(format!("expected a result number, got '{}'", arg))
                })?;
            let result = k
                .checked_sub(1)
                .and_then(|i| controller.results().get(i))
                .ok_or_else(|| LectioError::NotFound(format!("result {}", k)))?;
            match controller.select_result(result, &state.registry) {
                Some(jump) => {
                    state.set_position(jump.position)?;
                    println!(
                        "-> {} {}:{}",
                        result.book_title, jump.focus.chapter, jump.focus.verse
                    );
                }
                None => println!(
                    "{} {}:{} is not in the primary translation",
                    result.book_title, result.chapter, result.verse
                ),
            }
        }
        "jump" => {
            let numbers = arg
                .split_whitespace()
                .map(|n| n.parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| {
                    LectioError::InvalidQuery(format!(
                        "expected :jump <book> <chapter> [verse], got '{}'",
                        arg
                    ))
                })?;
            let (book, chapter, verse) = match numbers[..] {
                [book, chapter] => (book, chapter, 1),
                [book, chapter, verse] => (book, chapter, verse),
                _ => {
                    return Err(LectioError::InvalidQuery(
                        "expected :jump <book> <chapter> [verse]".to_string(),
                    ))
                }
            };
            let jump = state.jump_to(book, chapter, verse)?;
            let title = state
                .registry
                .primary()
                .and_then(|p| p.book_title(book).map(str::to_string))
                .unwrap_or_else(|| book.to_string());
            println!("-> {} {}:{}", title, jump.focus.chapter, jump.focus.verse);
        }
                "next" | "prev" => {
            let primary = state
                .registry
                .primary()
                .ok_or_else(|| LectioError::NotFound("no translation loaded".to_string()))?;
            let step = if name == "next" {
                navigation::next_chapter(&primary, state.position)
            } else {
                navigation::previous_chapter(&primary, state.position)
            };
            if let Some(position) = step {
                state.set_position(position)?;
            }
            if let (Some(book), Some(chapter)) = (
                primary.book_at(state.position.book_index),
                primary.chapter_at(state.position.book_index, state.position.chapter_index),
            ) {
                println!("{} {}", book.title, chapter.number);
            }
        }
        "close" => controller.close(),
        "font" => {
            match arg {
                "+" => state.preferences.increase_font(),
                "-" => state.preferences.decrease_font(),
                "reset" => state.preferences.set_font_scale(BASE_FONT_SCALE),
                _ => {
                    return Err(LectioError::InvalidQuery(format!(
                        "expected +, - or reset, got '{}'",
                        arg
                    )))
                }
            }
            state.save_preferences()?;
            println!("font scale {}", state.preferences.font_scale);
        }
        "furigana" => {
            let on = state.preferences.toggle_furigana();
            state.save_preferences()?;
            println!("furigana {}", if on { "on" } else { "off" });
        }
        "wakelock" => {
            let on = state.preferences.toggle_wake_lock();
            state.save_preferences()?;
            println!("wake lock {}", if on { "on" } else { "off" });
        }
        "theme" => {
            state.preferences.toggle_theme();
            state.save_preferences()?;
            println!("theme {:?}", state.preferences.theme);
        }
        other => {
            return Err(LectioError::InvalidQuery(format!(
                "unknown command :{} (try :help)",
                other
            )))
        }
    }
    Ok(true)
}

fn print_results(controller: &Controller) {
    match controller.status() {
        SearchStatus::Unavailable => println!("no translations loaded yet"),
        SearchStatus::Idle => println!("enter a word or phrase to search"),
        SearchStatus::Searching => println!("searching..."),
        SearchStatus::NoMatches { term } => println!("no results for \"{}\"", term),
        SearchStatus::Matches { count, capped } => {
            for (i, r) in controller.results().iter().enumerate() {
                println!(
                    "{:>3}. [{}] {} {}:{}  {}",
                    i + 1,
                    r.translation_label,
                    r.book_title,
                    r.chapter,
                    r.verse,
                    r.text
                );
            }
            if capped {
                println!("showing the first {} results only", count);
            } else {
                println!("{} results", count);
            }
        }
    }
}
