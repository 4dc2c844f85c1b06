use std::io::{BufRead, Write};
use std::sync::Arc;

use waypoint_core::config::AppConfig;
use waypoint_db::store::{MemoryEntityStore, MemorySessionStore};
use waypoint_engine::{ChatEngine, EchoDelegate, HttpDelegate, RemoteDelegate};

use crate::commands::CommandResult;

/// Interactive loop over stdin. State lives in memory for the duration
/// of the session; the durable log backs transcript reconciliation.
pub fn run(config: &AppConfig) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let delegate: Arc<dyn RemoteDelegate> = match HttpDelegate::from_config(&config.delegate) {
        Ok(Some(delegate)) => Arc::new(delegate),
        Ok(None) => Arc::new(EchoDelegate),
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "delegate_init",
                format!("failed to build the delegate client: {error}"),
                4,
            );
        }
    };

    let engine = ChatEngine::with_suggestion_cap(
        Arc::new(MemoryEntityStore::default()),
        Arc::new(MemorySessionStore::default()),
        delegate,
        config.suggestions.max_suggestions,
    );

    println!("Waypoint chat. Type a command, or 'exit' to leave.");
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("you> ");
        if std::io::stdout().flush().is_err() {
            break;
        }
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        let report = runtime.block_on(engine.submit(text));
        for message in &report.appended {
            println!("waypoint> {}", message.text);
        }
        for suggestion in &report.suggestions {
            println!("  hint: {suggestion}");
        }
    }

    engine.shutdown();
    CommandResult::success("chat", "session ended")
}
