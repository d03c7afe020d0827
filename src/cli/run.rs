// Entry point logic: configuration, agent construction, mode dispatch

use clap::CommandFactory;
use crossterm::style::Stylize;
use tracing::debug;

use crate::agent::DebugAgent;
use crate::config::{config_dir, load_config};
use crate::logging;

use super::args::{Cli, Mode};
use super::render;
use super::repl::Repl;
use super::session::Session;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INTERRUPTED: i32 = 130;

fn exit_code(ok: bool) -> i32 {
    if ok {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

/// Run one invocation and return the process exit code
pub async fn run(cli: Cli) -> i32 {
    let mut config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            render::print_error(format!("{:#}", e));
            return EXIT_FAILURE;
        }
    };
    cli.apply_to(&mut config);
    if let Err(e) = config.validate() {
        render::print_error(format!("{:#}", e));
        return EXIT_FAILURE;
    }

    logging::init(config.features.debug_logging);
    debug!(
        provider = config.provider.provider_type(),
        model = config.provider.model(),
        "Configuration loaded"
    );

    println!("{}", render::banner());

    let agent = match DebugAgent::from_config(&config) {
        Ok(agent) => agent,
        Err(e) => {
            render::print_error(format!("Failed to initialize: {:#}", e));
            println!("{}", "Make sure Ollama is running: ollama serve".dark_grey());
            return EXIT_FAILURE;
        }
    };
    let session = Session::new(agent, config.features.auto_apply);
    session.check_model().await;

    match cli.mode() {
        Mode::Fix(path) => {
            if !session.agent().workspace().exists(&path) {
                render::print_error(format!("File not found: {}", path.display()));
                return EXIT_FAILURE;
            }
            report(session.fix(&path).await)
        }
        Mode::Analyze(path) => report(session.analyze(&path).await.map(|_| true)),
        Mode::Create(description) => report(session.create(&description, cli.output.as_deref()).await),
        Mode::Inline(code) => exit_code(session.inline(&code).await),
        Mode::Interactive => interactive(session).await,
        Mode::Default => {
            let _ = Cli::command().print_help();
            println!();
            interactive(session).await
        }
    }
}

fn report(result: anyhow::Result<bool>) -> i32 {
    match result {
        Ok(ok) => exit_code(ok),
        Err(e) => {
            render::print_error(format!("{:#}", e));
            EXIT_FAILURE
        }
    }
}

async fn interactive(session: Session) -> i32 {
    let mut repl = Repl::new(session);
    if let Ok(dir) = config_dir() {
        repl = repl.with_history_dir(dir);
    }
    match repl.run().await {
        Ok(code) => code,
        Err(e) => {
            render::print_error(format!("{:#}", e));
            EXIT_FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(true), 0);
        assert_eq!(exit_code(false), 1);
        assert_eq!(report(Err(anyhow::anyhow!("boom"))), EXIT_FAILURE);
        assert_eq!(report(Ok(false)), EXIT_FAILURE);
    }
}
