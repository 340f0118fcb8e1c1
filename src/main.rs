mod config;
mod conversation;
mod error;
mod logging;
mod output;
mod prompt;
mod providers;
mod session;

use clap::Parser;
use config::Config;
use error::AishError;
use session::Session;
use std::io;
use std::process::ExitCode;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "aish")]
#[command(version)]
#[command(about = "A shell where every command is answered by an LLM", long_about = None)]
struct Cli {
    /// Run this command once instead of starting an interactive session
    #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,

    /// Wait for the whole reply instead of streaming it
    #[arg(long)]
    no_stream: bool,
}

impl Cli {
    fn apply(&self, mut config: Config) -> Config {
        if !self.command.is_empty() {
            config.command = Some(self.command.join(" "));
        }
        if self.no_stream {
            config.stream = false;
        }
        config
    }
}

fn report(error: &AishError) {
    tracing::error!(error = %error, "session end");
    eprintln!("Error: {}", error);
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => cli.apply(c),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.log_file.as_deref());
    tracing::info!(
        user = %config.username,
        host = %config.hostname,
        model = %config.model,
        "new session"
    );

    let provider = providers::create_provider(&config);
    let mut session = Session::new(provider, &config);
    let mut stdout = io::stdout();

    if let Some(command) = &config.command {
        return match session.run_one_shot(command, &mut stdout).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report(&e);
                ExitCode::FAILURE
            }
        };
    }

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let input = BufReader::new(tokio::io::stdin());
    let code = match session.run_interactive(input, &mut stdout, interrupt).await {
        Ok(_) => 0,
        Err(e) => {
            report(&e);
            1
        }
    };
    tracing::debug!(
        messages = session.conversation().messages().len(),
        "conversation closed"
    );

    // tokio's stdin reader sits on a blocking thread that would keep the
    // runtime from shutting down
    std::process::exit(code);
}
