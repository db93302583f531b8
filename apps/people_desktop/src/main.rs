use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    DataService, PeopleController, PeopleModel, TextBundle, TextProvider,
};
use storage::Storage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod console;

use commands::{ReplCommand, HELP};
use config::{load_settings, prepare_database_url};
use console::{format_person, ConsoleNotifier, ConsolePane};

#[derive(Parser, Debug)]
#[command(about = "Master-detail editor for the People collection")]
struct Args {
    /// Config file, `people.toml` when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    /// Text bundle overriding the built-in English texts.
    #[arg(long)]
    texts: Option<PathBuf>,
    /// Reads commands from a file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }
    if let Some(texts) = args.texts {
        settings.texts_path = Some(texts);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    if storage.count_people().await? == 0 {
        info!("empty data source, seeding sample people");
        storage.reset_data_source().await?;
    }

    let texts: Arc<dyn TextProvider> = match &settings.texts_path {
        Some(path) => Arc::new(TextBundle::load(path)?),
        None => Arc::new(TextBundle::default()),
    };

    let model = PeopleModel::open(storage.clone(), settings.batch_group_id.clone()).await?;
    let notifier = Arc::new(ConsoleNotifier::default());
    let pane = Arc::new(ConsolePane);
    let controller = PeopleController::new(
        model,
        texts,
        notifier.clone(),
        settings.controller_settings(),
    );
    controller.attach_detail_pane(pane);
    let dedup = controller.start();
    info!(%database_url, group = %settings.batch_group_id, "people editor ready");

    let echo = args.script.is_some();
    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open script '{}'", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    print_rows(controller.data().as_ref());
    run_session(&controller, &notifier, input, echo).await?;

    dedup.abort();
    storage.close().await;
    Ok(())
}

async fn run_session(
    controller: &PeopleController,
    notifier: &ConsoleNotifier,
    input: Box<dyn AsyncBufRead + Unpin + Send>,
    echo: bool,
) -> Result<()> {
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if echo {
            println!("> {line}");
        }

        let command = match line.parse::<ReplCommand>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::List => print_rows(controller.data().as_ref()),
            ReplCommand::State => println!("{}", serde_json::to_string(&controller.ui_state())?),
            ReplCommand::Dismiss => {
                let closed = notifier.dismiss();
                if closed == 0 {
                    println!("nothing to dismiss");
                }
            }
            ReplCommand::View(command) => {
                let rows: Vec<_> = controller
                    .data()
                    .contexts()
                    .iter()
                    .map(|ctx| ctx.id())
                    .collect();
                let detail = controller.selection().detail_context().map(|ctx| ctx.id());
                match command.into_event(&rows, detail) {
                    Ok(event) => controller.handle(event).await,
                    Err(err) => println!("{err}"),
                }
            }
        }

        // Lets spawned deletes and the message follower observe the outcome.
        tokio::task::yield_now().await;
    }
    Ok(())
}

fn print_rows(data: &dyn DataService) {
    let rows = data.contexts();
    if rows.is_empty() {
        println!("(no people)");
        return;
    }
    for (index, ctx) in rows.iter().enumerate() {
        let marker = if ctx.is_deleted() { '-' } else { ' ' };
        println!("{:>3}{marker} {}", index + 1, format_person(ctx.as_ref()));
    }
}
