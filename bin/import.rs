use accident_ingest::template::write_template;
use accident_ingest::validate::is_required_column;
use accident_ingest::{
    parse_preview, ClientConfig, HttpSubmitter, ImportController, ImportState, SelectedFile,
    PREVIEW_LIMIT, REQUIRED_COLUMNS,
};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accident_ingest=info,accident_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path_arg = || {
        Arg::new("path")
            .required(true)
            .value_parser(clap::value_parser!(PathBuf))
    };
    let charset_arg = || {
        Arg::new("charset")
            .long("charset")
            .help("Character encoding of the file, e.g. windows-1252 (default: utf-8)")
    };

    let matches = Command::new("accident-import")
        .about("Preview, validate and upload accident CSV files")
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .help("Backend API base URL (overrides ACCIDENTS_API_URL)"),
        )
        .subcommand(
            Command::new("preview")
                .about("Show the header, the first rows and any missing columns")
                .arg(path_arg())
                .arg(charset_arg())
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                ),
        )
        .subcommand(
            Command::new("upload")
                .about("Validate the file, then send it to the ingestion endpoint")
                .arg(path_arg())
                .arg(charset_arg()),
        )
        .subcommand(
            Command::new("template")
                .about("Write accidents_template.csv")
                .arg(
                    Arg::new("dir")
                        .long("dir")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("."),
                ),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("preview", sub)) => preview(sub).await,
        Some(("upload", sub)) => upload(sub).await,
        Some(("template", sub)) => {
            let dir = sub.get_one::<PathBuf>("dir").cloned().unwrap_or_default();
            let path = write_template(&dir)
                .await
                .with_context(|| format!("writing template into {}", dir.display()))?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

async fn selected_file(sub: &ArgMatches) -> anyhow::Result<SelectedFile> {
    let path = sub
        .get_one::<PathBuf>("path")
        .context("missing file path")?;
    let mut file = SelectedFile::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    if let Some(label) = sub.get_one::<String>("charset") {
        let charset = encoding_rs::Encoding::for_label(label.as_bytes())
            .with_context(|| format!("unknown charset {label}"))?;
        file = file.with_charset(charset);
    }
    Ok(file)
}

async fn preview(sub: &ArgMatches) -> anyhow::Result<ExitCode> {
    let file = selected_file(sub).await?;
    let limit = sub.get_one::<usize>("limit").copied().unwrap_or(PREVIEW_LIMIT);
    let preview = parse_preview(&file, limit).await?;

    let header: Vec<String> = preview
        .header
        .iter()
        .map(|h| if is_required_column(h) { format!("{h}*") } else { h.clone() })
        .collect();
    println!("{}", header.join(" | "));
    for row in &preview.rows {
        let cells: Vec<&str> = preview
            .header
            .iter()
            .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
            .collect();
        println!("{}", cells.join(" | "));
    }

    let missing = accident_ingest::missing_columns(&preview.header, &REQUIRED_COLUMNS);
    if missing.is_empty() {
        println!("all required columns present");
        Ok(ExitCode::SUCCESS)
    } else {
        let missing: Vec<String> = missing.into_iter().collect();
        println!("Missing required columns: {}", missing.join(", "));
        Ok(ExitCode::FAILURE)
    }
}

async fn upload(sub: &ArgMatches) -> anyhow::Result<ExitCode> {
    // global flags are propagated into the subcommand's matches
    let mut config = ClientConfig::from_env();
    if let Some(url) = sub.get_one::<String>("api-url") {
        config = config.with_api_url(url);
    }
    let quiet = sub.get_flag("quiet");

    let submitter = HttpSubmitter::new(&config).context("building HTTP client")?;
    let controller = ImportController::new(submitter);

    let file = selected_file(sub).await?;
    let state = controller.open(file).await?;
    if state != ImportState::Valid {
        let session = controller.session();
        eprintln!(
            "{}",
            session.error_message().unwrap_or("file cannot be imported")
        );
        return Ok(ExitCode::FAILURE);
    }

    match controller.submit().await {
        Ok(receipt) => {
            if !quiet {
                println!("Successfully uploaded {} accidents", receipt.row_count);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
