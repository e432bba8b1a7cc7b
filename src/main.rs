//! CLI entry point for `orderpdf`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use orderpdf::config::{self, Config};
use orderpdf::mailbox::imap::ImapConnector;
use orderpdf::mailbox::mbox::MboxConnector;
use orderpdf::mailbox::MailboxConnector;
use orderpdf::model::document::PDF_CONTENT_TYPE;
use orderpdf::model::metadata::MetadataField;
use orderpdf::model::request::RetrievalRequest;
use orderpdf::pipeline::{self, Pipeline, PipelineOutput};
use orderpdf::upload::{self, DirectoryUploader, Uploader};

#[derive(Parser)]
#[command(
    name = "orderpdf",
    version,
    about = "Assemble an order email and its attachments into a single PDF"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the order message from an IMAP server
    Fetch {
        /// IMAP host (defaults to [mailbox].host)
        #[arg(long)]
        host: Option<String>,
        /// IMAP port (defaults to [mailbox].port)
        #[arg(long)]
        port: Option<u16>,
        /// Login name (defaults to [mailbox].user)
        #[arg(long)]
        user: Option<String>,
        /// Login password
        #[arg(long, env = "ORDERPDF_PASSWORD", hide_env_values = true)]
        password: String,
        /// Use STARTTLS instead of implicit TLS
        #[arg(long)]
        starttls: bool,
        /// Mailbox to search (defaults to [mailbox].mailbox)
        #[arg(long)]
        mailbox: Option<String>,
        #[command(flatten)]
        job: JobArgs,
    },
    /// Read the order message from a local MBOX file
    Mbox {
        path: PathBuf,
        #[command(flatten)]
        job: JobArgs,
    },
    /// Assemble a single .eml message file
    Eml {
        path: PathBuf,
        #[command(flatten)]
        job: JobArgs,
    },
    /// Write the current configuration to the config file
    InitConfig,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args)]
struct JobArgs {
    /// Order id to look for in message subjects
    #[arg(short, long = "order")]
    order_id: String,

    /// Extra metadata field, overriding the body (repeatable)
    #[arg(short, long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    fields: Vec<MetadataField>,

    /// Output directory (defaults to [output].directory)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the PDF to this exact file instead of the output directory
    #[arg(long, conflicts_with = "output")]
    file: Option<PathBuf>,
}

fn parse_field(s: &str) -> Result<MetadataField, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("field key must not be empty".into());
    }
    Ok(MetadataField::new(key, value.trim()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Fetch {
            host,
            port,
            user,
            password,
            starttls,
            mailbox,
            job,
        } => {
            let defaults = &config.mailbox;
            let host = host.unwrap_or_else(|| defaults.host.clone());
            if host.is_empty() {
                anyhow::bail!("No IMAP host given (use --host or set [mailbox].host)");
            }
            let mut request = RetrievalRequest::new(
                user.unwrap_or_else(|| defaults.user.clone()),
                password,
                host,
                port.unwrap_or(defaults.port),
                job.order_id.clone(),
            );
            request.use_tls = defaults.tls && !starttls;
            request.mailbox = mailbox.unwrap_or_else(|| defaults.mailbox.clone());
            request.metadata_fields = job.fields.clone();
            cmd_retrieve(ImapConnector, &request, &job, &config)
        }
        Commands::Mbox { path, job } => {
            if !path.exists() {
                anyhow::bail!("File not found: {}", path.display());
            }
            let mut request = RetrievalRequest::new("", "", path.display().to_string(), 0, job.order_id.clone());
            request.metadata_fields = job.fields.clone();
            cmd_retrieve(MboxConnector::new(&path), &request, &job, &config)
        }
        Commands::Eml { path, job } => cmd_eml(&path, &job, &config),
        Commands::InitConfig => cmd_init_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "orderpdf.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} ({elapsed})")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Retrieve through `connector`, assemble, and store the result.
fn cmd_retrieve<C: MailboxConnector>(
    connector: C,
    request: &RetrievalRequest,
    job: &JobArgs,
    config: &Config,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(connector, config.layout.clone());
    let pb = spinner(&format!("Assembling order {}", request.order_id));
    let result = pipeline.run(request);
    pb.finish_and_clear();
    store_and_report(result?, &request.order_id, job, config)
}

fn cmd_eml(path: &std::path::Path, job: &JobArgs, config: &Config) -> anyhow::Result<()> {
    let raw = orderpdf::parser::eml::read_eml(path)?;
    let pb = spinner(&format!("Assembling order {}", job.order_id));
    let result = pipeline::assemble_message(&raw, &job.order_id, &job.fields, &config.layout);
    pb.finish_and_clear();
    store_and_report(result?, &job.order_id, job, config)
}

/// Store the PDF and print the manifest as JSON.
fn store_and_report(
    output: PipelineOutput,
    order_id: &str,
    job: &JobArgs,
    config: &Config,
) -> anyhow::Result<()> {
    let bytes = &output.document.bytes;
    let location = if let Some(file) = &job.file {
        std::fs::write(file, bytes).with_context(|| format!("writing {}", file.display()))?;
        file.display().to_string()
    } else {
        let root = job.output.as_ref().unwrap_or(&config.output.directory);
        let key = upload::document_key(&config.output.key_prefix, order_id, chrono::Utc::now());
        DirectoryUploader::new(root).put(bytes, &key, PDF_CONTENT_TYPE)?
    };

    let report = serde_json::json!({
        "orderId": order_id,
        "location": location,
        "contentType": PDF_CONTENT_TYPE,
        "size": bytes.len(),
        "manifest": output.manifest,
        "pages": output.document.pages,
        "failures": output.document.failures,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_init_config(config: &Config) -> anyhow::Result<()> {
    config::save_config(config)?;
    if let Some(path) = config::config_file_path() {
        println!("  Wrote {}", path.display());
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "orderpdf", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
