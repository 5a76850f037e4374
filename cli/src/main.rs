use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use product_cli::Shell;
use product_core::{
    ClientConfig, DeleteState, Field, HttpTransport, ProductApp, ProductForm, DEFAULT_BASE_URL,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "product-cli")]
#[command(about = "Browse and edit the product catalogue", long_about = None)]
struct Cli {
    /// Base URL of the product API
    #[arg(long, env = "PRODUCT_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Automatic retries for a failed read
    #[arg(long, default_value_t = 1)]
    retry: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all products
    List,
    /// Show one product
    Show { id: String },
    /// Open a view by path, e.g. /product/3
    Open { path: String },
    /// Create a product
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: String,
    },
    /// Edit a product; omitted fields keep their current value
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
    },
    /// Delete a product
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Interactive shell (the default)
    Shell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ClientConfig {
        base_url: cli.api_url.clone(),
        retry: cli.retry,
        timeout_secs: cli.timeout_secs,
        ..ClientConfig::default()
    };
    let app = ProductApp::new(&config, HttpTransport::new(config.timeout()));
    let mut shell = Shell::new(app);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::List => shell.open("/", &mut out)?,
        Commands::Show { id } => shell.open(&format!("/product/{id}"), &mut out)?,
        Commands::Open { path } => shell.open(&path, &mut out)?,
        Commands::Add {
            name,
            description,
            price,
        } => {
            shell.open("/add", &mut out)?;
            let mut form = ProductForm::create();
            form.set_field(Field::ProductName, &name);
            form.set_field(Field::ProductDescription, &description);
            form.set_field(Field::Price, &price);
            if !shell.submit_form(&mut form, &mut out)? {
                bail!("product was not created");
            }
        }
        Commands::Edit {
            id,
            name,
            description,
            price,
        } => {
            shell.open(&format!("/edit/{id}"), &mut out)?;
            let Some(mut form) = shell.open_form() else {
                bail!("product {id} could not be loaded");
            };
            for (field, value) in [
                (Field::ProductName, name),
                (Field::ProductDescription, description),
                (Field::Price, price),
            ] {
                if let Some(value) = value {
                    form.set_field(field, &value);
                }
            }
            if !shell.submit_form(&mut form, &mut out)? {
                bail!("product {id} was not updated");
            }
        }
        Commands::Delete { id, yes } => {
            shell.open("/", &mut out)?;
            if !shell.request_delete(&id, &mut out)? {
                bail!("product {id} was not deleted");
            }
            let confirmed = yes || read_confirmation(&mut out)?;
            shell.answer_delete(confirmed, &mut out)?;
            if confirmed && shell.delete_state() != &DeleteState::Idle {
                bail!("product {id} was not deleted");
            }
        }
        Commands::Shell => shell.run(io::stdin().lock(), &mut out)?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn read_confirmation(out: &mut impl Write) -> Result<bool> {
    write!(out, "> ")?;
    out.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "yes" | "y"))
}
