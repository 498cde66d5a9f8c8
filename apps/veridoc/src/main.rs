mod config;
mod credential;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CredentialStore, DocumentClient, FetchError, RefreshSignal, UploadController, ViewController,
    ViewState,
};
use shared::domain::{format_size, Network};
use shared::protocol::{DocumentDetail, DocumentSummary, UploadReceipt};

use crate::config::load_settings;
use crate::credential::FileCredentialStore;

#[derive(Parser, Debug)]
#[command(name = "veridoc", about = "Blockchain-anchored document verification")]
struct Args {
    /// Base URL of the document API.
    #[arg(long)]
    api_url: Option<String>,
    /// Network to operate on: public or private.
    #[arg(long)]
    network: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the login message the wallet must sign.
    Nonce,
    /// Exchange a wallet signature for a bearer credential.
    Login {
        #[arg(long)]
        signature: String,
    },
    /// Forget the stored credential.
    Logout,
    /// List documents on the selected network.
    List {
        /// Case-insensitive substring filter on document names.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show one document by id or CID.
    Show { key: String },
    /// Check whether a local file is registered on chain.
    Verify { path: PathBuf },
    /// Upload a document for anchoring.
    Upload { path: PathBuf },
    /// Poll the listing and reprint it whenever it changes.
    Watch {
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
}

type Client = DocumentClient<FileCredentialStore>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let settings = load_settings(args.api_url, args.network)?;
    let store = FileCredentialStore::new(settings.credential_path.clone());
    let client = Arc::new(DocumentClient::new(settings.api_base_url.clone(), store));

    match args.command {
        Command::Nonce => {
            let message = client.fetch_login_message().await?;
            println!("{message}");
        }
        Command::Login { signature } => {
            let token = client.login_with_signature(&signature).await?;
            client.credentials().store(&token)?;
            println!("Logged in.");
        }
        Command::Logout => {
            client.credentials().clear()?;
            println!("Logged out.");
        }
        Command::List { filter } => list(&client, settings.network, filter.as_deref()).await?,
        Command::Show { key } => {
            let detail = client.document_detail(&key, settings.network).await?;
            print_detail(&detail);
        }
        Command::Verify { path } => verify(&client, &path).await?,
        Command::Upload { path } => upload(client, settings.network, &path).await?,
        Command::Watch { interval_secs } => {
            watch(client, settings.network, Duration::from_secs(interval_secs)).await?
        }
    }

    Ok(())
}

async fn list(client: &Client, network: Network, filter: Option<&str>) -> Result<()> {
    let page = client.list_documents(network).await?;
    let shown: Vec<&DocumentSummary> = match filter {
        Some(needle) => {
            let needle = needle.to_lowercase();
            page.files
                .iter()
                .filter(|doc| doc.name.to_lowercase().contains(&needle))
                .collect()
        }
        None => page.files.iter().collect(),
    };

    if shown.is_empty() {
        println!("No documents found");
        return Ok(());
    }
    for doc in shown {
        println!(
            "{}  {:>10}  {}  {}",
            doc.created_at.format("%Y-%m-%d %H:%M"),
            format_size(doc.size),
            doc.cid,
            doc.name,
        );
    }
    Ok(())
}

fn print_detail(detail: &DocumentDetail) {
    println!("Name:     {}", detail.name);
    println!("CID:      {}", detail.cid);
    println!("Size:     {}", format_size(detail.size));
    if let Some(issuer) = &detail.issuer {
        println!("Issuer:   {issuer}");
    }
    println!("Created:  {}", detail.created_at.format("%Y-%m-%d %H:%M"));
    println!(
        "Status:   {}",
        if detail.is_valid { "verified" } else { "invalid" }
    );
    println!(
        "Ethereum: {}",
        if detail.is_exist_ethereum {
            "verified"
        } else {
            "not found"
        }
    );
    println!(
        "Base:     {}",
        if detail.is_exist_base {
            "verified"
        } else {
            "waiting"
        }
    );
}

async fn verify(client: &Client, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = file_name(path)?;
    let mime = mime_guess::from_path(path).first_raw();

    match client.verify_file(filename, bytes, mime).await {
        Ok(detail) => {
            println!("Document is registered:");
            print_detail(&detail);
            Ok(())
        }
        Err(FetchError::NotFound) => {
            bail!("this document was not found in our system; it might not be registered")
        }
        Err(err) => Err(err.into()),
    }
}

async fn upload(client: Arc<Client>, network: Network, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = file_name(path)?.to_string();
    let mime = mime_guess::from_path(path).first_raw().map(str::to_string);

    let controller: UploadController<UploadReceipt> = UploadController::new();
    let mut progress = controller.progress();
    let mut states = controller.subscribe();

    let http = Arc::clone(&client);
    controller.run(async move {
        http.upload_document(&filename, bytes, mime.as_deref(), network)
            .await
    });

    loop {
        tokio::select! {
            changed = progress.changed() => {
                if changed.is_ok() {
                    print!("\rUploading... {:>3}%", *progress.borrow_and_update());
                    let _ = std::io::stdout().flush();
                }
            }
            changed = states.changed() => {
                changed.context("upload controller dropped")?;
                let state = states.borrow_and_update().clone();
                match state {
                    ViewState::Success(receipt) => {
                        println!("\nUploaded {} (cid {})", receipt.name, receipt.cid);
                        return Ok(());
                    }
                    ViewState::Error(reason) => {
                        println!();
                        bail!("upload failed: {reason}");
                    }
                    ViewState::Idle | ViewState::Loading => {}
                }
            }
        }
    }
}

async fn watch(client: Arc<Client>, network: Network, interval: Duration) -> Result<()> {
    let signal = RefreshSignal::new();
    let mut listener = signal.subscribe();
    let controller: ViewController<Vec<DocumentSummary>> = ViewController::new();

    let mut states = controller.subscribe();
    let printer = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            match state {
                ViewState::Success(docs) => {
                    println!("--- {} document(s) ---", docs.len());
                    for doc in docs {
                        println!("{}  {}", format_size(doc.size), doc.name);
                    }
                }
                ViewState::Error(reason) => println!("refresh failed: {reason}"),
                ViewState::Idle | ViewState::Loading => {}
            }
        }
    });

    let fetcher = controller.clone();
    let consumer = tokio::spawn(async move {
        while listener.changed().await {
            let http = Arc::clone(&client);
            fetcher.run(async move {
                let page = http.list_documents(network).await?;
                Ok(page.files)
            });
        }
    });

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => signal.pulse(),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Dropping the last signal handle ends the consumer; dropping the
    // controller afterwards ends the printer.
    drop(signal);
    consumer.await.context("refresh consumer failed")?;
    drop(controller);
    printer.await.context("printer task failed")?;
    Ok(())
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))
}
