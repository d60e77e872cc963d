use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ostack_config::Config;
use ostack_services::{
    ComputeClient, ImageClient, NetworkClient, ObjectStorageClient, VolumeClient,
    image::ImageQuery, object_storage::ObjectQuery,
};
use ostack_session::{Session, Transport};
use std::{path::PathBuf, sync::Arc};

#[derive(Parser, Debug)]
#[command(name = "ostack", about = "ostack: a small OpenStack API client")]
struct Cli {
    /// Path to a YAML configuration file. `OS_*` environment variables override it.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Log every request and response (secrets redacted).
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authenticate and print the issued token.
    Token,
    /// Print the service catalog.
    Catalog,
    /// List compute servers.
    Servers {
        /// Include status and addresses.
        #[arg(long)]
        detail: bool,
    },
    /// List networks.
    Networks,
    /// List images.
    Images {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// List block storage volumes.
    Volumes,
    /// List object storage containers, or the objects of one container.
    Containers {
        /// Container whose objects to list.
        container: Option<String>,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = Config::load(cli.config.as_deref()).context("config error")?;
    if cli.debug {
        config.debug = true;
    }
    let session = open_session(&config)?;
    let region = config.region();
    let interface = config.interface;

    match cli.command {
        Commands::Token => cmd_token(&session).await,
        Commands::Catalog => cmd_catalog(&session).await,
        Commands::Servers { detail } => {
            let compute = ComputeClient::from_catalog(session, region, interface).await?;
            if detail {
                for s in compute.servers_detail().await? {
                    println!(
                        "{}\t{}\t{}",
                        s.id,
                        s.name,
                        s.status.as_deref().unwrap_or("-")
                    );
                }
            } else {
                for s in compute.servers().await? {
                    println!("{}\t{}", s.id, s.name);
                }
            }
            Ok(())
        }
        Commands::Networks => {
            let network = NetworkClient::from_catalog(session, region, interface).await?;
            for n in network.networks(&[]).await? {
                println!("{}\t{}\t{}", n.id, n.name, n.status);
            }
            Ok(())
        }
        Commands::Images {
            name,
            status,
            limit,
        } => {
            let image = ImageClient::from_catalog(session, region, interface).await?;
            let query = ImageQuery {
                name,
                status,
                limit,
                ..ImageQuery::default()
            };
            for i in image.query_images(&query).await? {
                println!("{}\t{}\t{}", i.id, i.name.as_deref().unwrap_or("-"), i.size);
            }
            Ok(())
        }
        Commands::Volumes => {
            let volume = VolumeClient::from_catalog(session, region, interface).await?;
            for v in volume.volumes().await? {
                println!("{}\t{}", v.id, v.name.as_deref().unwrap_or("-"));
            }
            Ok(())
        }
        Commands::Containers { container, limit } => {
            let storage = ObjectStorageClient::from_catalog(session, region, interface).await?;
            match container {
                Some(container) => {
                    let query = ObjectQuery {
                        limit,
                        ..ObjectQuery::default()
                    };
                    for o in storage.list_objects(&container, &query).await? {
                        let name = o.name.or(o.subdir).unwrap_or_default();
                        println!("{name}\t{}", o.bytes);
                    }
                }
                None => {
                    for c in storage.list_containers(limit, None).await? {
                        println!("{}\t{}\t{}", c.name, c.count, c.bytes);
                    }
                }
            }
            Ok(())
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "ostack=debug,ostack_session=debug,ostack_auth=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn open_session(config: &Config) -> Result<Arc<Session>> {
    let transport = Transport::from_config(config).context("transport setup failed")?;
    let provider = ostack_auth::from_config(config, transport.clone())
        .context("no usable credentials configured")?;
    let session = Session::from_config(config, Some(provider))?;
    Ok(Arc::new(session))
}

async fn cmd_token(session: &Session) -> Result<()> {
    let credential = session
        .authenticate()
        .await
        .context("authentication failed")?;
    println!("id\t{}", credential.id());
    println!("expires\t{}", credential.expires_at().to_rfc3339());
    if let Some(project) = credential.project() {
        println!(
            "project\t{} ({})",
            project.name.as_deref().unwrap_or("-"),
            project.id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_catalog(session: &Session) -> Result<()> {
    session.authenticate().await.context("authentication failed")?;
    let Some(catalog) = session.catalog() else {
        anyhow::bail!("identity service returned no catalog");
    };
    for service in catalog.services() {
        for endpoint in &service.endpoints {
            println!(
                "{}\t{}\t{}\t{}",
                service.service_type,
                service.name,
                endpoint.region.as_deref().unwrap_or("-"),
                endpoint.public_url.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}
