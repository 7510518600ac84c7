//! courier-fleet CLI - fleet identity & artifact distribution engine

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use courier_fleet::activation::ActivationLedger;
use courier_fleet::convergence::plan_fleet;
use courier_fleet::package::{build, Manifest, PackageFile, PackageSpec};
use courier_fleet::publish::{publish_release, Release};
use courier_fleet::store::DirStore;
use courier_fleet::{Error, FleetConfig};

#[derive(Parser)]
#[command(name = "courier-fleet")]
#[command(about = "fleet identity & artifact distribution engine")]
#[command(version)]
struct Cli {
    /// fleet inventory file
    #[arg(short, long, env = "COURIER_FLEET_CONFIG", default_value = "fleet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// resolve the inventory and print the identity table
    Validate,

    /// plan the convergence pass and print a per-node summary
    Plan {
        /// activation ledger file
        #[arg(long, default_value = "activations.toml")]
        ledger: PathBuf,
    },

    /// build one package version and publish its release
    Package {
        /// package version to build
        #[arg(short, long)]
        version: String,

        /// files to bundle, as <s3://bucket/key>=<local-name> pairs
        #[arg(short, long, required = true)]
        file: Vec<String>,

        /// root directory of the local object store
        #[arg(long)]
        store: PathBuf,

        /// staging area for package builds
        #[arg(long, default_value = "staging")]
        staging: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> courier_fleet::Result<()> {
    let config = FleetConfig::load(&cli.config)?;

    match cli.command {
        Commands::Validate => {
            let resolved = config.resolver().resolve_fleet(&config.nodes)?;
            for identity in resolved {
                println!(
                    "{}\t{}\t{}",
                    identity.immutable_id, identity.resource_name, identity.alias
                );
            }
        }

        Commands::Plan { ledger } => {
            let ledger = ActivationLedger::load(&ledger)?;
            let plans = plan_fleet(
                &config.resolver(),
                &config.nodes,
                &config.context(),
                &ledger,
            )?;
            for plan in plans {
                println!(
                    "{}: {} declarations, {} policies{}",
                    plan.resolved.immutable_id,
                    plan.declarations.len(),
                    plan.policies.len(),
                    if plan.needs_activation_script {
                        ", needs activation"
                    } else {
                        ""
                    }
                );
            }
        }

        Commands::Package {
            version,
            file,
            store,
            staging,
        } => {
            let files = file
                .iter()
                .map(|pair| parse_file_pair(pair))
                .collect::<courier_fleet::Result<Vec<_>>>()?;

            let mut store = DirStore::new(store);
            let spec = PackageSpec::new(version, config.deployment.region.clone(), files);
            let built = build(&spec, &store, &staging)?;
            let manifest = Manifest::for_package(&built);
            let release = Release::stage(&built, &manifest, &config.deployment.packages_bucket)?;
            let outcome = publish_release(&mut store, &release)?;

            println!("{}\t{}", built.archive_name, built.digest);
            println!("archive: {:?}, manifest: {:?}", outcome.archive, outcome.manifest);
        }
    }

    Ok(())
}

/// split a `<s3://bucket/key>=<local-name>` argument
fn parse_file_pair(pair: &str) -> courier_fleet::Result<PackageFile> {
    let (source, local_name) = pair
        .rsplit_once('=')
        .ok_or_else(|| Error::UnsupportedSource(pair.to_string()))?;
    Ok(PackageFile::new(source, local_name))
}
