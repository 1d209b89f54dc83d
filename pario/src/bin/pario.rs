use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pario::{
    npy, CartesianTopology, Decomposer, Decomposition, DynamicArray, LinearTopology, ProcessGroup,
    ThreadComm, Topology,
};
use serde_json::json;

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(about = "pario - Decompose arrays across workers and load them collectively")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every worker's brick of a domain
    Decompose {
        /// Global shape (format: 8,4,4)
        #[arg(long, value_delimiter = ',', required = true)]
        shape: Vec<usize>,

        #[command(flatten)]
        workers: WorkerArgs,
    },
    /// Show the header of an array file
    Head {
        /// Path to the .npy file
        file: PathBuf,
    },
    /// Load an array file with a group of in-process workers
    Load {
        /// Path to the .npy file
        file: PathBuf,

        #[command(flatten)]
        workers: WorkerArgs,

        /// Include every worker's loaded elements in the report
        #[arg(long)]
        data: bool,
    },
}

#[derive(clap::Args)]
struct WorkerArgs {
    /// Number of workers
    #[arg(long, env = "PARIO_WORKERS", default_value_t = 1)]
    workers: usize,

    /// Arrange workers in a Cartesian grid of this many axes (slab split if omitted)
    #[arg(long, env = "PARIO_GRID_DIMS")]
    grid_dims: Option<usize>,
}

impl WorkerArgs {
    fn topology(&self, rank: usize) -> pario::Result<Topology> {
        Ok(match self.grid_dims {
            Some(ndims) => CartesianTopology::new(self.workers, rank, ndims)?.into(),
            None => LinearTopology::new(self.workers, rank)?.into(),
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("pario=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start_time = std::time::Instant::now();

    match &cli.command {
        Commands::Decompose { shape, workers } => handle_decompose(shape, workers)?,
        Commands::Head { file } => handle_head(file)?,
        Commands::Load {
            file,
            workers,
            data,
        } => handle_load(file, workers, *data)?,
    }

    tracing::info!(elapsed = ?start_time.elapsed(), "done");
    Ok(())
}

fn handle_decompose(shape: &[usize], args: &WorkerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut ranks = Vec::with_capacity(args.workers);
    for rank in 0..args.workers {
        let topology = args.topology(rank)?;
        let decomposition = Decomposer::for_topology(&topology)?.decompose(shape)?;
        let coords = topology.as_cartesian().map(|cart| cart.coords().to_vec());
        ranks.push(json!({
            "rank": rank,
            "coords": coords,
            "decomposition": decomposition,
        }));
    }
    println!("{}", serde_json::to_string_pretty(&ranks)?);
    Ok(())
}

fn handle_head(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let header = npy::head(file)?;
    println!("{}", serde_json::to_string_pretty(&header)?);
    Ok(())
}

fn handle_load(
    file: &Path,
    args: &WorkerArgs,
    with_data: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid_dims = args.grid_dims;
    let results = ThreadComm::run(args.workers, |comm| -> pario::Result<DynamicArray> {
        let comm = Arc::new(comm);
        let group = match grid_dims {
            Some(ndims) => ProcessGroup::cartesian(comm, ndims)?,
            None => ProcessGroup::linear(comm)?,
        };
        let array = npy::load_dynamic(file, &group)?;
        tracing::debug!(rank = group.rank(), elements = array.len(), "loaded brick");
        Ok(array)
    })?;

    let arrays = results.into_iter().collect::<pario::Result<Vec<_>>>()?;
    let bricks: Vec<Decomposition> = arrays.iter().map(|a| a.decomposition().clone()).collect();
    let mut ranks = Vec::with_capacity(arrays.len());
    for (rank, (d, array)) in bricks.iter().zip(&arrays).enumerate() {
        let mut entry = json!({
            "rank": rank,
            "elements": d.local_len(),
            "starts": d.starts,
            "subsizes": d.subsizes,
        });
        if with_data {
            entry["array"] = serde_json::to_value(array)?;
        }
        ranks.push(entry);
    }
    let report = json!({
        "global_shape": bricks.first().map(|d| d.sizes.clone()),
        "element_type": arrays.first().map(|a| a.element_type()),
        "tiled": tiles_exactly(&bricks),
        "ranks": ranks,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Bricks are pairwise disjoint and their volumes add up to the global array
fn tiles_exactly(bricks: &[Decomposition]) -> bool {
    let Some(first) = bricks.first() else {
        return false;
    };
    let total: usize = bricks.iter().map(Decomposition::local_len).sum();
    let disjoint = bricks.iter().enumerate().all(|(i, a)| {
        bricks[i + 1..].iter().all(|b| {
            (0..a.rank()).any(|axis| {
                a.starts[axis] + a.subsizes[axis] <= b.starts[axis]
                    || b.starts[axis] + b.subsizes[axis] <= a.starts[axis]
            })
        })
    });
    total == first.global_len() && disjoint
}
