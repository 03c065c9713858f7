//! CLI entrypoint. Loads config, wires both pipelines into a
//! `relay_utils::Supervisor` and maps its outcome onto an exit code
//! (0 clean, 1 logical, 2 restart budget exhausted, 3 fatal).

mod config;
mod workers;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rbtag::{BuildDateInfo, BuildInfo, CrateInfo};
use relay_ethereum_client::EthereumConnection;
use relay_substrate_client::SubstrateConnection;
use relay_utils::{RelayError, Supervisor, Worker};
use sp_core::{sr25519, Pair};

use crate::config::Config;
use crate::workers::{AppRouting, BeefyWorker, EthToParaWorker};
use beefy_relay::{EthLightClientConnection, ParachainConnection, RelayChainConnection};

#[derive(BuildDateInfo, BuildInfo, CrateInfo)]
struct VersionInfo;

#[derive(Parser)]
#[command(name = "relay", about = "Bidirectional Ethereum <-> parachain bridge relayer")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Run every worker: the Ethereum -> parachain pipeline and the BEEFY
	/// catch-up engine.
	Run {
		#[arg(long)]
		config: std::path::PathBuf,
	},
	/// Run the BEEFY catch-up engine only.
	SubBeefy {
		#[arg(long)]
		config: std::path::PathBuf,
	},
	/// Print the build's version banner and exit.
	Version,
}

fn main() -> ExitCode {
	env_logger::init();
	let cli = Cli::parse();

	match cli.command {
		Command::Version => {
			print_version();
			ExitCode::from(0)
		}
		Command::Run { config } => run(config, true, true),
		Command::SubBeefy { config } => run(config, false, true),
	}
}

fn print_version() {
	let info = VersionInfo;
	println!(
		"{} {} ({}, built {} with {})",
		info.get_crate_name(),
		info.get_crate_version(),
		info.get_build_target(),
		info.get_build_date(),
		info.get_build_rust(),
	);
}

fn run(config_path: std::path::PathBuf, with_eth_to_para: bool, with_beefy: bool) -> ExitCode {
	let outcome = async_std::task::block_on(run_inner(config_path, with_eth_to_para, with_beefy));
	match outcome {
		Ok(()) => ExitCode::from(0),
		Err(err) => {
			log::error!(target: "relay", "exiting: {err}");
			exit_code_for(&err)
		}
	}
}

fn exit_code_for(err: &RelayError) -> ExitCode {
	match err {
		RelayError::Logical { .. } => ExitCode::from(1),
		RelayError::RestartBudgetExhausted { .. } | RelayError::Transient { .. } => ExitCode::from(2),
		RelayError::Fatal { .. } | RelayError::Signal(_) => ExitCode::from(3),
	}
}

async fn run_inner(
	config_path: std::path::PathBuf,
	with_eth_to_para: bool,
	with_beefy: bool,
) -> Result<(), RelayError> {
	let config = Config::load(&config_path)
		.map_err(|err| RelayError::fatal("config", format!("failed to load {}: {err}", config_path.display())))?;

	let mut supervisor = Supervisor::new(config.supervisor.max_restarts);

	if with_eth_to_para {
		register_eth_to_para(&mut supervisor, &config).await?;
	}
	if with_beefy {
		register_beefy(&mut supervisor, &config).await?;
	}

	supervisor.run().await
}

async fn register_eth_to_para(supervisor: &mut Supervisor, config: &Config) -> Result<(), RelayError> {
	let eth = Arc::new(
		EthereumConnection::connect(&config.ethereum.endpoint)
			.await
			.map_err(|err| RelayError::fatal("ethereum connect", err))?,
	);
	let substrate = Arc::new(
		SubstrateConnection::connect(&config.parachain.endpoint)
			.await
			.map_err(|err| RelayError::fatal("parachain connect", err))?,
	);

	let private_key = config
		.parachain
		.private_key
		.as_deref()
		.ok_or_else(|| RelayError::fatal("parachain signer", "parachain.private_key is not configured"))?;
	let signer = sr25519::Pair::from_string(private_key, None)
		.map_err(|err| RelayError::fatal("parachain signer", format!("{err:?}")))?;

	let indices = config.pallets.into();

	let basic_inbound = config
		.ethereum
		.channels
		.basic
		.inbound_address()
		.map_err(|err| RelayError::fatal("channel config", err))?
		.to_fixed_bytes();
	let incentivized_inbound = config
		.ethereum
		.channels
		.incentivized
		.inbound_address()
		.map_err(|err| RelayError::fatal("channel config", err))?
		.to_fixed_bytes();
	let routing = Arc::new(AppRouting::new(basic_inbound, incentivized_inbound));

	let descendants_until_final = config.ethereum.descendants_until_final;
	let chunk_size = config.ethereum.chunk_size;
	let start_height = config.ethereum.start_height;

	let factory: relay_utils::WorkerFactory = Box::new(move || {
		Ok(Box::new(EthToParaWorker::new(
			eth.clone(),
			substrate.clone(),
			descendants_until_final,
			chunk_size,
			start_height,
			signer.clone(),
			indices,
			routing.clone(),
		)) as Box<dyn Worker>)
	});
	supervisor.register("eth-to-para", factory);
	Ok(())
}

async fn register_beefy(supervisor: &mut Supervisor, config: &Config) -> Result<(), RelayError> {
	let parachain = Arc::new(
		ParachainConnection::connect(&config.parachain.endpoint)
			.await
			.map_err(|err| RelayError::fatal("parachain connect", err))?,
	);
	let relay_chain = Arc::new(
		RelayChainConnection::connect(
			&config.relaychain.endpoint,
			config.parachain.para_id,
			config.parachain.sibling_para_ids.clone(),
		)
		.await
		.map_err(|err| RelayError::fatal("relay chain connect", err))?,
	);

	let light_client = &config.beefy.light_client;
	let basic_nonce = light_client
		.nonce_call(&config.ethereum.channels.basic)
		.map_err(|err| RelayError::fatal("light client config", err))?;
	let incentivized_nonce = light_client
		.nonce_call(&config.ethereum.channels.incentivized)
		.map_err(|err| RelayError::fatal("light client config", err))?;
	let latest_beefy_block = light_client
		.latest_beefy_block_call()
		.map_err(|err| RelayError::fatal("light client config", err))?;
	let eth = Arc::new(
		EthLightClientConnection::connect(
			&config.ethereum.endpoint,
			basic_nonce,
			incentivized_nonce,
			latest_beefy_block,
		)
		.await
		.map_err(|err| RelayError::fatal("eth light client connect", err))?,
	);

	let poll_interval = config.beefy.poll_interval();
	// Submitting these packages to Ethereum is the out-of-core submitter's
	// job; this process just logs each one it
	// would have handed off, so the channel still needs a live reader.
	let (sink, packages) = async_std::channel::bounded(16);
	async_std::task::spawn(async move {
		while let Ok(package) = packages.recv().await {
			log::info!(
				target: "relay",
				"beefy: package ready for channel {:?}, commitment {:?}",
				package.channel_id,
				package.commitment_hash,
			);
		}
	});

	let factory: relay_utils::WorkerFactory = Box::new(move || {
		Ok(Box::new(BeefyWorker::new(
			parachain.clone(),
			relay_chain.clone(),
			eth.clone(),
			poll_interval,
			sink.clone(),
		)) as Box<dyn Worker>)
	});
	supervisor.register("beefy", factory);
	Ok(())
}
