use clap::Parser;
use shop_thumbs::api::ApiClient;
use shop_thumbs::cli::Args;
use shop_thumbs::config::{Config, StrategyConfig};
use shop_thumbs::driver::{run, RunCounters, RunOptions};
use shop_thumbs::error::Result;
use shop_thumbs::publisher::Publisher;
use shop_thumbs::resolver::{probe_client, Resolver, Strategy};
use shop_thumbs::store::S3Store;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    match execute(&args) {
        Ok(counters) => ExitCode::from(counters.exit_code()),
        Err(err) => {
            eprintln!("❌ {err}");
            ExitCode::FAILURE
        }
    }
}

fn execute(args: &Args) -> Result<RunCounters> {
    let config = Config::from_args(args)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_pipeline(config))
}

async fn run_pipeline(config: Config) -> Result<RunCounters> {
    let originals = S3Store::connect(&config.originals);
    let thumbs = S3Store::connect(&config.thumbs);

    let strategy = match config.strategy {
        StrategyConfig::Api(api) => Strategy::Api(Box::new(ApiClient::new(api)?)),
        StrategyConfig::Probe { product_id } => Strategy::Probe { product_id },
        StrategyConfig::Listing => Strategy::Listing,
    };
    let probe_http = config.probe_http.then(probe_client).transpose()?;

    let mut resolver = Resolver::new(
        &originals,
        config.originals.endpoint.clone(),
        config.originals.bucket.clone(),
        strategy,
        probe_http,
        config.only_first,
        config.product_id_filter.clone(),
        config.max_products,
    );
    let publisher = Publisher::new(&originals, &thumbs, config.size);
    let options = RunOptions {
        only_first: config.only_first,
        sleep: config.sleep,
    };

    run(&mut resolver, &publisher, &options).await
}
