use federated_client::{ClientConfig, Datasets, LocalClient, start_client};
use federated_client_quickstart::{LineFitModel, SyntheticDataset};
use log::info;

const TRUE_WEIGHTS: [f64; 2] = [3.5, -1.2];
const TRUE_BIAS: f64 = 0.7;
const NOISE: f64 = 0.1;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ClientConfig::from_env()?;
    let seed = config.client_id.bytes().map(u64::from).sum::<u64>();

    let datasets = Datasets {
        training: SyntheticDataset::generate(&TRUE_WEIGHTS, TRUE_BIAS, 1000, NOISE, seed),
        validation: SyntheticDataset::generate(&TRUE_WEIGHTS, TRUE_BIAS, 100, NOISE, seed + 1),
        test: SyntheticDataset::generate(&TRUE_WEIGHTS, TRUE_BIAS, 100, NOISE, seed + 2),
    };
    let model = LineFitModel::new(TRUE_WEIGHTS.len(), 0.01, 1000, 32, seed);
    let mut client = LocalClient::new(model, datasets);

    match start_client(&mut client, &config).await? {
        Some(sleep) => info!(
            client_id = config.client_id.as_str();
            "coordinator asked to reconnect in {}s",
            sleep.as_secs()
        ),
        None => info!(client_id = config.client_id.as_str(); "session ended"),
    }
    Ok(())
}
