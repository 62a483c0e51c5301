use evoked_sim_rs::{SimulationOutput, SimulationSettings, SyntheticDataSource, simulate_evoked, snr_db};
use evoked_sim_rs::{Error, EvokedSignal};
use log::{error, info};
use std::path::Path;
use std::process::ExitCode;

// Background recording long enough for the default filter window, [60, 180] s
const RAW_DURATION: f64 = 200.0; // (second)

/// Simulate a noisy evoked response on the synthetic MEG/EEG setup
///
/// Usage: `simulate_evoked [settings.toml]`
fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let settings: SimulationSettings = match std::env::args().nth(1) {
        Some(path) => SimulationSettings::load(Path::new(&path))?,
        None => SimulationSettings::default(),
    };
    info!("settings: {settings:?}");

    let data_source: SyntheticDataSource = SyntheticDataSource::new(RAW_DURATION);
    let output: SimulationOutput = simulate_evoked(&data_source, &settings)?;

    let added_noise: EvokedSignal = EvokedSignal::new(output.evoked_clean.layout().clone(), output.evoked_noisy.data() - output.evoked_clean.data())?;
    let achieved: f64 = snr_db(&output.evoked_clean, &added_noise, settings.snr_tmin, settings.snr_tmax)?;
    info!("requested snr = {} dB; achieved snr = {achieved:.3} dB", settings.snr_db);

    println!("{output}");
    return Ok(());
}
