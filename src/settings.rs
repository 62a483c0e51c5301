use crate::errors::Error;
use crate::evoked::Baseline;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Waveform of one source: the real part of a Morlet wavelet placed at the start of the
/// signal, then circularly shifted
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SourceWaveformSettings {
    pub label: String,
    pub frequency: f64,      // (hertz)
    pub n_cycles: f64,
    pub shift_samples: i64,  // positive delays the waveform
}

/// Parameters of one simulation run
///
/// Every field has a default, so a TOML file only needs the values it changes:
/// ```toml
/// snr_db = 3.0
/// noise_random_state = 12
///
/// [[sources]]
/// label = "Aud-lh"
/// frequency = 3.0
/// n_cycles = 1.0
/// shift_samples = 0
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub snr_db: f64,
    pub tmin: f64,        // (second)
    pub sfreq: f64,       // (hertz)
    pub n_samples: usize,
    pub amplitude: f64,   // peak source amplitude scale, (ampere metre)
    pub fir_order: usize,
    pub fir_tmin: f64,    // estimation window in the raw recording, (second)
    pub fir_tmax: f64,    // (second)
    pub snr_tmin: f64,    // (second)
    pub snr_tmax: f64,    // (second)
    pub random_state: u64,
    pub noise_random_state: Option<u64>,
    pub evoked_index: usize,
    pub baseline: Option<Baseline>,
    pub bads: Vec<String>,
    pub sources: Vec<SourceWaveformSettings>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            snr_db: 6.0,
            tmin: -0.1,
            sfreq: 1000.0,
            n_samples: 600,
            amplitude: 100e-9,
            fir_order: 5,
            fir_tmin: 60.0,
            fir_tmax: 180.0,
            snr_tmin: 0.0,
            snr_tmax: 0.2,
            random_state: 0,
            noise_random_state: None,
            evoked_index: 0,
            baseline: None,
            bads: vec!["MEG 2443".to_string(), "EEG 053".to_string()],
            sources: vec![
                SourceWaveformSettings {
                    label: "Aud-lh".to_string(),
                    frequency: 3.0,
                    n_cycles: 1.0,
                    shift_samples: 0,
                },
                SourceWaveformSettings {
                    label: "Aud-rh".to_string(),
                    frequency: 10.0,
                    n_cycles: 1.5,
                    shift_samples: 80,
                },
            ],
        }
    }
}

impl SimulationSettings {
    /// Read and validate settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content: String = fs::read_to_string(path)?;
        return Self::from_toml_str(&content);
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let settings: SimulationSettings = toml::from_str(content)?;
        settings.validate()?;
        return Ok(settings);
    }

    pub fn label_names(&self) -> Vec<String> {
        return self.sources.iter().map(|source| source.label.to_owned()).collect();
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.sfreq > 0.0) || !self.sfreq.is_finite() {
            return Err(Error::InvalidSettings {
                field: "sfreq",
                reason: format!("must be positive, found {}", self.sfreq),
            });
        }
        if self.n_samples == 0 {
            return Err(Error::InvalidSettings {
                field: "n_samples",
                reason: "must be positive".to_string(),
            });
        }
        if !self.snr_db.is_finite() {
            return Err(Error::InvalidSettings {
                field: "snr_db",
                reason: format!("must be finite, found {}", self.snr_db),
            });
        }
        if !(self.fir_tmax > self.fir_tmin) {
            return Err(Error::InvalidSettings {
                field: "fir_tmax",
                reason: format!("must be after fir_tmin, found [{}, {}]", self.fir_tmin, self.fir_tmax),
            });
        }
        if !(self.snr_tmax >= self.snr_tmin) {
            return Err(Error::InvalidSettings {
                field: "snr_tmax",
                reason: format!("must not be before snr_tmin, found [{}, {}]", self.snr_tmin, self.snr_tmax),
            });
        }
        if self.sources.is_empty() {
            return Err(Error::InvalidSettings {
                field: "sources",
                reason: "at least one source is needed".to_string(),
            });
        }
        for source in &self.sources {
            if !(source.frequency > 0.0) || !(source.n_cycles > 0.0) {
                return Err(Error::InvalidSettings {
                    field: "sources",
                    reason: format!(
                        "source `{}` needs a positive frequency and n_cycles, found {} Hz and {} cycles",
                        source.label, source.frequency, source.n_cycles
                    ),
                });
            }
        }

        return Ok(());
    }
}

#[test]
fn test_settings_defaults_and_partial_toml() {
    use approx::assert_abs_diff_eq;

    let settings: SimulationSettings = SimulationSettings::default();
    settings.validate().expect("defaults are valid");
    assert_eq!(settings.label_names(), vec!["Aud-lh".to_string(), "Aud-rh".to_string()]);

    // Unspecified fields keep their default
    let settings: SimulationSettings = SimulationSettings::from_toml_str(
        r#"
        snr_db = -3.0
        noise_random_state = 12
        bads = []

        [baseline]
        tmax = 0.0
        "#,
    )
    .expect("valid toml");
    assert_abs_diff_eq!(settings.snr_db, -3.0, epsilon = 1e-15);
    assert_eq!(settings.noise_random_state, Some(12));
    assert!(settings.bads.is_empty());
    assert_eq!(settings.baseline, Some(Baseline { tmin: None, tmax: Some(0.0) }));
    assert_eq!(settings.n_samples, 600);
    assert_eq!(settings.sources.len(), 2);
}

#[test]
fn test_settings_rejects_invalid_values() {
    assert!(matches!(SimulationSettings::from_toml_str("sfreq = 0.0"), Err(Error::InvalidSettings { field: "sfreq", .. })));
    assert!(matches!(SimulationSettings::from_toml_str("n_samples = 0"), Err(Error::InvalidSettings { field: "n_samples", .. })));
    assert!(matches!(SimulationSettings::from_toml_str("fir_tmin = 200.0"), Err(Error::InvalidSettings { field: "fir_tmax", .. })));
    assert!(matches!(SimulationSettings::from_toml_str("sources = []"), Err(Error::InvalidSettings { field: "sources", .. })));
    assert!(matches!(SimulationSettings::from_toml_str("snr_db = \"six\""), Err(Error::SettingsParse(..))));

    let negative_frequency: &str = r#"
        [[sources]]
        label = "Aud-lh"
        frequency = -3.0
        n_cycles = 1.0
        shift_samples = 0
    "#;
    assert!(matches!(SimulationSettings::from_toml_str(negative_frequency), Err(Error::InvalidSettings { field: "sources", .. })));
}

#[test]
fn test_settings_load_from_file() {
    use std::io::Write;

    let mut file: tempfile::NamedTempFile = tempfile::NamedTempFile::new().expect("temporary file");
    writeln!(
        file,
        r#"
        n_samples = 300
        fir_order = 2

        [[sources]]
        label = "Aud-rh"
        frequency = 8.0
        n_cycles = 2.0
        shift_samples = -20
        "#
    )
    .expect("write settings");

    let settings: SimulationSettings = SimulationSettings::load(file.path()).expect("valid settings file");
    assert_eq!(settings.n_samples, 300);
    assert_eq!(settings.fir_order, 2);
    assert_eq!(settings.sources.len(), 1);
    assert_eq!(settings.sources[0].shift_samples, -20);

    let missing: Result<SimulationSettings, Error> = SimulationSettings::load(Path::new("/nonexistent/evoked_sim.toml"));
    assert!(matches!(missing, Err(Error::Io(..))));
}
