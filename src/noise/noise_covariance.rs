use crate::channels::pick_names;
use crate::errors::Error;
use ndarray::{Array1, Array2, Axis};

/// Empirical sensor noise covariance, shape = [n_channels, n_channels]
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseCovariance {
    channel_names: Vec<String>,
    data: Array2<f64>,
}

impl NoiseCovariance {
    /// Square matrix with one row per channel; symmetry and definiteness are checked
    /// when the matrix square root is taken
    pub fn new(channel_names: Vec<String>, data: Array2<f64>) -> Result<Self, Error> {
        let n_channels: usize = channel_names.len();
        if data.nrows() != n_channels {
            return Err(Error::ShapeMismatch {
                context: "noise covariance rows",
                expected: n_channels,
                found: data.nrows(),
            });
        }
        if data.ncols() != n_channels {
            return Err(Error::ShapeMismatch {
                context: "noise covariance columns",
                expected: n_channels,
                found: data.ncols(),
            });
        }

        return Ok(Self { channel_names, data });
    }

    /// Independent channels with the given variances
    pub fn from_diagonal(channel_names: Vec<String>, variances: &Array1<f64>) -> Result<Self, Error> {
        let data: Array2<f64> = Array2::from_diag(variances);
        return Self::new(channel_names, data);
    }

    pub fn channel_names(&self) -> &[String] {
        return &self.channel_names;
    }

    pub fn data(&self) -> &Array2<f64> {
        return &self.data;
    }

    pub fn n_channels(&self) -> usize {
        return self.channel_names.len();
    }

    /// Sub-matrix for the named channels, rows and columns in the order of `names`
    pub fn pick_channels(&self, names: &[String]) -> Result<Self, Error> {
        let picks: Vec<usize> = pick_names(&self.channel_names, names, "noise covariance")?;
        let data: Array2<f64> = self.data.select(Axis(0), &picks).select(Axis(1), &picks);
        return Ok(Self {
            channel_names: names.to_vec(),
            data,
        });
    }
}

#[test]
fn test_noise_covariance_pick_channels() {
    let names: Vec<String> = vec!["MEG 0111".to_string(), "MEG 0112".to_string(), "EEG 001".to_string()];
    let data: Array2<f64> = Array2::from_shape_vec((3, 3), vec![4.0, 1.0, 0.5, 1.0, 9.0, 0.0, 0.5, 0.0, 1.0]).expect("shape");
    let covariance: NoiseCovariance = NoiseCovariance::new(names, data).expect("square covariance");

    let wanted: Vec<String> = vec!["EEG 001".to_string(), "MEG 0111".to_string()];
    let picked: NoiseCovariance = covariance.pick_channels(&wanted).expect("channels exist");
    assert_eq!(picked.channel_names(), wanted.as_slice());
    assert_eq!(picked.data(), &Array2::from_shape_vec((2, 2), vec![1.0, 0.5, 0.5, 4.0]).expect("shape"));

    let missing: Vec<String> = vec!["EEG 053".to_string()];
    assert!(matches!(covariance.pick_channels(&missing), Err(Error::ChannelMismatch { .. })));

    let result: Result<NoiseCovariance, Error> = NoiseCovariance::new(vec!["MEG 0111".to_string()], Array2::zeros((1, 2)));
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}
