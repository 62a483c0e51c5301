use crate::channels::{Channel, channel_names, pick_channels, pick_types};
use crate::errors::Error;
use crate::source_space::{Hemisphere, SourceVertex};
use ndarray::{Array2, Axis};

/// Fixed-orientation forward solution
///
/// Linear map from source amplitudes (one scalar per vertex, in ampere-metre) to
/// sensor measurements: `measurement = gain.dot(&amplitudes)`.
///
/// By convention rows are "sensors" and columns are "current sources", the same
/// convention as a Greens table.
#[derive(Clone, Debug)]
pub struct ForwardOperator {
    channels: Vec<Channel>,
    source_vertices: Vec<SourceVertex>, // strictly increasing, one per gain column
    gain: Array2<f64>,                  // shape = [n_channels, n_sources]
}

impl ForwardOperator {
    pub fn new(channels: Vec<Channel>, source_vertices: Vec<SourceVertex>, gain: Array2<f64>) -> Result<Self, Error> {
        if gain.nrows() != channels.len() {
            return Err(Error::ShapeMismatch {
                context: "forward gain rows",
                expected: channels.len(),
                found: gain.nrows(),
            });
        }
        if gain.ncols() != source_vertices.len() {
            return Err(Error::ShapeMismatch {
                context: "forward gain columns",
                expected: source_vertices.len(),
                found: gain.ncols(),
            });
        }

        // `source_index` relies on a binary search
        for i_source in 1..source_vertices.len() {
            if source_vertices[i_source] <= source_vertices[i_source - 1] {
                return Err(Error::InvalidSourceSpace {
                    reason: format!(
                        "forward operator vertices must be unique and sorted, found {} {} after {} {}",
                        source_vertices[i_source].hemisphere,
                        source_vertices[i_source].vertex,
                        source_vertices[i_source - 1].hemisphere,
                        source_vertices[i_source - 1].vertex
                    ),
                });
            }
        }

        return Ok(Self {
            channels,
            source_vertices,
            gain,
        });
    }

    pub fn channels(&self) -> &[Channel] {
        return &self.channels;
    }

    pub fn channel_names(&self) -> Vec<String> {
        return channel_names(&self.channels);
    }

    pub fn source_vertices(&self) -> &[SourceVertex] {
        return &self.source_vertices;
    }

    pub fn gain(&self) -> &Array2<f64> {
        return &self.gain;
    }

    pub fn n_channels(&self) -> usize {
        return self.channels.len();
    }

    pub fn n_sources(&self) -> usize {
        return self.source_vertices.len();
    }

    /// Active vertex numbers of one hemisphere, ascending
    pub fn vertno(&self, hemisphere: Hemisphere) -> Vec<usize> {
        return self
            .source_vertices
            .iter()
            .filter(|source_vertex| source_vertex.hemisphere == hemisphere)
            .map(|source_vertex| source_vertex.vertex)
            .collect();
    }

    /// Gain column of a vertex, `None` when the vertex is not in the source space
    pub fn source_index(&self, source_vertex: &SourceVertex) -> Option<usize> {
        return self.source_vertices.binary_search(source_vertex).ok();
    }

    /// Gain rows of the named channels, in the order of `names`
    pub fn channel_indices(&self, names: &[String]) -> Result<Vec<usize>, Error> {
        return pick_channels(&self.channels, names, "forward operator");
    }

    /// Restrict the operator to the named channels, in the order of `names`
    pub fn pick_channels(&self, names: &[String]) -> Result<Self, Error> {
        let picks: Vec<usize> = self.channel_indices(names)?;
        return Ok(self.select_channels(&picks));
    }

    /// Restrict the operator to MEG and/or EEG channels, dropping `exclude`
    pub fn pick_types(&self, meg: bool, eeg: bool, exclude: &[String]) -> Self {
        let picks: Vec<usize> = pick_types(&self.channels, meg, eeg, exclude);
        return self.select_channels(&picks);
    }

    fn select_channels(&self, picks: &[usize]) -> Self {
        Self {
            channels: picks.iter().map(|&i_channel| self.channels[i_channel].clone()).collect(),
            source_vertices: self.source_vertices.clone(),
            gain: self.gain.select(Axis(0), picks),
        }
    }
}

#[test]
fn test_forward_operator_lookup_and_picks() {
    use crate::channels::ChannelKind;

    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("MEG 0113", ChannelKind::Magnetometer),
        Channel::new("EEG 001", ChannelKind::Eeg),
    ];
    let source_vertices: Vec<SourceVertex> = vec![
        SourceVertex::new(Hemisphere::Left, 2),
        SourceVertex::new(Hemisphere::Left, 10),
        SourceVertex::new(Hemisphere::Right, 4),
    ];
    let gain: Array2<f64> = Array2::from_shape_fn((3, 3), |(i, j)| (10 * i + j) as f64);

    let forward: ForwardOperator = ForwardOperator::new(channels.clone(), source_vertices.clone(), gain.clone()).expect("valid forward");

    assert_eq!(forward.vertno(Hemisphere::Left), vec![2, 10]);
    assert_eq!(forward.vertno(Hemisphere::Right), vec![4]);
    assert_eq!(forward.source_index(&SourceVertex::new(Hemisphere::Right, 4)), Some(2));
    assert_eq!(forward.source_index(&SourceVertex::new(Hemisphere::Right, 2)), None);

    // Picking EEG only keeps the last gain row
    let eeg_only: ForwardOperator = forward.pick_types(false, true, &[]);
    assert_eq!(eeg_only.n_channels(), 1);
    assert_eq!(eeg_only.gain().row(0).to_vec(), vec![20.0, 21.0, 22.0]);

    // Picking by name re-orders the rows
    let names: Vec<String> = vec!["EEG 001".to_string(), "MEG 0111".to_string()];
    let reordered: ForwardOperator = forward.pick_channels(&names).expect("channels exist");
    assert_eq!(reordered.gain().row(1).to_vec(), vec![0.0, 1.0, 2.0]);

    // Gain of the wrong shape
    let result: Result<ForwardOperator, Error> = ForwardOperator::new(channels.clone(), source_vertices.clone(), Array2::zeros((2, 3)));
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));

    // Duplicate vertices
    let duplicated: Vec<SourceVertex> = vec![
        SourceVertex::new(Hemisphere::Left, 2),
        SourceVertex::new(Hemisphere::Left, 2),
        SourceVertex::new(Hemisphere::Right, 4),
    ];
    let result: Result<ForwardOperator, Error> = ForwardOperator::new(channels, duplicated, gain);
    assert!(matches!(result, Err(Error::InvalidSourceSpace { .. })));
}
