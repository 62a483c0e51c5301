use crate::errors::Error;
use crate::evoked::{EvokedSignal, SignalLayout};
use crate::forward::ForwardOperator;
use crate::source_space::SourceTimeCourse;
use crate::timebase::Timebase;
use log::debug;
use ndarray::{Array2, ArrayView2, Axis, s};

/// Project a source time course through a forward operator into sensor space
///
/// # Arguments
/// * `forward` - fixed-orientation forward operator
/// * `stc` - source activity, every vertex must be in `forward`'s source space
/// * `layout` - channels and timebase of the output; when `None` the operator's channels
///   and the source time course's timebase are used
///
/// # Returns
/// * `EvokedSignal` - shape = [layout n_channels, layout n_samples]
///
/// # Algorithm
/// 1. Look up the gain rows of the layout's channels (by name) and the gain columns of the
///    source time course's vertices.
/// 2. Multiply the restricted gain, shape = [n_channels, n_vertices], with the source data.
/// 3. Output sample `j` takes source sample `j + offset`, with
///    `offset = round((layout.tmin - stc.tmin) / tstep)`. Output samples with no
///    matching source sample are zero.
///
/// # Errors
/// * `ChannelMismatch` - a layout channel is not in the forward operator
/// * `UnknownVertex` - a source vertex is not in the forward operator
/// * `TimebaseMismatch` - the layout and source sample intervals differ
///
pub fn apply_forward(forward: &ForwardOperator, stc: &SourceTimeCourse, layout: Option<&SignalLayout>) -> Result<EvokedSignal, Error> {
    let layout: SignalLayout = match layout {
        Some(layout) => layout.clone(),
        None => SignalLayout::new(forward.channels().to_vec(), stc.timebase().clone()),
    };
    let output_timebase: &Timebase = &layout.timebase;
    let source_timebase: &Timebase = stc.timebase();

    if !output_timebase.same_tstep(source_timebase) {
        return Err(Error::TimebaseMismatch {
            expected_tstep: source_timebase.tstep,
            found_tstep: output_timebase.tstep,
        });
    }

    // Gain rows for the output channels
    let channel_rows: Vec<usize> = forward.channel_indices(&layout.channel_names())?;

    // Gain columns for the active vertices
    let mut source_columns: Vec<usize> = Vec::with_capacity(stc.vertices().len());
    for source_vertex in stc.vertices() {
        let source_column: usize = forward.source_index(source_vertex).ok_or(Error::UnknownVertex {
            hemisphere: source_vertex.hemisphere,
            vertex: source_vertex.vertex,
        })?;
        source_columns.push(source_column);
    }

    let gain: Array2<f64> = forward.gain().select(Axis(0), &channel_rows).select(Axis(1), &source_columns); // shape = [n_channels, n_vertices]

    // Overlap between the two timebases
    let n_output: isize = output_timebase.n_samples as isize;
    let n_source: isize = source_timebase.n_samples as isize;
    let offset: isize = ((output_timebase.tmin - source_timebase.tmin) / source_timebase.tstep).round() as isize;
    let first_output: isize = (-offset).clamp(0, n_output);
    let stop_output: isize = (n_source - offset).clamp(first_output, n_output);

    let mut data: Array2<f64> = Array2::zeros((layout.n_channels(), output_timebase.n_samples));
    if stop_output > first_output {
        let first_source: usize = (first_output + offset) as usize;
        let stop_source: usize = (stop_output + offset) as usize;
        let source_data: ArrayView2<f64> = stc.data().slice(s![.., first_source..stop_source]);
        data.slice_mut(s![.., first_output as usize..stop_output as usize]).assign(&gain.dot(&source_data));
    }
    debug!(
        "apply_forward: {} channels x {} vertices, output samples {}..{} of {} computed",
        layout.n_channels(),
        source_columns.len(),
        first_output,
        stop_output,
        n_output
    );

    return EvokedSignal::new(layout, data);
}

/// Three channels, two vertices per hemisphere
#[cfg(test)]
fn small_forward() -> ForwardOperator {
    use crate::channels::{Channel, ChannelKind};
    use crate::source_space::{Hemisphere, SourceVertex};

    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("MEG 0112", ChannelKind::Gradiometer),
        Channel::new("EEG 001", ChannelKind::Eeg),
    ];
    let source_vertices: Vec<SourceVertex> = vec![
        SourceVertex::new(Hemisphere::Left, 1),
        SourceVertex::new(Hemisphere::Left, 4),
        SourceVertex::new(Hemisphere::Right, 3),
        SourceVertex::new(Hemisphere::Right, 8),
    ];
    let gain: Array2<f64> = Array2::from_shape_vec(
        (3, 4),
        vec![
            1.0, 2.0, 0.0, -1.0, //
            0.5, 0.0, 3.0, 1.0, //
            -2.0, 1.0, 1.0, 0.0,
        ],
    )
    .expect("shape");

    return ForwardOperator::new(channels, source_vertices, gain).expect("valid forward");
}

#[test]
fn test_apply_forward_matches_gain_product() {
    use crate::source_space::{Hemisphere, SourceVertex};
    use approx::assert_abs_diff_eq;

    let forward: ForwardOperator = small_forward();
    let timebase: Timebase = Timebase::from_sfreq(0.0, 100.0, 3);
    let vertices: Vec<SourceVertex> = vec![SourceVertex::new(Hemisphere::Left, 4), SourceVertex::new(Hemisphere::Right, 8)];
    let stc_data: Array2<f64> = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, -1.0, 0.0, 1.0]).expect("shape");
    let stc: SourceTimeCourse = SourceTimeCourse::new(vertices, stc_data, timebase).expect("valid stc");

    let evoked: EvokedSignal = apply_forward(&forward, &stc, None).expect("projection works");
    assert_eq!(evoked.data().shape(), &[3, 3]);

    // Channel "MEG 0111": 2.0 * lh4 - 1.0 * rh8
    assert_abs_diff_eq!(evoked.data()[[0, 0]], 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(evoked.data()[[0, 1]], 4.0, epsilon = 1e-12);
    assert_abs_diff_eq!(evoked.data()[[0, 2]], 5.0, epsilon = 1e-12);
    // Channel "EEG 001": 1.0 * lh4 + 0.0 * rh8
    assert_abs_diff_eq!(evoked.data()[[2, 2]], 3.0, epsilon = 1e-12);
}

#[test]
fn test_apply_forward_output_shape_follows_layout() {
    use crate::channels::{Channel, ChannelKind};
    use crate::source_space::{Hemisphere, SourceVertex};
    use approx::assert_abs_diff_eq;

    let forward: ForwardOperator = small_forward();

    // Source activity: 4 samples at 100 Hz starting at t=0.0
    let source_timebase: Timebase = Timebase::from_sfreq(0.0, 100.0, 4);
    let vertices: Vec<SourceVertex> = vec![SourceVertex::new(Hemisphere::Left, 1)];
    let stc_data: Array2<f64> = Array2::from_shape_vec((1, 4), vec![1.0, 2.0, 3.0, 4.0]).expect("shape");
    let stc: SourceTimeCourse = SourceTimeCourse::new(vertices, stc_data, source_timebase).expect("valid stc");

    // Template: two channels in reverse order, 6 samples starting one sample earlier
    let layout: SignalLayout = SignalLayout::new(
        vec![Channel::new("EEG 001", ChannelKind::Eeg), Channel::new("MEG 0111", ChannelKind::Gradiometer)],
        Timebase::from_sfreq(-0.01, 100.0, 6),
    );

    let evoked: EvokedSignal = apply_forward(&forward, &stc, Some(&layout)).expect("projection works");
    assert_eq!(evoked.data().shape(), &[2, 6]);
    assert_eq!(evoked.timebase(), &layout.timebase);

    // Zero before and after the source activity
    let meg_row: Vec<f64> = evoked.data().row(1).to_vec();
    let expected: Vec<f64> = vec![0.0, 1.0, 2.0, 3.0, 4.0, 0.0];
    for i_sample in 0..6 {
        assert_abs_diff_eq!(meg_row[i_sample], expected[i_sample], epsilon = 1e-12);
    }
    assert_abs_diff_eq!(evoked.data()[[0, 1]], -2.0, epsilon = 1e-12);

    // Template entirely after the source activity gives zeros, same shape
    let late_layout: SignalLayout = layout.with_timebase(Timebase::from_sfreq(1.0, 100.0, 6));
    let late: EvokedSignal = apply_forward(&forward, &stc, Some(&late_layout)).expect("projection works");
    assert_eq!(late.data().shape(), &[2, 6]);
    assert_abs_diff_eq!(late.data().sum(), 0.0, epsilon = 1e-12);
}

#[test]
fn test_apply_forward_errors() {
    use crate::channels::{Channel, ChannelKind};
    use crate::source_space::{Hemisphere, SourceVertex};

    let forward: ForwardOperator = small_forward();
    let timebase: Timebase = Timebase::from_sfreq(0.0, 100.0, 2);

    // Channel missing from the operator
    let stc: SourceTimeCourse = SourceTimeCourse::new(vec![SourceVertex::new(Hemisphere::Left, 1)], Array2::zeros((1, 2)), timebase.clone()).expect("valid stc");
    let layout: SignalLayout = SignalLayout::new(vec![Channel::new("MEG 2443", ChannelKind::Gradiometer)], timebase.clone());
    let result: Result<EvokedSignal, Error> = apply_forward(&forward, &stc, Some(&layout));
    assert!(matches!(result, Err(Error::ChannelMismatch { .. })));

    // Vertex missing from the operator
    let stc: SourceTimeCourse = SourceTimeCourse::new(vec![SourceVertex::new(Hemisphere::Left, 2)], Array2::zeros((1, 2)), timebase.clone()).expect("valid stc");
    let result: Result<EvokedSignal, Error> = apply_forward(&forward, &stc, None);
    assert!(matches!(result, Err(Error::UnknownVertex { .. })));

    // Different sample rate
    let stc: SourceTimeCourse = SourceTimeCourse::new(vec![SourceVertex::new(Hemisphere::Left, 1)], Array2::zeros((1, 2)), timebase.clone()).expect("valid stc");
    let layout: SignalLayout = SignalLayout::new(forward.channels().to_vec(), Timebase::from_sfreq(0.0, 600.0, 2));
    let result: Result<EvokedSignal, Error> = apply_forward(&forward, &stc, Some(&layout));
    assert!(matches!(result, Err(Error::TimebaseMismatch { .. })));
}
