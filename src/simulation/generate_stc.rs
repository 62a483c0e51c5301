use crate::errors::Error;
use crate::forward::ForwardOperator;
use crate::source_space::{Label, SourceTimeCourse, SourceVertex};
use crate::timebase::Timebase;
use log::debug;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};

/// Build a sparse source time course with one active vertex per label
///
/// # Arguments
/// * `forward` - forward operator, defines which vertices can be active
/// * `labels` - regions, one per row of `stc_data`
/// * `stc_data` - time course of each label, shape = [n_labels, n_samples]
/// * `timebase` - timing of `stc_data`
/// * `random_state` - seed for the vertex choice; `None` seeds from the operating system
///
/// # Returns
/// * `SourceTimeCourse` - rows sorted by (hemisphere, vertex)
///
/// # Algorithm
/// Labels are processed in order. For each label the candidates are the operator's
/// vertices of the label's hemisphere which are also in the label, ascending, and one
/// is drawn uniformly. Fixed-orientation sources need no sign change. When two labels
/// draw the same vertex their time courses are summed.
///
/// # Errors
/// * `ShapeMismatch` - `stc_data` has a row count different from the number of labels,
///   or a sample count different from `timebase.n_samples`
/// * `EmptyIntersection` - a label shares no vertex with the operator
///
pub fn generate_stc(forward: &ForwardOperator, labels: &[Label], stc_data: &Array2<f64>, timebase: &Timebase, random_state: Option<u64>) -> Result<SourceTimeCourse, Error> {
    if stc_data.nrows() != labels.len() {
        return Err(Error::ShapeMismatch {
            context: "source time courses per label",
            expected: labels.len(),
            found: stc_data.nrows(),
        });
    }
    if stc_data.ncols() != timebase.n_samples {
        return Err(Error::ShapeMismatch {
            context: "source time course samples",
            expected: timebase.n_samples,
            found: stc_data.ncols(),
        });
    }

    let mut rng: StdRng = match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut active: BTreeMap<SourceVertex, Array1<f64>> = BTreeMap::new();
    for (i_label, label) in labels.iter().enumerate() {
        let label_vertices: HashSet<usize> = label.vertices.iter().copied().collect();
        let candidates: Vec<usize> = forward
            .vertno(label.hemisphere)
            .into_iter()
            .filter(|vertex| label_vertices.contains(vertex))
            .collect();
        if candidates.is_empty() {
            return Err(Error::EmptyIntersection {
                label_name: label.name.to_owned(),
            });
        }

        let vertex: usize = candidates[rng.random_range(0..candidates.len())];
        debug!(
            "generate_stc: label `{}` -> vertex {} {} ({} candidates)",
            label.name,
            label.hemisphere,
            vertex,
            candidates.len()
        );

        let source_vertex: SourceVertex = SourceVertex::new(label.hemisphere, vertex);
        let time_course: &mut Array1<f64> = active.entry(source_vertex).or_insert_with(|| Array1::zeros(timebase.n_samples));
        *time_course += &stc_data.row(i_label);
    }

    // BTreeMap iterates in (hemisphere, vertex) order
    let vertices: Vec<SourceVertex> = active.keys().copied().collect();
    let mut data: Array2<f64> = Array2::zeros((vertices.len(), timebase.n_samples));
    for (i_vertex, time_course) in active.values().enumerate() {
        data.row_mut(i_vertex).assign(time_course);
    }

    return SourceTimeCourse::new(vertices, data, timebase.clone());
}

/// Eight vertices per hemisphere, gain is irrelevant for vertex selection
#[cfg(test)]
fn forward_with_vertices() -> ForwardOperator {
    use crate::channels::{Channel, ChannelKind};
    use crate::source_space::Hemisphere;

    let mut source_vertices: Vec<SourceVertex> = Vec::new();
    for hemisphere in [Hemisphere::Left, Hemisphere::Right] {
        for vertex in [2, 5, 9, 14, 20, 27, 35, 44] {
            source_vertices.push(SourceVertex::new(hemisphere, vertex));
        }
    }
    let channels: Vec<Channel> = vec![Channel::new("MEG 0111", ChannelKind::Gradiometer)];
    let gain: Array2<f64> = Array2::ones((1, source_vertices.len()));

    return ForwardOperator::new(channels, source_vertices, gain).expect("valid forward");
}

#[test]
fn test_generate_stc_is_reproducible() {
    use crate::source_space::Hemisphere;

    let forward: ForwardOperator = forward_with_vertices();
    let labels: Vec<Label> = vec![
        Label::new("Aud-lh", Hemisphere::Left, (0..30).collect()),
        Label::new("Aud-rh", Hemisphere::Right, (10..50).collect()),
    ];
    let timebase: Timebase = Timebase::from_sfreq(-0.1, 1000.0, 5);
    let stc_data: Array2<f64> = Array2::from_shape_vec((2, 5), vec![1.0, 2.0, 3.0, 4.0, 5.0, -1.0, -2.0, -3.0, -4.0, -5.0]).expect("shape");

    let stc_a: SourceTimeCourse = generate_stc(&forward, &labels, &stc_data, &timebase, Some(0)).expect("valid stc");
    let stc_b: SourceTimeCourse = generate_stc(&forward, &labels, &stc_data, &timebase, Some(0)).expect("valid stc");
    assert_eq!(stc_a, stc_b);

    // One vertex per hemisphere, drawn from the intersection
    let lh: Vec<usize> = stc_a.vertno(Hemisphere::Left);
    let rh: Vec<usize> = stc_a.vertno(Hemisphere::Right);
    assert_eq!(lh.len(), 1);
    assert_eq!(rh.len(), 1);
    assert!([2, 5, 9, 14, 20, 27].contains(&lh[0]));
    assert!([14, 20, 27, 35, 44].contains(&rh[0]));

    // Left hemisphere row first
    assert_eq!(stc_a.data().row(0).to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(stc_a.data().row(1).to_vec(), vec![-1.0, -2.0, -3.0, -4.0, -5.0]);
    assert_eq!(stc_a.timebase(), &timebase);
}

#[test]
fn test_generate_stc_orders_rows_and_sums_shared_vertices() {
    use crate::source_space::Hemisphere;

    let forward: ForwardOperator = forward_with_vertices();
    let timebase: Timebase = Timebase::from_sfreq(0.0, 100.0, 2);

    // Right hemisphere label given first, rows still come out left first
    let labels: Vec<Label> = vec![
        Label::new("only-rh-35", Hemisphere::Right, vec![35, 36]),
        Label::new("only-lh-9", Hemisphere::Left, vec![9]),
        Label::new("also-lh-9", Hemisphere::Left, vec![8, 9, 10]),
    ];
    let stc_data: Array2<f64> = Array2::from_shape_vec((3, 2), vec![7.0, 8.0, 1.0, 1.0, 0.5, 2.0]).expect("shape");

    let stc: SourceTimeCourse = generate_stc(&forward, &labels, &stc_data, &timebase, Some(3)).expect("valid stc");
    assert_eq!(stc.vertices(), &[SourceVertex::new(Hemisphere::Left, 9), SourceVertex::new(Hemisphere::Right, 35)]);
    assert_eq!(stc.data().row(0).to_vec(), vec![1.5, 3.0]);
    assert_eq!(stc.data().row(1).to_vec(), vec![7.0, 8.0]);
}

#[test]
fn test_generate_stc_errors() {
    use crate::source_space::Hemisphere;

    let forward: ForwardOperator = forward_with_vertices();
    let timebase: Timebase = Timebase::from_sfreq(0.0, 100.0, 4);

    // No label vertex is in the source space
    let labels: Vec<Label> = vec![Label::new("nowhere", Hemisphere::Left, vec![1, 3, 100])];
    let result: Result<SourceTimeCourse, Error> = generate_stc(&forward, &labels, &Array2::zeros((1, 4)), &timebase, Some(0));
    assert!(matches!(result, Err(Error::EmptyIntersection { label_name }) if label_name == "nowhere"));

    // Vertex 50 exists, but only in the right hemisphere
    let split_forward: ForwardOperator = {
        use crate::channels::{Channel, ChannelKind};
        let source_vertices: Vec<SourceVertex> = vec![SourceVertex::new(Hemisphere::Left, 2), SourceVertex::new(Hemisphere::Right, 50)];
        let channels: Vec<Channel> = vec![Channel::new("MEG 0111", ChannelKind::Gradiometer)];
        ForwardOperator::new(channels, source_vertices, Array2::ones((1, 2))).expect("valid forward")
    };
    let labels: Vec<Label> = vec![Label::new("wrong-side", Hemisphere::Left, vec![50])];
    let result: Result<SourceTimeCourse, Error> = generate_stc(&split_forward, &labels, &Array2::zeros((1, 4)), &timebase, Some(0));
    assert!(matches!(result, Err(Error::EmptyIntersection { label_name }) if label_name == "wrong-side"));

    let labels: Vec<Label> = vec![Label::new("Aud-lh", Hemisphere::Left, vec![2])];
    let result: Result<SourceTimeCourse, Error> = generate_stc(&forward, &labels, &Array2::zeros((2, 4)), &timebase, Some(0));
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));

    let result: Result<SourceTimeCourse, Error> = generate_stc(&forward, &labels, &Array2::zeros((1, 3)), &timebase, Some(0));
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}
