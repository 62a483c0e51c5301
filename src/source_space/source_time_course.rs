use crate::errors::Error;
use crate::source_space::{Hemisphere, SourceVertex};
use crate::timebase::Timebase;
use ndarray::Array2;
use std::fmt;

/// Activity at a sparse set of source-space vertices
///
/// Row `i` of `data` is the time course of `vertices[i]`; vertices are strictly
/// increasing in (hemisphere, vertex) order and all rows share `timebase`.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceTimeCourse {
    vertices: Vec<SourceVertex>,
    data: Array2<f64>, // shape = [n_vertices, n_samples]
    timebase: Timebase,
}

impl SourceTimeCourse {
    pub fn new(vertices: Vec<SourceVertex>, data: Array2<f64>, timebase: Timebase) -> Result<Self, Error> {
        if data.nrows() != vertices.len() {
            return Err(Error::ShapeMismatch {
                context: "source time course rows",
                expected: vertices.len(),
                found: data.nrows(),
            });
        }
        if data.ncols() != timebase.n_samples {
            return Err(Error::ShapeMismatch {
                context: "source time course samples",
                expected: timebase.n_samples,
                found: data.ncols(),
            });
        }
        for i_vertex in 1..vertices.len() {
            if vertices[i_vertex] <= vertices[i_vertex - 1] {
                return Err(Error::InvalidSourceSpace {
                    reason: format!(
                        "source time course vertices not strictly increasing at position {i_vertex} ({} {})",
                        vertices[i_vertex].hemisphere, vertices[i_vertex].vertex
                    ),
                });
            }
        }

        return Ok(Self { vertices, data, timebase });
    }

    pub fn vertices(&self) -> &[SourceVertex] {
        return &self.vertices;
    }

    /// Vertex numbers belonging to one hemisphere, ascending
    pub fn vertno(&self, hemisphere: Hemisphere) -> Vec<usize> {
        return self
            .vertices
            .iter()
            .filter(|source_vertex| source_vertex.hemisphere == hemisphere)
            .map(|source_vertex| source_vertex.vertex)
            .collect();
    }

    pub fn data(&self) -> &Array2<f64> {
        return &self.data;
    }

    pub fn timebase(&self) -> &Timebase {
        return &self.timebase;
    }
}

impl fmt::Display for SourceTimeCourse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut string_output = String::from("╔═════════════════════════════════════════════════════════════════════════════╗\n");
        string_output += &format!("║ {:<75} ║\n", " <evoked_sim_rs.SourceTimeCourse>");
        string_output += &format!("║ {:<75} ║\n", format!(" n_vertices = {} (lh={}, rh={})", self.vertices.len(), self.vertno(Hemisphere::Left).len(), self.vertno(Hemisphere::Right).len()));
        string_output += &format!("║ {:<75} ║\n", format!(" n_samples = {}", self.timebase.n_samples));
        string_output += &format!("║ {:<75} ║\n", format!(" tmin = {:.4} s;  tstep = {:.6} s", self.timebase.tmin, self.timebase.tstep));
        string_output.push_str("╚═════════════════════════════════════════════════════════════════════════════╝");

        return write!(f, "{string_output}");
    }
}

#[test]
fn test_source_time_course_rejects_bad_shapes() {
    let timebase: Timebase = Timebase::from_sfreq(0.0, 100.0, 4);
    let vertices: Vec<SourceVertex> = vec![SourceVertex::new(Hemisphere::Left, 5), SourceVertex::new(Hemisphere::Right, 2)];

    // Valid
    let stc: SourceTimeCourse = SourceTimeCourse::new(vertices.clone(), Array2::zeros((2, 4)), timebase.clone()).expect("valid shape");
    assert_eq!(stc.vertno(Hemisphere::Left), vec![5]);
    assert_eq!(stc.vertno(Hemisphere::Right), vec![2]);

    // Wrong number of rows
    let result: Result<SourceTimeCourse, Error> = SourceTimeCourse::new(vertices.clone(), Array2::zeros((3, 4)), timebase.clone());
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));

    // Wrong number of samples
    let result: Result<SourceTimeCourse, Error> = SourceTimeCourse::new(vertices.clone(), Array2::zeros((2, 5)), timebase.clone());
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));

    // Unsorted vertices
    let unsorted: Vec<SourceVertex> = vec![SourceVertex::new(Hemisphere::Right, 2), SourceVertex::new(Hemisphere::Left, 5)];
    let result: Result<SourceTimeCourse, Error> = SourceTimeCourse::new(unsorted, Array2::zeros((2, 4)), timebase);
    assert!(matches!(result, Err(Error::InvalidSourceSpace { .. })));
}
