use crate::errors::Error;
use std::fmt;
use std::str::FromStr;

/// Cortical hemisphere, ordered left before right
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hemisphere {
    Left,
    Right,
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hemisphere::Left => write!(f, "lh"),
            Hemisphere::Right => write!(f, "rh"),
        }
    }
}

impl FromStr for Hemisphere {
    type Err = Error;

    fn from_str(hemisphere: &str) -> Result<Self, Self::Err> {
        match hemisphere {
            "lh" => Ok(Hemisphere::Left),
            "rh" => Ok(Hemisphere::Right),
            _ => Err(Error::InvalidSourceSpace {
                reason: format!("unknown hemisphere `{hemisphere}`"),
            }),
        }
    }
}

/// A source-space vertex
///
/// The derived ordering (hemisphere first, then vertex number) is the row order
/// used by `SourceTimeCourse` and the column order used by `ForwardOperator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceVertex {
    pub hemisphere: Hemisphere,
    pub vertex: usize,
}

impl SourceVertex {
    pub fn new(hemisphere: Hemisphere, vertex: usize) -> Self {
        Self { hemisphere, vertex }
    }
}

#[test]
fn test_source_vertex_order_is_hemisphere_then_index() {
    let mut vertices: Vec<SourceVertex> = vec![
        SourceVertex::new(Hemisphere::Right, 3),
        SourceVertex::new(Hemisphere::Left, 900),
        SourceVertex::new(Hemisphere::Right, 1),
        SourceVertex::new(Hemisphere::Left, 7),
    ];
    vertices.sort();

    assert_eq!(
        vertices,
        vec![
            SourceVertex::new(Hemisphere::Left, 7),
            SourceVertex::new(Hemisphere::Left, 900),
            SourceVertex::new(Hemisphere::Right, 1),
            SourceVertex::new(Hemisphere::Right, 3),
        ]
    );

    assert_eq!("rh".parse::<Hemisphere>().expect("valid hemisphere"), Hemisphere::Right);
    assert!("both".parse::<Hemisphere>().is_err());
}
