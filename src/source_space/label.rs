use crate::source_space::Hemisphere;

/// Named anatomical region: a set of source-space vertices in one hemisphere
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub name: String,
    pub hemisphere: Hemisphere,
    pub vertices: Vec<usize>,
}

impl Label {
    pub fn new(name: &str, hemisphere: Hemisphere, vertices: Vec<usize>) -> Self {
        Self {
            name: name.to_string(),
            hemisphere,
            vertices,
        }
    }
}
