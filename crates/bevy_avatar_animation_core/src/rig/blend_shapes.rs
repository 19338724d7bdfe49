use indexmap::IndexMap;

/// Facial blend shape names of a rig together with their live weights.
///
/// The weight vector always has exactly one entry per name. Duplicate names are collapsed to
/// their first occurrence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlendShapeTable {
    indices: IndexMap<String, usize>,
    weights: Vec<f32>,
}

impl BlendShapeTable {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indices = IndexMap::new();
        for name in names {
            let next = indices.len();
            indices.entry(name.into()).or_insert(next);
        }
        let weights = vec![0.; indices.len()];

        Self { indices, weights }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.indices.get_index(index).map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indices.keys().map(String::as_str)
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    pub fn weight(&self, name: &str) -> Option<f32> {
        self.index_of(name).map(|i| self.weights[i])
    }
}
