use std::ops::Range;

/// A handle to a variable of a `ParamStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(super) usize);

/// How `ParamStore::get_variable` treats an already existing name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reuse {
    /// The variable must not exist yet.
    #[default]
    No,
    /// The variable must already exist with the same shape.
    Yes,
    /// Reuse the variable if it exists, create it otherwise.
    Auto,
}

/// A named, contiguous slice of the store's buffers.
#[derive(Debug, Clone)]
pub struct Variable {
    pub(super) name: String,
    pub(super) shape: Vec<usize>,
    pub(super) range: Range<usize>,
    pub(super) weight_decay: Option<f32>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The amount of scalars of this variable.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Where the variable lives in the flat buffers of its store.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The L2 regularization coefficient registered on creation.
    pub fn weight_decay(&self) -> Option<f32> {
        self.weight_decay
    }

    /// The scope of the variable, `"conv1"` for `"conv1/weights"`.
    pub fn scope(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map_or(self.name.as_str(), |(scope, _)| scope)
    }
}
