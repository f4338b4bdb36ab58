/// Looped sequence of per-tick lines
///
/// Samples, ornaments and position lists all share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinesObject<T> {
    pub lines: Vec<T>,
    /// Line to continue from after the last one
    pub loop_index: usize,
}

impl<T> LinesObject<T> {
    pub fn new(lines: Vec<T>, loop_index: usize) -> Self {
        Self { lines, loop_index }
    }

    pub fn size(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&T> {
        self.lines.get(index)
    }
}
