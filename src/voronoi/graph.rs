/// Marker for a missing neighbour or vertex.
pub const SENTINEL: i64 = -1;

/// Flattened run-length encoded adjacency: the runs of consecutive particles
/// are stored back to back in `values`, with `counts[i]` the length of run `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatGraph {
    values: Vec<i64>,
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl FlatGraph {
    /// Build from a run per row. Empty runs are replaced by `[SENTINEL]`.
    pub fn from_runs<I, R>(runs: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[i64]>,
    {
        let mut graph = Self::default();
        for run in runs {
            graph.push_run(run.as_ref());
        }
        graph
    }

    pub(crate) fn push_run(&mut self, run: &[i64]) {
        self.offsets.push(self.values.len());
        if run.is_empty() {
            self.values.push(SENTINEL);
            self.counts.push(1);
        } else {
            self.values.extend_from_slice(run);
            self.counts.push(run.len());
        }
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of runs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn run(&self, i: usize) -> &[i64] {
        let start = self.offsets[i];
        &self.values[start..start + self.counts[i]]
    }

    pub fn is_degenerate(&self, i: usize) -> bool {
        self.run(i) == [SENTINEL]
    }
}

/// Neighbour graph of a tessellation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborGraph(FlatGraph);

impl NeighborGraph {
    pub fn from_runs<I, R>(runs: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[i64]>,
    {
        Self(FlatGraph::from_runs(runs))
    }

    pub fn graph(&self) -> &FlatGraph {
        &self.0
    }

    pub fn values(&self) -> &[i64] {
        self.0.values()
    }

    pub fn counts(&self) -> &[usize] {
        self.0.counts()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw run of particle `i`, sentinel included.
    pub fn neighbors(&self, i: usize) -> &[i64] {
        self.0.run(i)
    }

    /// Positions of the run of `i` in the flat array, i.e. the face entries of `i`.
    pub fn entries(&self, i: usize) -> std::ops::Range<usize> {
        let start = self.0.offsets()[i];
        start..start + self.0.counts()[i]
    }

    /// The neighbours of `i` paired with their position in the flat array.
    /// The only place where the sentinel is filtered out.
    pub fn valid_neighbors(&self, i: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let offset = self.entries(i).start;
        self.0
            .run(i)
            .iter()
            .enumerate()
            .filter(|(_, &j)| j != SENTINEL)
            .map(move |(k, &j)| (offset + k, j as usize))
    }

    pub fn is_degenerate(&self, i: usize) -> bool {
        self.0.is_degenerate(i)
    }
}

/// Vertex runs of every face, parallel to the entries of a [`NeighborGraph`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceGraph(FlatGraph);

impl FaceGraph {
    pub fn from_runs<I, R>(runs: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[i64]>,
    {
        Self(FlatGraph::from_runs(runs))
    }

    pub fn values(&self) -> &[i64] {
        self.0.values()
    }

    pub fn counts(&self) -> &[usize] {
        self.0.counts()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Vertices of the face belonging to neighbour entry `entry`.
    pub fn face(&self, entry: usize) -> &[i64] {
        self.0.run(entry)
    }

    /// Whether the face of `entry` extends to infinity (or is degenerate).
    pub fn is_unbounded(&self, entry: usize) -> bool {
        self.face(entry).contains(&SENTINEL)
    }
}
