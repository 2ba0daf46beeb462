/// Index into the tree's node arena.
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,

    /// None for the root
    pub parent: Option<NodeId>,

    /// Ordered as written in the newick text
    pub children: Vec<NodeId>,

    /// Genome name. In a HAL tree internal nodes are ancestral genomes and
    /// carry names too.
    pub name: Option<String>,

    /// Branch length to parent
    pub length: Option<f64>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            name: None,
            length: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
