use super::node::{Node, NodeId};
use super::TreeError;

/// Arena-backed rooted tree.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node and return its id.
    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id));
        id
    }

    /// Link `child_id` under `parent_id`. Unknown ids are ignored.
    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        if parent_id >= self.nodes.len() || child_id >= self.nodes.len() {
            return;
        }
        self.nodes[parent_id].children.push(child_id);
        self.nodes[child_id].parent = Some(parent_id);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get_root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        if id < self.nodes.len() {
            self.root = Some(id);
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Node ids in preorder (root first, children left to right)
    pub fn preorder(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            if let Some(node) = self.get_node(id) {
                result.push(id);
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }

        result
    }

    /// Leaves below `id`, left to right
    pub fn get_leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.preorder(id)
            .into_iter()
            .filter(|&n| self.nodes[n].is_leaf())
            .collect()
    }

    /// Names of all leaves in newick order. Unnamed leaves are skipped.
    pub fn get_leaf_names(&self) -> Vec<String> {
        match self.root {
            Some(root) => self.leaf_names_under(root),
            None => Vec::new(),
        }
    }

    pub fn leaf_names_under(&self, id: NodeId) -> Vec<String> {
        self.get_leaves(id)
            .into_iter()
            .filter_map(|n| self.nodes[n].name.clone())
            .collect()
    }

    /// Every internal node has exactly two children
    pub fn is_binary(&self) -> bool {
        self.nodes
            .iter()
            .all(|n| n.children.is_empty() || n.children.len() == 2)
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.name.as_deref() == Some(name))
            .map(|n| n.id)
    }

    /// Names of the parent and the direct children of `name`.
    /// An unknown name has no neighbors.
    ///
    /// ```
    /// use hal2hub::libs::phylo::Tree;
    ///
    /// let tree = Tree::from_newick("((human,chimp)Anc1,gorilla)Anc0;").unwrap();
    /// assert_eq!(tree.neighbors("Anc1"), vec!["Anc0", "human", "chimp"]);
    /// assert_eq!(tree.neighbors("gorilla"), vec!["Anc0"]);
    /// assert!(tree.neighbors("mouse").is_empty());
    /// ```
    pub fn neighbors(&self, name: &str) -> Vec<String> {
        let id = match self.get_node_by_name(name) {
            Some(id) => id,
            None => return Vec::new(),
        };
        let node = &self.nodes[id];

        node.parent
            .iter()
            .chain(node.children.iter())
            .filter_map(|&n| self.nodes[n].name.clone())
            .collect()
    }

    /// Neighbors of `name` restricted to the genomes in `shown`.
    /// A neighbor that is not shown stands for the shown leaves below it,
    /// so a leaf's parent becomes its sibling leaves.
    ///
    /// ```
    /// use hal2hub::libs::phylo::Tree;
    ///
    /// let tree = Tree::from_newick("((human,chimp)Anc1,gorilla)Anc0;").unwrap();
    /// let shown: Vec<String> = ["human", "chimp", "gorilla"].iter().map(|s| s.to_string()).collect();
    /// assert_eq!(tree.shown_neighbors("human", &shown), vec!["chimp"]);
    /// assert_eq!(tree.shown_neighbors("gorilla", &shown), vec!["human", "chimp"]);
    /// ```
    pub fn shown_neighbors(&self, name: &str, shown: &[String]) -> Vec<String> {
        let mut result: Vec<String> = vec![];
        for neighbor in self.neighbors(name) {
            let candidates = if shown.contains(&neighbor) {
                vec![neighbor]
            } else {
                self.get_node_by_name(&neighbor)
                    .map(|id| self.leaf_names_under(id))
                    .unwrap_or_default()
            };
            for genome in candidates {
                if genome != name && shown.contains(&genome) && !result.contains(&genome) {
                    result.push(genome);
                }
            }
        }
        result
    }

    /// Named internal nodes in preorder, each with the leaf names below it.
    pub fn clades(&self) -> Vec<(String, Vec<String>)> {
        let root = match self.root {
            Some(root) => root,
            None => return Vec::new(),
        };

        self.preorder(root)
            .into_iter()
            .filter(|&n| !self.nodes[n].is_leaf())
            .filter_map(|n| {
                self.nodes[n]
                    .name
                    .clone()
                    .map(|name| (name, self.leaf_names_under(n)))
            })
            .collect()
    }

    /// Fails naming the first genome absent from the tree.
    pub fn check_names(&self, names: &[String]) -> Result<(), TreeError> {
        match names.iter().find(|n| self.get_node_by_name(n).is_none()) {
            Some(missing) => Err(TreeError::UnknownGenome(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn to_newick(&self) -> String {
        match self.root {
            Some(root) => {
                let mut s = self.to_newick_recursive(root);
                s.push(';');
                s
            }
            None => ";".to_string(),
        }
    }

    fn to_newick_recursive(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        let mut s = String::new();

        if !node.children.is_empty() {
            let parts: Vec<String> = node
                .children
                .iter()
                .map(|&c| self.to_newick_recursive(c))
                .collect();
            s.push('(');
            s.push_str(&parts.join(","));
            s.push(')');
        }
        if let Some(name) = &node.name {
            if name.contains(|c: char| "():;,[] '".contains(c)) {
                s.push_str(&format!("'{}'", name.replace('\'', "''")));
            } else {
                s.push_str(name);
            }
        }
        if let Some(len) = node.length {
            s.push_str(&format!(":{}", len));
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hal_tree() -> Tree {
        Tree::from_newick("((human:0.006,chimp:0.006)Anc1:0.02,(gorilla:0.03,orang:0.04)Anc2:0.01)Anc0;")
            .unwrap()
    }

    #[test]
    fn test_leaves_in_order() {
        let tree = hal_tree();
        assert_eq!(
            tree.get_leaf_names(),
            vec!["human", "chimp", "gorilla", "orang"]
        );
    }

    #[test]
    fn test_is_binary() {
        assert!(hal_tree().is_binary());
        let tree = Tree::from_newick("(a,b,c)root;").unwrap();
        assert!(!tree.is_binary());
    }

    #[test]
    fn test_neighbors() {
        let tree = hal_tree();
        assert_eq!(tree.neighbors("Anc0"), vec!["Anc1", "Anc2"]);
        assert_eq!(tree.neighbors("human"), vec!["Anc1"]);
    }

    #[test]
    fn test_shown_neighbors() {
        let tree = hal_tree();
        let leaves = tree.get_leaf_names();
        assert_eq!(tree.shown_neighbors("human", &leaves), vec!["chimp"]);
        assert_eq!(tree.shown_neighbors("orang", &leaves), vec!["gorilla"]);

        // ancestors shown as genomes of their own
        let mut all = leaves.clone();
        all.extend(["Anc0", "Anc1", "Anc2"].iter().map(|s| s.to_string()));
        assert_eq!(tree.shown_neighbors("human", &all), vec!["Anc1"]);
        assert_eq!(tree.shown_neighbors("Anc1", &all), vec!["Anc0", "human", "chimp"]);
        assert!(tree.shown_neighbors("mouse", &all).is_empty());
    }

    #[test]
    fn test_clades() {
        let clades = hal_tree().clades();
        assert_eq!(clades.len(), 3);
        assert_eq!(clades[0].0, "Anc0");
        assert_eq!(clades[0].1.len(), 4);
        assert_eq!(clades[1], ("Anc1".to_string(), vec!["human".to_string(), "chimp".to_string()]));
    }

    #[test]
    fn test_check_names() {
        let tree = hal_tree();
        assert!(tree.check_names(&["human".to_string()]).is_ok());
        let err = tree.check_names(&["mouse".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "genome mouse is not in the tree");
    }

    #[test]
    fn test_to_newick() {
        let tree = Tree::from_newick("((human:0.5,'mouse strain')Anc1)Anc0;").unwrap();
        assert_eq!(tree.to_newick(), "((human:0.5,'mouse strain')Anc1)Anc0;");
    }
}
