//! Graph metrics over board connections.
//!
//! Nodes are connection endpoints (placement ids in practice) and every
//! connection is an undirected edge between its begin and end endpoint.

use super::Connection;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Union-Find (Disjoint Set Union) with path compression and union by rank.
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: HashMap<String, String>,
    rank: HashMap<String, usize>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element. Adding an existing element is a no-op.
    pub fn make_set(&mut self, x: &str) {
        if !self.parent.contains_key(x) {
            self.parent.insert(x.to_string(), x.to_string());
            self.rank.insert(x.to_string(), 0);
        }
    }

    /// Representative of the set containing `x`, or `None` if unknown.
    pub fn find(&mut self, x: &str) -> Option<String> {
        let parent = self.parent.get(x)?.clone();
        if parent == x {
            return Some(parent);
        }
        let root = self.find(&parent)?;
        self.parent.insert(x.to_string(), root.clone());
        Some(root)
    }

    /// Merge the sets containing `x` and `y`.
    ///
    /// Returns `false` when they were already merged or either is unknown.
    pub fn union(&mut self, x: &str, y: &str) -> bool {
        let (Some(root_x), Some(root_y)) = (self.find(x), self.find(y)) else {
            return false;
        };
        if root_x == root_y {
            return false;
        }

        let rank_x = self.rank.get(&root_x).copied().unwrap_or(0);
        let rank_y = self.rank.get(&root_y).copied().unwrap_or(0);
        if rank_x < rank_y {
            self.parent.insert(root_x, root_y);
        } else if rank_x > rank_y {
            self.parent.insert(root_y, root_x);
        } else {
            self.parent.insert(root_y, root_x.clone());
            self.rank.insert(root_x, rank_x + 1);
        }
        true
    }

    /// All components, each sorted, ordered by their first member.
    pub fn components(&mut self) -> Vec<Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let elements: Vec<String> = self.parent.keys().cloned().collect();
        for elem in elements {
            if let Some(root) = self.find(&elem) {
                grouped.entry(root).or_default().push(elem);
            }
        }
        let mut components: Vec<Vec<String>> = grouped
            .into_values()
            .map(|mut c| {
                c.sort();
                c
            })
            .collect();
        components.sort();
        components
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Undirected graph built from a set of connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
    degree: BTreeMap<String, usize>,
    edge_count: usize,
}

impl ConnectionGraph {
    pub fn from_connections<'a, I>(connections: I) -> Self
    where
        I: IntoIterator<Item = &'a Connection>,
    {
        let mut graph = Self::default();
        for conn in connections {
            graph.add_edge(&conn.begin_id, &conn.end_id);
        }
        graph
    }

    fn add_edge(&mut self, a: &str, b: &str) {
        self.edge_count += 1;
        *self.degree.entry(a.to_string()).or_default() += 1;
        *self.degree.entry(b.to_string()).or_default() += 1;
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Degree centrality: number of connection endpoints at each node.
    ///
    /// Parallel connections are counted once each.
    pub fn degree_centrality(&self) -> BTreeMap<String, usize> {
        self.degree.clone()
    }

    /// Average local clustering coefficient over nodes with two or more neighbours.
    ///
    /// Returns 0.0 when no node qualifies.
    pub fn average_clustering(&self) -> f64 {
        let mut total = 0.0;
        let mut counted = 0usize;

        for neighbours in self.adjacency.values() {
            if neighbours.len() < 2 {
                continue;
            }
            let list: Vec<&String> = neighbours.iter().collect();
            let mut triangles = 0usize;
            for (i, a) in list.iter().enumerate() {
                for b in &list[i + 1..] {
                    if self
                        .adjacency
                        .get(a.as_str())
                        .is_some_and(|n| n.contains(b.as_str()))
                    {
                        triangles += 1;
                    }
                }
            }
            let possible = (list.len() * (list.len() - 1)) as f64 / 2.0;
            total += triangles as f64 / possible;
            counted += 1;
        }

        if counted == 0 {
            0.0
        } else {
            total / counted as f64
        }
    }

    /// Connected components of the endpoint graph.
    pub fn components(&self) -> Vec<Vec<String>> {
        let mut uf = UnionFind::new();
        for node in self.adjacency.keys() {
            uf.make_set(node);
        }
        for (node, neighbours) in &self.adjacency {
            for other in neighbours {
                uf.union(node, other);
            }
        }
        uf.components()
    }
}

/// Directed edge density `edges / (nodes * (nodes - 1))`, 0.0 below two nodes.
pub fn edge_density(nodes: usize, edges: usize) -> f64 {
    if nodes < 2 {
        return 0.0;
    }
    edges as f64 / (nodes as f64 * (nodes as f64 - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str, begin: &str, end: &str) -> Connection {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "whiteboardId": "b1",
            "beginId": begin,
            "endId": end,
        }))
        .unwrap()
    }

    #[test]
    fn test_union_find_basic() {
        let mut uf = UnionFind::new();
        uf.make_set("a");
        uf.make_set("b");
        uf.make_set("a");
        assert_eq!(uf.len(), 2);
        assert_ne!(uf.find("a"), uf.find("b"));

        assert!(uf.union("a", "b"));
        assert!(!uf.union("a", "b"));
        assert_eq!(uf.find("a"), uf.find("b"));
        assert!(!uf.union("a", "missing"));
        assert_eq!(uf.find("missing"), None);
    }

    #[test]
    fn test_union_find_components() {
        let mut uf = UnionFind::new();
        for id in ["p1", "p2", "p3", "p4", "p5", "p6"] {
            uf.make_set(id);
        }
        uf.union("p1", "p2");
        uf.union("p2", "p3");
        uf.union("p4", "p5");

        let components = uf.components();
        assert_eq!(
            components,
            vec![
                vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
                vec!["p4".to_string(), "p5".to_string()],
                vec!["p6".to_string()],
            ]
        );
    }

    #[test]
    fn test_degree_centrality() {
        let conns = [conn("c1", "a", "b"), conn("c2", "a", "c"), conn("c3", "a", "b")];
        let graph = ConnectionGraph::from_connections(&conns);
        let degree = graph.degree_centrality();
        assert_eq!(degree["a"], 3);
        assert_eq!(degree["b"], 2);
        assert_eq!(degree["c"], 1);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(degree.len(), 3);
    }

    #[test]
    fn test_clustering_triangle_is_one() {
        let conns = [conn("1", "a", "b"), conn("2", "b", "c"), conn("3", "c", "a")];
        let graph = ConnectionGraph::from_connections(&conns);
        assert!((graph.average_clustering() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clustering_star_is_zero() {
        let conns = [conn("1", "hub", "a"), conn("2", "hub", "b")];
        let graph = ConnectionGraph::from_connections(&conns);
        assert_eq!(graph.average_clustering(), 0.0);
        assert_eq!(ConnectionGraph::default().average_clustering(), 0.0);
    }

    #[test]
    fn test_graph_components() {
        let conns = [conn("1", "a", "b"), conn("2", "c", "d")];
        let graph = ConnectionGraph::from_connections(&conns);
        assert_eq!(graph.components().len(), 2);
    }

    #[test]
    fn test_edge_density() {
        assert_eq!(edge_density(0, 0), 0.0);
        assert_eq!(edge_density(1, 3), 0.0);
        assert!((edge_density(4, 6) - 0.5).abs() < f64::EPSILON);
    }
}
