//! Contribution and co-contribution matrices across projects, and the
//! co-participation graph of authors.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::error::{Error, Result};
use crate::records::ProjectLogs;

/// One post (ticket opening) or comment, reduced to who wrote it where.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contribution {
    pub project: String,
    pub ticket_id: String,
    pub author_name: String,
    pub is_post: bool,
}

/// Posts and comments of a project as contributions.
pub fn contributions_from_logs(logs: &ProjectLogs) -> Vec<Contribution> {
    let posts = logs.tickets.iter().map(|t| Contribution {
        project: logs.name.clone(),
        ticket_id: t.ticket_id.clone(),
        author_name: t.author_name.clone(),
        is_post: true,
    });
    let replies = logs.comments.iter().map(|c| Contribution {
        project: logs.name.clone(),
        ticket_id: c.ticket_id.clone(),
        author_name: c.author_name.clone(),
        is_post: false,
    });
    posts.chain(replies).collect()
}

/// Each ticket must have exactly one post per project.
pub fn check_unique_posts(contributions: &[Contribution]) -> Result<()> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for c in contributions.iter().filter(|c| c.is_post) {
        if !seen.insert((c.project.as_str(), c.ticket_id.as_str())) {
            return Err(Error::InvalidInput(format!(
                "ticket {} of {} has more than one post",
                c.ticket_id, c.project
            )));
        }
    }
    Ok(())
}

/// Projects x authors contribution counts. Rows and columns are sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionMatrix {
    pub projects: Vec<String>,
    pub authors: Vec<String>,
    /// `counts[project][author]`
    pub counts: Vec<Vec<u32>>,
}

impl ContributionMatrix {
    fn contributed(&self, project: usize, author: usize) -> bool {
        self.counts[project][author] > 0
    }

    /// Number of projects each author contributed to, by author column.
    pub fn projects_of_authors(&self) -> Vec<usize> {
        (0..self.authors.len())
            .map(|a| {
                (0..self.projects.len())
                    .filter(|&p| self.contributed(p, a))
                    .count()
            })
            .collect()
    }

    /// Project with the most contributions of an author; ties go to the
    /// first project.
    pub fn main_project(&self, author: usize) -> Option<&str> {
        let mut best: Option<(usize, u32)> = None;
        for p in 0..self.projects.len() {
            let n = self.counts[p][author];
            if best.is_none_or(|(_, m)| n > m) {
                best = Some((p, n));
            }
        }
        best.map(|(p, _)| self.projects[p].as_str())
    }
}

/// Count contributions per project and author. Contributions without an
/// author name are ignored.
pub fn compute_contributions_per_project(contributions: &[Contribution]) -> ContributionMatrix {
    let mut tally: BTreeMap<&str, BTreeMap<&str, u32>> = BTreeMap::new();
    let mut authors: BTreeSet<&str> = BTreeSet::new();
    for c in contributions {
        let per_project = tally.entry(c.project.as_str()).or_default();
        if c.author_name.is_empty() {
            continue;
        }
        *per_project.entry(c.author_name.as_str()).or_insert(0) += 1;
        authors.insert(c.author_name.as_str());
    }
    let authors: Vec<&str> = authors.into_iter().collect();
    let counts = tally
        .values()
        .map(|per_author| {
            authors
                .iter()
                .map(|a| per_author.get(a).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    ContributionMatrix {
        projects: tally.keys().map(|p| p.to_string()).collect(),
        authors: authors.into_iter().map(String::from).collect(),
        counts,
    }
}

/// `B . B^T` for the binarized matrix: shared contributors of every
/// project pair, with each project's contributor count on the diagonal.
pub fn cocontribution_matrix(matrix: &ContributionMatrix) -> Vec<Vec<u32>> {
    let n = matrix.projects.len();
    let mut shared = vec![vec![0u32; n]; n];
    for a in 0..matrix.authors.len() {
        let contributed: Vec<usize> = (0..n).filter(|&p| matrix.contributed(p, a)).collect();
        for &i in &contributed {
            for &j in &contributed {
                shared[i][j] += 1;
            }
        }
    }
    shared
}

/// Percent of project i's contributors who also contribute to project j.
/// A project without contributors gets a row of zeros.
///
/// # Example
/// ```
/// use community_stats::network::normalized_cocontribution;
/// let shared = vec![vec![4, 1], vec![1, 2]];
/// assert_eq!(
///     normalized_cocontribution(&shared),
///     vec![vec![100.0, 25.0], vec![50.0, 100.0]]
/// );
/// ```
pub fn normalized_cocontribution(shared: &[Vec<u32>]) -> Vec<Vec<f64>> {
    shared
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let diag = row[i];
            row.iter()
                .map(|&v| {
                    if diag == 0 {
                        0.0
                    } else {
                        v as f64 / diag as f64 * 100.0
                    }
                })
                .collect()
        })
        .collect()
}

/// `(n, number of authors contributing to exactly n projects)` for `n`
/// in `1..=projects`.
pub fn projects_per_contributor(matrix: &ContributionMatrix) -> Vec<(usize, usize)> {
    let per_author = matrix.projects_of_authors();
    (1..=matrix.projects.len())
        .map(|n| (n, per_author.iter().filter(|&&k| k == n).count()))
        .collect()
}

/// For each project, the percent of its contributors who contribute to
/// exactly `n` projects: `spread[project][n - 1]`.
pub fn contributor_spread(matrix: &ContributionMatrix) -> Vec<Vec<f64>> {
    let per_author = matrix.projects_of_authors();
    let n_projects = matrix.projects.len();
    (0..n_projects)
        .map(|p| {
            let mut by_n = vec![0usize; n_projects];
            for (a, &k) in per_author.iter().enumerate() {
                if matrix.contributed(p, a) {
                    by_n[k - 1] += 1;
                }
            }
            let total: usize = by_n.iter().sum();
            by_n.into_iter()
                .map(|c| {
                    if total == 0 {
                        0.0
                    } else {
                        c as f64 / total as f64 * 100.0
                    }
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorNode {
    pub name: String,
    pub main_project: String,
}

/// Authors linked by shared ticket threads; edge weight = shared threads.
#[derive(Debug, Clone)]
pub struct AuthorGraph {
    pub graph: UnGraph<AuthorNode, u32>,
}

/// Build the co-participation graph: every author of the matrix is a
/// node, two authors are linked when both posted or commented in the
/// same ticket thread of the same project.
pub fn create_graph(contributions: &[Contribution], matrix: &ContributionMatrix) -> AuthorGraph {
    let mut graph: UnGraph<AuthorNode, u32> = UnGraph::default();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for (a, name) in matrix.authors.iter().enumerate() {
        let node = graph.add_node(AuthorNode {
            name: name.clone(),
            main_project: matrix.main_project(a).unwrap_or_default().to_string(),
        });
        index.insert(name.as_str(), node);
    }

    let mut threads: HashMap<(&str, &str), BTreeSet<NodeIndex>> = HashMap::new();
    for c in contributions {
        if let Some(&node) = index.get(c.author_name.as_str()) {
            threads
                .entry((c.project.as_str(), c.ticket_id.as_str()))
                .or_default()
                .insert(node);
        }
    }

    let mut weights: BTreeMap<(NodeIndex, NodeIndex), u32> = BTreeMap::new();
    for members in threads.values() {
        let members: Vec<NodeIndex> = members.iter().copied().collect();
        for (i, &u) in members.iter().enumerate() {
            for &v in &members[i + 1..] {
                *weights.entry((u, v)).or_insert(0) += 1;
            }
        }
    }
    for ((u, v), w) in weights {
        graph.add_edge(u, v, w);
    }
    AuthorGraph { graph }
}

fn gml_string(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

impl AuthorGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Shared threads between two authors, 0 when not linked.
    pub fn weight(&self, a: &str, b: &str) -> u32 {
        let find = |name: &str| self.graph.node_indices().find(|&i| self.graph[i].name == name);
        match (find(a), find(b)) {
            (Some(u), Some(v)) => self
                .graph
                .find_edge(u, v)
                .map(|e| self.graph[e])
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Render as GML; the edge `value` is `ln(weight + 1)`.
    pub fn to_gml(&self) -> String {
        let mut out = String::from("graph [\n  directed 0\n");
        for i in self.graph.node_indices() {
            let node = &self.graph[i];
            let _ = write!(
                out,
                "  node [\n    id {}\n    label \"{}\"\n    main_project \"{}\"\n  ]\n",
                i.index(),
                gml_string(&node.name),
                gml_string(&node.main_project)
            );
        }
        for e in self.graph.edge_indices() {
            if let Some((u, v)) = self.graph.edge_endpoints(e) {
                let w = self.graph[e];
                let _ = write!(
                    out,
                    "  edge [\n    source {}\n    target {}\n    value {:.6}\n    shared_threads {}\n  ]\n",
                    u.index(),
                    v.index(),
                    (w as f64 + 1.0).ln(),
                    w
                );
            }
        }
        out.push_str("]\n");
        out
    }
}
