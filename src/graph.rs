//! Immutable graph configuration: the step registry and the edge table.
//!
//! A [`Graph`] is built once through [`GraphBuilder`], validated, and then
//! shared by any number of [`Workflow`](crate::Workflow)s. It also acts as the
//! router: [`Graph::resolve`] turns a node's [`Transition`] into the next step.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::collaborator::{EntitlementLedger, Reasoner};
use crate::instrumented::InstrumentedNode;
use crate::step::{
    CheckBalanceNode, ClassifyNode, Node, ProcessLeaveNode, ReplyGenerator, StepId, TerminalNode,
    Transition,
};
use crate::{Error, GraphError, Result, WorkflowConfig};

/// The outgoing edge of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    /// Always continue to this step.
    Fixed(StepId),
    /// Continue to whichever allowed step the node picks.
    Conditional(Vec<StepId>),
    /// Stop the run.
    Terminal,
}

impl Edge {
    fn targets(&self) -> &[StepId] {
        match self {
            Edge::Fixed(to) => std::slice::from_ref(to),
            Edge::Conditional(to) => to,
            Edge::Terminal => &[],
        }
    }
}

/// Where the router sends the run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Step(StepId),
    Terminal,
}

/// Builder for a [`Graph`].
///
/// # Example
///
/// ```rust
/// use leave_workflow::{GraphBuilder, StepId, ProcessLeaveNode, Edge};
///
/// let graph = GraphBuilder::new()
///     .node(StepId::ProcessLeave, ProcessLeaveNode)
///     .entry(StepId::ProcessLeave)
///     .terminal(StepId::ProcessLeave)
///     .build()
///     .unwrap();
/// assert_eq!(graph.edge(StepId::ProcessLeave), Some(&Edge::Terminal));
/// ```
#[derive(Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<StepId, Arc<dyn Node>>,
    edges: BTreeMap<StepId, Edge>,
    entry: Option<StepId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `id`, replacing any previous one.
    pub fn node<N: Node + 'static>(mut self, id: StepId, node: N) -> Self {
        self.nodes
            .insert(id, Arc::new(InstrumentedNode::new(node, id)));
        self
    }

    pub fn entry(mut self, id: StepId) -> Self {
        self.entry = Some(id);
        self
    }

    pub fn edge(mut self, from: StepId, to: StepId) -> Self {
        self.edges.insert(from, Edge::Fixed(to));
        self
    }

    /// Declare a conditional edge; `allowed` is the complete set of valid branches.
    pub fn conditional(mut self, from: StepId, allowed: impl IntoIterator<Item = StepId>) -> Self {
        self.edges
            .insert(from, Edge::Conditional(allowed.into_iter().collect()));
        self
    }

    pub fn terminal(mut self, id: StepId) -> Self {
        self.edges.insert(id, Edge::Terminal);
        self
    }

    /// Validate and freeze the graph.
    pub fn build(self) -> Result<Graph> {
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::UnknownStep(entry).into());
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownStep(*from).into());
            }
            if matches!(edge, Edge::Conditional(to) if to.is_empty()) {
                return Err(GraphError::EmptyBranch(*from).into());
            }
            if let Some(missing) = edge.targets().iter().find(|t| !self.nodes.contains_key(*t)) {
                return Err(GraphError::UnknownStep(*missing).into());
            }
        }
        if let Some(missing) = self.nodes.keys().find(|id| !self.edges.contains_key(*id)) {
            return Err(GraphError::MissingEdge(*missing).into());
        }
        if !self.edges.values().any(|e| *e == Edge::Terminal) {
            return Err(GraphError::NoTerminal.into());
        }

        let graph = Graph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }
}

/// A validated, immutable workflow graph.
pub struct Graph {
    nodes: BTreeMap<StepId, Arc<dyn Node>>,
    edges: BTreeMap<StepId, Edge>,
    entry: StepId,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("entry", &self.entry)
            .field("edges", &self.edges)
            .finish_non_exhaustive()
    }
}

impl Graph {
    pub fn entry(&self) -> StepId {
        self.entry
    }

    pub fn edge(&self, from: StepId) -> Option<&Edge> {
        self.edges.get(&from)
    }

    pub fn node(&self, id: StepId) -> Option<&Arc<dyn Node>> {
        self.nodes.get(&id)
    }

    /// Number of registered steps; an upper bound on steps per run.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve the edge leaving `from` given the node's chosen transition.
    ///
    /// Terminal and fixed edges ignore the node's choice. Conditional edges
    /// require a branch from their allow-list.
    pub fn resolve(&self, from: StepId, transition: Transition) -> Result<Next> {
        let edge = self
            .edges
            .get(&from)
            .ok_or_else(|| Error::routing(from, "step has no outgoing edge"))?;

        match (edge, transition) {
            (Edge::Terminal, _) => Ok(Next::Terminal),
            (Edge::Fixed(to), _) => Ok(Next::Step(*to)),
            (Edge::Conditional(_), Transition::End) => {
                Err(Error::routing(from, "step ended but its edge is conditional"))
            }
            (Edge::Conditional(allowed), Transition::Branch(to)) if allowed.contains(&to) => {
                Ok(Next::Step(to))
            }
            (Edge::Conditional(allowed), Transition::Branch(to)) => Err(Error::routing(
                from,
                format!("branch '{to}' is not one of {allowed:?}"),
            )),
            (Edge::Conditional(_), Transition::Continue) => {
                Err(Error::routing(from, "conditional edge but no branch was chosen"))
            }
        }
    }

    fn check_acyclic(&self) -> Result<()> {
        let mut done = BTreeSet::new();
        for &start in self.nodes.keys() {
            let mut path = Vec::new();
            self.visit(start, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        id: StepId,
        path: &mut Vec<StepId>,
        done: &mut BTreeSet<StepId>,
    ) -> Result<()> {
        if done.contains(&id) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|s| *s == id) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(id);
            return Err(GraphError::Cycle(cycle).into());
        }

        path.push(id);
        if let Some(edge) = self.edges.get(&id) {
            for &to in edge.targets() {
                self.visit(to, path, done)?;
            }
        }
        path.pop();
        done.insert(id);
        Ok(())
    }
}

/// The standard six-step leave workflow graph.
///
/// `classify -> checkBalance -> {process | reject}`, `process -> {approve | humanReview}`;
/// approve, reject and humanReview are terminal.
pub fn leave_graph(
    reasoner: Arc<dyn Reasoner>,
    ledger: Arc<dyn EntitlementLedger>,
    config: Arc<WorkflowConfig>,
) -> Result<Graph> {
    let replies = ReplyGenerator::new(reasoner.clone(), config.clone());

    GraphBuilder::new()
        .node(StepId::Classify, ClassifyNode::new(reasoner, config))
        .node(StepId::CheckBalance, CheckBalanceNode::new(ledger))
        .node(StepId::ProcessLeave, ProcessLeaveNode)
        .node(StepId::Approve, TerminalNode::approve(replies.clone()))
        .node(StepId::Reject, TerminalNode::reject(replies.clone()))
        .node(StepId::HumanReview, TerminalNode::human_review(replies))
        .entry(StepId::Classify)
        .edge(StepId::Classify, StepId::CheckBalance)
        .conditional(StepId::CheckBalance, [StepId::ProcessLeave, StepId::Reject])
        .conditional(StepId::ProcessLeave, [StepId::Approve, StepId::HumanReview])
        .terminal(StepId::Approve)
        .terminal(StepId::Reject)
        .terminal(StepId::HumanReview)
        .build()
}
