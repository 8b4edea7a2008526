//! # Graph Resolution
//!
//! Turns a validated [`Graph`] into live values. Every node is produced at
//! most once per run; later requests are served from the memo. Resolution
//! is demand-driven: resolving a block first resolves its parent (for
//! dependent factories) and every source feeding its arguments.
//!
//! A full run has three phases:
//! 1. constants, in ascending id order;
//! 2. every remaining node, in ascending id order;
//! 3. wiring: every input link group is bound against the already-resolved
//!    values, then all mutators are invoked in plan order.
//!
//! Any failure stops the run and releases whatever was created so far.

mod state;
mod wiring;

use std::sync::Arc;

use blockwire_types::{Graph, GraphError, Link, Node, NodeId, NodeKind, Origin, SourceSlot};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::{
    app::RuntimeApp,
    capability::CapabilityRegistry,
    constant::resolve_constant,
    error::EngineError,
    lifecycle::LifecycleCoordinator,
    value::{Arg, Args, Param, Value},
};
use state::ResolutionState;

/// Counters describing the work one resolution run performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub constants_resolved: usize,
    pub blocks_constructed: usize,
    /// Distinct accessor invocations; repeated reads of one output hit the cache.
    pub accessor_calls: usize,
    pub wiring_calls: usize,
}

/// Single-run resolver over one graph.
pub struct GraphResolver<'g> {
    graph: &'g Graph,
    registry: Arc<CapabilityRegistry>,
    state: ResolutionState,
    lifecycle: LifecycleCoordinator,
    report: ResolutionReport,
}

impl<'g> GraphResolver<'g> {
    pub fn new(graph: &'g Graph, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            graph,
            registry,
            state: ResolutionState::with_max_node_id(graph.max_node_id()),
            lifecycle: LifecycleCoordinator::new(),
            report: ResolutionReport::default(),
        }
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }

    /// Resolves and wires the whole graph.
    ///
    /// On failure every closeable created so far is released in reverse
    /// creation order; release failures ride along on the returned error.
    pub fn resolve(mut self) -> Result<RuntimeApp, EngineError> {
        info!(nodes = self.graph.len(), types = self.registry.len(), "resolving graph");
        if let Err(error) = self.resolve_all() {
            return Err(self.abort(error));
        }
        info!(
            constants = self.report.constants_resolved,
            blocks = self.report.blocks_constructed,
            accessor_calls = self.report.accessor_calls,
            wiring_calls = self.report.wiring_calls,
            "graph resolved"
        );
        let values = std::mem::take(&mut self.state).into_values();
        let lifecycle = std::mem::take(&mut self.lifecycle);
        Ok(RuntimeApp::new(values, lifecycle, std::mem::take(&mut self.report)))
    }

    /// Releases everything created so far and forgets every memoized value.
    fn abort(&mut self, error: EngineError) -> EngineError {
        warn!(node = ?error.node(), error = %error, "resolution failed; releasing created resources");
        let teardown = self.lifecycle.close().err();
        self.state = ResolutionState::with_max_node_id(self.graph.max_node_id());
        error.with_teardown(teardown)
    }

    fn resolve_all(&mut self) -> Result<(), EngineError> {
        let graph = self.graph;
        for node in graph.nodes().filter(|node| node.is_constant()) {
            self.produce(node.id)?;
        }
        for node in graph.nodes() {
            self.produce(node.id)?;
        }
        let plan = self.plan_wiring()?;
        self.apply_wiring(plan)
    }

    /// Produces the value of one node, constructing its dependencies on demand.
    ///
    /// A failure releases every closeable this resolver created and clears
    /// the memo, so released values are never handed out again.
    pub fn resolve_node(&mut self, id: NodeId) -> Result<Value, EngineError> {
        self.produce(id).map_err(|error| self.abort(error))
    }

    fn produce(&mut self, id: NodeId) -> Result<Value, EngineError> {
        if let Some(value) = self.state.value(id) {
            trace!(node = %id, "memo hit");
            return Ok(value.clone());
        }
        let graph = self.graph;
        let node = graph.node(id).ok_or(GraphError::UnknownNode { node: id })?;
        match &node.kind {
            NodeKind::Constant { producer_kind, literal } => {
                let value = resolve_constant(id, producer_kind, literal, &self.registry)?;
                debug!(node = %id, kind = %producer_kind, "constant resolved");
                self.report.constants_resolved += 1;
                Ok(self.record(id, value))
            }
            NodeKind::Block { origin } => self.construct(node, origin),
        }
    }

    fn construct(&mut self, node: &Node, origin: &Origin) -> Result<Value, EngineError> {
        let id = node.id;
        if self.state.is_in_progress(id) {
            return Err(EngineError::CircularDependency {
                node: id,
                in_progress: self.state.in_progress(),
            });
        }
        self.state.begin(id);
        match self.invoke_factory(id, origin) {
            Ok(value) => {
                debug!(node = %id, origin = %node.describe(), produced = value.type_name(), "block constructed");
                self.report.blocks_constructed += 1;
                Ok(self.record(id, value))
            }
            Err(error) => {
                self.state.abandon(id);
                Err(error)
            }
        }
    }

    fn invoke_factory(&mut self, id: NodeId, origin: &Origin) -> Result<Value, EngineError> {
        match origin {
            Origin::Static { type_name, operation } => {
                let factory = self.registry.static_factory(id, type_name, operation)?;
                let args = self.bind_arguments(id, factory.params())?;
                trace!(node = %id, type_name = %type_name, operation = %operation, args = args.len(), "invoking static factory");
                factory
                    .invoke(&args)
                    .map_err(|source| EngineError::Resolution { node: id, source })
            }
            Origin::Dependent { parent, operation } => {
                let receiver = self.produce(*parent)?;
                let factory = self.registry.instance_factory(id, &receiver, operation)?;
                let args = self.bind_arguments(id, factory.params())?;
                trace!(node = %id, parent = %parent, operation = %operation, args = args.len(), "invoking instance factory");
                factory
                    .invoke(&receiver, &args)
                    .map_err(|source| EngineError::Resolution { node: id, source })
            }
        }
    }

    fn bind_arguments(&mut self, id: NodeId, params: &[Param]) -> Result<Args, EngineError> {
        let graph = self.graph;
        let mut bound = Vec::with_capacity(params.len());
        for param in params {
            bound.push(self.bind_slot(param, graph.argument_links(id, &param.name))?);
        }
        Ok(Args::new(bound))
    }

    /// Binds the links feeding one parameter. Unbound parameters get their zero argument.
    fn bind_slot(&mut self, param: &Param, links: &[Link]) -> Result<Arg, EngineError> {
        match links {
            [] => Ok(param.zero_argument()),
            _ if param.variadic => links
                .iter()
                .map(|link| self.project(link))
                .collect::<Result<Vec<_>, _>>()
                .map(Arg::List),
            [first, ..] => self.project(first).map(Arg::Single),
        }
    }

    /// Value a link delivers: the whole source, or one of its outputs.
    fn project(&mut self, link: &Link) -> Result<Value, EngineError> {
        let source = self.produce(link.source)?;
        let output = match &link.source_slot {
            SourceSlot::Whole => return Ok(source),
            SourceSlot::Output(output) => output,
        };
        if let Some(cached) = self.state.cached_output(link.source, output) {
            trace!(node = %link.source, output = %output, "output cache hit");
            return Ok(cached.clone());
        }

        let accessor = self.registry.output(link.source, &source, output)?;
        let value = accessor.read(&source).map_err(|error| EngineError::Resolution {
            node: link.source,
            source: error.context(format!("reading output '{output}'")),
        })?;
        self.report.accessor_calls += 1;
        self.state.cache_output(link.source, output, value.clone());
        Ok(value)
    }

    /// Memoizes a produced value and hands it to lifecycle tracking.
    fn record(&mut self, id: NodeId, value: Value) -> Value {
        if let Some(capabilities) = self.registry.lifecycle_of(&value) {
            self.lifecycle.track(id, &value, &capabilities);
        }
        self.state.finish(id, value.clone());
        value
    }
}

impl Drop for GraphResolver<'_> {
    fn drop(&mut self) {
        if !self.lifecycle.has_pending_release() {
            return;
        }
        warn!(pending = self.lifecycle.closeable_nodes().len(), "resolver dropped before launch; releasing");
        if let Err(failure) = self.lifecycle.close() {
            error!(error = %failure, "release failed while dropping resolver");
        }
    }
}
