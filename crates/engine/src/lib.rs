//! # Blockwire Engine
//!
//! The Blockwire Engine turns a declarative graph of constants and blocks into
//! a running set of values. It resolves every node exactly once, binds links
//! to factory arguments and post-construction inputs, and coordinates start
//! and release of the produced resources.
//!
//! ## Key Features
//!
//! - **Constant parsing**: primitive, array, and well-known value kinds from string literals
//! - **Capability registry**: typed registration of factories, outputs, inputs, and lifecycle hooks
//! - **Memoized resolution**: demand-driven construction with cycle detection
//! - **Lifecycle coordination**: start in creation order, release in reverse with aggregated failures
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use blockwire_engine::{CapabilityRegistry, NodeId, Param, Shape, TypeBuilder, launch, load_graph_file};
//!
//! #[derive(Clone)]
//! struct Counter {
//!     count: i32,
//! }
//!
//! let registry = CapabilityRegistry::builder()
//!     .register(
//!         TypeBuilder::<Counter>::new("demo.Counter")
//!             .factory("of", [Param::new("value", Shape::Int)], |args| Ok(Counter { count: args.get(0)? })),
//!     )
//!     .build();
//!
//! let temp_dir = tempfile::tempdir()?;
//! let graph_path = temp_dir.path().join("graph.yaml");
//! std::fs::write(&graph_path, r#"
//! nodes:
//!   - { id: 1, kind: constant, factory: int, value: "42" }
//!   - { id: 2, factory: demo.Counter, method: of }
//! links:
//!   - { source: 1, target: 2, slot: value }
//! "#)?;
//!
//! let graph = load_graph_file(&graph_path)?;
//! let mut app = launch(&graph, Arc::new(registry))?;
//! assert_eq!(app.with_value(NodeId(2), |counter: &Counter| counter.count), Some(42));
//! app.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`value`**: type-erased values and bound factory arguments
//! - **`capability`**: the registration table of per-type capabilities
//! - **`constant`**: literal parsing for constant nodes
//! - **`resolver`**: memoized resolution and input wiring
//! - **`lifecycle`**: start and release ordering
//! - **`app`**: the caller-facing runtime handle

use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use tracing::debug;

pub mod app;
pub mod capability;
pub mod constant;
pub mod error;
pub mod lifecycle;
pub mod resolver;
pub mod value;

pub use app::{NodeSummary, RuntimeApp, RuntimeSummary};
pub use blockwire_types::{Graph, GraphDocument, GraphError, Link, LinkGroup, Node, NodeId, NodeKind, Origin, SourceSlot};
pub use capability::{CapabilityRegistry, CapabilityRegistryBuilder, TypeBuilder, TypeCapabilities};
pub use constant::{Charset, Locale, resolve_constant};
pub use error::{Capability, EngineError, ReleaseFailure, TeardownError};
pub use lifecycle::LifecycleCoordinator;
pub use resolver::{GraphResolver, ResolutionReport};
pub use value::{Arg, Args, Param, Shape, Value};

/// Options applied by [`launch_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Start every startable value as soon as wiring completes.
    pub start_on_launch: bool,
}

/// Resolves and wires `graph` against `registry`.
///
/// Startables are not started; call [`RuntimeApp::run`] for that. The caller
/// owns the returned handle and should call [`RuntimeApp::close`] exactly once.
pub fn launch(graph: &Graph, registry: Arc<CapabilityRegistry>) -> Result<RuntimeApp, EngineError> {
    launch_with_options(graph, registry, EngineOptions::default())
}

/// Like [`launch`], optionally starting the runtime before returning it.
///
/// A start failure releases everything that was created and is returned
/// with any release failure attached.
pub fn launch_with_options(graph: &Graph, registry: Arc<CapabilityRegistry>, options: EngineOptions) -> Result<RuntimeApp, EngineError> {
    let mut app = GraphResolver::new(graph, registry).resolve()?;
    if options.start_on_launch {
        app.run()?;
    }
    Ok(app)
}

/// Loads a graph document from the filesystem.
///
/// Files ending in `.json` are parsed as JSON; anything else is parsed as
/// YAML. The document is validated while being turned into a [`Graph`].
///
/// # Errors
///
/// - [`EngineError::Load`] when the file cannot be read or is not a valid document
/// - [`EngineError::Graph`] when the document violates a graph invariant
pub fn load_graph_file(path: impl AsRef<Path>) -> Result<Graph, EngineError> {
    let path = path.as_ref();
    let document = read_document(path).map_err(|source| EngineError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), nodes = document.nodes.len(), links = document.links.len(), "graph document loaded");
    Ok(document.into_graph()?)
}

fn read_document(path: &Path) -> anyhow::Result<GraphDocument> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read graph file: {}", path.display()))?;
    let is_json = path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).context("invalid JSON graph document")
    } else {
        serde_yaml::from_str(&content).context("invalid YAML graph document")
    }
}
