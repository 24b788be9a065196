//! engine::builder
//!
//! Builds the dependency graph of a set of top-level requirements.
//!
//! # Algorithm
//!
//! Requirements are processed breadth-first from the synthetic root. For
//! each one:
//!
//! 1. A private requirement opens a new visibility scope and always gets
//!    its own node. The subtree below it sees the outer scopes; the outer
//!    scopes never see into it.
//! 2. Otherwise an override recorded for the name in a visible scope
//!    replaces the requested target.
//! 3. A visible node with the same name is shared when it satisfies the
//!    requirement (diamond unification). On a mismatch an overriding node
//!    wins; an overriding requirement is recorded and the pass restarts
//!    from the root; anything else is a [`GraphError::VersionConflict`].
//! 4. With no visible node the requirement is resolved (ranges through the
//!    [`RangeResolver`]), its recipe looked up, and its own requirements
//!    queued.
//!
//! Restarts are bounded: each one records a new override, and recording the
//! same override twice is a conflict.
//!
//! # Invariants
//!
//! - The graph is acyclic; sharing a node that reaches its requirer is a
//!   [`GraphError::Loop`]
//! - Every decision is logged, and the log survives a failed build
//! - Any error aborts the build; no partial graph escapes

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use tracing::{debug, info};

use super::decision::Decision;
use super::proxy::{lookup_recipe, LookupError, RecipeCache, RecipeLookup};
use super::Session;
use crate::core::graph::{DepsGraph, NodeId, NodeState};
use crate::core::reference::Reference;
use crate::core::version::Version;
use crate::range::{RangeQuery, RangeResolver, ResolveError, UpdatePolicy};
use crate::recipe::{Requirement, RequirementTarget};

/// Errors that abort a graph build.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("recipe '{reference}' required by '{requirer}' was not found")]
    RecipeNotFound { reference: Reference, requirer: String },

    #[error(
        "conflict on '{name}': '{requirer}' requires '{requested}' but '{existing_requirer}' already resolved '{existing}'"
    )]
    VersionConflict {
        name: String,
        existing: Reference,
        existing_requirer: String,
        requested: String,
        requirer: String,
    },

    #[error("loop detected: '{requirer}' requires '{reference}', which already depends on it")]
    Loop { reference: Reference, requirer: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// A finished build: the graph plus the decisions that shaped it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub graph: DepsGraph,
    pub decisions: Vec<Decision>,
}

impl Resolution {
    /// Decisions where an override replaced a request.
    pub fn overridden(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.is_override())
    }
}

// =============================================================================
// Pass state
// =============================================================================

/// Names visible to the requirements processed inside it.
#[derive(Debug)]
struct Scope {
    /// Stable across passes: built from the chain of private requirements.
    key: String,
    parent: Option<usize>,
    names: HashMap<String, NodeId>,
}

/// How a node entered the graph.
#[derive(Debug)]
struct Origin {
    requirer: String,
    overriding: bool,
}

#[derive(Debug)]
struct Queued {
    requirer: NodeId,
    requirement: Requirement,
    scope: usize,
}

#[derive(Debug)]
struct Pass {
    graph: DepsGraph,
    scopes: Vec<Scope>,
    origins: HashMap<NodeId, Origin>,
    queue: VecDeque<Queued>,
}

impl Pass {
    fn new() -> Self {
        Self {
            graph: DepsGraph::new(),
            scopes: vec![Scope {
                key: String::new(),
                parent: None,
                names: HashMap::new(),
            }],
            origins: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    fn open_scope(&mut self, parent: usize, opened_by: &Requirement) -> usize {
        let key = format!("{}/{}", self.scopes[parent].key, opened_by);
        self.scopes.push(Scope {
            key,
            parent: Some(parent),
            names: HashMap::new(),
        });
        self.scopes.len() - 1
    }

    /// Scope indices from `scope` up to the global one.
    fn chain(&self, scope: usize) -> Vec<usize> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.scopes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Closest visible node named `name` and the scope holding it.
    fn visible(&self, scope: usize, name: &str) -> Option<(NodeId, usize)> {
        self.chain(scope)
            .into_iter()
            .find_map(|s| self.scopes[s].names.get(name).map(|id| (*id, s)))
    }

    fn label(&self, id: NodeId) -> String {
        self.graph.node(id).map(|n| n.to_string()).unwrap_or_default()
    }

    fn reference(&self, id: NodeId) -> Option<Reference> {
        self.graph.node(id).and_then(|n| n.reference().cloned())
    }
}

enum Step {
    Continue,
    Restart,
}

// =============================================================================
// Builder
// =============================================================================

/// Graph builder for one resolution call.
///
/// Owns the range memo and the recipe cache for the call; both are dropped
/// with the builder.
pub struct GraphBuilder<'a> {
    session: Session<'a>,
    policy: UpdatePolicy,
    resolver: RangeResolver<'a>,
    recipes: RecipeCache,
    decisions: Vec<Decision>,
    forced: HashMap<(String, String), Reference>,
    passes: usize,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(session: Session<'a>, policy: UpdatePolicy) -> Self {
        Self {
            resolver: RangeResolver::new(session.cache, session.remotes, session.manager),
            session,
            policy,
            recipes: RecipeCache::new(),
            decisions: Vec::new(),
            forced: HashMap::new(),
            passes: 0,
        }
    }

    /// Decisions of the latest pass, also after a failed build.
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Candidate-gathering passes run by the range resolver.
    pub fn gather_passes(&self) -> usize {
        self.resolver.gather_passes()
    }

    /// Number of graph passes, restarts included.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Build the graph of `requirements`.
    pub async fn build(&mut self, requirements: &[Requirement]) -> Result<Resolution, GraphError> {
        loop {
            self.passes += 1;
            self.decisions.clear();
            debug!(pass = self.passes, "starting graph pass");

            if let Some(graph) = self.run_pass(requirements).await? {
                info!(nodes = graph.len() - 1, passes = self.passes, "dependency graph built");
                return Ok(Resolution {
                    graph,
                    decisions: self.decisions.clone(),
                });
            }
        }
    }

    /// One pass from the root. `None` means an override was recorded.
    async fn run_pass(&mut self, requirements: &[Requirement]) -> Result<Option<DepsGraph>, GraphError> {
        let mut pass = Pass::new();
        let root = pass.graph.root();
        pass.origins.insert(
            root,
            Origin {
                requirer: String::new(),
                overriding: false,
            },
        );
        for requirement in requirements {
            pass.queue.push_back(Queued {
                requirer: root,
                requirement: requirement.clone(),
                scope: 0,
            });
        }
        pass.graph.set_state(root, NodeState::Expanded);

        while let Some(item) = pass.queue.pop_front() {
            match self.process(&mut pass, item).await? {
                Step::Continue => {}
                Step::Restart => return Ok(None),
            }
        }

        pass.graph.complete_all();
        Ok(Some(pass.graph))
    }

    async fn process(&mut self, pass: &mut Pass, item: Queued) -> Result<Step, GraphError> {
        let requirer = pass.label(item.requirer);
        let mut requirement = item.requirement;

        if requirement.is_private() {
            let scope = pass.open_scope(item.scope, &requirement);
            let overriding = requirement.is_override();
            self.create_node(pass, item.requirer, &requirer, &requirement, scope, overriding)
                .await?;
            return Ok(Step::Continue);
        }

        let mut overriding = requirement.is_override();
        if let Some(winner) = self.forced_for(pass, item.scope, requirement.name()) {
            let unchanged = matches!(
                requirement.target(),
                RequirementTarget::Pinned(r) if r.eq_with_revision(&winner)
            );
            if !unchanged {
                self.decisions.push(Decision::Overridden {
                    requirer: requirer.clone(),
                    requested: requirement.to_string(),
                    winner: winner.clone(),
                });
                debug!(%requirer, requested = %requirement, %winner, "override applied");
            }
            requirement = requirement.retarget(winner);
            overriding = true;
        }

        let Some((existing, owner_scope)) = pass.visible(item.scope, requirement.name()) else {
            self.create_node(pass, item.requirer, &requirer, &requirement, item.scope, overriding)
                .await?;
            return Ok(Step::Continue);
        };

        let Some(existing_ref) = pass.reference(existing) else {
            return Ok(Step::Continue);
        };
        if self.check_existing(&requirer, &requirement, &existing_ref) {
            link(pass, item.requirer, existing, &existing_ref, &requirer)?;
            self.decisions.push(Decision::Unified {
                requirer: requirer.clone(),
                reference: existing_ref,
            });
            return Ok(Step::Continue);
        }

        let (existing_overriding, existing_requirer) = pass
            .origins
            .get(&existing)
            .map(|o| (o.overriding, o.requirer.clone()))
            .unwrap_or_default();
        if existing_overriding {
            link(pass, item.requirer, existing, &existing_ref, &requirer)?;
            self.decisions.push(Decision::Overridden {
                requirer: requirer.clone(),
                requested: requirement.to_string(),
                winner: existing_ref,
            });
            return Ok(Step::Continue);
        }

        if requirement.is_override() {
            let winner = self.concrete(&requirement).await?;
            let key = (pass.scopes[owner_scope].key.clone(), requirement.name().to_string());
            if self.forced.contains_key(&key) {
                return Err(self.conflict(&requirement, existing_ref, existing_requirer, requirer));
            }
            info!(%requirer, %winner, replaces = %existing_ref, "override recorded, restarting graph");
            self.forced.insert(key, winner);
            return Ok(Step::Restart);
        }

        Err(self.conflict(&requirement, existing_ref, existing_requirer, requirer))
    }

    /// Whether `existing` satisfies `requirement`, logging range checks.
    fn check_existing(&mut self, requirer: &str, requirement: &Requirement, existing: &Reference) -> bool {
        match requirement.target() {
            RequirementTarget::Pinned(reference) => reference == existing,
            RequirementTarget::Range {
                user,
                channel,
                range,
                ..
            } => {
                let same_stream = existing.user() == user && existing.channel() == channel;
                let inside = Version::parse(existing.version())
                    .map(|v| range.satisfies(&v))
                    .unwrap_or(false);
                if same_stream && inside {
                    self.decisions.push(Decision::RangeValid {
                        requirer: requirer.to_string(),
                        range: range.to_string(),
                        reference: existing.clone(),
                    });
                    true
                } else {
                    self.decisions.push(Decision::RangeInvalid {
                        requirer: requirer.to_string(),
                        range: range.to_string(),
                        existing: existing.clone(),
                    });
                    false
                }
            }
        }
    }

    fn conflict(
        &mut self,
        requirement: &Requirement,
        existing: Reference,
        existing_requirer: String,
        requirer: String,
    ) -> GraphError {
        self.decisions.push(Decision::ConflictRejected {
            requirer: requirer.clone(),
            requested: requirement.to_string(),
            existing: existing.clone(),
        });
        GraphError::VersionConflict {
            name: requirement.name().to_string(),
            existing,
            existing_requirer,
            requested: requirement.to_string(),
            requirer,
        }
    }

    fn forced_for(&self, pass: &Pass, scope: usize, name: &str) -> Option<Reference> {
        pass.chain(scope).into_iter().find_map(|s| {
            self.forced
                .get(&(pass.scopes[s].key.clone(), name.to_string()))
                .cloned()
        })
    }

    /// The reference a requirement points at, resolving ranges.
    async fn concrete(&mut self, requirement: &Requirement) -> Result<Reference, GraphError> {
        match requirement.target() {
            RequirementTarget::Pinned(reference) => Ok(reference.clone()),
            RequirementTarget::Range {
                name,
                user,
                channel,
                range,
            } => {
                let query = RangeQuery {
                    name: name.clone(),
                    user: user.clone(),
                    channel: channel.clone(),
                    range: range.clone(),
                };
                Ok(self.resolver.resolve(&query, &self.policy).await?)
            }
        }
    }

    async fn create_node(
        &mut self,
        pass: &mut Pass,
        requirer_id: NodeId,
        requirer: &str,
        requirement: &Requirement,
        scope: usize,
        overriding: bool,
    ) -> Result<NodeId, GraphError> {
        let reference = self.concrete(requirement).await?;
        let id = pass.graph.add_node(reference.clone(), None);

        let lookup = lookup_recipe(&self.session, &reference, &self.policy, &mut self.recipes).await?;
        let (resolved, recipe, remote) = match lookup {
            RecipeLookup::FoundLocally { reference, recipe } => (reference, recipe, None),
            RecipeLookup::FoundRemotely {
                reference,
                recipe,
                remote,
            } => (reference, recipe, Some(remote)),
            RecipeLookup::NotFound => {
                return Err(GraphError::RecipeNotFound {
                    reference,
                    requirer: requirer.to_string(),
                })
            }
        };

        pass.graph.resolve_node(id, resolved.clone(), recipe.clone());
        pass.graph.set_remote(id, remote);
        pass.graph.set_private(id, requirement.is_private());
        pass.graph.add_edge(requirer_id, id);
        pass.scopes[scope]
            .names
            .insert(resolved.name().to_string(), id);
        pass.origins.insert(
            id,
            Origin {
                requirer: requirer.to_string(),
                overriding,
            },
        );

        self.decisions.push(Decision::Resolved {
            requirer: requirer.to_string(),
            requirement: requirement.to_string(),
            reference: resolved.clone(),
        });
        debug!(%requirer, reference = %resolved.full_text(), node = %id, "node resolved");

        for child in recipe.requirements() {
            pass.queue.push_back(Queued {
                requirer: id,
                requirement: child,
                scope,
            });
        }
        pass.graph.set_state(id, NodeState::Expanded);
        Ok(id)
    }
}

/// Add `from -> to` unless it would close a cycle.
fn link(pass: &mut Pass, from: NodeId, to: NodeId, reference: &Reference, requirer: &str) -> Result<(), GraphError> {
    if pass.graph.reaches(to, from) {
        return Err(GraphError::Loop {
            reference: reference.clone(),
            requirer: requirer.to_string(),
        });
    }
    pass.graph.add_edge(from, to);
    Ok(())
}
