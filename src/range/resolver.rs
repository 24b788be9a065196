//! range::resolver
//!
//! Resolution of range requirements against known versions.
//!
//! # Procedure
//!
//! 1. Gather candidates from the local cache, plus remote search results
//!    when the policy asks to check remotes (merged, never replacing)
//! 2. Deduplicate by version, local entries winning, and sort descending
//! 3. Pick the first candidate inside the range
//!
//! # Memoisation
//!
//! Answers (including "nothing matches") are memoised per resolver, keyed by
//! name, user, channel, expression text and policy. One resolver lives for
//! one graph build, so every distinct query gathers candidates at most once
//! no matter how many requirers share it. [`RangeResolver::gather_passes`]
//! counts the passes that actually ran.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use super::expr::VersionRange;
use crate::core::cache::PackageCache;
use crate::core::ops::CacheError;
use crate::core::reference::Reference;
use crate::core::version::Version;
use crate::remote::{RecipeQuery, RemoteError, RemoteManager, Remotes};

/// Errors from range resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No candidate satisfies the expression.
    #[error("version range '{expression}' from requirement '{name}' could not be resolved")]
    Unsatisfiable { expression: String, name: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Remote policy for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UpdatePolicy {
    /// Also look at remotes, not just the local cache.
    pub check_remote: bool,
    /// Restrict remote lookups to this remote.
    pub remote: Option<String>,
}

impl UpdatePolicy {
    /// Local cache only.
    pub fn local() -> Self {
        Self::default()
    }

    /// Local cache plus remotes (`remote` selects a single one).
    pub fn check_remote(remote: Option<String>) -> Self {
        Self {
            check_remote: true,
            remote,
        }
    }
}

/// One range query.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    pub name: String,
    pub user: String,
    pub channel: String,
    pub range: VersionRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    name: String,
    user: String,
    channel: String,
    expression: String,
    check_remote: bool,
    remote: Option<String>,
}

/// Range resolver scoped to one build.
pub struct RangeResolver<'a> {
    cache: &'a PackageCache,
    remotes: &'a Remotes,
    manager: &'a dyn RemoteManager,
    memo: HashMap<MemoKey, Option<Reference>>,
    gather_passes: usize,
}

impl<'a> RangeResolver<'a> {
    pub fn new(
        cache: &'a PackageCache,
        remotes: &'a Remotes,
        manager: &'a dyn RemoteManager,
    ) -> Self {
        Self {
            cache,
            remotes,
            manager,
            memo: HashMap::new(),
            gather_passes: 0,
        }
    }

    /// Number of candidate-gathering passes run so far.
    pub fn gather_passes(&self) -> usize {
        self.gather_passes
    }

    /// Resolve `query` to the highest satisfying reference.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Unsatisfiable`] when no candidate matches
    /// - cache or remote errors while gathering candidates
    pub async fn resolve(
        &mut self,
        query: &RangeQuery,
        policy: &UpdatePolicy,
    ) -> Result<Reference, ResolveError> {
        let key = MemoKey {
            name: query.name.clone(),
            user: query.user.clone(),
            channel: query.channel.clone(),
            expression: query.range.as_str().to_string(),
            check_remote: policy.check_remote,
            remote: policy.remote.clone(),
        };

        let answer = match self.memo.get(&key).cloned() {
            Some(answer) => {
                debug!(name = %query.name, range = %query.range, "range answered from memo");
                answer
            }
            None => {
                let candidates = self.gather(query, policy).await?;
                let answer = candidates
                    .into_iter()
                    .find(|(version, _)| query.range.satisfies(version))
                    .map(|(_, reference)| reference);
                self.memo.insert(key, answer.clone());
                answer
            }
        };

        match answer {
            Some(reference) => {
                info!(name = %query.name, range = %query.range, resolved = %reference, "version range resolved");
                Ok(reference)
            }
            None => Err(ResolveError::Unsatisfiable {
                expression: query.range.as_str().to_string(),
                name: query.name.clone(),
            }),
        }
    }

    /// Candidates sorted by version, highest first, unique per version.
    async fn gather(
        &mut self,
        query: &RangeQuery,
        policy: &UpdatePolicy,
    ) -> Result<Vec<(Version, Reference)>, ResolveError> {
        self.gather_passes += 1;

        let mut found =
            self.cache
                .search_references(&query.name, Some(&query.user), Some(&query.channel))?;

        if policy.check_remote {
            let remote_query =
                RecipeQuery::with_user_channel(&query.name, &query.user, &query.channel);
            for remote in self.remotes.candidates(policy.remote.as_deref())? {
                let results = self.manager.search_recipes(&remote_query, remote).await?;
                if !results.is_empty() {
                    debug!(remote = %remote.name, count = results.len(), "remote candidates found");
                    found.extend(results);
                    break;
                }
            }
        }

        let mut candidates: Vec<(Version, Reference)> = Vec::new();
        for reference in found {
            let Ok(version) = Version::parse(reference.version()) else {
                continue;
            };
            // Local entries come first, so the first copy of a version wins.
            if candidates.iter().any(|(v, _)| *v == version) {
                continue;
            }
            candidates.push((version, reference.without_revision()));
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(candidates)
    }
}
