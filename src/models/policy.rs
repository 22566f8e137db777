// src/models/policy.rs

//! Traversal policies.
//!
//! A [`TraversalPolicy`] is an immutable tuple of three orthogonal axes:
//! how far edges are followed (`transitivity`), when an already-seen
//! document is re-handled (`freshness`), and how the fetch layer sources
//! the body (`fetch`). The processor reads only the first two; the fetch
//! axis rides along for the fetch layer.
//!
//! Policies are value objects. Transitions never mutate: [`TraversalPolicy::child_for`]
//! returns the policy a child request inherits across a given edge role.

use serde::{Deserialize, Serialize};

/// How far to follow edges out of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Transitivity {
    Shallow,
    DeepShallow,
    DeepDeep,
}

/// When to re-handle a document that is already in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Freshness {
    Always,
    Match,
    Version,
    Mutables,
}

/// How the fetch layer should source the document body.
///
/// Consumed by the fetch layer only; the processor never reads this axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchStrategy {
    None,
    Storage,
    OriginStorage,
    Mutables,
    Always,
}

/// The role of an edge at an enqueue site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRole {
    /// Next page of the same collection.
    CollectionPage,
    /// Element of a top-level listing (`orgs`, `users`).
    RootCollectionElement,
    /// Element of an interior collection.
    CollectionElement,
    /// Singleton outbound reference (owner, actor, ...).
    Resource,
}

/// Verdict of the freshness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Process,
    Skip,
    /// Stored version is strictly newer than the running processor; skip,
    /// and the caller logs it at warn level.
    SkipNewer,
}

/// An immutable traversal policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalPolicy {
    pub transitivity: Transitivity,
    pub freshness: Freshness,
    pub fetch: FetchStrategy,
}

impl TraversalPolicy {
    pub fn new(transitivity: Transitivity, freshness: Freshness, fetch: FetchStrategy) -> Self {
        Self {
            transitivity,
            freshness,
            fetch,
        }
    }

    /// Default crawl policy: follow collections deeply, stop one level past
    /// resources, reprocess when the stored version is stale.
    pub fn standard() -> Self {
        Self::new(
            Transitivity::DeepShallow,
            Freshness::Version,
            FetchStrategy::OriginStorage,
        )
    }

    /// User-initiated force refresh: everything is refetched and re-handled.
    pub fn refresh() -> Self {
        Self::new(
            Transitivity::DeepDeep,
            Freshness::Always,
            FetchStrategy::Always,
        )
    }

    /// Event-feed policy: events are deduplicated upstream by the finder,
    /// so each delivered event is always handled.
    pub fn events() -> Self {
        Self::new(
            Transitivity::DeepShallow,
            Freshness::Always,
            FetchStrategy::OriginStorage,
        )
    }

    /// Resolve a policy preset by name.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "standard" | "default" => Some(Self::standard()),
            "refresh" | "update" => Some(Self::refresh()),
            "events" => Some(Self::events()),
            _ => None,
        }
    }

    /// The policy a child request inherits across an edge of the given role.
    ///
    /// Transitivity follows the transition table; freshness and fetch
    /// propagate unchanged, except that a force-refresh freshness (`always`)
    /// decays to `match` on exactly the edges where transitivity decays.
    pub fn child_for(&self, role: EdgeRole) -> Self {
        use EdgeRole::*;
        use Transitivity::*;

        let transitivity = match (self.transitivity, role) {
            (Shallow, _) => Shallow,
            (DeepShallow, CollectionPage) => DeepShallow,
            (DeepShallow, RootCollectionElement) => Shallow,
            (DeepShallow, CollectionElement) => DeepShallow,
            (DeepShallow, Resource) => Shallow,
            (DeepDeep, CollectionPage) => DeepDeep,
            (DeepDeep, RootCollectionElement) => DeepShallow,
            (DeepDeep, CollectionElement) => DeepShallow,
            (DeepDeep, Resource) => DeepShallow,
        };

        let freshness = if transitivity != self.transitivity && self.freshness == Freshness::Always
        {
            Freshness::Match
        } else {
            self.freshness
        };

        Self {
            transitivity,
            freshness,
            fetch: self.fetch,
        }
    }

    /// Apply the freshness gate against stored state.
    ///
    /// `stored_version`/`stored_etag` describe what the store already holds;
    /// `current_version` is the running processor's version and
    /// `fetched_etag` the etag of the freshly fetched response.
    pub fn gate(
        &self,
        stored_version: Option<u32>,
        current_version: u32,
        stored_etag: Option<&str>,
        fetched_etag: Option<&str>,
    ) -> GateVerdict {
        match self.freshness {
            Freshness::Always => GateVerdict::Process,
            Freshness::Match => match (stored_etag, fetched_etag) {
                (Some(stored), Some(fetched)) if stored == fetched => GateVerdict::Skip,
                _ => GateVerdict::Process,
            },
            Freshness::Version | Freshness::Mutables => match stored_version {
                Some(stored) if stored > current_version => GateVerdict::SkipNewer,
                Some(stored) if stored == current_version => GateVerdict::Skip,
                _ => GateVerdict::Process,
            },
        }
    }
}

impl Default for TraversalPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(transitivity: Transitivity) -> TraversalPolicy {
        TraversalPolicy::new(transitivity, Freshness::Version, FetchStrategy::OriginStorage)
    }

    #[test]
    fn test_transition_table_shallow() {
        use EdgeRole::*;
        for role in [CollectionPage, RootCollectionElement, CollectionElement, Resource] {
            assert_eq!(
                policy(Transitivity::Shallow).child_for(role).transitivity,
                Transitivity::Shallow
            );
        }
    }

    #[test]
    fn test_transition_table_deep_shallow() {
        use EdgeRole::*;
        let parent = policy(Transitivity::DeepShallow);
        assert_eq!(
            parent.child_for(CollectionPage).transitivity,
            Transitivity::DeepShallow
        );
        assert_eq!(
            parent.child_for(RootCollectionElement).transitivity,
            Transitivity::Shallow
        );
        assert_eq!(
            parent.child_for(CollectionElement).transitivity,
            Transitivity::DeepShallow
        );
        assert_eq!(
            parent.child_for(Resource).transitivity,
            Transitivity::Shallow
        );
    }

    #[test]
    fn test_transition_table_deep_deep() {
        use EdgeRole::*;
        let parent = policy(Transitivity::DeepDeep);
        assert_eq!(
            parent.child_for(CollectionPage).transitivity,
            Transitivity::DeepDeep
        );
        assert_eq!(
            parent.child_for(RootCollectionElement).transitivity,
            Transitivity::DeepShallow
        );
        assert_eq!(
            parent.child_for(CollectionElement).transitivity,
            Transitivity::DeepShallow
        );
        assert_eq!(
            parent.child_for(Resource).transitivity,
            Transitivity::DeepShallow
        );
    }

    #[test]
    fn test_freshness_propagates_unchanged() {
        let parent = TraversalPolicy::new(
            Transitivity::DeepShallow,
            Freshness::Match,
            FetchStrategy::Storage,
        );
        let child = parent.child_for(EdgeRole::Resource);
        assert_eq!(child.freshness, Freshness::Match);
        assert_eq!(child.fetch, FetchStrategy::Storage);
    }

    #[test]
    fn test_refresh_decays_with_transitivity() {
        let parent = TraversalPolicy::refresh();

        // Page edges keep the same transitivity, so no decay.
        let page = parent.child_for(EdgeRole::CollectionPage);
        assert_eq!(page.freshness, Freshness::Always);

        // Resource edges decay deepDeep -> deepShallow, and freshness with it.
        let resource = parent.child_for(EdgeRole::Resource);
        assert_eq!(resource.transitivity, Transitivity::DeepShallow);
        assert_eq!(resource.freshness, Freshness::Match);
    }

    #[test]
    fn test_gate_always() {
        let p = TraversalPolicy::new(
            Transitivity::Shallow,
            Freshness::Always,
            FetchStrategy::Always,
        );
        assert_eq!(p.gate(Some(9), 1, None, None), GateVerdict::Process);
    }

    #[test]
    fn test_gate_match_on_etag() {
        let p = TraversalPolicy::new(
            Transitivity::Shallow,
            Freshness::Match,
            FetchStrategy::OriginStorage,
        );
        assert_eq!(
            p.gate(None, 1, Some("abc"), Some("abc")),
            GateVerdict::Skip
        );
        assert_eq!(
            p.gate(None, 1, Some("abc"), Some("def")),
            GateVerdict::Process
        );
        assert_eq!(p.gate(None, 1, None, Some("def")), GateVerdict::Process);
    }

    #[test]
    fn test_gate_version() {
        let p = TraversalPolicy::standard();
        assert_eq!(p.gate(Some(3), 3, None, None), GateVerdict::Skip);
        assert_eq!(p.gate(Some(4), 3, None, None), GateVerdict::SkipNewer);
        assert_eq!(p.gate(Some(2), 3, None, None), GateVerdict::Process);
        assert_eq!(p.gate(None, 3, None, None), GateVerdict::Process);
    }

    #[test]
    fn test_named_presets() {
        assert_eq!(
            TraversalPolicy::named("default"),
            Some(TraversalPolicy::standard())
        );
        assert_eq!(
            TraversalPolicy::named("refresh"),
            Some(TraversalPolicy::refresh())
        );
        assert!(TraversalPolicy::named("bogus").is_none());
    }
}
