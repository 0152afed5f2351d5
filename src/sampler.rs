//! Page-cluster sampling: pick small windows of consecutive pages at random.
//!
//! A quiz is built from `cluster_count` clusters of `cluster_size`
//! consecutive pages. Clusters should cover different parts of the document,
//! so every sampled window is recorded in a [`UsedPages`] set and later draws
//! try to avoid it.
//!
//! ## Search phases
//!
//! ```text
//! DisjointWindow (≤100 draws) ──▶ UnusedStart (≤50 draws) ──▶ AcceptOverlap
//!   no page of the window used     start page alone unused     last draw wins
//! ```
//!
//! Short documents cannot hold `cluster_count × cluster_size` disjoint pages,
//! so overlap is an accepted degradation and never an error. Each result
//! carries the [`SampleExit`] that produced it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Draws allowed while looking for a fully unused window.
pub const DISJOINT_ATTEMPTS: usize = 100;

/// Draws allowed while looking for a window whose start page is unused.
pub const UNUSED_START_ATTEMPTS: usize = 50;

/// Inclusive range of 1-indexed pages `[start_page, start_page + size - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCluster {
    pub start_page: usize,
    pub size: usize,
}

impl PageCluster {
    /// Last page of the window (inclusive).
    pub fn end_page(&self) -> usize {
        (self.start_page + self.size).saturating_sub(1)
    }

    /// Iterate the 1-indexed pages of the window.
    pub fn pages(&self) -> impl Iterator<Item = usize> {
        self.start_page..self.start_page + self.size
    }
}

/// Pages already claimed during one sampling run.
#[derive(Debug, Clone, Default)]
pub struct UsedPages {
    pages: BTreeSet<usize>,
}

impl UsedPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, page: usize) -> bool {
        self.pages.contains(&page)
    }

    pub(crate) fn len(&self) -> usize {
        self.pages.len()
    }

    fn overlaps(&self, cluster: &PageCluster) -> bool {
        cluster.pages().any(|p| self.contains(p))
    }

    fn claim(&mut self, cluster: &PageCluster) {
        self.pages.extend(cluster.pages());
    }
}

/// Which exit condition of the search produced a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleExit {
    /// Document no longer than one cluster: the whole document is returned.
    ShortDocument,
    /// No page of the window was used before.
    Disjoint,
    /// Only the start page was unused; the window overlaps earlier clusters.
    UnusedStart,
    /// Both bounded searches failed; the last draw was accepted as-is.
    Overlap,
}

impl SampleExit {
    /// `true` unless the window is guaranteed disjoint from earlier ones.
    pub fn is_degraded(self) -> bool {
        matches!(self, SampleExit::UnusedStart | SampleExit::Overlap)
    }
}

/// A sampled window and the exit condition that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledCluster {
    pub cluster: PageCluster,
    pub exit: SampleExit,
}

#[derive(Debug, Clone, Copy)]
enum SearchPhase {
    DisjointWindow { remaining: usize },
    UnusedStart { remaining: usize },
    AcceptOverlap,
}

/// Sample one cluster and claim its pages in `used`.
///
/// `page_count ≤ cluster_size` always yields `{start_page: 1, size:
/// page_count}`. Otherwise start pages are drawn uniformly from
/// `[1, page_count - cluster_size + 1]`.
pub fn sample<R: Rng + ?Sized>(
    page_count: usize,
    cluster_size: usize,
    used: &mut UsedPages,
    rng: &mut R,
) -> SampledCluster {
    if page_count <= cluster_size {
        let cluster = PageCluster {
            start_page: 1,
            size: page_count,
        };
        used.claim(&cluster);
        return SampledCluster {
            cluster,
            exit: SampleExit::ShortDocument,
        };
    }

    let max_start = page_count - cluster_size + 1;
    let draw = |rng: &mut R| PageCluster {
        start_page: rng.gen_range(1..=max_start),
        size: cluster_size,
    };

    let mut phase = SearchPhase::DisjointWindow {
        remaining: DISJOINT_ATTEMPTS,
    };
    let mut last: Option<PageCluster> = None;

    let (cluster, exit) = loop {
        match phase {
            SearchPhase::DisjointWindow { remaining: 0 } => {
                phase = SearchPhase::UnusedStart {
                    remaining: UNUSED_START_ATTEMPTS,
                };
            }
            SearchPhase::DisjointWindow { remaining } => {
                let candidate = draw(rng);
                last = Some(candidate);
                if !used.overlaps(&candidate) {
                    break (candidate, SampleExit::Disjoint);
                }
                phase = SearchPhase::DisjointWindow {
                    remaining: remaining - 1,
                };
            }
            SearchPhase::UnusedStart { remaining: 0 } => {
                phase = SearchPhase::AcceptOverlap;
            }
            SearchPhase::UnusedStart { remaining } => {
                let candidate = draw(rng);
                last = Some(candidate);
                if !used.contains(candidate.start_page) {
                    break (candidate, SampleExit::UnusedStart);
                }
                phase = SearchPhase::UnusedStart {
                    remaining: remaining - 1,
                };
            }
            SearchPhase::AcceptOverlap => {
                let candidate = last.unwrap_or_else(|| draw(rng));
                break (candidate, SampleExit::Overlap);
            }
        }
    };

    used.claim(&cluster);
    debug!(
        "Sampled pages {}-{} ({:?}), {} pages used",
        cluster.start_page,
        cluster.end_page(),
        exit,
        used.len()
    );

    SampledCluster { cluster, exit }
}

/// Run one full sampling pass: `cluster_count` draws over a fresh
/// [`UsedPages`] set.
pub fn sample_clusters<R: Rng + ?Sized>(
    page_count: usize,
    cluster_size: usize,
    cluster_count: usize,
    rng: &mut R,
) -> Vec<SampledCluster> {
    let mut used = UsedPages::new();
    (0..cluster_count)
        .map(|_| sample(page_count, cluster_size, &mut used, rng))
        .collect()
}
