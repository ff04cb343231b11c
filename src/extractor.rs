//! Incremental feed extraction.
//!
//! The extractor scrolls a [`ContentSurface`] and records every post it has
//! not seen before, stopping as soon as it meets an already-known post. The
//! feed is newest-first and older entries never change, so the first known
//! identity proves that everything below it is stored already.
//!
//! Termination, in order of precedence:
//!
//! 1. **Boundary**: a pass saw an identity from the known snapshot.
//! 2. **Stable**: the content-size signal did not change for
//!    `stability_rounds` consecutive rounds (first-ever run, or the feed ended).
//! 3. **Round ceiling**: `max_rounds` scrolls were issued without 1 or 2.
//!
//! After the loop one more settle delay and scan pass pick up content that
//! finished loading right at the edge.

use crate::config::ExtractorConfig;
use crate::error::{FeedError, Result};
use crate::model::{Item, StopReason};
use crate::scan::PostRef;
use crate::surface::ContentSurface;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

/// Default settle delay after each scroll.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2500;
/// Default settle delay before the final pass.
pub const DEFAULT_FINAL_SETTLE_MS: u64 = 2000;
/// Unchanged rounds that count as end-of-content.
pub const DEFAULT_STABILITY_ROUNDS: u32 = 5;
/// Default hard ceiling on scroll rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 500;

/// Tunables for one extraction. Serializable because it crosses the host
/// boundary together with the known-identity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractPolicy {
    pub settle_delay_ms: u64,
    pub final_settle_ms: u64,
    pub stability_rounds: u32,
    /// `None` leaves the loop unbounded.
    pub max_rounds: Option<usize>,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            final_settle_ms: DEFAULT_FINAL_SETTLE_MS,
            stability_rounds: DEFAULT_STABILITY_ROUNDS,
            max_rounds: Some(DEFAULT_MAX_ROUNDS),
        }
    }
}

impl From<&ExtractorConfig> for ExtractPolicy {
    fn from(config: &ExtractorConfig) -> Self {
        Self {
            settle_delay_ms: config.settle_delay_ms,
            final_settle_ms: config.final_settle_ms,
            stability_rounds: config.stability_rounds,
            max_rounds: (config.max_rounds > 0).then_some(config.max_rounds),
        }
    }
}

impl ExtractPolicy {
    /// Reject settings that would break termination or skip async loading.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidArgument`] for a zero settle delay, zero
    /// stability rounds, or a zero round ceiling.
    pub fn validate(&self) -> Result<()> {
        if self.settle_delay_ms == 0 {
            return Err(FeedError::invalid_argument(
                "settle delay must be greater than zero",
            ));
        }
        if self.stability_rounds == 0 {
            return Err(FeedError::invalid_argument(
                "stability rounds must be at least 1",
            ));
        }
        if self.max_rounds == Some(0) {
            return Err(FeedError::invalid_argument("max rounds must be at least 1"));
        }
        Ok(())
    }

    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub const fn final_settle(&self) -> Duration {
        Duration::from_millis(self.final_settle_ms)
    }
}

/// Items found by one extraction, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub items: Vec<Item>,
    pub rounds: usize,
    pub stop: StopReason,
}

/// Per-run discovery state: identity to item, in discovery order.
#[derive(Debug, Default)]
struct Discovery {
    index: HashMap<String, usize>,
    items: Vec<Item>,
    found_boundary: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct PassStats {
    new: usize,
    known: usize,
}

impl Discovery {
    /// One scan pass. A known identity sets the boundary flag but does not
    /// end the pass; later references in the same pass may still be new.
    fn scan(&mut self, refs: &[PostRef], known: &HashSet<String>) -> PassStats {
        let mut stats = PassStats::default();
        for post in refs {
            if post.link.trim().is_empty() {
                continue;
            }
            if known.contains(&post.link) {
                self.found_boundary = true;
                stats.known += 1;
                continue;
            }
            match self.index.get(&post.link) {
                Some(&slot) => {
                    // Lazily loaded previews: keep the first non-empty one.
                    let item = &mut self.items[slot];
                    if item.thumb.is_empty() && !post.thumb.is_empty() {
                        item.thumb.clone_from(&post.thumb);
                    }
                }
                None => {
                    self.index.insert(post.link.clone(), self.items.len());
                    self.items.push(Item {
                        link: post.link.clone(),
                        thumb: post.thumb.clone(),
                    });
                    stats.new += 1;
                }
            }
        }
        stats
    }
}

/// Runs the scroll/settle/scan cycle against one surface.
#[derive(Debug, Clone)]
pub struct Extractor {
    known: HashSet<String>,
    policy: ExtractPolicy,
}

impl Extractor {
    #[must_use]
    pub const fn new(known: HashSet<String>, policy: ExtractPolicy) -> Self {
        Self { known, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &ExtractPolicy {
        &self.policy
    }

    /// Extract every item not in the known snapshot.
    ///
    /// # Errors
    ///
    /// Any surface failure becomes [`FeedError::ExtractionFault`] and the
    /// items recorded so far are dropped with the discovery state.
    pub async fn run(&self, surface: &mut dyn ContentSurface) -> Result<Extraction> {
        self.policy.validate()?;

        let mut discovery = Discovery::default();
        let mut rounds = 0usize;

        let refs = surface.post_references().await.map_err(|e| fault(0, &e))?;
        let initial = discovery.scan(&refs, &self.known);
        debug!(
            new_in_pass = initial.new,
            known_in_pass = initial.known,
            "Initial scan"
        );

        let mut last_extent = surface.content_extent().await.map_err(|e| fault(0, &e))?;
        let mut stable_rounds = 0u32;

        let stop = loop {
            if discovery.found_boundary {
                break StopReason::Boundary;
            }
            if stable_rounds >= self.policy.stability_rounds {
                break StopReason::Stable;
            }
            if self.policy.max_rounds.is_some_and(|max| rounds >= max) {
                break StopReason::RoundCeiling;
            }

            rounds += 1;
            surface.reveal_more().await.map_err(|e| fault(rounds, &e))?;
            tokio::time::sleep(self.policy.settle_delay()).await;

            let extent = surface
                .content_extent()
                .await
                .map_err(|e| fault(rounds, &e))?;
            let refs = surface
                .post_references()
                .await
                .map_err(|e| fault(rounds, &e))?;
            let pass = discovery.scan(&refs, &self.known);

            if discovery.found_boundary {
                debug!(
                    round = rounds,
                    new_in_pass = pass.new,
                    known_in_pass = pass.known,
                    discovered = discovery.items.len(),
                    "Boundary reached"
                );
                break StopReason::Boundary;
            }

            if extent == last_extent {
                stable_rounds += 1;
            } else {
                stable_rounds = 0;
                last_extent = extent;
            }

            debug!(
                round = rounds,
                new_in_pass = pass.new,
                known_in_pass = pass.known,
                discovered = discovery.items.len(),
                stable_rounds,
                "Scroll round"
            );
        };

        tokio::time::sleep(self.policy.final_settle()).await;
        let refs = surface
            .post_references()
            .await
            .map_err(|e| fault(rounds, &e))?;
        let tail = discovery.scan(&refs, &self.known);

        info!(
            stop = %stop,
            rounds,
            discovered = discovery.items.len(),
            late = tail.new,
            "Extraction finished"
        );

        Ok(Extraction {
            items: discovery.items,
            rounds,
            stop,
        })
    }
}

fn fault(round: usize, err: &FeedError) -> FeedError {
    FeedError::extraction_fault(round, err.to_string())
}
