//! Sync Peer Selection
//!
//! Peers are grouped by the cumulative score they announce. The largest group
//! is taken as the score most of the network agrees on, and the peer to sync
//! with is drawn from it. When the current sync peer is already a member of
//! the winning group it is kept, so a peer is only switched when the network
//! majority actually moves.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tidal_types::{PeerId, Score};

#[derive(Debug, PartialEq, Eq)]
struct GroupEntry<'a> {
    size: usize,
    score: &'a Score,
}

impl Ord for GroupEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Larger groups first; among equal sizes the heavier chain wins.
        self.size
            .cmp(&other.size)
            .then_with(|| self.score.cmp(other.score))
    }
}

impl PartialOrd for GroupEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Groups peers by announced score.
#[derive(Debug, Default)]
pub struct PeerScoreSelector {
    groups: HashMap<Score, HashSet<PeerId>>,
    peers: HashMap<PeerId, Score>,
}

impl PeerScoreSelector {
    /// Create an empty selector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `peer`'s latest score, moving it out of its previous group.
    pub fn push(&mut self, peer: PeerId, score: Score) {
        if let Some(previous) = self.peers.get(&peer) {
            if *previous == score {
                return;
            }
        }
        self.remove(&peer);
        self.groups
            .entry(score.clone())
            .or_default()
            .insert(peer.clone());
        self.peers.insert(peer, score);
    }

    /// Forget `peer`. Empty groups are dropped.
    pub fn remove(&mut self, peer: &PeerId) {
        let Some(score) = self.peers.remove(peer) else {
            return;
        };
        if let Some(group) = self.groups.get_mut(&score) {
            group.remove(peer);
            if group.is_empty() {
                self.groups.remove(&score);
            }
        }
    }

    /// Last score announced by `peer`.
    pub fn score_of(&self, peer: &PeerId) -> Option<&Score> {
        self.peers.get(peer)
    }

    /// Number of tracked peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peers are tracked.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Pick the peer to sync with.
    ///
    /// Returns `current` if it belongs to the largest score group, otherwise
    /// the smallest peer ID of that group, so repeated calls with unchanged
    /// input give the same answer.
    pub fn select_best_peer(&self, current: Option<&PeerId>) -> Option<(PeerId, Score)> {
        let mut heap: BinaryHeap<GroupEntry<'_>> = self
            .groups
            .iter()
            .map(|(score, peers)| GroupEntry {
                size: peers.len(),
                score,
            })
            .collect();

        let best = heap.pop()?;
        let group = self.groups.get(best.score)?;

        if let Some(current) = current {
            if group.contains(current) {
                return Some((current.clone(), best.score.clone()));
            }
        }

        group
            .iter()
            .min()
            .map(|peer| (peer.clone(), best.score.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(name: &str) -> PeerId {
        PeerId::from(name)
    }

    #[test]
    fn test_largest_group_wins() {
        let mut selector = PeerScoreSelector::new();
        selector.push(peer("a"), Score::from(100));
        selector.push(peer("b"), Score::from(50));
        selector.push(peer("c"), Score::from(50));

        let (best, score) = selector.select_best_peer(None).unwrap();
        assert_eq!(score, Score::from(50));
        assert!(best == peer("b") || best == peer("c"));
    }

    #[test]
    fn test_current_peer_kept() {
        let mut selector = PeerScoreSelector::new();
        selector.push(peer("a"), Score::from(50));
        selector.push(peer("b"), Score::from(50));
        let (best, _) = selector.select_best_peer(Some(&peer("b"))).unwrap();
        assert_eq!(best, peer("b"));
    }

    #[test]
    fn test_push_moves_between_groups() {
        let mut selector = PeerScoreSelector::new();
        selector.push(peer("a"), Score::from(1));
        selector.push(peer("a"), Score::from(2));
        assert_eq!(selector.len(), 1);
        assert_eq!(selector.groups.len(), 1);
        assert_eq!(selector.score_of(&peer("a")), Some(&Score::from(2)));
    }

    #[test]
    fn test_remove_drops_empty_group() {
        let mut selector = PeerScoreSelector::new();
        selector.push(peer("a"), Score::from(1));
        selector.remove(&peer("a"));
        assert!(selector.is_empty());
        assert!(selector.groups.is_empty());
        assert!(selector.select_best_peer(None).is_none());
    }

    #[test]
    fn test_equal_groups_prefer_higher_score() {
        let mut selector = PeerScoreSelector::new();
        selector.push(peer("low"), Score::from(10));
        selector.push(peer("high"), Score::from(20));
        let (best, score) = selector.select_best_peer(Some(&peer("low"))).unwrap();
        assert_eq!(best, peer("high"));
        assert_eq!(score, Score::from(20));
    }
}
