//! In-process store. Mirrors Redis sorted-set semantics closely enough that
//! the test suite can run the full queue contract without a server.

use super::{QueueStore, StoreResult};
use crate::model::QueueEntry;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;

/// Score wrapper with a total order, so it can key a `BTreeSet`.
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl Score {
    /// `-0.0` is stored as `0.0` so the two tie on member id, as they do in
    /// Redis and Postgres.
    fn new(score: f64) -> Self {
        Score(if score == 0.0 { 0.0 } else { score })
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default)]
struct SortedSet {
    order: BTreeSet<(Score, String)>,
    scores: HashMap<String, Score>,
}

impl SortedSet {
    fn upsert(&mut self, member: &str, score: f64) {
        let score = Score::new(score);
        if let Some(old) = self.scores.insert(member.to_string(), score) {
            self.order.remove(&(old, member.to_string()));
        }
        self.order.insert((score, member.to_string()));
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(old) => {
                self.order.remove(&(old, member.to_string()));
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn take_front(&mut self, count: usize) -> Vec<String> {
        let mut taken = Vec::with_capacity(count.min(self.len()));
        while taken.len() < count {
            let Some((_, member)) = self.order.pop_first() else {
                break;
            };
            self.scores.remove(&member);
            taken.push(member);
        }
        taken
    }
}

#[derive(Debug, Default)]
struct State {
    live: HashMap<String, SortedSet>,
    released: HashSet<String>,
    dequeued: HashMap<String, HashSet<String>>,
}

impl State {
    /// Drop the live set once it is empty, like Redis does with its keys.
    fn prune(&mut self, queue_id: &str) {
        if self.live.get(queue_id).is_some_and(|set| set.order.is_empty()) {
            self.live.remove(queue_id);
        }
    }
}

/// Store kept entirely in process memory. Every call holds one lock for its
/// whole duration, which makes the compound operations atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn add(&self, queue_id: &str, entry: &QueueEntry) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state
            .live
            .entry(queue_id.to_string())
            .or_default()
            .upsert(&entry.member_id, entry.score);
        Ok(())
    }

    async fn remove(&self, queue_id: &str, member_id: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state
            .live
            .get_mut(queue_id)
            .is_some_and(|set| set.remove(member_id));
        state.prune(queue_id);
        Ok(removed)
    }

    async fn range_by_rank(
        &self,
        queue_id: &str,
        start: u64,
        stop: i64,
    ) -> StoreResult<Vec<String>> {
        let state = self.state.lock().await;
        let Some(set) = state.live.get(queue_id) else {
            return Ok(Vec::new());
        };
        let len = set.len() as i64;
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        let start = start as i64;
        if stop < start {
            return Ok(Vec::new());
        }
        Ok(set
            .order
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(_, member)| member.clone())
            .collect())
    }

    async fn rank(&self, queue_id: &str, member_id: &str) -> StoreResult<Option<u64>> {
        let state = self.state.lock().await;
        let Some(set) = state.live.get(queue_id) else {
            return Ok(None);
        };
        let Some(score) = set.scores.get(member_id) else {
            return Ok(None);
        };
        let key = (*score, member_id.to_string());
        Ok(Some(set.order.range(..key).count() as u64))
    }

    async fn cardinality(&self, queue_id: &str) -> StoreResult<u64> {
        let state = self.state.lock().await;
        Ok(state.live.get(queue_id).map_or(0, |set| set.len() as u64))
    }

    async fn pop_by_rank(&self, queue_id: &str, count: usize) -> StoreResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let taken = match state.live.get_mut(queue_id) {
            Some(set) => set.take_front(count),
            None => return Ok(Vec::new()),
        };
        state.prune(queue_id);
        if !taken.is_empty() {
            state
                .dequeued
                .entry(queue_id.to_string())
                .or_default()
                .extend(taken.iter().cloned());
        }
        Ok(taken)
    }

    async fn release_all(&self, queue_id: &str) -> StoreResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let taken: Vec<String> = state
            .live
            .remove(queue_id)
            .map(|set| set.order.into_iter().map(|(_, member)| member).collect())
            .unwrap_or_default();
        state.released.insert(queue_id.to_string());
        Ok(taken)
    }

    async fn is_released(&self, queue_id: &str) -> StoreResult<bool> {
        Ok(self.state.lock().await.released.contains(queue_id))
    }

    async fn is_member_dequeued(&self, queue_id: &str, member_id: &str) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .dequeued
            .get(queue_id)
            .is_some_and(|members| members.contains(member_id)))
    }
}
