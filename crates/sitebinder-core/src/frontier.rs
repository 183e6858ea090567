//! FIFO work queue with visited and pending sets.

use std::collections::{HashSet, VecDeque};

use crate::models::CrawlTask;

/// Pending crawl tasks plus the set of URLs already claimed for rendering.
///
/// URLs are expected in canonical form. A URL is refused on [`push`](Self::push)
/// while it is visited or already queued, so each canonical URL is rendered
/// at most once per crawl.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    pending: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task unless its URL is visited or already pending.
    ///
    /// Returns whether the task was accepted.
    pub fn push(&mut self, task: CrawlTask) -> bool {
        if self.visited.contains(&task.url) || self.pending.contains(&task.url) {
            return false;
        }
        self.pending.insert(task.url.clone());
        self.queue.push_back(task);
        true
    }

    /// Take the oldest task.
    pub fn pop(&mut self) -> Option<CrawlTask> {
        let task = self.queue.pop_front()?;
        self.pending.remove(&task.url);
        Some(task)
    }

    /// Claim a URL for rendering. Returns `false` if it was already claimed.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_fifo_order() {
        let mut frontier = Frontier::new();
        frontier.push(CrawlTask::new("https://example.com/a", 0));
        frontier.push(CrawlTask::new("https://example.com/b", 1));
        frontier.push(CrawlTask::new("https://example.com/c", 1));

        let order: Vec<_> = std::iter::from_fn(|| frontier.pop())
            .map(|t| t.url)
            .collect();
        assert_eq!(
            order,
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c"
            ]
        );
        assert!(frontier.is_empty());
    }

    #[test]
    fn refuses_url_already_pending() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(CrawlTask::new("https://example.com/a", 1)));
        assert!(!frontier.push(CrawlTask::new("https://example.com/a", 2)));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn refuses_url_already_visited() {
        let mut frontier = Frontier::new();
        assert!(frontier.mark_visited("https://example.com/a"));
        assert!(!frontier.push(CrawlTask::new("https://example.com/a", 1)));
        assert!(frontier.is_empty());
    }

    #[test]
    fn pop_clears_pending_so_visited_takes_over() {
        let mut frontier = Frontier::new();
        frontier.push(CrawlTask::new("https://example.com/a", 0));
        let task = frontier.pop().unwrap();
        // Popped but not yet claimed: the URL may be queued again.
        assert!(frontier.push(CrawlTask::new(task.url.clone(), 0)));
        frontier.pop();

        assert!(frontier.mark_visited(&task.url));
        assert!(!frontier.mark_visited(&task.url));
        assert_eq!(frontier.visited_count(), 1);
        assert!(!frontier.push(task));
    }
}
