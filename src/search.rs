//! Whole-word, case-insensitive matching of free-text queries against posts and comments.

use std::collections::HashSet;

use crate::models::{Id, Post};
use crate::tree::CommentArena;

/// Lowercased words of `text` with punctuation removed (not split on), so
/// "don't" becomes "dont".
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().map(str::to_lowercase).collect()
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    terms: Vec<String>,
}

impl Query {
    pub fn parse(text: &str) -> Self {
        let mut terms = tokenize(text);
        let mut seen = HashSet::new();
        terms.retain(|t| seen.insert(t.clone()));
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True when any query term appears in `text` as a whole word.
    pub fn matches(&self, text: &str) -> bool {
        if self.terms.is_empty() {
            return false;
        }
        let words: HashSet<String> = tokenize(text).into_iter().collect();
        self.terms.iter().any(|t| words.contains(t))
    }

    fn matches_post(&self, post: &Post) -> bool {
        self.matches(&post.title) || self.matches(&post.content)
    }
}

/// Posts matching `query` directly or owning a matching comment, each at most once.
/// Direct matches come first, in `posts` order.
pub fn matching_posts<'p>(query: &Query, posts: &'p [Post], arena: &CommentArena) -> Vec<&'p Post> {
    if query.is_empty() {
        return Vec::new();
    }
    let mut included: HashSet<Id> = HashSet::new();
    let mut out = Vec::new();
    for post in posts.iter().filter(|p| query.matches_post(p)) {
        if included.insert(post.id) {
            out.push(post);
        }
    }
    let mut hits: Vec<Id> = arena
        .comments()
        .filter(|c| query.matches(&c.content))
        .map(|c| c.id)
        .collect();
    hits.sort_unstable();
    for comment_id in hits {
        if let Some(post) = arena.owning_post(posts, comment_id) {
            if included.insert(post.id) {
                out.push(post);
            }
        }
    }
    out
}
