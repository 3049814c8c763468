//! Traversals over the comment graph.
//!
//! Comments only know their children, by id. A [`CommentArena`] is a snapshot of the
//! comment collection keyed by id; every operation walks it with an explicit stack and a
//! visited set, so a corrupted graph (a reply that is its own ancestor, or a comment
//! shared by two parents) ends the walk early instead of looping. Such revisits are
//! reported through [`Walk::cycle_detected`] and logged, never raised as errors.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::models::{Comment, CommentNode, Id, Post};

/// Anything that owns an ordered list of direct replies.
pub trait Replies {
    fn reply_ids(&self) -> &[Id];
}

impl Replies for Post {
    fn reply_ids(&self) -> &[Id] {
        &self.child_comment_ids
    }
}

impl Replies for Comment {
    fn reply_ids(&self) -> &[Id] {
        &self.child_comment_ids
    }
}

/// Ids reached by a traversal, in visit order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Walk {
    pub order: Vec<Id>,
    pub cycle_detected: bool,
}

impl Walk {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The direct holder of a comment's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Post(Id),
    Comment(Id),
}

fn report_revisit(id: Id) {
    warn!(comment_id = id, "comment graph revisits a node, traversal cut short");
    metrics::increment_counter!("phreddit_cycles_detected_total");
}

#[derive(Debug, Default, Clone)]
pub struct CommentArena {
    nodes: HashMap<Id, Comment>,
}

impl CommentArena {
    pub fn new(comments: impl IntoIterator<Item = Comment>) -> Self {
        Self { nodes: comments.into_iter().map(|c| (c.id, c)).collect() }
    }

    pub fn get(&self, id: Id) -> Option<&Comment> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.nodes.values()
    }

    /// Depth-first pre-order walk starting from `roots`, children in stored order.
    /// Ids that no longer resolve are skipped.
    pub fn walk(&self, roots: &[Id]) -> Walk {
        let mut walk = Walk::default();
        let mut seen = HashSet::new();
        let mut stack: Vec<Id> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                report_revisit(id);
                walk.cycle_detected = true;
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                debug!(comment_id = id, "skipping unresolved child reference");
                continue;
            };
            walk.order.push(id);
            stack.extend(node.child_comment_ids.iter().rev());
        }
        walk
    }

    /// Number of comments reachable below `node`, not counting `node` itself.
    pub fn count_descendants<R: Replies + ?Sized>(&self, node: &R) -> usize {
        self.walk(node.reply_ids()).len()
    }

    /// Latest-created comment below `node`. Among equal timestamps the first one
    /// reached in walk order wins.
    pub fn most_recent_descendant<R: Replies + ?Sized>(&self, node: &R) -> Option<&Comment> {
        let mut best: Option<&Comment> = None;
        for id in self.walk(node.reply_ids()).order {
            let Some(c) = self.nodes.get(&id) else { continue };
            if best.map_or(true, |b| c.created_at > b.created_at) {
                best = Some(c);
            }
        }
        best
    }

    /// The comment whose child list holds `id`, if any.
    pub fn parent_comment(&self, id: Id) -> Option<&Comment> {
        self.nodes.values().find(|c| c.child_comment_ids.contains(&id))
    }

    /// Direct holder of `id`: a post is preferred over a comment.
    pub fn parent_of(&self, posts: &[Post], id: Id) -> Option<ParentRef> {
        if let Some(p) = posts.iter().find(|p| p.child_comment_ids.contains(&id)) {
            return Some(ParentRef::Post(p.id));
        }
        self.parent_comment(id).map(|c| ParentRef::Comment(c.id))
    }

    /// Climbs from `comment_id` to the post at the root of its tree.
    /// Orphans, and chains that loop back on themselves, resolve to `None`.
    pub fn owning_post<'p>(&self, posts: &'p [Post], comment_id: Id) -> Option<&'p Post> {
        let mut current = comment_id;
        let mut seen = HashSet::new();
        loop {
            if let Some(p) = posts.iter().find(|p| p.child_comment_ids.contains(&current)) {
                return Some(p);
            }
            if !seen.insert(current) {
                report_revisit(current);
                return None;
            }
            current = self.parent_comment(current)?.id;
        }
    }

    /// `ids` reordered newest first. Ids missing from the arena are dropped.
    pub fn sort_by_newest(&self, ids: &[Id]) -> Vec<Id> {
        let mut found: Vec<&Comment> = ids.iter().filter_map(|id| self.nodes.get(id)).collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.into_iter().map(|c| c.id).collect()
    }

    /// Nested view of the replies under `node`, newest first at every level.
    pub fn thread<R: Replies + ?Sized>(&self, node: &R) -> Vec<CommentNode> {
        let mut seen = HashSet::new();
        self.build_nodes(node.reply_ids(), &mut seen)
    }

    fn build_nodes(&self, ids: &[Id], seen: &mut HashSet<Id>) -> Vec<CommentNode> {
        let mut out = Vec::new();
        for id in self.sort_by_newest(ids) {
            if !seen.insert(id) {
                report_revisit(id);
                continue;
            }
            let Some(c) = self.nodes.get(&id) else { continue };
            let replies = self.build_nodes(&c.child_comment_ids, seen);
            out.push(CommentNode { comment: c.clone(), replies });
        }
        out
    }
}
