//! Vote state machine and voter registry bookkeeping.
//!
//! Leaving a direction undoes its effect, entering one applies it. Both halves fire in
//! the same call, so a direct up -> down request moves the vote count by -2 and the
//! author's reputation by -15.

use crate::error::{ForumError, ForumResult};
use crate::models::{Comment, Id, Post, VoteDirection, Voter};

pub const VOTE_REPUTATION_THRESHOLD: i64 = 50;
pub const UPVOTE_REPUTATION: i64 = 5;
pub const DOWNVOTE_REPUTATION: i64 = 10;

/// Change to an entity's vote count and its author's reputation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VoteDelta {
    pub votes: i64,
    pub reputation: i64,
}

pub fn ensure_eligible(reputation: i64) -> ForumResult<()> {
    if reputation < VOTE_REPUTATION_THRESHOLD {
        return Err(ForumError::InsufficientReputation {
            required: VOTE_REPUTATION_THRESHOLD,
            actual: reputation,
        });
    }
    Ok(())
}

pub fn transition(previous: VoteDirection, next: VoteDirection) -> ForumResult<VoteDelta> {
    if previous == next {
        return Err(ForumError::NoOpVote);
    }
    let mut delta = VoteDelta::default();
    match previous {
        VoteDirection::Up => {
            delta.votes -= 1;
            delta.reputation -= UPVOTE_REPUTATION;
        }
        VoteDirection::Down => {
            delta.votes += 1;
            delta.reputation += DOWNVOTE_REPUTATION;
        }
        VoteDirection::None => {}
    }
    match next {
        VoteDirection::Up => {
            delta.votes += 1;
            delta.reputation += UPVOTE_REPUTATION;
        }
        VoteDirection::Down => {
            delta.votes -= 1;
            delta.reputation -= DOWNVOTE_REPUTATION;
        }
        VoteDirection::None => {}
    }
    Ok(delta)
}

pub fn recorded_direction(voters: &[Voter], user_id: Id) -> VoteDirection {
    voters
        .iter()
        .find(|v| v.user_id == user_id)
        .map(|v| v.direction)
        .unwrap_or_default()
}

/// Upserts `user_id`'s entry, or removes it when `direction` is `None`.
pub fn record(voters: &mut Vec<Voter>, user_id: Id, direction: VoteDirection) {
    if direction == VoteDirection::None {
        voters.retain(|v| v.user_id != user_id);
    } else if let Some(existing) = voters.iter_mut().find(|v| v.user_id == user_id) {
        existing.direction = direction;
    } else {
        voters.push(Voter { user_id, direction });
    }
}

/// Content that carries a tally and a voter registry.
pub trait Votable {
    fn author_name(&self) -> &str;
    fn vote_count(&self) -> i64;
    fn tally_mut(&mut self) -> (&mut i64, &mut Vec<Voter>);
}

impl Votable for Post {
    fn author_name(&self) -> &str { &self.author_name }
    fn vote_count(&self) -> i64 { self.vote_count }
    fn tally_mut(&mut self) -> (&mut i64, &mut Vec<Voter>) { (&mut self.vote_count, &mut self.voters) }
}

impl Votable for Comment {
    fn author_name(&self) -> &str { &self.author_name }
    fn vote_count(&self) -> i64 { self.vote_count }
    fn tally_mut(&mut self) -> (&mut i64, &mut Vec<Voter>) { (&mut self.vote_count, &mut self.voters) }
}

/// Applies `user_id`'s vote to `entity` in place and returns the author-side delta.
/// On error `entity` is untouched.
pub fn apply<V: Votable>(entity: &mut V, user_id: Id, direction: VoteDirection) -> ForumResult<VoteDelta> {
    let (count, voters) = entity.tally_mut();
    let delta = transition(recorded_direction(voters, user_id), direction)?;
    *count += delta.votes;
    record(voters, user_id, direction);
    Ok(delta)
}
