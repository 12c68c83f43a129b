use std::collections::HashSet;

use crate::models::Like;

/// Which side of a like edge to resolve for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeDirection {
    /// Users who like X (`likee_id = X`, yields `liker_id`)
    Likers,
    /// Users X likes (`liker_id = X`, yields `likee_id`)
    Likees,
}

impl LikeDirection {
    /// Column matched against the user id
    pub fn filter_column(&self) -> &'static str {
        match self {
            LikeDirection::Likers => "likee_id",
            LikeDirection::Likees => "liker_id",
        }
    }

    /// Column holding the ids returned
    pub fn select_column(&self) -> &'static str {
        match self {
            LikeDirection::Likers => "liker_id",
            LikeDirection::Likees => "likee_id",
        }
    }

    /// Returns the id on the far side of `like` when the edge touches
    /// `user_id` in this direction
    pub fn counterpart(&self, like: &Like, user_id: i32) -> Option<i32> {
        match self {
            LikeDirection::Likers if like.likee_id == user_id => Some(like.liker_id),
            LikeDirection::Likees if like.liker_id == user_id => Some(like.likee_id),
            _ => None,
        }
    }
}

/// Collect one direction's id set from a list of edges
pub fn collect_ids<'a, I>(likes: I, user_id: i32, direction: LikeDirection) -> HashSet<i32>
where
    I: IntoIterator<Item = &'a Like>,
{
    likes
        .into_iter()
        .filter_map(|like| direction.counterpart(like, user_id))
        .collect()
}
