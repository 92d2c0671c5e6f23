use crate::models::{Comment, ThreadNode};
use std::collections::{HashMap, HashSet};

/// How many parent hops the root search follows before giving up and treating
/// the last visited comment as the root.
pub const MAX_SEARCH_DEPTH: usize = 5;

/// Assembles the reply tree rooted at `root_id` from the flat list of an
/// article's comments. Replies keep the order in which they appear in
/// `comments`, so callers pass them sorted by creation time.
///
/// Returns `None` if `root_id` is not in the list.
pub fn build_thread(comments: Vec<Comment>, root_id: i64) -> Option<ThreadNode> {
    let mut by_id: HashMap<i64, Comment> = HashMap::with_capacity(comments.len());
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut order: Vec<i64> = Vec::with_capacity(comments.len());

    for comment in comments {
        order.push(comment.id);
        by_id.insert(comment.id, comment);
    }

    for id in &order {
        if let Some(parent_id) = by_id.get(id).and_then(|c| c.parent_id) {
            // Replies pointing outside this article are dropped.
            if by_id.contains_key(&parent_id) {
                children.entry(parent_id).or_default().push(*id);
            }
        }
    }

    let mut visited = HashSet::new();
    attach(root_id, &mut by_id, &children, &mut visited)
}

fn attach(
    id: i64,
    by_id: &mut HashMap<i64, Comment>,
    children: &HashMap<i64, Vec<i64>>,
    visited: &mut HashSet<i64>,
) -> Option<ThreadNode> {
    // A corrupted parent chain could loop back on itself.
    if !visited.insert(id) {
        return None;
    }
    let comment = by_id.remove(&id)?;

    let replies = children
        .get(&id)
        .map(|ids| {
            ids.iter()
                .filter_map(|child| attach(*child, by_id, children, visited))
                .collect()
        })
        .unwrap_or_default();

    Some(ThreadNode { comment, replies })
}
