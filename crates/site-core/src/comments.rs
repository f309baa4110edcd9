use crate::ids::EntityId;
use crate::records::ChecklistItemComment;
use std::collections::{HashMap, HashSet};

/// A root comment and its replies, both in creation order.
#[derive(Debug, Clone)]
pub struct CommentThread<'a> {
    pub root: &'a ChecklistItemComment,
    pub replies: Vec<&'a ChecklistItemComment>,
}

/// Builds the two-level comment tree shown under a checklist item.
///
/// Only one level of nesting is displayed: a reply to a reply is listed
/// under the thread's root. A reply whose parent is not in the list is shown
/// as its own root so it is never hidden.
pub fn thread_comments(comments: &[ChecklistItemComment]) -> Vec<CommentThread<'_>> {
    let by_id: HashMap<EntityId, &ChecklistItemComment> =
        comments.iter().map(|comment| (comment.id, comment)).collect();

    let assigned: Vec<(&ChecklistItemComment, Option<EntityId>)> = comments
        .iter()
        .map(|comment| (comment, root_of(comment, &by_id, comments.len())))
        .collect();
    let root_ids: HashSet<EntityId> = assigned
        .iter()
        .filter(|(_, root)| root.is_none())
        .map(|(comment, _)| comment.id)
        .collect();

    let mut roots: Vec<&ChecklistItemComment> = Vec::new();
    let mut replies: HashMap<EntityId, Vec<&ChecklistItemComment>> = HashMap::new();
    for (comment, root) in assigned {
        match root {
            Some(root_id) if root_ids.contains(&root_id) => {
                replies.entry(root_id).or_default().push(comment)
            }
            _ => roots.push(comment),
        }
    }

    roots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    roots
        .into_iter()
        .map(|root| {
            let mut thread_replies = replies.remove(&root.id).unwrap_or_default();
            thread_replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            CommentThread {
                root,
                replies: thread_replies,
            }
        })
        .collect()
}

fn root_of<'a>(
    comment: &'a ChecklistItemComment,
    by_id: &HashMap<EntityId, &'a ChecklistItemComment>,
    max_hops: usize,
) -> Option<EntityId> {
    let mut current = comment;
    let mut hops = 0;
    while let Some(parent_id) = current.parent_id {
        match by_id.get(&parent_id) {
            Some(parent) if hops < max_hops => {
                current = *parent;
                hops += 1;
            }
            _ => break,
        }
    }
    (current.id != comment.id).then_some(current.id)
}
