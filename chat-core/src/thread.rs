//! Reply-tree assembly from flat message lists.
//!
//! Roots are messages without a parent; replies are attached to their parent and every level is
//! ordered by timestamp ascending (input order breaks ties). Building, dropping and flattening a
//! tree all use explicit stacks, so thread depth is bounded by memory, not by the call stack.
//! Trees are rendered as a flat pre-order list of [`ThreadEntry`] rows.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::Message;

/// One message and its replies.
pub struct ThreadNode {
    pub id: Uuid,
    pub sender: Uuid,
    pub receiver: Option<Uuid>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
    pub replies: Vec<ThreadNode>,
}

/// A thread message in pre-order, with its depth below the root (the root is 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadEntry {
    pub depth: usize,
    pub id: Uuid,
    pub sender: Uuid,
    pub receiver: Option<Uuid>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
    pub reply_count: usize,
}

impl ThreadNode {
    fn leaf(message: &Message) -> Self {
        Self {
            id: message.id,
            sender: message.sender_id,
            receiver: message.receiver_id,
            content: message.content.clone(),
            timestamp: message.timestamp,
            parent_id: message.parent_id,
            replies: Vec::new(),
        }
    }

    /// Number of messages in this subtree, including this one.
    pub fn message_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }

    /// This subtree as pre-order rows.
    pub fn flatten(&self) -> Vec<ThreadEntry> {
        flatten_threads(std::slice::from_ref(self))
    }
}

impl Drop for ThreadNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

impl fmt::Debug for ThreadNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadNode")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("content", &self.content)
            .field("replies", &self.replies.len())
            .finish()
    }
}

/// Pre-order rows for every tree in `threads`, roots in the given order.
pub fn flatten_threads(threads: &[ThreadNode]) -> Vec<ThreadEntry> {
    let mut entries = Vec::new();
    let mut stack: Vec<(usize, &ThreadNode)> = threads.iter().rev().map(|t| (0, t)).collect();
    while let Some((depth, node)) = stack.pop() {
        entries.push(ThreadEntry {
            depth,
            id: node.id,
            sender: node.sender,
            receiver: node.receiver,
            content: node.content.clone(),
            timestamp: node.timestamp,
            parent_id: node.parent_id,
            reply_count: node.replies.len(),
        });
        stack.extend(node.replies.iter().rev().map(|r| (depth + 1, r)));
    }
    entries
}

/// Builds every thread in `messages`, roots ordered by timestamp.
/// Messages whose parent is not in the slice are not reachable and are left out.
pub fn assemble_threads(messages: &[Message]) -> Vec<ThreadNode> {
    let mut roots: Vec<&Message> = messages.iter().filter(|m| m.is_root()).collect();
    roots.sort_by_key(|m| m.timestamp);
    build(&roots, &children_index(messages))
}

/// Builds the subtree rooted at `root_id`, or `None` if the root is not in `messages`.
pub fn assemble_thread(messages: &[Message], root_id: Uuid) -> Option<ThreadNode> {
    let root = messages.iter().find(|m| m.id == root_id)?;
    build(&[root], &children_index(messages)).pop()
}

fn children_index(messages: &[Message]) -> HashMap<Uuid, Vec<&Message>> {
    let mut children: HashMap<Uuid, Vec<&Message>> = HashMap::new();
    for message in messages {
        if let Some(parent_id) = message.parent_id {
            children.entry(parent_id).or_default().push(message);
        }
    }
    for replies in children.values_mut() {
        replies.sort_by_key(|m| m.timestamp);
    }
    children
}

fn build(roots: &[&Message], children: &HashMap<Uuid, Vec<&Message>>) -> Vec<ThreadNode> {
    // Pre-order walk; visiting the result backwards guarantees children are built before parents.
    let mut order: Vec<&Message> = Vec::new();
    let mut stack: Vec<&Message> = roots.iter().rev().copied().collect();
    while let Some(message) = stack.pop() {
        order.push(message);
        if let Some(replies) = children.get(&message.id) {
            stack.extend(replies.iter().rev().copied());
        }
    }

    let mut built: HashMap<Uuid, ThreadNode> = HashMap::with_capacity(order.len());
    for message in order.iter().rev() {
        let mut node = ThreadNode::leaf(message);
        if let Some(replies) = children.get(&message.id) {
            node.replies = replies.iter().filter_map(|r| built.remove(&r.id)).collect();
        }
        built.insert(message.id, node);
    }

    roots.iter().filter_map(|r| built.remove(&r.id)).collect()
}
