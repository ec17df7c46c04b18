//! Builds the nested comment forest rendered by the client from the flat rows
//! returned by the comment query.
//!
//! Rows are expected to list a parent before any of its replies. A reply whose
//! parent has not been seen yet is left out of the forest, as is a reply to a
//! comment that is not part of the input at all. When two rows share an id,
//! the later one takes over the id and is the one later replies attach to.

use std::{collections::HashMap, hash::Hash};

use serde::Serialize;

/// A comment row that can be placed in a tree.
pub trait CommentRecord {
    type Id: Eq + Hash + Clone;

    /// Whoever is looking at the comments, threaded into `serialize`.
    type Viewer: ?Sized;

    /// What ends up in `CommentNode::comment`.
    type Output;

    fn comment_id(&self) -> Self::Id;

    fn parent_id(&self) -> Option<Self::Id>;

    /// Decides whether the record is a root, whatever `parent_id` says.
    fn has_parent(&self) -> bool;

    fn serialize(&self, viewer: Option<&Self::Viewer>) -> Self::Output;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode<T> {
    pub comment: T,
    pub children: Vec<CommentNode<T>>,
}

impl<T> CommentNode<T> {
    pub fn leaf(comment: T) -> Self {
        CommentNode {
            comment,
            children: vec![],
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(CommentNode::count).sum::<usize>()
    }

    /// Length of the longest reply chain below this node.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

struct Slot<T> {
    comment: T,
    children: Vec<usize>,
}

/// Turns `records` into a forest, keeping the input order among siblings.
///
/// Never fails: orphaned replies are dropped instead.
pub fn build_tree<'a, R, I>(records: I, viewer: Option<&R::Viewer>) -> Vec<CommentNode<R::Output>>
where
    R: CommentRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let records = records.into_iter();

    // Nodes live in `slots` and refer to their replies by index, so the
    // forest can be assembled by moving each node out exactly once.
    let mut slots: Vec<Option<Slot<R::Output>>> = Vec::with_capacity(records.size_hint().0);
    let mut by_id = HashMap::<R::Id, usize>::with_capacity(records.size_hint().0);
    let mut roots: Vec<usize> = vec![];

    for record in records {
        let index = slots.len();
        slots.push(Some(Slot {
            comment: record.serialize(viewer),
            children: vec![],
        }));
        by_id.insert(record.comment_id(), index);

        if !record.has_parent() {
            roots.push(index);
            continue;
        }

        let parent = record
            .parent_id()
            .and_then(|parent_id| by_id.get(&parent_id).copied());

        match parent {
            // A record listing itself as its own parent would otherwise
            // become its own child.
            Some(parent) if parent != index => {
                if let Some(slot) = slots[parent].as_mut() {
                    slot.children.push(index);
                }
            }
            _ => {}
        }
    }

    roots
        .into_iter()
        .filter_map(|index| assemble(index, &mut slots))
        .collect()
}

fn assemble<T>(index: usize, slots: &mut [Option<Slot<T>>]) -> Option<CommentNode<T>> {
    let Slot { comment, children } = slots[index].take()?;

    Some(CommentNode {
        comment,
        children: children
            .into_iter()
            .filter_map(|child| assemble(child, slots))
            .collect(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        id: i32,
        parent_id: Option<i32>,
        has_parent: bool,
        content: &'static str,
    }

    fn root(id: i32) -> Row {
        Row {
            id,
            parent_id: None,
            has_parent: false,
            content: "",
        }
    }

    fn reply(id: i32, parent_id: i32) -> Row {
        Row {
            id,
            parent_id: Some(parent_id),
            has_parent: true,
            content: "",
        }
    }

    impl CommentRecord for Row {
        type Id = i32;
        type Viewer = i32;
        type Output = (i32, &'static str, bool);

        fn comment_id(&self) -> i32 {
            self.id
        }

        fn parent_id(&self) -> Option<i32> {
            self.parent_id
        }

        fn has_parent(&self) -> bool {
            self.has_parent
        }

        fn serialize(&self, viewer: Option<&i32>) -> Self::Output {
            (self.id, self.content, viewer == Some(&self.id))
        }
    }

    fn ids(nodes: &[CommentNode<(i32, &'static str, bool)>]) -> Vec<i32> {
        nodes.iter().map(|n| n.comment.0).collect()
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        let rows: Vec<Row> = vec![];
        assert!(build_tree(&rows, None).is_empty());
    }

    #[test]
    fn replies_keep_input_order() {
        let rows = vec![root(1), reply(2, 1), reply(3, 1)];
        let tree = build_tree(&rows, None);

        assert_eq!(
            tree,
            vec![CommentNode {
                comment: (1, "", false),
                children: vec![
                    CommentNode::leaf((2, "", false)),
                    CommentNode::leaf((3, "", false)),
                ],
            }]
        );
    }

    #[test]
    fn roots_keep_input_order() {
        let rows = vec![root(7), root(3), reply(4, 3), root(5)];
        let tree = build_tree(&rows, None);

        assert_eq!(ids(&tree), vec![7, 3, 5]);
        assert_eq!(ids(&tree[1].children), vec![4]);
    }

    #[test]
    fn every_row_is_reachable_when_parents_come_first() {
        let rows = vec![
            root(1),
            reply(2, 1),
            reply(3, 2),
            root(4),
            reply(5, 1),
            reply(6, 4),
            reply(7, 3),
        ];
        let tree = build_tree(&rows, None);

        assert_eq!(tree.iter().map(CommentNode::count).sum::<usize>(), rows.len());
    }

    #[test]
    fn orphan_is_dropped() {
        let rows = vec![reply(2, 99)];
        assert!(build_tree(&rows, None).is_empty());
    }

    #[test]
    fn reply_before_its_parent_is_dropped() {
        let rows = vec![reply(2, 1), root(1), reply(3, 1)];
        let tree = build_tree(&rows, None);

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![3]);
    }

    #[test]
    fn descendants_of_a_dropped_reply_are_dropped_too() {
        let rows = vec![root(1), reply(2, 99), reply(3, 2)];
        let tree = build_tree(&rows, None);

        assert_eq!(tree.iter().map(CommentNode::count).sum::<usize>(), 1);
    }

    #[test]
    fn has_parent_decides_roots() {
        // parent_id is set, but the row says it has no parent
        let mut row = reply(2, 1);
        row.has_parent = false;
        let rows = vec![root(1), row];

        let tree = build_tree(&rows, None);
        assert_eq!(ids(&tree), vec![1, 2]);
        assert!(tree[0].children.is_empty());

        // has_parent without a parent_id can never be placed
        let rows = vec![Row {
            id: 3,
            parent_id: None,
            has_parent: true,
            content: "",
        }];
        assert!(build_tree(&rows, None).is_empty());
    }

    #[test]
    fn later_duplicate_takes_over_the_id() {
        let first = Row {
            content: "first",
            ..root(5)
        };
        let second = Row {
            content: "second",
            ..root(5)
        };
        let rows = vec![first, second, reply(6, 5)];
        let tree = build_tree(&rows, None);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.1, "first");
        assert!(tree[0].children.is_empty());
        assert_eq!(tree[1].comment.1, "second");
        assert_eq!(ids(&tree[1].children), vec![6]);
    }

    #[test]
    fn self_parent_is_dropped() {
        let rows = vec![root(1), reply(2, 2)];
        let tree = build_tree(&rows, None);

        assert_eq!(tree.iter().map(CommentNode::count).sum::<usize>(), 1);
    }

    #[test]
    fn chain_depth() {
        let k = 50;
        let mut rows = vec![root(0)];
        rows.extend((1..k).map(|i| reply(i, i - 1)));

        let tree = build_tree(&rows, None);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].depth(), (k - 1) as usize);
        assert_eq!(tree[0].count(), k as usize);
    }

    #[test]
    fn viewer_is_passed_to_serialize() {
        let rows = vec![root(1), reply(2, 1)];

        let tree = build_tree(&rows, Some(&2));
        assert!(!tree[0].comment.2);
        assert!(tree[0].children[0].comment.2);

        let tree = build_tree(&rows, None);
        assert!(!tree[0].children[0].comment.2);
    }

    #[test]
    fn serializes_as_comment_and_children() {
        let rows = vec![root(1), reply(2, 1)];
        let tree = build_tree(&rows, None);

        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {
                    "comment": [1, "", false],
                    "children": [{ "comment": [2, "", false], "children": [] }]
                }
            ])
        );
    }
}
