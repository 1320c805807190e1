use slotmap::{SlotMap, new_key_type};

use crate::editor::BufferId;
use crate::error::{RedError, Result};

new_key_type! { pub struct PaneId; }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAxis {
    Horizontal,
    Vertical,
}

/// How a split divides its dimension between the two children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    Percent(f32),
    FirstFixed(u16),
    SecondFixed(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub x: u16,
    pub y: u16,
    pub rows: u16,
    pub cols: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    pub buffer_id: BufferId,
    pub top_line: u16,
    pub wrap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaneKind {
    Leaf(Leaf),
    Split {
        axis: SplitAxis,
        first: PaneId,
        second: PaneId,
        sizing: Sizing,
    },
}

#[derive(Debug)]
pub struct PaneNode {
    pub kind: PaneKind,
    pub parent: Option<PaneId>,
}

/// Everything removed by one `close_child` call: the surviving child that
/// took the split's position and every invalidated id, closed-subtree panes
/// in depth-first order with the split node last.
#[derive(Debug)]
pub struct CloseOutcome {
    pub survivor: PaneId,
    pub removed: Vec<PaneId>,
}

/// Binary tree of panes stored in an arena. Parent and child links are ids,
/// never owning references; a removed id misses the arena and surfaces as a
/// typed error from then on.
pub struct PaneTree {
    nodes: SlotMap<PaneId, PaneNode>,
    root: PaneId,
}

impl PaneTree {
    pub fn new(initial_buffer: BufferId) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(PaneNode {
            kind: PaneKind::Leaf(Leaf {
                buffer_id: initial_buffer,
                top_line: 0,
                wrap: false,
            }),
            parent: None,
        });
        Self { nodes, root }
    }

    pub fn root(&self) -> PaneId {
        self.root
    }

    pub fn contains(&self, id: PaneId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn pane_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, id: PaneId) -> Result<&PaneKind> {
        self.nodes
            .get(id)
            .map(|node| &node.kind)
            .ok_or_else(|| RedError::invalid_pane(id))
    }

    pub fn parent_of(&self, id: PaneId) -> Result<Option<PaneId>> {
        self.nodes
            .get(id)
            .map(|node| node.parent)
            .ok_or_else(|| RedError::invalid_pane(id))
    }

    pub fn child_of(&self, id: PaneId, to_first: bool) -> Result<Option<PaneId>> {
        Ok(match self.kind(id)? {
            PaneKind::Leaf(_) => None,
            PaneKind::Split { first, second, .. } => {
                Some(if to_first { *first } else { *second })
            }
        })
    }

    /// Whether `id` is its parent's first child; `None` at the root.
    pub fn is_first(&self, id: PaneId) -> Result<Option<bool>> {
        let Some(parent) = self.parent_of(id)? else {
            return Ok(None);
        };
        Ok(match self.kind(parent)? {
            PaneKind::Leaf(_) => None,
            PaneKind::Split { first, second, .. } => {
                if *first == id {
                    Some(true)
                } else if *second == id {
                    Some(false)
                } else {
                    None
                }
            }
        })
    }

    /// The buffer shown by `id`'s nearest first-leaf descendant (or by `id`
    /// itself when it is a leaf).
    pub fn first_leaf_buffer(&self, id: PaneId) -> Result<BufferId> {
        let mut current = id;
        loop {
            match self.kind(current)? {
                PaneKind::Leaf(leaf) => return Ok(leaf.buffer_id),
                PaneKind::Split { first, .. } => current = *first,
            }
        }
    }

    /// Replaces `id` with a new split node in `id`'s tree position. `id`
    /// keeps its identity as the first child; the second child is a fresh
    /// leaf showing the nearest first-leaf descendant's buffer. Returns the
    /// new split node's id.
    pub fn split(&mut self, id: PaneId, axis: SplitAxis) -> Result<PaneId> {
        let parent = self.parent_of(id)?;
        let sibling_buffer = self.first_leaf_buffer(id)?;

        let second = self.nodes.insert(PaneNode {
            kind: PaneKind::Leaf(Leaf {
                buffer_id: sibling_buffer,
                top_line: 0,
                wrap: false,
            }),
            parent: None,
        });
        let split = self.nodes.insert(PaneNode {
            kind: PaneKind::Split {
                axis,
                first: id,
                second,
                sizing: Sizing::Percent(0.5),
            },
            parent,
        });

        self.nodes[id].parent = Some(split);
        self.nodes[second].parent = Some(split);

        match parent {
            Some(parent) => self.replace_child(parent, id, split),
            None => self.root = split,
        }

        Ok(split)
    }

    /// Removes one child subtree of a split along with the split node
    /// itself; the surviving child takes the split's tree position.
    pub fn close_child(&mut self, split_id: PaneId, first_child: bool) -> Result<CloseOutcome> {
        let (closed, survivor) = match self.kind(split_id)? {
            PaneKind::Leaf(_) => {
                return Err(RedError::new(
                    crate::error::ErrorKind::InvalidPane,
                    format!("close_child requires a split pane, got leaf {:?}", split_id),
                ));
            }
            PaneKind::Split { first, second, .. } => {
                if first_child {
                    (*first, *second)
                } else {
                    (*second, *first)
                }
            }
        };
        let parent = self.parent_of(split_id)?;

        let mut removed = Vec::new();
        self.collect_subtree(closed, &mut removed);
        for id in &removed {
            self.nodes.remove(*id);
        }
        self.nodes.remove(split_id);
        removed.push(split_id);

        self.nodes[survivor].parent = parent;
        match parent {
            Some(parent) => self.replace_child(parent, split_id, survivor),
            None => self.root = survivor,
        }

        Ok(CloseOutcome { survivor, removed })
    }

    pub fn set_split_percent(
        &mut self,
        id: PaneId,
        percent: f32,
        on_first: bool,
    ) -> Result<()> {
        let first_fraction = if on_first {
            percent
        } else {
            1.0 - percent
        };
        self.set_sizing(id, Sizing::Percent(first_fraction.clamp(0.0, 1.0)))
    }

    pub fn set_split_fixed(&mut self, id: PaneId, size: u16, on_first: bool) -> Result<()> {
        let sizing = if on_first {
            Sizing::FirstFixed(size)
        } else {
            Sizing::SecondFixed(size)
        };
        self.set_sizing(id, sizing)
    }

    pub fn buffer_of(&self, id: PaneId) -> Result<Option<BufferId>> {
        Ok(match self.kind(id)? {
            PaneKind::Leaf(leaf) => Some(leaf.buffer_id),
            PaneKind::Split { .. } => None,
        })
    }

    pub fn set_buffer(&mut self, id: PaneId, buffer_id: BufferId) -> Result<()> {
        match self.leaf_mut(id)? {
            Some(leaf) => {
                leaf.buffer_id = buffer_id;
                Ok(())
            }
            None => Err(RedError::new(
                crate::error::ErrorKind::InvalidPane,
                format!("cannot set buffer on split pane {:?}", id),
            )),
        }
    }

    pub fn top_line(&self, id: PaneId) -> Result<Option<u16>> {
        Ok(match self.kind(id)? {
            PaneKind::Leaf(leaf) => Some(leaf.top_line),
            PaneKind::Split { .. } => None,
        })
    }

    pub fn set_top_line(&mut self, id: PaneId, line: u16) -> Result<()> {
        if let Some(leaf) = self.leaf_mut(id)? {
            leaf.top_line = line;
        }
        Ok(())
    }

    pub fn wrap(&self, id: PaneId) -> Result<Option<bool>> {
        Ok(match self.kind(id)? {
            PaneKind::Leaf(leaf) => Some(leaf.wrap),
            PaneKind::Split { .. } => None,
        })
    }

    pub fn set_wrap(&mut self, id: PaneId, wrap: bool) -> Result<()> {
        if let Some(leaf) = self.leaf_mut(id)? {
            leaf.wrap = wrap;
        }
        Ok(())
    }

    /// The rectangle `id` occupies inside `root_frame`, computed by
    /// descending the split chain from the root. V-splits divide columns,
    /// H-splits divide rows.
    pub fn frame(&self, id: PaneId, root_frame: Frame) -> Result<Frame> {
        if !self.contains(id) {
            return Err(RedError::invalid_pane(id));
        }

        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_of(current)? {
            let went_first = self.is_first(current)?.unwrap_or(true);
            path.push((parent, went_first));
            current = parent;
        }

        let mut frame = root_frame;
        for (split, went_first) in path.into_iter().rev() {
            let PaneKind::Split { axis, sizing, .. } = self.kind(split)? else {
                continue;
            };
            let (first_frame, second_frame) = split_frames(*axis, *sizing, frame);
            frame = if went_first { first_frame } else { second_frame };
        }
        Ok(frame)
    }

    pub fn leaves(&self) -> impl Iterator<Item = (PaneId, &Leaf)> {
        self.nodes.iter().filter_map(|(id, node)| match &node.kind {
            PaneKind::Leaf(leaf) => Some((id, leaf)),
            PaneKind::Split { .. } => None,
        })
    }

    fn leaf_mut(&mut self, id: PaneId) -> Result<Option<&mut Leaf>> {
        match self
            .nodes
            .get_mut(id)
            .ok_or_else(|| RedError::invalid_pane(id))?
        {
            PaneNode {
                kind: PaneKind::Leaf(leaf),
                ..
            } => Ok(Some(leaf)),
            _ => Ok(None),
        }
    }

    fn set_sizing(&mut self, id: PaneId, sizing: Sizing) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| RedError::invalid_pane(id))?;
        if let PaneKind::Split {
            sizing: current, ..
        } = &mut node.kind
        {
            *current = sizing;
        }
        Ok(())
    }

    fn replace_child(&mut self, parent: PaneId, old: PaneId, new: PaneId) {
        if let Some(PaneNode {
            kind: PaneKind::Split { first, second, .. },
            ..
        }) = self.nodes.get_mut(parent)
        {
            if *first == old {
                *first = new;
            } else if *second == old {
                *second = new;
            }
        }
    }

    fn collect_subtree(&self, id: PaneId, out: &mut Vec<PaneId>) {
        out.push(id);
        if let Some(PaneNode {
            kind: PaneKind::Split { first, second, .. },
            ..
        }) = self.nodes.get(id)
        {
            self.collect_subtree(*first, out);
            self.collect_subtree(*second, out);
        }
    }
}

fn split_frames(axis: SplitAxis, sizing: Sizing, frame: Frame) -> (Frame, Frame) {
    match axis {
        SplitAxis::Vertical => {
            let first_cols = first_share(sizing, frame.cols);
            let first = Frame {
                cols: first_cols,
                ..frame
            };
            let second = Frame {
                x: frame.x + first_cols,
                cols: frame.cols - first_cols,
                ..frame
            };
            (first, second)
        }
        SplitAxis::Horizontal => {
            let first_rows = first_share(sizing, frame.rows);
            let first = Frame {
                rows: first_rows,
                ..frame
            };
            let second = Frame {
                y: frame.y + first_rows,
                rows: frame.rows - first_rows,
                ..frame
            };
            (first, second)
        }
    }
}

fn first_share(sizing: Sizing, dimension: u16) -> u16 {
    match sizing {
        Sizing::Percent(fraction) => {
            ((f32::from(dimension) * fraction).round() as u16).min(dimension)
        }
        Sizing::FirstFixed(size) => size.min(dimension),
        Sizing::SecondFixed(size) => dimension - size.min(dimension),
    }
}
