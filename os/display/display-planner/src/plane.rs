use alloc::vec::Vec;
use core::fmt;
use display_cmdlist::{CommandList, ListArena, ListId, NextList};
use display_dma::DmaSlot;

/// Handle of a plane's persistent state.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PlaneId(pub u16);

impl fmt::Debug for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plane#{}", self.0)
    }
}

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PlaneId {
    #[inline]
    #[must_use]
    pub const fn list_id(self) -> ListId {
        ListId(self.0)
    }
}

/// Translation tables and command-list memory of one plane.
#[derive(Debug)]
pub(crate) struct PlaneBuffers<B> {
    pub(crate) tables: DmaSlot<B>,
    pub(crate) list: DmaSlot<B>,
}

impl<B> Default for PlaneBuffers<B> {
    fn default() -> Self {
        Self {
            tables: DmaSlot::default(),
            list: DmaSlot::default(),
        }
    }
}

/// Device buffers and command lists of one plane, double buffered.
///
/// `front` is what the last commit handed to hardware; `back` is filled by
/// `prepare` and swapped in by `commit`. Preparing never rewrites, grows or
/// frees `front`, so a frame that fails half way leaves the scanout intact.
///
/// All buffers are released when the state is dropped, which happens only
/// when the plane is destroyed or the engine goes away.
#[derive(Debug)]
pub struct PlaneState<B> {
    pub(crate) front: PlaneBuffers<B>,
    pub(crate) back: PlaneBuffers<B>,
    /// List in `front`, as committed.
    pub(crate) list: Option<CommandList>,
    /// List in `back`, waiting for commit.
    pub(crate) staged: Option<CommandList>,
}

impl<B> Default for PlaneState<B> {
    fn default() -> Self {
        Self {
            front: PlaneBuffers::default(),
            back: PlaneBuffers::default(),
            list: None,
            staged: None,
        }
    }
}

impl<B> PlaneState<B> {
    /// Make the staged buffers the ones hardware reads.
    pub(crate) fn promote(&mut self) {
        if let Some(list) = self.staged.take() {
            core::mem::swap(&mut self.front, &mut self.back);
            self.list = Some(list);
        }
    }

    /// Forget a staged list and free the buffers it was built in.
    pub(crate) fn discard(&mut self) {
        self.staged = None;
        self.back.tables.release();
        self.back.list.release();
    }
}

/// Plane states indexed by [`PlaneId`]. Freed slots are reused.
#[derive(Debug)]
pub struct PlaneArena<B> {
    slots: Vec<Option<PlaneState<B>>>,
}

impl<B> Default for PlaneArena<B> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<B> PlaneArena<B> {
    /// A fresh state in the lowest free slot, or `None` when every id is taken.
    pub fn create(&mut self) -> Option<PlaneId> {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(free) => free,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        let Ok(id) = u16::try_from(index) else {
            self.slots.pop();
            return None;
        };
        self.slots[index] = Some(PlaneState::default());
        Some(PlaneId(id))
    }

    /// Drop the state of `id`, releasing its buffers.
    pub fn destroy(&mut self, id: PlaneId) -> bool {
        self.slots
            .get_mut(usize::from(id.0))
            .and_then(Option::take)
            .is_some()
    }

    #[must_use]
    pub fn get(&self, id: PlaneId) -> Option<&PlaneState<B>> {
        self.slots.get(usize::from(id.0))?.as_ref()
    }

    pub fn get_mut(&mut self, id: PlaneId) -> Option<&mut PlaneState<B>> {
        self.slots.get_mut(usize::from(id.0))?.as_mut()
    }

    #[must_use]
    pub fn contains(&self, id: PlaneId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live planes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B> ListArena for PlaneArena<B> {
    fn set_next(&mut self, id: ListId, next: Option<NextList>) {
        if let Some(list) = self.get_mut(PlaneId(id.0)).and_then(|s| s.staged.as_mut()) {
            list.set_next(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_ids_are_reused() {
        let mut arena = PlaneArena::<()>::default();
        let a = arena.create().unwrap();
        let b = arena.create().unwrap();
        assert_eq!((a, b), (PlaneId(0), PlaneId(1)));
        assert!(arena.destroy(a));
        assert!(!arena.destroy(a));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.create(), Some(a));
    }

    #[test]
    fn promotion_swaps_in_the_staged_list() {
        let mut state = PlaneState::<()>::default();
        state.promote();
        assert!(state.list.is_none());

        let list = display_cmdlist::CmdListBuilder::new()
            .build(
                display_cmdlist::Trailer {
                    channel: 0,
                    scaler: None,
                },
                8,
            )
            .unwrap();
        state.staged = Some(list.clone());
        state.promote();
        assert_eq!(state.list, Some(list));
        assert!(state.staged.is_none());

        state.staged = state.list.clone();
        state.discard();
        assert!(state.staged.is_none());
        assert!(state.list.is_some());
    }
}
