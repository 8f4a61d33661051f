use super::texture::TextureId;
use super::vertex::Vertex;
use super::MAX_TEXTURE_SLOTS;

/// Outcome of resolving a texture against the slot table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotLookup {
    /// Already referenced in this batch.
    Existing(u32),
    /// First reference in this batch; took the next free slot.
    Assigned(u32),
    /// Not present and no slot left. The batch must be flushed first.
    Full,
}

impl SlotLookup {
    pub fn slot(self) -> Option<u32> {
        match self {
            SlotLookup::Existing(s) | SlotLookup::Assigned(s) => Some(s),
            SlotLookup::Full => None,
        }
    }
}

/// Which texture occupies which slot for the current batch.
///
/// Slots are handed out in first-seen order, so slot 0 is the first texture
/// referenced after a reset. Lookup is a linear identity scan.
#[derive(Debug, Clone)]
pub struct TextureSlots {
    slots: [Option<TextureId>; MAX_TEXTURE_SLOTS],
    used: usize,
    limit: usize,
}

impl TextureSlots {
    /// `limit` is clamped to `1..=MAX_TEXTURE_SLOTS`.
    pub fn new(limit: usize) -> Self {
        Self {
            slots: [None; MAX_TEXTURE_SLOTS],
            used: 0,
            limit: limit.clamp(1, MAX_TEXTURE_SLOTS),
        }
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.used >= self.limit
    }

    pub fn find(&self, id: TextureId) -> Option<u32> {
        self.slots[..self.used]
            .iter()
            .position(|s| *s == Some(id))
            .map(|i| i as u32)
    }

    pub fn resolve(&mut self, id: TextureId) -> SlotLookup {
        if let Some(slot) = self.find(id) {
            return SlotLookup::Existing(slot);
        }
        if self.is_full() {
            return SlotLookup::Full;
        }
        let slot = self.used;
        self.slots[slot] = Some(id);
        self.used += 1;
        SlotLookup::Assigned(slot as u32)
    }

    /// Occupied slots in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, TextureId)> + '_ {
        self.slots[..self.used]
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|id| (i as u32, id)))
    }

    pub fn clear(&mut self) {
        self.slots = [None; MAX_TEXTURE_SLOTS];
        self.used = 0;
    }
}

/// CPU side of one batch: the vertex scratch buffer, counts, and slot table.
#[derive(Debug, Clone)]
pub struct BatchState {
    vertices: Vec<Vertex>,
    max_quads: usize,
    quad_count: usize,
    index_count: usize,
    slots: TextureSlots,
}

impl BatchState {
    pub fn new(max_quads: usize, texture_slots: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(max_quads * 4),
            max_quads,
            quad_count: 0,
            index_count: 0,
            slots: TextureSlots::new(texture_slots),
        }
    }

    #[inline]
    pub fn max_quads(&self) -> usize {
        self.max_quads
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.quad_count
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.index_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quad_count == 0
    }

    /// Whether one more quad would overrun the index buffer.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.index_count + 6 > 6 * self.max_quads
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn slots(&self) -> &TextureSlots {
        &self.slots
    }

    #[inline]
    pub fn slots_mut(&mut self) -> &mut TextureSlots {
        &mut self.slots
    }

    /// Appends one quad. The caller checks [`is_full`](Self::is_full) first.
    pub fn push_quad(&mut self, quad: [Vertex; 4]) {
        debug_assert!(!self.is_full());
        self.vertices.extend_from_slice(&quad);
        self.quad_count += 1;
        self.index_count += 6;
    }

    /// Resets counts, write cursor and slot table.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.quad_count = 0;
        self.index_count = 0;
        self.slots.clear();
    }

    /// Changes capacity. Drops any accumulated quads.
    pub fn resize(&mut self, max_quads: usize) {
        self.max_quads = max_quads;
        self.vertices = Vec::with_capacity(max_quads * 4);
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use crate::paint::Color;

    fn quad() -> [Vertex; 4] {
        Vertex::quad(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE, 0)
    }

    // ── texture slots ─────────────────────────────────────────────────────

    #[test]
    fn same_texture_resolves_to_same_slot() {
        let mut slots = TextureSlots::new(4);
        let a = TextureId::allocate();
        assert_eq!(slots.resolve(a), SlotLookup::Assigned(0));
        assert_eq!(slots.resolve(a), SlotLookup::Existing(0));
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn slots_assigned_in_first_seen_order() {
        let mut slots = TextureSlots::new(4);
        let ids: Vec<_> = (0..3).map(|_| TextureId::allocate()).collect();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(slots.resolve(*id).slot(), Some(i as u32));
        }
        let occupied: Vec<_> = slots.occupied().collect();
        assert_eq!(occupied, vec![(0, ids[0]), (1, ids[1]), (2, ids[2])]);
    }

    #[test]
    fn full_table_rejects_new_but_finds_existing() {
        let mut slots = TextureSlots::new(2);
        let a = TextureId::allocate();
        let b = TextureId::allocate();
        slots.resolve(a);
        slots.resolve(b);
        assert!(slots.is_full());
        assert_eq!(slots.resolve(TextureId::allocate()), SlotLookup::Full);
        assert_eq!(slots.resolve(b), SlotLookup::Existing(1));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(TextureSlots::new(0).limit(), 1);
        assert_eq!(TextureSlots::new(1000).limit(), MAX_TEXTURE_SLOTS);
    }

    #[test]
    fn clear_restarts_at_slot_zero() {
        let mut slots = TextureSlots::new(2);
        slots.resolve(TextureId::allocate());
        slots.clear();
        assert!(slots.is_empty());
        assert_eq!(slots.resolve(TextureId::allocate()), SlotLookup::Assigned(0));
    }

    // ── batch state ───────────────────────────────────────────────────────

    #[test]
    fn counts_stay_in_step() {
        let mut batch = BatchState::new(3, 4);
        batch.push_quad(quad());
        batch.push_quad(quad());
        assert_eq!(batch.quad_count(), 2);
        assert_eq!(batch.index_count(), 12);
        assert_eq!(batch.vertices().len(), 8);
        assert!(!batch.is_full());
        batch.push_quad(quad());
        assert!(batch.is_full());
    }

    #[test]
    fn reset_clears_everything() {
        let mut batch = BatchState::new(2, 4);
        batch.push_quad(quad());
        batch.slots_mut().resolve(TextureId::allocate());
        batch.reset();
        assert!(batch.is_empty());
        assert_eq!(batch.index_count(), 0);
        assert!(batch.vertices().is_empty());
        assert!(batch.slots().is_empty());
    }

    #[test]
    fn resize_changes_capacity() {
        let mut batch = BatchState::new(1, 4);
        batch.push_quad(quad());
        batch.resize(5);
        assert_eq!(batch.max_quads(), 5);
        assert!(batch.is_empty());
        assert!(batch.vertices.capacity() >= 20);
    }
}
