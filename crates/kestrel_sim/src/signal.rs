//! Storage cells owned by modules: plain values, state wires and memories.
//!
//! Inputs and combinational nets are plain [`Value`]s recomputed by `eval`.
//! Sequential state lives in a [`Wire`] (current + next value) or a
//! [`Memory`] (words + pending writes); `eval` only ever writes the shadow
//! side and `commit` publishes it, which is what makes all registers appear
//! to update simultaneously.

use kestrel_common::Value;

/// A state element with a current value and a pending next value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wire {
    /// The value visible to combinational logic during this step.
    pub curr: Value,
    /// The value `commit` will publish.
    pub next: Value,
}

impl Wire {
    /// Creates a wire of the given width with both sides cleared.
    pub fn new(width: u32) -> Self {
        Self::with_init(Value::new(width))
    }

    /// Creates a wire whose power-on value is `init`.
    pub fn with_init(init: Value) -> Self {
        Self {
            next: init.clone(),
            curr: init,
        }
    }

    /// Returns the bit width.
    pub fn width(&self) -> u32 {
        self.curr.width()
    }

    /// Publishes `next` into `curr`, returning whether `curr` changed.
    pub fn commit(&mut self) -> bool {
        self.curr.assign(&self.next)
    }

    /// Overwrites both sides, so the forced value survives the next commit.
    pub fn force(&mut self, value: &Value) {
        self.curr.assign(value);
        self.next.assign(value);
    }
}

/// A write queued on a memory port, applied by [`Memory::commit`].
#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingWrite {
    port: usize,
    index: usize,
    value: Value,
    priority: u32,
}

/// An array of equal-width words with port-addressed pending writes.
///
/// Each write port holds at most one pending write; re-queuing on the same
/// port during a later `eval` pass replaces the earlier request, so repeated
/// passes before convergence never leave stale writes behind. On commit,
/// writes apply in ascending priority (then port) order, so the highest
/// priority wins when two ports target the same word.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    width: u32,
    data: Vec<Value>,
    writes: Vec<PendingWrite>,
    external: bool,
    /// Returned for out-of-range reads.
    zero: Value,
}

impl Memory {
    /// Creates a memory of `depth` cleared words.
    pub fn new(width: u32, depth: usize) -> Self {
        Self::with_contents(width, vec![Value::new(width); depth])
    }

    /// Creates a memory with the given initial contents.
    ///
    /// # Panics
    ///
    /// Panics if any word's width differs from `width`.
    pub fn with_contents(width: u32, contents: Vec<Value>) -> Self {
        assert!(
            contents.iter().all(|w| w.width() == width),
            "memory word width mismatch"
        );
        Self {
            width,
            data: contents,
            writes: Vec::new(),
            external: false,
            zero: Value::new(width),
        }
    }

    /// Creates a memory whose contents are injected by the host.
    ///
    /// External memories are carried across reset by [`Memory::adopt_from`].
    pub fn external(width: u32, depth: usize) -> Self {
        Self {
            external: true,
            ..Self::new(width, depth)
        }
    }

    /// Returns whether the contents belong to the host rather than the design.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Returns the word width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the number of words.
    pub fn depth(&self) -> usize {
        self.data.len()
    }

    /// Reads a word; out-of-range indices read as zero.
    pub fn read(&self, index: usize) -> &Value {
        self.data.get(index).unwrap_or(&self.zero)
    }

    /// Returns all words.
    pub fn contents(&self) -> &[Value] {
        &self.data
    }

    /// Queues a write on `port`, replacing any write already pending there.
    ///
    /// Out-of-range indices are accepted here and dropped at commit.
    pub fn update(&mut self, port: usize, index: usize, value: Value, priority: u32) {
        assert_eq!(value.width(), self.width, "memory write width mismatch");
        let write = PendingWrite {
            port,
            index,
            value,
            priority,
        };
        match self.writes.iter_mut().find(|w| w.port == port) {
            Some(slot) => *slot = write,
            None => self.writes.push(write),
        }
    }

    /// Withdraws the write pending on `port`, if any.
    pub fn retract(&mut self, port: usize) {
        self.writes.retain(|w| w.port != port);
    }

    /// Returns whether any write is pending.
    pub fn has_pending(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Applies pending writes, returning whether any word changed.
    pub fn commit(&mut self) -> bool {
        if self.writes.is_empty() {
            return false;
        }
        self.writes.sort_by_key(|w| (w.priority, w.port));
        let mut changed = false;
        for write in self.writes.drain(..) {
            if let Some(word) = self.data.get_mut(write.index) {
                changed |= word.assign(&write.value);
            }
        }
        changed
    }

    /// Overwrites one word immediately, bypassing the write queue.
    ///
    /// Returns `false` without writing if `index` is out of range.
    pub fn force(&mut self, index: usize, value: &Value) -> bool {
        match self.data.get_mut(index) {
            Some(word) => {
                word.assign(value);
                true
            }
            None => false,
        }
    }

    /// Copies `image` into the memory starting at word `offset`.
    ///
    /// Words past the end of the memory are ignored. Returns the number of
    /// words written.
    pub fn load(&mut self, offset: usize, image: &[Value]) -> usize {
        let mut written = 0;
        for (word, value) in self.data.iter_mut().skip(offset).zip(image) {
            word.assign(value);
            written += 1;
        }
        written
    }

    /// Moves the contents out of `previous` for a freshly reset instance.
    ///
    /// Pending writes are discarded; `previous` is left empty.
    pub fn adopt_from(previous: &mut Memory) -> Memory {
        let mut adopted = std::mem::take(previous);
        adopted.writes.clear();
        adopted
    }
}

/// A borrowed view of one storage cell.
#[derive(Clone, Copy, Debug)]
pub enum SignalRef<'a> {
    /// An input or combinational net.
    Value(&'a Value),
    /// A register.
    Wire(&'a Wire),
    /// A memory.
    Memory(&'a Memory),
}

impl SignalRef<'_> {
    /// Returns the bit width (word width for memories).
    pub fn width(&self) -> u32 {
        match self {
            SignalRef::Value(v) => v.width(),
            SignalRef::Wire(w) => w.width(),
            SignalRef::Memory(m) => m.width(),
        }
    }

    /// Returns the number of words: 1 for scalars.
    pub fn depth(&self) -> usize {
        match self {
            SignalRef::Memory(m) => m.depth(),
            _ => 1,
        }
    }

    /// Returns the current value of a scalar; `None` for memories.
    pub fn current(&self) -> Option<&Value> {
        match self {
            SignalRef::Value(v) => Some(v),
            SignalRef::Wire(w) => Some(&w.curr),
            SignalRef::Memory(_) => None,
        }
    }
}

impl<'a> From<&'a Value> for SignalRef<'a> {
    fn from(value: &'a Value) -> Self {
        SignalRef::Value(value)
    }
}

impl<'a> From<&'a Wire> for SignalRef<'a> {
    fn from(wire: &'a Wire) -> Self {
        SignalRef::Wire(wire)
    }
}

impl<'a> From<&'a Memory> for SignalRef<'a> {
    fn from(memory: &'a Memory) -> Self {
        SignalRef::Memory(memory)
    }
}

/// A mutable view of one storage cell.
#[derive(Debug)]
pub enum SignalMut<'a> {
    /// An input or combinational net.
    Value(&'a mut Value),
    /// A register.
    Wire(&'a mut Wire),
    /// A memory.
    Memory(&'a mut Memory),
}

impl<'a> From<&'a mut Value> for SignalMut<'a> {
    fn from(value: &'a mut Value) -> Self {
        SignalMut::Value(value)
    }
}

impl<'a> From<&'a mut Wire> for SignalMut<'a> {
    fn from(wire: &'a mut Wire) -> Self {
        SignalMut::Wire(wire)
    }
}

impl<'a> From<&'a mut Memory> for SignalMut<'a> {
    fn from(memory: &'a mut Memory) -> Self {
        SignalMut::Memory(memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_commit_publishes_next() {
        let mut w = Wire::new(8);
        w.next = Value::from_u64(5, 8);
        assert_eq!(w.curr.to_u64(), Some(0));
        assert!(w.commit());
        assert_eq!(w.curr.to_u64(), Some(5));
        assert!(!w.commit());
    }

    #[test]
    fn wire_force_sets_both_sides() {
        let mut w = Wire::with_init(Value::from_u64(1, 4));
        w.force(&Value::from_u64(9, 4));
        assert_eq!(w.curr.to_u64(), Some(9));
        assert!(!w.commit());
    }

    #[test]
    fn memory_read_out_of_range_is_zero() {
        let m = Memory::with_contents(8, vec![Value::from_u64(7, 8)]);
        assert_eq!(m.read(0).to_u64(), Some(7));
        assert!(m.read(5).is_zero());
        assert_eq!(m.read(5).width(), 8);
    }

    #[test]
    fn memory_writes_wait_for_commit() {
        let mut m = Memory::new(8, 4);
        m.update(0, 2, Value::from_u64(0xAA, 8), 0);
        assert!(m.read(2).is_zero());
        assert!(m.has_pending());
        assert!(m.commit());
        assert_eq!(m.read(2).to_u64(), Some(0xAA));
        assert!(!m.has_pending());
        assert!(!m.commit());
    }

    #[test]
    fn memory_requeue_on_same_port_replaces() {
        let mut m = Memory::new(8, 4);
        m.update(0, 1, Value::from_u64(1, 8), 0);
        m.update(0, 3, Value::from_u64(3, 8), 0);
        m.commit();
        assert!(m.read(1).is_zero());
        assert_eq!(m.read(3).to_u64(), Some(3));
    }

    #[test]
    fn memory_higher_priority_wins() {
        let mut m = Memory::new(8, 4);
        m.update(1, 0, Value::from_u64(0x22, 8), 5);
        m.update(0, 0, Value::from_u64(0x11, 8), 1);
        m.commit();
        assert_eq!(m.read(0).to_u64(), Some(0x22));
    }

    #[test]
    fn memory_retract_and_out_of_range_write() {
        let mut m = Memory::new(8, 2);
        m.update(0, 0, Value::from_u64(1, 8), 0);
        m.retract(0);
        assert!(!m.has_pending());
        m.update(0, 9, Value::from_u64(1, 8), 0);
        assert!(!m.commit());
    }

    #[test]
    fn memory_load_and_force() {
        let mut m = Memory::external(8, 3);
        let image = [1, 2, 3, 4].map(|v| Value::from_u64(v, 8));
        assert_eq!(m.load(1, &image), 2);
        assert_eq!(m.read(1).to_u64(), Some(1));
        assert_eq!(m.read(2).to_u64(), Some(2));
        assert!(m.force(0, &Value::from_u64(9, 8)));
        assert!(!m.force(3, &Value::from_u64(9, 8)));
        assert_eq!(m.read(0).to_u64(), Some(9));
    }

    #[test]
    fn adopt_moves_contents_and_drops_writes() {
        let mut m = Memory::external(8, 2);
        m.force(1, &Value::from_u64(0x5A, 8));
        m.update(0, 0, Value::from_u64(1, 8), 0);
        let adopted = Memory::adopt_from(&mut m);
        assert!(adopted.is_external());
        assert_eq!(adopted.read(1).to_u64(), Some(0x5A));
        assert!(!adopted.has_pending());
        assert_eq!(m.depth(), 0);
    }

    #[test]
    fn signal_ref_metadata() {
        let v = Value::new(3);
        let w = Wire::new(5);
        let m = Memory::new(16, 8);
        assert_eq!(SignalRef::from(&v).width(), 3);
        assert_eq!(SignalRef::from(&w).current().map(Value::width), Some(5));
        assert_eq!(SignalRef::from(&m).depth(), 8);
        assert!(SignalRef::from(&m).current().is_none());
    }
}
