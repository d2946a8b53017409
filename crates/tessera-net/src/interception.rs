//! Outgoing packet interception.
//!
//! An [`InterceptionRegistry`] maps each of the 256 packet tags to an ordered
//! list of [`PacketGate`]s. Every outgoing packet is offered to the gates of its
//! tag in registration order; the first gate that refuses stops the packet and
//! the remaining gates are not consulted.
//!
//! Registration is expected at startup and shutdown only. The registry takes
//! `&mut self` for every mutation, so it cannot change while an `approve` call
//! holds a shared borrow.

use std::fmt;
use std::sync::Arc;

use crate::packet::Packet;

/// Number of distinct packet tags.
pub const TAG_SLOTS: usize = 256;

// ---------------------------------------------------------------------------
// PacketGate
// ---------------------------------------------------------------------------

/// Decides whether an outgoing packet may reach the wire.
pub trait PacketGate: Send + Sync {
    /// Returns `false` to stop `packet`.
    fn check(&self, packet: &Packet) -> bool;
}

impl<F> PacketGate for F
where
    F: Fn(&Packet) -> bool + Send + Sync,
{
    fn check(&self, packet: &Packet) -> bool {
        self(packet)
    }
}

// ---------------------------------------------------------------------------
// InterceptionRegistry
// ---------------------------------------------------------------------------

/// Fixed-size table of packet gates, one ordered list per tag.
pub struct InterceptionRegistry {
    slots: Box<[Vec<Arc<dyn PacketGate>>; TAG_SLOTS]>,
}

impl InterceptionRegistry {
    /// Creates a registry with no gates.
    pub fn new() -> Self {
        Self {
            slots: Box::new(std::array::from_fn(|_| Vec::new())),
        }
    }

    /// Returns `true` if every gate registered for the packet's tag accepts it.
    ///
    /// Gates run in registration order and evaluation stops at the first
    /// refusal. A tag with no gates always approves.
    pub fn approve(&self, packet: &Packet) -> bool {
        self.slots[usize::from(packet.tag().0)]
            .iter()
            .all(|gate| gate.check(packet))
    }

    /// Appends `gate` to the list for `tag`.
    ///
    /// Tags outside `0..=255` are ignored.
    pub fn register(&mut self, tag: i32, gate: Arc<dyn PacketGate>) {
        let Some(slot) = slot_index(tag) else {
            tracing::debug!(tag, "ignoring gate registration for out-of-range tag");
            return;
        };
        self.slots[slot].push(gate);
        tracing::debug!(tag, gates = self.slots[slot].len(), "registered packet gate");
    }

    /// Removes the first occurrence of `gate` (by identity) from the list for
    /// `tag`. Returns `true` if a gate was removed.
    pub fn unregister(&mut self, tag: i32, gate: &Arc<dyn PacketGate>) -> bool {
        let Some(slot) = slot_index(tag) else {
            return false;
        };
        let gates = &mut self.slots[slot];
        match gates.iter().position(|registered| same_gate(registered, gate)) {
            Some(index) => {
                gates.remove(index);
                tracing::debug!(tag, gates = gates.len(), "unregistered packet gate");
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `gate` is registered for `tag`.
    pub fn contains(&self, tag: i32, gate: &Arc<dyn PacketGate>) -> bool {
        slot_index(tag).is_some_and(|slot| {
            self.slots[slot]
                .iter()
                .any(|registered| same_gate(registered, gate))
        })
    }

    /// Returns `true` if at least one gate is registered for `tag`.
    pub fn has_any(&self, tag: i32) -> bool {
        slot_index(tag).is_some_and(|slot| !self.slots[slot].is_empty())
    }

    /// Returns `true` if any tag has at least one gate.
    pub fn has_any_gates(&self) -> bool {
        self.slots.iter().any(|gates| !gates.is_empty())
    }

    /// Number of gates registered for `tag`.
    pub fn gate_count(&self, tag: i32) -> usize {
        slot_index(tag).map_or(0, |slot| self.slots[slot].len())
    }

    /// Drops every registration. Intended for coordinated shutdown.
    pub fn reset(&mut self) {
        for gates in self.slots.iter_mut() {
            gates.clear();
        }
        tracing::debug!("cleared all packet gates");
    }
}

impl Default for InterceptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InterceptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let populated: Vec<(usize, usize)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, gates)| !gates.is_empty())
            .map(|(tag, gates)| (tag, gates.len()))
            .collect();
        f.debug_struct("InterceptionRegistry")
            .field("populated", &populated)
            .finish()
    }
}

fn slot_index(tag: i32) -> Option<usize> {
    u8::try_from(tag).ok().map(usize::from)
}

fn same_gate(a: &Arc<dyn PacketGate>, b: &Arc<dyn PacketGate>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::block_change::BlockChange;
    use crate::entity_title::EntityTitle;
    use crate::packet::PacketTag;

    /// Gate that counts its invocations and answers a fixed verdict.
    struct CountingGate {
        verdict: bool,
        calls: AtomicUsize,
    }

    impl CountingGate {
        fn new(verdict: bool) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PacketGate for CountingGate {
        fn check(&self, _packet: &Packet) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }
    }

    fn title_packet() -> Packet {
        EntityTitle::new(1, "x").into()
    }

    fn block_packet() -> Packet {
        BlockChange {
            x: 0,
            y: 0,
            z: 0,
            block_type: 1,
            meta: 0,
        }
        .into()
    }

    #[test]
    fn test_no_gates_approves() {
        let registry = InterceptionRegistry::new();
        assert!(registry.approve(&title_packet()));
        assert!(!registry.has_any_gates());
    }

    #[test]
    fn test_refusal_short_circuits_later_gates() {
        let packet = title_packet();
        let tag = i32::from(packet.tag());
        let first = CountingGate::new(true);
        let second = CountingGate::new(false);
        let third = CountingGate::new(true);

        let mut registry = InterceptionRegistry::new();
        registry.register(tag, first.clone());
        registry.register(tag, second.clone());
        registry.register(tag, third.clone());

        assert!(!registry.approve(&packet));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
        assert_eq!(third.calls(), 0, "third gate must not run after a refusal");
    }

    #[test]
    fn test_gates_on_other_tags_never_run() {
        let gate = CountingGate::new(false);
        let mut registry = InterceptionRegistry::new();
        registry.register(10, gate.clone());

        assert!(registry.approve(&title_packet()));
        assert!(registry.approve(&block_packet()));
        assert_eq!(gate.calls(), 0);
    }

    #[test]
    fn test_all_accepting_gates_approve() {
        let mut registry = InterceptionRegistry::new();
        let tag = i32::from(PacketTag::BLOCK_CHANGE);
        registry.register(tag, Arc::new(|_: &Packet| true));
        registry.register(tag, Arc::new(|_: &Packet| true));
        assert!(registry.approve(&block_packet()));
        assert_eq!(registry.gate_count(tag), 2);
    }

    #[test]
    fn test_closure_gate_inspects_packet() {
        let mut registry = InterceptionRegistry::new();
        registry.register(
            i32::from(PacketTag::ENTITY_TITLE),
            Arc::new(|packet: &Packet| match packet {
                Packet::EntityTitle(title) => !title.title.contains("forbidden"),
                _ => true,
            }),
        );
        assert!(registry.approve(&EntityTitle::new(1, "fine").into()));
        assert!(!registry.approve(&EntityTitle::new(1, "forbidden word").into()));
        assert!(registry.approve(&block_packet()));
    }

    #[test]
    fn test_out_of_range_tags_are_ignored() {
        let mut registry = InterceptionRegistry::new();
        let gate: Arc<dyn PacketGate> = CountingGate::new(false);
        registry.register(-1, gate.clone());
        registry.register(256, gate.clone());
        registry.register(i32::MAX, gate.clone());

        assert!(!registry.has_any_gates());
        assert!(!registry.has_any(-1));
        assert!(!registry.has_any(256));
        assert!(!registry.unregister(256, &gate));
        assert!(!registry.contains(-1, &gate));
        assert_eq!(registry.gate_count(300), 0);
    }

    #[test]
    fn test_register_then_unregister_restores_has_any() {
        let mut registry = InterceptionRegistry::new();
        let tag = 77;
        assert!(!registry.has_any(tag));

        let gate: Arc<dyn PacketGate> = CountingGate::new(true);
        registry.register(tag, gate.clone());
        assert!(registry.has_any(tag));
        assert!(registry.has_any_gates());
        assert!(registry.contains(tag, &gate));

        assert!(registry.unregister(tag, &gate));
        assert!(!registry.has_any(tag));
        assert!(!registry.has_any_gates());
    }

    #[test]
    fn test_unregister_removes_first_occurrence_only() {
        let mut registry = InterceptionRegistry::new();
        let tag = 5;
        let gate: Arc<dyn PacketGate> = CountingGate::new(true);
        registry.register(tag, gate.clone());
        registry.register(tag, gate.clone());

        assert!(registry.unregister(tag, &gate));
        assert_eq!(registry.gate_count(tag), 1);
        assert!(registry.unregister(tag, &gate));
        assert!(!registry.unregister(tag, &gate));
    }

    #[test]
    fn test_unregister_uses_identity_not_behaviour() {
        let mut registry = InterceptionRegistry::new();
        let tag = 5;
        let registered: Arc<dyn PacketGate> = CountingGate::new(true);
        let lookalike: Arc<dyn PacketGate> = CountingGate::new(true);
        registry.register(tag, registered.clone());

        assert!(!registry.unregister(tag, &lookalike));
        assert!(!registry.contains(tag, &lookalike));
        assert!(registry.unregister(tag, &registered));
    }

    #[test]
    fn test_unregister_keeps_order_of_remaining_gates() {
        let mut registry = InterceptionRegistry::new();
        let packet = block_packet();
        let tag = i32::from(packet.tag());

        let a: Arc<dyn PacketGate> = CountingGate::new(true);
        let refusing = CountingGate::new(false);
        let c = CountingGate::new(true);
        registry.register(tag, a.clone());
        registry.register(tag, refusing.clone());
        registry.register(tag, c.clone());

        assert!(registry.unregister(tag, &a));
        assert!(!registry.approve(&packet));
        assert_eq!(refusing.calls(), 1);
        assert_eq!(c.calls(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut registry = InterceptionRegistry::new();
        for tag in [0, 53, 200, 255] {
            registry.register(tag, Arc::new(|_: &Packet| false));
        }
        assert!(registry.has_any(0));
        assert!(registry.has_any(255));

        registry.reset();
        assert!(!registry.has_any_gates());
        assert!(registry.approve(&block_packet()));
    }
}
