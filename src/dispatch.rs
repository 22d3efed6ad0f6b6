//! Timer objects and the ISR dispatch table.
//!
//! A timer vector has no context of its own, so each slot keeps a
//! back-reference to the [`TimerObject`] currently armed on it. The caller
//! owns the object (it is `'static`); the table only points at it.

use core::cell::Cell;
use core::ptr;

use critical_section::{CriticalSection, Mutex};

use crate::slot::Slot;

/// Function invoked on expiry, in interrupt context.
///
/// Must be short and must not block. It may call back into the timer core,
/// including re-arming or disarming its own slot.
pub type Callback = fn(CallbackArg);

/// Opaque pointer-sized value handed back to the callback untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackArg(*mut ());

// The core never dereferences the pointer; only the callback does.
unsafe impl Send for CallbackArg {}
unsafe impl Sync for CallbackArg {}

impl CallbackArg {
    pub const NONE: Self = Self(ptr::null_mut());

    pub const fn new(ptr: *mut ()) -> Self {
        Self(ptr)
    }

    pub fn from_ref<T>(value: &'static T) -> Self {
        Self(value as *const T as *mut ())
    }

    pub const fn from_usize(value: usize) -> Self {
        Self(value as *mut ())
    }

    pub const fn as_ptr(self) -> *mut () {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// # Safety
    /// The argument must have been built with [`CallbackArg::from_ref`] from
    /// a `&'static T`.
    pub unsafe fn as_ref<T>(self) -> &'static T {
        &*(self.0 as *const T)
    }
}

/// Arming state of a timer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Disarmed,
    /// Fires every interval until disarmed.
    Repeating,
    /// Fires once, then disarms itself.
    OneShot,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Disarmed
    }
}

impl Mode {
    pub const fn is_armed(self) -> bool {
        !matches!(self, Mode::Disarmed)
    }
}

/// Everything the interrupt handler needs to know about an armed object.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Binding {
    pub callback: Option<Callback>,
    pub arg: CallbackArg,
    pub mode: Mode,
    pub interval_ms: u32,
    pub slot: Option<usize>,
    /// Bumped on every arm.
    pub epoch: u32,
}

/// One logical timer owned by the caller.
pub struct TimerObject {
    binding: Mutex<Cell<Binding>>,
}

impl TimerObject {
    /// A disarmed timer that will request `interval_ms` when armed.
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            binding: Mutex::new(Cell::new(Binding {
                callback: None,
                arg: CallbackArg::NONE,
                mode: Mode::Disarmed,
                interval_ms,
                slot: None,
                epoch: 0,
            })),
        }
    }

    pub fn mode(&self) -> Mode {
        critical_section::with(|cs| self.binding(cs).mode)
    }

    pub fn is_armed(&self) -> bool {
        self.mode().is_armed()
    }

    /// Requested period while disarmed, clamped period once armed.
    pub fn interval_ms(&self) -> u32 {
        critical_section::with(|cs| self.binding(cs).interval_ms)
    }

    /// Changes the period requested on the next arm.
    ///
    /// Has no effect on hardware; use the core's `set_interval` to retune
    /// an armed slot.
    pub fn set_requested_interval(&self, interval_ms: u32) {
        critical_section::with(|cs| self.update(cs, |b| b.interval_ms = interval_ms));
    }

    /// Slot the object was last armed on, while it stays armed.
    pub fn slot(&self) -> Option<usize> {
        critical_section::with(|cs| {
            let binding = self.binding(cs);
            binding.mode.is_armed().then_some(binding.slot).flatten()
        })
    }

    pub(crate) fn binding(&self, cs: CriticalSection<'_>) -> Binding {
        self.binding.borrow(cs).get()
    }

    pub(crate) fn update(&self, cs: CriticalSection<'_>, f: impl FnOnce(&mut Binding)) {
        let cell = self.binding.borrow(cs);
        let mut binding = cell.get();
        f(&mut binding);
        cell.set(binding);
    }

    pub(crate) fn mark_disarmed(&self, cs: CriticalSection<'_>) {
        self.update(cs, |b| {
            b.mode = Mode::Disarmed;
            b.slot = None;
        });
    }
}

/// Back-references from slots to the objects armed on them.
pub struct DispatchTable<const N: usize> {
    entries: Mutex<[Cell<Option<&'static TimerObject>>; N]>,
}

impl<const N: usize> DispatchTable<N> {
    /// All slots empty.
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new([const { Cell::new(None) }; N]),
        }
    }

    fn entry<'cs>(
        &'cs self,
        cs: CriticalSection<'cs>,
        slot: Slot<N>,
    ) -> &'cs Cell<Option<&'static TimerObject>> {
        &self.entries.borrow(cs)[slot.index()]
    }

    /// Binds `timer` to `slot`, returning whatever was bound before.
    pub fn register(
        &self,
        cs: CriticalSection<'_>,
        slot: Slot<N>,
        timer: &'static TimerObject,
    ) -> Option<&'static TimerObject> {
        self.entry(cs, slot).replace(Some(timer))
    }

    pub fn lookup(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> Option<&'static TimerObject> {
        self.entry(cs, slot).get()
    }

    pub fn clear(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> Option<&'static TimerObject> {
        self.entry(cs, slot).take()
    }

    pub fn is_bound(&self, cs: CriticalSection<'_>, slot: Slot<N>, timer: &TimerObject) -> bool {
        self.lookup(cs, slot)
            .is_some_and(|bound| ptr::eq(bound, timer))
    }
}

impl<const N: usize> Default for DispatchTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak(interval_ms: u32) -> &'static TimerObject {
        Box::leak(Box::new(TimerObject::new(interval_ms)))
    }

    #[test]
    fn new_object_is_disarmed() {
        let timer = TimerObject::new(250);
        assert_eq!(timer.mode(), Mode::Disarmed);
        assert_eq!(timer.interval_ms(), 250);
        assert_eq!(timer.slot(), None);
    }

    #[test]
    fn register_replaces_and_reports_previous() {
        let table = DispatchTable::<2>::new();
        let first = leak(10);
        let second = leak(20);
        let slot = Slot::new(1).unwrap();
        critical_section::with(|cs| {
            assert!(table.register(cs, slot, first).is_none());
            let previous = table.register(cs, slot, second).unwrap();
            assert!(ptr::eq(previous, first));
            assert!(table.is_bound(cs, slot, second));
            assert!(!table.is_bound(cs, slot, first));
        });
    }

    #[test]
    fn clear_empties_only_its_slot() {
        let table = DispatchTable::<2>::new();
        let a = leak(10);
        let b = leak(20);
        let (s0, s1) = (Slot::new(0).unwrap(), Slot::new(1).unwrap());
        critical_section::with(|cs| {
            table.register(cs, s0, a);
            table.register(cs, s1, b);
            assert!(table.clear(cs, s0).is_some());
            assert!(table.lookup(cs, s0).is_none());
            assert!(table.is_bound(cs, s1, b));
        });
    }

    #[test]
    fn callback_arg_round_trips_a_reference() {
        static VALUE: u32 = 42;
        let arg = CallbackArg::from_ref(&VALUE);
        assert_eq!(unsafe { *arg.as_ref::<u32>() }, 42);
        assert_eq!(CallbackArg::from_usize(7).as_usize(), 7);
    }

    #[test]
    fn mark_disarmed_forgets_the_slot() {
        let timer = leak(10);
        critical_section::with(|cs| {
            timer.update(cs, |b| {
                b.mode = Mode::Repeating;
                b.slot = Some(1);
            })
        });
        assert_eq!(timer.slot(), Some(1));
        critical_section::with(|cs| timer.mark_disarmed(cs));
        assert!(!timer.is_armed());
        assert_eq!(timer.slot(), None);
    }
}
