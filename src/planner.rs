//! Interactive planning state
//!
//! [`Planner`] holds everything an interactive front end needs between
//! events: the raw input, the current base block and its placements, the
//! subnet catalog, what the user is holding and the legal drop targets for
//! it. Front ends translate pointer and keyboard events into [`Intent`]s (or
//! call the matching methods) one at a time, in the order they happen.
//!
//! Mutations of the allocation store happen only in [`Planner::confirm_drop`],
//! [`Planner::click_at`], [`Planner::remove_at`], [`Planner::cycle_role_at`]
//! and when a new base block replaces the old one. Cancelling never touches
//! the store.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::catalog::{generate_catalog, CandidateSize};
use crate::cidr::{AddressRange, BaseBlock};
use crate::position::{enumerate, target, Slot};
use crate::store::{AllocationStore, PlacedSubnet, Role};
use crate::{Error, Field};

/// What the user is currently holding
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Active {
    /// A catalog size picked for click-to-place
    Selected { prefix_len: u8, role: Role },
    /// A catalog size being dragged onto the bar
    Dragging { prefix_len: u8, role: Role },
    /// A placed subnet being dragged to a new position
    Moving {
        index: usize,
        prefix_len: u8,
        role: Role,
    },
}

impl Active {
    const fn prefix_len(&self) -> u8 {
        match self {
            Self::Selected { prefix_len, .. }
            | Self::Dragging { prefix_len, .. }
            | Self::Moving { prefix_len, .. } => *prefix_len,
        }
    }

    const fn role(&self) -> Role {
        match self {
            Self::Selected { role, .. } | Self::Dragging { role, .. } | Self::Moving { role, .. } => {
                *role
            }
        }
    }

    /// Entry of the store to ignore when looking for free space
    const fn exclude(&self) -> Option<usize> {
        match self {
            Self::Moving { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// A discrete user action
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    /// The base block text changed
    SetInput(String),
    /// A catalog size was clicked
    SelectSize { prefix_len: u8, role: Role },
    /// A catalog size started being dragged
    BeginDrag { prefix_len: u8, role: Role },
    /// A placed subnet started being dragged
    BeginMove { index: usize },
    /// The pointer moved over the bar during a drag
    UpdateDragTarget { address: u32 },
    /// The pointer left the bar during a drag
    ClearDragTarget,
    /// The dragged subnet was released
    ConfirmDrop,
    /// The bar was clicked
    ClickAt { address: u32 },
    /// Escape, a click elsewhere, or a drag ending outside the bar
    Cancel,
    RemoveAt { index: usize },
    CycleRoleAt { index: usize },
}

/// State of an interactive planning session
#[derive(Clone, Debug, Default)]
pub struct Planner {
    input: String,
    store: Option<AllocationStore>,
    catalog: Vec<CandidateSize>,
    active: Option<Active>,
    preview: Option<Slot>,
    slots: Vec<Slot>,
}

impl Planner {
    /// Start a session with `input` as the base block text
    ///
    /// An invalid `input` still creates a planner, without a base block.
    #[must_use]
    pub fn new(input: &str) -> Self {
        let mut planner = Self::default();
        if let Err(e) = planner.set_input(input) {
            log::debug!("Initial input {input:?} rejected: {e}");
        }
        planner
    }

    /// Last text given to [`Self::set_input`], valid or not
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn base(&self) -> Option<&BaseBlock> {
        self.store.as_ref().map(AllocationStore::base)
    }

    #[must_use]
    pub const fn store(&self) -> Option<&AllocationStore> {
        self.store.as_ref()
    }

    /// Placed subnets, empty without a base block
    #[must_use]
    pub fn subnets(&self) -> &[PlacedSubnet] {
        match &self.store {
            Some(store) => store.subnets(),
            None => &[],
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &[CandidateSize] {
        &self.catalog
    }

    #[must_use]
    pub const fn active(&self) -> Option<&Active> {
        self.active.as_ref()
    }

    /// Slot under the pointer during a drag, if it is a legal target
    #[must_use]
    pub const fn preview(&self) -> Option<&Slot> {
        self.preview.as_ref()
    }

    /// Every legal target for what is currently held
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Apply one intent, discarding any value the matching method returns
    pub fn dispatch(&mut self, intent: Intent) -> Result<(), Error> {
        log::trace!("Dispatching {intent:?}");
        match intent {
            Intent::SetInput(text) => self.set_input(&text).map(|_| ()),
            Intent::SelectSize { prefix_len, role } => self.select_size(prefix_len, role),
            Intent::BeginDrag { prefix_len, role } => self.begin_drag(prefix_len, role),
            Intent::BeginMove { index } => self.begin_move(index),
            Intent::UpdateDragTarget { address } => self.update_drag_target(address).map(|_| ()),
            Intent::ClearDragTarget => {
                self.clear_drag_target();
                Ok(())
            }
            Intent::ConfirmDrop => self.confirm_drop().map(|_| ()),
            Intent::ClickAt { address } => self.click_at(address).map(|_| ()),
            Intent::Cancel => {
                self.cancel();
                Ok(())
            }
            Intent::RemoveAt { index } => self.remove_at(index).map(|_| ()),
            Intent::CycleRoleAt { index } => self.cycle_role_at(index).map(|_| ()),
        }
    }

    /// Parse `text` as the new base block
    ///
    /// On success every placement is dropped and the catalog regenerated. On
    /// failure the previous base block and placements are kept.
    pub fn set_input(&mut self, text: &str) -> Result<BaseBlock, Error> {
        text.clone_into(&mut self.input);
        let base: BaseBlock = text.parse()?;
        match &mut self.store {
            Some(store) => store.replace_base(base),
            None => self.store = Some(AllocationStore::new(base)),
        }
        self.catalog = generate_catalog(base.prefix_len());
        self.cancel();
        log::debug!(
            "Base block set to {base} with {} candidate sizes",
            self.catalog.len()
        );
        Ok(base)
    }

    /// Pick a size for click-to-place, or drop it if it is already picked
    pub fn select_size(&mut self, prefix_len: u8, role: Role) -> Result<(), Error> {
        self.require_base()?;
        check_prefix_len(prefix_len)?;
        let selected = Active::Selected { prefix_len, role };
        if self.active == Some(selected) {
            self.cancel();
        } else {
            self.hold(selected);
        }
        Ok(())
    }

    /// Start dragging a new subnet of `prefix_len`
    pub fn begin_drag(&mut self, prefix_len: u8, role: Role) -> Result<(), Error> {
        self.require_base()?;
        check_prefix_len(prefix_len)?;
        self.hold(Active::Dragging { prefix_len, role });
        Ok(())
    }

    /// Start dragging the placed subnet at `index`
    pub fn begin_move(&mut self, index: usize) -> Result<(), Error> {
        let subnet = *self
            .require_base()?
            .get(index)
            .ok_or(Error::IndexOutOfRange(index))?;
        self.hold(Active::Moving {
            index,
            prefix_len: subnet.prefix_len,
            role: subnet.role,
        });
        Ok(())
    }

    /// Point the current drag at `address`
    ///
    /// Returns the previewed slot, `None` if nothing is being dragged, or the
    /// reason the position under the pointer is not a legal target.
    pub fn update_drag_target(&mut self, address: u32) -> Result<Option<Slot>, Error> {
        self.preview = None;
        let Some(active) = self.active else {
            return Ok(None);
        };
        if matches!(active, Active::Selected { .. }) {
            return Ok(None);
        }
        let store = self.require_base()?;
        let slot = target(
            address,
            active.prefix_len(),
            active.role(),
            store.base(),
            store.subnets(),
            active.exclude(),
        )?;
        log::trace!("Drag target {}", slot.range);
        self.preview = Some(slot);
        Ok(Some(slot))
    }

    /// Forget the previewed slot, keeping the drag going
    pub fn clear_drag_target(&mut self) {
        self.preview = None;
    }

    /// Release the current drag
    ///
    /// Commits the previewed slot, if any, and returns the index of the new
    /// or moved entry. The drag ends either way.
    pub fn confirm_drop(&mut self) -> Result<Option<usize>, Error> {
        let Some(active) = self.active else {
            return Ok(None);
        };
        if matches!(active, Active::Selected { .. }) {
            return Ok(None);
        }
        let preview = self.preview.take();
        self.cancel();
        let Some(slot) = preview else {
            return Ok(None);
        };
        let store = self.store.as_mut().ok_or(Error::NoBase)?;
        let index = match active {
            Active::Moving { index, .. } => {
                store.move_to(index, slot.range)?;
                index
            }
            _ => store.add(slot.candidate)?,
        };
        log::debug!("Dropped {} at index {index}", slot.candidate);
        Ok(Some(index))
    }

    /// Place the selected size at the boundary under `address`
    ///
    /// Returns `None` if no size is selected. On success the selection is
    /// cleared; on failure it is kept so the user can try another spot.
    pub fn click_at(&mut self, address: u32) -> Result<Option<usize>, Error> {
        let Some(Active::Selected { prefix_len, role }) = self.active else {
            return Ok(None);
        };
        let store = self.store.as_mut().ok_or(Error::NoBase)?;
        let slot = target(
            address,
            prefix_len,
            role,
            store.base(),
            store.subnets(),
            None,
        )?;
        let index = store.add(slot.candidate)?;
        log::debug!("Placed {} at index {index}", slot.candidate);
        self.cancel();
        Ok(Some(index))
    }

    /// Drop whatever is held without changing any placement
    pub fn cancel(&mut self) {
        self.active = None;
        self.preview = None;
        self.slots.clear();
    }

    /// Remove the placed subnet at `index`
    ///
    /// A move in progress is cancelled because entry indices shift.
    pub fn remove_at(&mut self, index: usize) -> Result<PlacedSubnet, Error> {
        let store = self.store.as_mut().ok_or(Error::NoBase)?;
        let removed = store.remove(index)?;
        log::debug!("Removed {removed}");
        if matches!(self.active, Some(Active::Moving { .. })) {
            self.cancel();
        } else {
            self.preview = None;
            self.refresh_slots();
        }
        Ok(removed)
    }

    /// Advance the role of the placed subnet at `index`
    pub fn cycle_role_at(&mut self, index: usize) -> Result<Role, Error> {
        let store = self.store.as_mut().ok_or(Error::NoBase)?;
        let role = store.cycle_role(index)?;
        let Some(Active::Moving {
            index: moving,
            role: held,
            ..
        }) = &mut self.active
        else {
            return Ok(role);
        };
        if *moving == index {
            *held = role;
            if let Some(preview) = &mut self.preview {
                preview.candidate.role = role;
            }
            self.refresh_slots();
        }
        Ok(role)
    }

    /// Legal targets for an arbitrary size, regardless of what is held
    #[must_use]
    pub fn free_slots(&self, prefix_len: u8, role: Role) -> Vec<Slot> {
        self.store.as_ref().map_or_else(Vec::new, |store| {
            enumerate(prefix_len, role, store.base(), store.subnets(), None)
        })
    }

    /// Range of the current base block, if any
    #[must_use]
    pub fn base_range(&self) -> Option<AddressRange> {
        self.base().map(BaseBlock::range)
    }

    fn require_base(&self) -> Result<&AllocationStore, Error> {
        self.store.as_ref().ok_or(Error::NoBase)
    }

    fn hold(&mut self, active: Active) {
        self.active = Some(active);
        self.preview = None;
        self.refresh_slots();
    }

    fn refresh_slots(&mut self) {
        self.slots = match (&self.active, &self.store) {
            (Some(active), Some(store)) => enumerate(
                active.prefix_len(),
                active.role(),
                store.base(),
                store.subnets(),
                active.exclude(),
            ),
            _ => Vec::new(),
        };
    }
}

fn check_prefix_len(prefix_len: u8) -> Result<(), Error> {
    if prefix_len > 32 {
        return Err(Error::InvalidFormat(Field::Prefix));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cidr::to_address;

    fn addr(dotted: &str) -> u32 {
        to_address(dotted).unwrap()
    }

    #[test]
    fn test_new_with_invalid_input() {
        let planner = Planner::new("10.0.0.0/15");
        assert!(planner.base().is_none());
        assert!(planner.catalog().is_empty());
        assert_eq!(planner.input(), "10.0.0.0/15");
    }

    #[test]
    fn test_set_input_clears_placements() {
        let mut planner = Planner::new("10.0.0.0/16");
        assert_eq!(planner.catalog().len(), 12);
        planner.select_size(24, Role::Public).unwrap();
        planner.click_at(addr("10.0.0.0")).unwrap();
        assert_eq!(planner.subnets().len(), 1);
        planner.set_input("10.0.0.0/20").unwrap();
        assert!(planner.subnets().is_empty());
        assert_eq!(planner.catalog().len(), 8);
    }

    #[test]
    fn test_invalid_input_keeps_state() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(24, Role::Public).unwrap();
        planner.click_at(addr("10.0.3.9")).unwrap();
        assert_eq!(planner.set_input("10.0.0."), Err(Error::InvalidFormat(Field::Shape)));
        assert_eq!(planner.input(), "10.0.0.");
        assert_eq!(planner.base().unwrap().to_string(), "10.0.0.0/16");
        assert_eq!(planner.subnets().len(), 1);
        assert_eq!(planner.subnets()[0].start(), addr("10.0.3.0"));
    }

    #[test]
    fn test_intents_require_base() {
        let mut planner = Planner::default();
        assert_eq!(planner.select_size(24, Role::Public), Err(Error::NoBase));
        assert_eq!(planner.begin_drag(24, Role::Public), Err(Error::NoBase));
        assert_eq!(planner.begin_move(0), Err(Error::NoBase));
        assert_eq!(planner.remove_at(0).unwrap_err(), Error::NoBase);
        assert_eq!(planner.cycle_role_at(0), Err(Error::NoBase));
        assert!(planner.free_slots(24, Role::Public).is_empty());
    }

    #[test]
    fn test_select_toggles() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(18, Role::Public).unwrap();
        assert_eq!(planner.slots().len(), 4);
        // A different role is a different selection
        planner.select_size(18, Role::Private).unwrap();
        assert_eq!(
            planner.active(),
            Some(&Active::Selected {
                prefix_len: 18,
                role: Role::Private
            })
        );
        planner.select_size(18, Role::Private).unwrap();
        assert!(planner.active().is_none());
        assert!(planner.slots().is_empty());
    }

    #[test]
    fn test_click_failure_keeps_selection() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(18, Role::Public).unwrap();
        assert_eq!(planner.click_at(addr("10.0.1.1")), Ok(Some(0)));
        assert!(planner.active().is_none());
        planner.select_size(20, Role::Public).unwrap();
        assert_eq!(planner.slots().len(), 12);
        assert_eq!(planner.click_at(addr("10.0.17.0")), Err(Error::Overlaps(0)));
        assert!(planner.active().is_some());
        assert_eq!(planner.click_at(addr("10.1.0.0")), Err(Error::OutOfBounds));
        assert_eq!(planner.click_at(addr("10.0.64.0")), Ok(Some(1)));
    }

    #[test]
    fn test_click_without_selection() {
        let mut planner = Planner::new("10.0.0.0/16");
        assert_eq!(planner.click_at(addr("10.0.0.0")), Ok(None));
        planner.begin_drag(24, Role::Public).unwrap();
        assert_eq!(planner.click_at(addr("10.0.0.0")), Ok(None));
        assert!(planner.subnets().is_empty());
    }

    #[test]
    fn test_drag_and_drop() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.begin_drag(20, Role::Database).unwrap();
        assert_eq!(planner.slots().len(), 16);
        let slot = planner.update_drag_target(addr("10.0.17.3")).unwrap().unwrap();
        assert_eq!(slot.range.start, addr("10.0.16.0"));
        assert_eq!(planner.preview(), Some(&slot));
        assert_eq!(planner.confirm_drop(), Ok(Some(0)));
        assert!(planner.active().is_none());
        assert!(planner.slots().is_empty());
        assert_eq!(planner.subnets()[0].role, Role::Database);
        assert_eq!(planner.subnets()[0].cidr().to_string(), "10.0.16.0/20");
    }

    #[test]
    fn test_drop_without_preview() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(24, Role::Public).unwrap();
        planner.click_at(addr("10.0.0.0")).unwrap();
        planner.begin_drag(24, Role::Public).unwrap();
        assert_eq!(
            planner.update_drag_target(addr("10.0.0.5")),
            Err(Error::Overlaps(0))
        );
        assert!(planner.preview().is_none());
        assert_eq!(planner.confirm_drop(), Ok(None));
        assert!(planner.active().is_none());
        assert_eq!(planner.subnets().len(), 1);
    }

    #[test]
    fn test_drag_leave_clears_preview() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.begin_drag(24, Role::Public).unwrap();
        planner.update_drag_target(addr("10.0.0.5")).unwrap();
        planner.clear_drag_target();
        assert_eq!(planner.confirm_drop(), Ok(None));
        assert!(planner.subnets().is_empty());
    }

    #[test]
    fn test_move() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.begin_drag(24, Role::Private).unwrap();
        planner.update_drag_target(addr("10.0.0.0")).unwrap();
        planner.confirm_drop().unwrap();
        planner.begin_drag(24, Role::Public).unwrap();
        planner.update_drag_target(addr("10.0.1.0")).unwrap();
        planner.confirm_drop().unwrap();

        planner.begin_move(0).unwrap();
        // The moved subnet's own spot stays legal
        assert_eq!(planner.slots().len(), 255);
        assert_eq!(
            planner.update_drag_target(addr("10.0.1.0")),
            Err(Error::Overlaps(1))
        );
        planner.update_drag_target(addr("10.0.9.0")).unwrap();
        assert_eq!(planner.confirm_drop(), Ok(Some(0)));
        assert_eq!(planner.subnets()[0].start(), addr("10.0.9.0"));
        assert_eq!(planner.subnets()[0].role, Role::Private);
        assert_eq!(planner.subnets()[1].start(), addr("10.0.1.0"));
    }

    #[test]
    fn test_cancel_commits_nothing() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.begin_drag(24, Role::Public).unwrap();
        planner.update_drag_target(addr("10.0.0.0")).unwrap();
        planner.cancel();
        assert_eq!(planner.confirm_drop(), Ok(None));
        assert!(planner.subnets().is_empty());
        assert!(planner.slots().is_empty());
    }

    #[test]
    fn test_new_drag_replaces_selection() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(24, Role::Public).unwrap();
        planner.begin_drag(20, Role::Private).unwrap();
        assert_eq!(
            planner.active(),
            Some(&Active::Dragging {
                prefix_len: 20,
                role: Role::Private
            })
        );
        assert_eq!(planner.slots().len(), 16);
    }

    #[test]
    fn test_remove_refreshes_slots() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(17, Role::Public).unwrap();
        planner.click_at(addr("10.0.0.0")).unwrap();
        planner.select_size(17, Role::Public).unwrap();
        assert_eq!(planner.slots().len(), 1);
        planner.remove_at(0).unwrap();
        assert_eq!(planner.slots().len(), 2);
        assert_eq!(planner.remove_at(0).unwrap_err(), Error::IndexOutOfRange(0));
    }

    #[test]
    fn test_remove_cancels_move() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(24, Role::Public).unwrap();
        planner.click_at(addr("10.0.0.0")).unwrap();
        planner.begin_move(0).unwrap();
        planner.remove_at(0).unwrap();
        assert!(planner.active().is_none());
    }

    #[test]
    fn test_cycle_role_while_moving() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(24, Role::Public).unwrap();
        planner.click_at(addr("10.0.0.0")).unwrap();
        planner.begin_move(0).unwrap();
        assert_eq!(planner.cycle_role_at(0), Ok(Role::Private));
        planner.update_drag_target(addr("10.0.5.0")).unwrap();
        planner.confirm_drop().unwrap();
        assert_eq!(planner.subnets()[0].role, Role::Private);
    }

    #[test]
    fn test_cycle_role_while_moving_refreshes_slots() {
        let mut planner = Planner::new("10.0.0.0/16");
        planner.select_size(24, Role::Public).unwrap();
        planner.click_at(addr("10.0.0.0")).unwrap();
        planner.begin_move(0).unwrap();
        planner.update_drag_target(addr("10.0.5.0")).unwrap();
        assert_eq!(planner.cycle_role_at(0), Ok(Role::Private));
        assert!(!planner.slots().is_empty());
        assert!(planner
            .slots()
            .iter()
            .all(|slot| slot.candidate.role == Role::Private));
        assert_eq!(
            planner.preview().map(|slot| slot.candidate.role),
            Some(Role::Private)
        );
    }

    #[test]
    fn test_dispatch() {
        let mut planner = Planner::default();
        let intents = [
            Intent::SetInput("172.16.0.0/20".to_string()),
            Intent::SelectSize {
                prefix_len: 24,
                role: Role::Public,
            },
            Intent::ClickAt {
                address: addr("172.16.4.200"),
            },
            Intent::BeginMove { index: 0 },
            Intent::UpdateDragTarget {
                address: addr("172.16.15.1"),
            },
            Intent::ConfirmDrop,
            Intent::CycleRoleAt { index: 0 },
        ];
        for intent in intents {
            planner.dispatch(intent).unwrap();
        }
        assert_eq!(planner.subnets().len(), 1);
        assert_eq!(planner.subnets()[0].cidr().to_string(), "172.16.15.0/24");
        assert_eq!(planner.subnets()[0].role, Role::Private);
        assert_eq!(
            planner.dispatch(Intent::RemoveAt { index: 4 }),
            Err(Error::IndexOutOfRange(4))
        );
        planner.dispatch(Intent::Cancel).unwrap();
        planner.dispatch(Intent::RemoveAt { index: 0 }).unwrap();
        assert!(planner.subnets().is_empty());
    }
}
