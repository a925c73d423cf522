//! Host page model the widgets are mounted into: field groups with
//! role-marked elements, change notifications for observers, and
//! document-level listener registrations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

pub type GroupId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Human-editable `DD-MM-YYYY` text input.
    Display,
    /// Canonical `YYYY-MM-DD` value; normally not edited directly.
    Hidden,
    /// Button that opens the calendar popup.
    Trigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub role: Role,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    pub id: GroupId,
    pub elements: Vec<Element>,
}

impl FieldGroup {
    pub fn new(id: impl Into<GroupId>) -> Self {
        FieldGroup {
            id: id.into(),
            elements: Vec::new(),
        }
    }

    /// Display, hidden and trigger elements, with the hidden one seeded
    /// from `canonical`.
    pub fn date_field(id: impl Into<GroupId>, canonical: &str) -> Self {
        FieldGroup::new(id)
            .with_element(Role::Display, "")
            .with_element(Role::Hidden, canonical)
            .with_element(Role::Trigger, "")
    }

    pub fn with_element(mut self, role: Role, value: &str) -> Self {
        self.elements.push(Element {
            role,
            value: value.to_string(),
        });
        self
    }

    pub fn position(&self, role: Role) -> Option<usize> {
        self.elements.iter().position(|e| e.role == role)
    }
}

/// Emitted after a widget writes a field, so surrounding form logic can react.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub group: GroupId,
    pub role: Role,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentListener {
    OutsideClick,
    Escape,
}

type ListenerId = u64;

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: ListenerId,
    entries: Vec<(ListenerId, DocumentListener, GroupId)>,
}

impl ListenerRegistry {
    pub fn count(&self, kind: DocumentListener) -> usize {
        self.entries.iter().filter(|(_, k, _)| *k == kind).count()
    }

    /// Owners to dispatch a document-level event of `kind` to, in
    /// registration order.
    pub fn subscribers(&self, kind: DocumentListener) -> Vec<GroupId> {
        self.entries
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, owner)| owner.clone())
            .collect()
    }

    fn add(&mut self, kind: DocumentListener, owner: GroupId) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, kind, owner));
        id
    }

    fn remove(&mut self, id: ListenerId) {
        self.entries.retain(|(entry, _, _)| *entry != id);
    }
}

/// Live registration of a document-level listener. Removed from the
/// registry when dropped.
#[derive(Debug)]
pub struct ListenerGuard {
    registry: Weak<RefCell<ListenerRegistry>>,
    id: ListenerId,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(self.id);
        }
    }
}

#[derive(Debug, Default)]
pub struct Page {
    groups: BTreeMap<GroupId, FieldGroup>,
    listeners: Rc<RefCell<ListenerRegistry>>,
    changes: Vec<ChangeNotice>,
}

impl Page {
    pub fn new() -> Self {
        Page::default()
    }

    /// Inserts `group`, replacing any group with the same id the way an
    /// outside re-render swaps out a field group's elements.
    pub fn insert_group(&mut self, group: FieldGroup) {
        self.groups.insert(group.id.clone(), group);
    }

    pub fn remove_group(&mut self, id: &str) -> Option<FieldGroup> {
        self.groups.remove(id)
    }

    pub fn group(&self, id: &str) -> Option<&FieldGroup> {
        self.groups.get(id)
    }

    pub fn value(&self, group: &str, index: usize) -> Option<&str> {
        self.groups
            .get(group)?
            .elements
            .get(index)
            .map(|e| e.value.as_str())
    }

    /// Writes an element's value. Returns false when the element is gone.
    pub fn set_value(&mut self, group: &str, index: usize, value: &str) -> bool {
        match self
            .groups
            .get_mut(group)
            .and_then(|g| g.elements.get_mut(index))
        {
            Some(element) => {
                element.value = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Value of the first element with `role` in `group`.
    pub fn role_value(&self, group: &str, role: Role) -> Option<&str> {
        let g = self.groups.get(group)?;
        g.elements
            .iter()
            .find(|e| e.role == role)
            .map(|e| e.value.as_str())
    }

    /// Host-side write into the first element with `role`, as if typed.
    pub fn type_into(&mut self, group: &str, role: Role, value: &str) -> bool {
        match self.groups.get(group).and_then(|g| g.position(role)) {
            Some(idx) => self.set_value(group, idx, value),
            None => false,
        }
    }

    pub fn notify_change(&mut self, group: &str, role: Role, value: &str) {
        self.changes.push(ChangeNotice {
            group: group.to_string(),
            role,
            value: value.to_string(),
        });
    }

    pub fn drain_changes(&mut self) -> Vec<ChangeNotice> {
        std::mem::take(&mut self.changes)
    }

    pub fn listen(&self, kind: DocumentListener, owner: &str) -> ListenerGuard {
        let id = self.listeners.borrow_mut().add(kind, owner.to_string());
        ListenerGuard {
            registry: Rc::downgrade(&self.listeners),
            id,
        }
    }

    pub fn listener_count(&self, kind: DocumentListener) -> usize {
        self.listeners.borrow().count(kind)
    }

    pub fn subscribers(&self, kind: DocumentListener) -> Vec<GroupId> {
        self.listeners.borrow().subscribers(kind)
    }
}
