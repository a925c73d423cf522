use crate::calendar::CalendarPopup;
use crate::codec::{canonical_to_display, display_to_canonical, format_canonical};
use crate::page::{DocumentListener, GroupId, ListenerGuard, Page, Role};
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerEvent {
    TriggerClick,
    /// Click on a popup cell by grid index.
    CellClick(usize),
    PrevMonth,
    NextMonth,
    /// Display field text changed; the new text is already on the page.
    DisplayInput,
    DisplayBlur,
    /// Hidden field value changed by someone other than this widget.
    HiddenInput,
    /// Click anywhere in the document; `inside` when it landed on the popup
    /// or on this widget's field group.
    DocumentClick { inside: bool },
    Escape,
}

/// Source of "today" for popups opened on an empty field.
pub type Clock = Box<dyn Fn() -> NaiveDate>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Binding {
    display: Option<usize>,
    hidden: Option<usize>,
    trigger: Option<usize>,
}

/// Day-month-year date field bound to a display input, a hidden canonical
/// input and a popup trigger inside one field group.
///
/// The document-level outside-click and Escape listeners are acquired once
/// in [`DatePicker::mount`] and released when the picker is destroyed or
/// dropped; [`DatePicker::update`] never touches them.
pub struct DatePicker {
    group: GroupId,
    binding: Binding,
    popup: CalendarPopup,
    clock: Clock,
    _listeners: [ListenerGuard; 2],
}

impl DatePicker {
    pub fn mount(page: &mut Page, group: &str, clock: Clock) -> Self {
        let listeners = [
            page.listen(DocumentListener::OutsideClick, group),
            page.listen(DocumentListener::Escape, group),
        ];
        let today = clock();
        let mut picker = DatePicker {
            group: group.to_string(),
            binding: Binding::default(),
            popup: CalendarPopup::new(today),
            clock,
            _listeners: listeners,
        };
        picker.assign_elements(page);
        picker.sync_from_hidden(page);
        debug!(group, binding = ?picker.binding, "date picker mounted");
        picker
    }

    /// Re-resolves the field group after an outside refresh and re-renders
    /// the display field from the hidden one. Any open popup is torn down.
    pub fn update(&mut self, page: &mut Page) {
        self.assign_elements(page);
        self.popup = CalendarPopup::new((self.clock)());
        self.sync_from_hidden(page);
        debug!(group = %self.group, "date picker updated");
    }

    pub fn destroy(self) {
        debug!(group = %self.group, "date picker destroyed");
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn state(&self) -> PickerState {
        if self.popup.is_visible() {
            PickerState::Open
        } else {
            PickerState::Closed
        }
    }

    pub fn popup(&self) -> &CalendarPopup {
        &self.popup
    }

    pub fn handle(&mut self, page: &mut Page, event: PickerEvent) {
        match event {
            PickerEvent::TriggerClick => self.toggle(page),
            PickerEvent::CellClick(index) => self.select_cell(page, index),
            PickerEvent::PrevMonth => self.change_month(-1),
            PickerEvent::NextMonth => self.change_month(1),
            PickerEvent::DisplayInput | PickerEvent::DisplayBlur => self.sync_from_display(page),
            PickerEvent::HiddenInput => self.sync_from_hidden(page),
            PickerEvent::DocumentClick { inside: false } | PickerEvent::Escape => self.close(),
            PickerEvent::DocumentClick { inside: true } => {}
        }
    }

    /// Hides the popup if it is showing; safe to call when already closed.
    pub fn close(&mut self) {
        if self.popup.close() {
            debug!(group = %self.group, "date picker closed");
        }
    }

    fn assign_elements(&mut self, page: &Page) {
        self.binding = match page.group(&self.group) {
            Some(group) => Binding {
                display: group.position(Role::Display),
                hidden: group.position(Role::Hidden),
                trigger: group.position(Role::Trigger),
            },
            None => Binding::default(),
        };
    }

    fn toggle(&mut self, page: &Page) {
        if self.binding.trigger.is_none() {
            return;
        }
        match self.state() {
            PickerState::Open => self.close(),
            PickerState::Closed => {
                let canonical = self
                    .binding
                    .hidden
                    .and_then(|idx| page.value(&self.group, idx))
                    .unwrap_or_default()
                    .to_string();
                self.popup.open(&canonical, (self.clock)());
                debug!(group = %self.group, view = %self.popup.view().label(), "date picker opened");
            }
        }
    }

    fn change_month(&mut self, delta: i32) {
        if self.state() == PickerState::Open && !self.popup.change_month(delta) {
            debug!(group = %self.group, delta, "month navigation at year limit");
        }
    }

    fn select_cell(&mut self, page: &mut Page, index: usize) {
        if self.state() != PickerState::Open {
            return;
        }
        let Some(date) = self.popup.select(index) else {
            return;
        };
        let canonical = format_canonical(date);
        let display = canonical_to_display(&canonical);
        if let Some(idx) = self.binding.hidden {
            if page.set_value(&self.group, idx, &canonical) {
                page.notify_change(&self.group, Role::Hidden, &canonical);
            }
        }
        if let Some(idx) = self.binding.display {
            if page.set_value(&self.group, idx, &display) {
                page.notify_change(&self.group, Role::Display, &display);
            }
        }
        self.close();
        debug!(group = %self.group, %canonical, "date selected");
    }

    fn sync_from_hidden(&self, page: &mut Page) {
        let (Some(display), Some(hidden)) = (self.binding.display, self.binding.hidden) else {
            return;
        };
        let value = page
            .value(&self.group, hidden)
            .map(canonical_to_display)
            .unwrap_or_default();
        page.set_value(&self.group, display, &value);
    }

    /// Invalid or partial text clears the hidden value rather than leaving
    /// a stale one; the typed text itself is left alone.
    fn sync_from_display(&self, page: &mut Page) {
        let (Some(display), Some(hidden)) = (self.binding.display, self.binding.hidden) else {
            return;
        };
        let canonical = page
            .value(&self.group, display)
            .map(display_to_canonical)
            .unwrap_or_default();
        page.set_value(&self.group, hidden, &canonical);
    }
}
