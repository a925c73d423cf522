use crate::codec::{parse_canonical, MAX_YEAR, MIN_YEAR};
use chrono::{Datelike, NaiveDate};

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Column headings, Monday first.
pub const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// The month a calendar popup is showing. `month` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewMonth {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// Offset cell ahead of the first of the month; never selectable.
    Blank,
    Day(u32),
}

impl Cell {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Cell::Day(_))
    }
}

impl ViewMonth {
    pub fn new(year: i32, month: u32) -> Self {
        ViewMonth { year, month: 1 }.shifted(month as i32 - 1)
    }

    pub fn containing(date: NaiveDate) -> Self {
        ViewMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Moves by `delta` months, carrying into the year in either direction.
    pub fn shifted(self, delta: i32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + delta;
        ViewMonth {
            year: zero_based.div_euclid(12),
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Day zero of the following month, i.e. the last day of this one.
    pub fn days_in_month(self) -> u32 {
        self.shifted(1)
            .first_day()
            .and_then(|next| next.pred_opt())
            .map(|last| last.day())
            .unwrap_or(0)
    }

    /// Blank cells needed to put the first of the month under its weekday
    /// in a Monday-first grid.
    pub fn leading_blanks(self) -> u32 {
        self.first_day()
            .map(|d| (d.weekday().num_days_from_sunday() + 6) % 7)
            .unwrap_or(0)
    }

    pub fn label(self) -> String {
        let idx = (self.month as usize).saturating_sub(1) % 12;
        format!("{} {}", MONTH_ABBREVIATIONS[idx], self.year)
    }

    pub fn date(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn is_supported(self) -> bool {
        (MIN_YEAR as i32..=MAX_YEAR as i32).contains(&self.year)
    }

    /// Pulls the view back to January of the first or December of the last
    /// year a canonical value can hold.
    pub fn clamped(self) -> Self {
        if self.year < MIN_YEAR as i32 {
            ViewMonth::new(MIN_YEAR as i32, 1)
        } else if self.year > MAX_YEAR as i32 {
            ViewMonth::new(MAX_YEAR as i32, 12)
        } else {
            self
        }
    }
}

pub fn render(view: ViewMonth) -> Vec<Cell> {
    let blanks = view.leading_blanks();
    let days = view.days_in_month();
    let mut cells = Vec::with_capacity((blanks + days) as usize);
    cells.extend((0..blanks).map(|_| Cell::Blank));
    cells.extend((1..=days).map(Cell::Day));
    cells
}

/// Month-grid popup. Holds only the view month and visibility; a selection
/// is handed straight back to the caller.
#[derive(Debug, Clone)]
pub struct CalendarPopup {
    view: ViewMonth,
    visible: bool,
    cells: Vec<Cell>,
}

impl CalendarPopup {
    pub fn new(today: NaiveDate) -> Self {
        let view = ViewMonth::containing(today).clamped();
        CalendarPopup {
            view,
            visible: false,
            cells: render(view),
        }
    }

    pub fn view(&self) -> ViewMonth {
        self.view
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows the popup on the month of `canonical`, or of `today` when the
    /// value is empty or does not parse.
    pub fn open(&mut self, canonical: &str, today: NaiveDate) {
        let anchor = parse_canonical(canonical).unwrap_or(today);
        self.view = ViewMonth::containing(anchor).clamped();
        self.cells = render(self.view);
        self.visible = true;
    }

    /// Hides the popup. Returns whether it was showing.
    pub fn close(&mut self) -> bool {
        std::mem::replace(&mut self.visible, false)
    }

    /// Moves the view by `delta` months. Returns false, leaving the view
    /// alone, when that would leave the supported years.
    pub fn change_month(&mut self, delta: i32) -> bool {
        let next = self.view.shifted(delta);
        if !next.is_supported() {
            return false;
        }
        self.view = next;
        self.cells = render(self.view);
        true
    }

    pub fn select(&self, index: usize) -> Option<NaiveDate> {
        if !self.view.is_supported() {
            return None;
        }
        match self.cells.get(index)? {
            Cell::Day(day) => self.view.date(*day),
            Cell::Blank => None,
        }
    }

    /// Cell index holding `day` in the current grid.
    pub fn index_of(&self, day: u32) -> Option<usize> {
        self.cells.iter().position(|c| *c == Cell::Day(day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn march_2024_grid() {
        let cells = render(ViewMonth::new(2024, 3));
        let blanks = cells.iter().filter(|c| !c.is_enabled()).count();
        let days = cells.iter().filter(|c| c.is_enabled()).count();
        assert_eq!(blanks, 4);
        assert_eq!(days, 31);
        assert_eq!(cells[4], Cell::Day(1));
        assert_eq!(cells.last(), Some(&Cell::Day(31)));
    }

    #[test]
    fn monday_start_needs_no_blanks() {
        assert_eq!(ViewMonth::new(2024, 1).leading_blanks(), 0);
        // September 2024 starts on a Sunday.
        assert_eq!(ViewMonth::new(2024, 9).leading_blanks(), 6);
    }

    #[test]
    fn days_in_month_handles_february() {
        assert_eq!(ViewMonth::new(2024, 2).days_in_month(), 29);
        assert_eq!(ViewMonth::new(2023, 2).days_in_month(), 28);
        assert_eq!(ViewMonth::new(1900, 2).days_in_month(), 28);
        assert_eq!(ViewMonth::new(2024, 4).days_in_month(), 30);
        assert_eq!(ViewMonth::new(2024, 12).days_in_month(), 31);
    }

    #[test]
    fn shifting_rolls_the_year() {
        assert_eq!(ViewMonth::new(2024, 12).shifted(1), ViewMonth::new(2025, 1));
        assert_eq!(ViewMonth::new(2024, 1).shifted(-1), ViewMonth::new(2023, 12));
        assert_eq!(ViewMonth::new(2024, 5).shifted(-17), ViewMonth::new(2022, 12));
        assert_eq!(ViewMonth::new(2024, 13), ViewMonth::new(2025, 1));
    }

    #[test]
    fn open_uses_canonical_value_then_today() {
        let mut popup = CalendarPopup::new(date(2026, 10, 18));
        popup.open("2024-03-07", date(2026, 10, 18));
        assert!(popup.is_visible());
        assert_eq!(popup.view(), ViewMonth::new(2024, 3));

        popup.open("", date(2026, 10, 18));
        assert_eq!(popup.view(), ViewMonth::new(2026, 10));

        popup.open("2023-02-30", date(2026, 10, 18));
        assert_eq!(popup.view(), ViewMonth::new(2026, 10));
    }

    #[test]
    fn close_is_idempotent() {
        let mut popup = CalendarPopup::new(date(2024, 3, 1));
        assert!(!popup.close());
        popup.open("", date(2024, 3, 1));
        assert!(popup.close());
        assert!(!popup.close());
        assert!(!popup.is_visible());
    }

    #[test]
    fn change_month_rerenders_cells() {
        let mut popup = CalendarPopup::new(date(2024, 1, 15));
        popup.change_month(1);
        assert_eq!(popup.view(), ViewMonth::new(2024, 2));
        assert_eq!(popup.cells().iter().filter(|c| c.is_enabled()).count(), 29);
        popup.change_month(-2);
        assert_eq!(popup.view(), ViewMonth::new(2023, 12));
    }

    #[test]
    fn select_skips_blanks() {
        let popup = CalendarPopup::new(date(2024, 3, 1));
        assert_eq!(popup.select(0), None);
        assert_eq!(popup.select(4), Some(date(2024, 3, 1)));
        assert_eq!(popup.select(34), Some(date(2024, 3, 31)));
        assert_eq!(popup.select(35), None);
        assert_eq!(popup.index_of(7), Some(10));
    }

    #[test]
    fn navigation_stops_at_supported_years() {
        let mut popup = CalendarPopup::new(date(1900, 1, 10));
        assert!(!popup.change_month(-1));
        assert_eq!(popup.view(), ViewMonth::new(1900, 1));
        assert_eq!(popup.select(0), Some(date(1900, 1, 1)));

        let mut popup = CalendarPopup::new(date(9999, 12, 10));
        assert!(!popup.change_month(1));
        assert_eq!(popup.view(), ViewMonth::new(9999, 12));
        assert!(popup.change_month(-1));
        assert_eq!(popup.view(), ViewMonth::new(9999, 11));
    }

    #[test]
    fn open_outside_supported_years_clamps_view() {
        let mut popup = CalendarPopup::new(date(1850, 6, 1));
        assert_eq!(popup.view(), ViewMonth::new(1900, 1));
        popup.open("", date(12_000, 3, 1));
        assert_eq!(popup.view(), ViewMonth::new(9999, 12));
        let last = popup.index_of(31).unwrap();
        assert_eq!(popup.select(last), Some(date(9999, 12, 31)));
    }

    #[test]
    fn unrepresentable_month_renders_empty() {
        let view = ViewMonth {
            year: 300_000,
            month: 1,
        };
        assert_eq!(view.first_day(), None);
        assert_eq!(view.days_in_month(), 0);
        assert!(render(view).is_empty());
        assert!(!view.is_supported());
    }

    #[test]
    fn label_uses_fixed_abbreviations() {
        assert_eq!(ViewMonth::new(2024, 3).label(), "Mar 2024");
    }
}
