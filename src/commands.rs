use crate::calendar::{render, Cell, ViewMonth, WEEKDAY_ABBREVIATIONS};
use crate::codec::{canonical_to_display, display_to_canonical};
use crate::model::{DateField, Form, HelpText};
use crate::storage::{init_project_form, load_form, locate_form, save_form, FormLocation};
use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use rand::{distributions::Alphanumeric, Rng};
use std::env;
use std::path::Path;
use tracing::info;

pub fn init(name: Option<String>) -> Result<()> {
    let cwd = env::current_dir()?;
    let location = init_project_form(&cwd, name)?;
    info!(path = %location.path.display(), "initialized form");
    println!("Initialized form at {}", location.path.display());
    Ok(())
}

pub fn list() -> Result<()> {
    let (form, location) = load_current_form()?;
    println!("Form: {} ({})", form.name, location.scope.label());
    if form.fields.is_empty() {
        println!("  (no fields)");
    }
    for field in &form.fields {
        print_field(field);
    }
    Ok(())
}

pub fn set(field_id: String, date: String) -> Result<()> {
    let (mut form, location) = load_current_form()?;
    form.set_display_value(&field_id, &date)
        .with_context(|| format!("setting {}", field_id))?;
    save_form(&location, &form)?;
    let value = form
        .find_field(&field_id)
        .map(|f| f.value.clone())
        .unwrap_or_default();
    info!(field = %field_id, %value, "field set");
    println!("Set {} to {}", field_id, value);
    Ok(())
}

pub fn clear(field_id: String) -> Result<()> {
    let (mut form, location) = load_current_form()?;
    form.set_value(&field_id, "")
        .with_context(|| format!("clearing {}", field_id))?;
    save_form(&location, &form)?;
    info!(field = %field_id, "field cleared");
    println!("Cleared {}", field_id);
    Ok(())
}

pub fn add(
    label: String,
    id: Option<String>,
    help_title: Option<String>,
    help_text: Option<String>,
) -> Result<()> {
    let (mut form, location) = load_current_form()?;
    let id = id.unwrap_or_else(generate_id);
    let help = if help_title.is_some() || help_text.is_some() {
        Some(HelpText {
            title: help_title,
            text: help_text,
        })
    } else {
        None
    };
    form.add_field(DateField::new(id.clone(), label, help))
        .with_context(|| format!("adding field {}", id))?;
    save_form(&location, &form)?;
    info!(field = %id, "field added");
    println!("Added field {}", id);
    Ok(())
}

pub fn remove(field_id: String) -> Result<()> {
    let (mut form, location) = load_current_form()?;
    form.remove_field(&field_id)
        .with_context(|| format!("removing {}", field_id))?;
    save_form(&location, &form)?;
    info!(field = %field_id, "field removed");
    println!("Removed field {}", field_id);
    Ok(())
}

pub fn to_display(date: String) -> Result<()> {
    let display = canonical_to_display(date.trim());
    if display.is_empty() {
        bail!("invalid date format (use YYYY-MM-DD): {}", date);
    }
    println!("{}", display);
    Ok(())
}

pub fn to_canonical(date: String) -> Result<()> {
    let canonical = display_to_canonical(date.trim());
    if canonical.is_empty() {
        bail!("invalid date (use DD-MM-YYYY): {}", date);
    }
    println!("{}", canonical);
    Ok(())
}

pub fn calendar(month: Option<String>) -> Result<()> {
    let view = match month.as_deref() {
        Some(raw) => parse_month(raw)?,
        None => ViewMonth::containing(Local::now().date_naive()),
    };
    print!("{}", month_grid(view));
    Ok(())
}

pub fn tui(log_dir: Option<&Path>) -> Result<()> {
    let (form, location) = load_current_form()?;
    ui::run(form, location, log_dir)
}

fn load_current_form() -> Result<(Form, FormLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_form(&cwd)?;
    let form = load_form(&location)?;
    Ok((form, location))
}

fn parse_month(raw: &str) -> Result<ViewMonth> {
    let (year, month) = raw
        .trim()
        .split_once('-')
        .ok_or_else(|| anyhow!("invalid month (use YYYY-MM): {}", raw))?;
    let year: i32 = year
        .parse()
        .map_err(|_| anyhow!("invalid year in {}", raw))?;
    let month: u32 = month
        .parse()
        .map_err(|_| anyhow!("invalid month in {}", raw))?;
    if !(1..=12).contains(&month) {
        bail!("month must be 1-12: {}", raw);
    }
    if !(1..=9999).contains(&year) {
        bail!("year out of range: {}", raw);
    }
    Ok(ViewMonth::new(year, month))
}

fn month_grid(view: ViewMonth) -> String {
    let mut out = format!("{:^20}\n", view.label());
    out.push_str(&WEEKDAY_ABBREVIATIONS.join(" "));
    out.push('\n');
    for week in render(view).chunks(7) {
        let row: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                Cell::Blank => "  ".to_string(),
                Cell::Day(day) => format!("{:>2}", day),
            })
            .collect();
        out.push_str(row.join(" ").trim_end());
        out.push('\n');
    }
    out
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

fn print_field(field: &DateField) {
    let display = field.display_value();
    println!(
        "  - {}: {} = {}",
        field.id,
        field.label,
        if display.is_empty() { "(unset)" } else { display.as_str() }
    );
    if let Some(help) = &field.help {
        if let Some(title) = &help.title {
            println!("    help: {}", title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_month_accepts_year_month() {
        assert_eq!(parse_month("2024-03").unwrap(), ViewMonth::new(2024, 3));
        assert_eq!(parse_month("2024-3").unwrap(), ViewMonth::new(2024, 3));
        assert!(parse_month("2024").is_err());
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("march").is_err());
    }

    #[test]
    fn month_grid_lays_out_march_2024() {
        let grid = month_grid(ViewMonth::new(2024, 3));
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines[0].trim(), "Mar 2024");
        assert_eq!(lines[1], "Mo Tu We Th Fr Sa Su");
        assert_eq!(lines[2], "             1  2  3");
        assert_eq!(lines[3], " 4  5  6  7  8  9 10");
        assert_eq!(lines.last().copied(), Some("25 26 27 28 29 30 31"));
    }
}
