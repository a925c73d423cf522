use crate::codec::{canonical_to_display, display_to_canonical};
use crate::help::FieldHelp;
use serde::{Deserialize, Serialize};

pub type FieldId = String;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Form {
    pub name: String,
    pub fields: Vec<DateField>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DateField {
    pub id: FieldId,
    pub label: String,
    /// Canonical `YYYY-MM-DD`, or empty when unset.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub help: Option<HelpText>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HelpText {
    pub title: Option<String>,
    pub text: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum FormError {
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("field already exists: {0}")]
    DuplicateField(String),
    #[error("not a valid date: {0}")]
    InvalidDate(String),
}

impl Form {
    pub fn default_named(name: impl Into<String>) -> Self {
        Form {
            name: name.into(),
            fields: vec![
                DateField::new(
                    "start".into(),
                    "Start date".into(),
                    Some(HelpText {
                        title: Some("Start date".into()),
                        text: Some("First day, as DD-MM-YYYY.".into()),
                    }),
                ),
                DateField::new(
                    "end".into(),
                    "End date".into(),
                    Some(HelpText {
                        title: Some("End date".into()),
                        text: Some("Last day, as DD-MM-YYYY.".into()),
                    }),
                ),
            ],
        }
    }

    pub fn find_field_index(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    pub fn find_field(&self, id: &str) -> Option<&DateField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn add_field(&mut self, field: DateField) -> Result<(), FormError> {
        if self.find_field_index(&field.id).is_some() {
            return Err(FormError::DuplicateField(field.id));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn remove_field(&mut self, id: &str) -> Result<DateField, FormError> {
        let idx = self
            .find_field_index(id)
            .ok_or_else(|| FormError::FieldNotFound(id.to_string()))?;
        Ok(self.fields.remove(idx))
    }

    /// Stores a canonical value. Empty clears the field; anything else must
    /// name a real calendar date.
    pub fn set_value(&mut self, id: &str, canonical: &str) -> Result<(), FormError> {
        if !is_stored_date(canonical) {
            return Err(FormError::InvalidDate(canonical.to_string()));
        }
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| FormError::FieldNotFound(id.to_string()))?;
        field.value = canonical.to_string();
        Ok(())
    }

    /// Clears every value that is not a real canonical date, returning the
    /// field ids and the values that were dropped.
    pub fn discard_invalid_values(&mut self) -> Vec<(FieldId, String)> {
        self.fields
            .iter_mut()
            .filter(|f| !is_stored_date(&f.value))
            .map(|f| (f.id.clone(), std::mem::take(&mut f.value)))
            .collect()
    }

    /// Parses a `DD-MM-YYYY` entry and stores it.
    pub fn set_display_value(&mut self, id: &str, display: &str) -> Result<(), FormError> {
        let canonical = display_to_canonical(display.trim());
        if canonical.is_empty() {
            return Err(FormError::InvalidDate(display.to_string()));
        }
        self.set_value(id, &canonical)
    }
}

/// Empty, or a canonical date that survives the display round trip.
fn is_stored_date(canonical: &str) -> bool {
    canonical.is_empty() || display_to_canonical(&canonical_to_display(canonical)) == canonical
}

impl DateField {
    pub fn new(id: FieldId, label: String, help: Option<HelpText>) -> Self {
        DateField {
            id,
            label,
            value: String::new(),
            help,
        }
    }

    pub fn display_value(&self) -> String {
        canonical_to_display(&self.value)
    }

    pub fn field_help(&self) -> FieldHelp {
        match &self.help {
            Some(help) => FieldHelp::new(help.title.clone(), help.text.clone()),
            None => FieldHelp::new(Some(self.label.clone()), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_has_start_and_end() {
        let form = Form::default_named("trip");
        assert_eq!(form.name, "trip");
        assert!(form.find_field("start").is_some());
        assert!(form.find_field("end").is_some());
        assert!(form.fields.iter().all(|f| f.value.is_empty()));
    }

    #[test]
    fn set_value_validates() {
        let mut form = Form::default_named("trip");
        form.set_value("start", "2024-02-29").unwrap();
        assert_eq!(form.find_field("start").unwrap().display_value(), "29-02-2024");
        assert!(matches!(
            form.set_value("start", "2023-02-29"),
            Err(FormError::InvalidDate(_))
        ));
        assert!(matches!(
            form.set_value("nope", "2024-01-01"),
            Err(FormError::FieldNotFound(_))
        ));
        form.set_value("start", "").unwrap();
        assert_eq!(form.find_field("start").unwrap().value, "");
    }

    #[test]
    fn discard_invalid_values_keeps_real_dates() {
        let mut form = Form::default_named("trip");
        form.fields[0].value = "2023-02-30".into();
        form.fields[1].value = "2024-02-29".into();
        let dropped = form.discard_invalid_values();
        assert_eq!(dropped, vec![("start".to_string(), "2023-02-30".to_string())]);
        assert_eq!(form.fields[0].value, "");
        assert_eq!(form.fields[1].value, "2024-02-29");
        assert!(form.discard_invalid_values().is_empty());
    }

    #[test]
    fn set_display_value_parses_day_first() {
        let mut form = Form::default_named("trip");
        form.set_display_value("end", "1-1-2000").unwrap();
        assert_eq!(form.find_field("end").unwrap().value, "2000-01-01");
        assert!(form.set_display_value("end", "2000-01-01").is_err());
    }

    #[test]
    fn add_and_remove_fields() {
        let mut form = Form::default_named("trip");
        form.add_field(DateField::new("due".into(), "Due".into(), None))
            .unwrap();
        assert!(matches!(
            form.add_field(DateField::new("due".into(), "Due".into(), None)),
            Err(FormError::DuplicateField(_))
        ));
        assert_eq!(form.remove_field("due").unwrap().label, "Due");
        assert!(form.remove_field("due").is_err());
    }

    #[test]
    fn field_help_falls_back_to_label() {
        let field = DateField::new("due".into(), "Due".into(), None);
        assert_eq!(field.field_help().title.as_deref(), Some("Due"));
    }
}
