use crate::model::Form;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct FormLocation {
    pub path: PathBuf,
    pub scope: FormScope,
}

impl FormScope {
    pub fn label(&self) -> &'static str {
        match self {
            FormScope::Project => "project",
            FormScope::Global => "global",
        }
    }
}

pub fn init_project_form(dir: &Path, name: Option<String>) -> Result<FormLocation> {
    let data_dir = dir.join(".eudate");
    fs::create_dir_all(&data_dir).context("failed to create .eudate directory")?;
    let location = FormLocation {
        path: data_dir.join("form.yml"),
        scope: FormScope::Project,
    };
    if !location.path.exists() {
        let form_name = name.unwrap_or_else(|| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("project")
                .to_string()
        });
        save_form(&location, &Form::default_named(form_name))?;
    }
    Ok(location)
}

pub fn locate_form(start: &Path) -> Result<FormLocation> {
    if let Some(project_path) = find_project_form(start) {
        return Ok(FormLocation {
            path: project_path,
            scope: FormScope::Project,
        });
    }
    Ok(FormLocation {
        path: global_form_path()?,
        scope: FormScope::Global,
    })
}

pub fn load_form(location: &FormLocation) -> Result<Form> {
    if location.path.exists() {
        let data = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {:?}", location.path))?;
        let mut form: Form = serde_yaml::from_str(&data).context("parsing form file")?;
        for (field, value) in form.discard_invalid_values() {
            warn!(path = %location.path.display(), %field, %value, "discarding invalid date");
        }
        Ok(form)
    } else {
        let fallback_name = match location.scope {
            FormScope::Project => location
                .path
                .parent()
                .and_then(|p| p.parent())
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or("project")
                .to_string(),
            FormScope::Global => "default".to_string(),
        };
        let form = Form::default_named(fallback_name);
        save_form(location, &form)?;
        info!(path = %location.path.display(), "created default form");
        Ok(form)
    }
}

pub fn save_form(location: &FormLocation, form: &Form) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(form).context("serializing form")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    Ok(())
}

pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "eudate").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

fn find_project_form(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(".eudate/form.yml");
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_form_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("form.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_locate_from_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        let location = init_project_form(tmp.path(), Some("trip".into())).unwrap();
        assert!(location.path.ends_with(".eudate/form.yml"));

        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let found = locate_form(&nested).unwrap();
        assert_eq!(found.scope, FormScope::Project);
        assert_eq!(found.path, location.path);
        assert_eq!(load_form(&found).unwrap().name, "trip");
    }

    #[test]
    fn init_keeps_existing_form() {
        let tmp = tempfile::tempdir().unwrap();
        let location = init_project_form(tmp.path(), Some("first".into())).unwrap();
        init_project_form(tmp.path(), Some("second".into())).unwrap();
        assert_eq!(load_form(&location).unwrap().name, "first");
    }

    #[test]
    fn save_and_load_preserve_values() {
        let tmp = tempfile::tempdir().unwrap();
        let location = FormLocation {
            path: tmp.path().join("proj/.eudate/form.yml"),
            scope: FormScope::Project,
        };
        let mut form = load_form(&location).unwrap();
        assert_eq!(form.name, "proj");
        form.set_value("start", "2024-03-07").unwrap();
        save_form(&location, &form).unwrap();

        let reloaded = load_form(&location).unwrap();
        assert_eq!(reloaded.find_field("start").unwrap().value, "2024-03-07");
    }

    #[test]
    fn missing_value_and_help_default() {
        let tmp = tempfile::tempdir().unwrap();
        let location = FormLocation {
            path: tmp.path().join("form.yml"),
            scope: FormScope::Global,
        };
        fs::write(&location.path, "name: bare\nfields:\n  - id: due\n    label: Due\n").unwrap();
        let form = load_form(&location).unwrap();
        let field = form.find_field("due").unwrap();
        assert_eq!(field.value, "");
        assert!(field.help.is_none());
    }

    #[test]
    fn load_clears_dates_that_do_not_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let location = FormLocation {
            path: tmp.path().join("form.yml"),
            scope: FormScope::Global,
        };
        fs::write(
            &location.path,
            "name: edited\nfields:\n  - id: due\n    label: Due\n    value: 2023-02-30\n  - id: end\n    label: End\n    value: 1899-12-31\n  - id: ok\n    label: Ok\n    value: 2024-02-29\n",
        )
        .unwrap();
        let form = load_form(&location).unwrap();
        assert_eq!(form.find_field("due").unwrap().value, "");
        assert_eq!(form.find_field("end").unwrap().value, "");
        assert_eq!(form.find_field("ok").unwrap().value, "2024-02-29");
    }
}
