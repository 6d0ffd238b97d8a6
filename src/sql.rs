use std::{fs, path::{Path, PathBuf}};

use regex::{Captures, Regex};

use crate::errors::{Error, Result};

pub const CREATE_STAGING_TABLE: &str = "create_staging_table.sql";
pub const TRUNCATE_STAGING_TABLE: &str = "truncate.sql";
pub const INSERT_FROM_FILES: &str = "insert_to.sql";
pub const TRANSFORM_DIR: &str = "transform";

/// A SQL file shipped next to the pipeline. Placeholders are written `{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    pub path: PathBuf,
    pub text: String,
}

impl SqlScript {
    pub fn load(path: &Path) -> Result<SqlScript> {
        let text = fs::read_to_string(path)
            .map_err(|err| Error::sql(format!("cannot read {}: {err}", path.display())))?;
        Ok(SqlScript {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Substitutes every `{name}` with the bound value as a quoted SQL string literal.
    pub fn render(&self, params: &[(&str, &str)]) -> Result<String> {
        let placeholder = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}")?;
        let mut missing = Vec::new();
        let rendered = placeholder.replace_all(&self.text, |caps: &Captures| {
            let key = &caps[1];
            match params.iter().find(|(name, _)| *name == key) {
                Some((_, value)) => quote_literal(value),
                None => {
                    missing.push(key.to_string());
                    caps[0].to_string()
                }
            }
        });
        if !missing.is_empty() {
            return Err(Error::sql(format!(
                "{}: unbound placeholders {}",
                self.name(),
                missing.join(", ")
            )));
        }
        Ok(rendered.into_owned())
    }

    /// Every `*.sql` file in `dir`, in file-name order.
    pub fn load_dir(dir: &Path) -> Result<Vec<SqlScript>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)
            .map_err(|err| Error::sql(format!("cannot list {}: {err}", dir.display())))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                paths.push(path);
            }
        }
        paths.sort();
        paths.iter().map(|path| SqlScript::load(path)).collect()
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(text: &str) -> SqlScript {
        SqlScript {
            path: PathBuf::from("insert_to.sql"),
            text: text.to_string(),
        }
    }

    #[test]
    fn render_quotes_values() {
        let sql = script("SELECT * FROM read_parquet({glob_pattern});")
            .render(&[("glob_pattern", "data/raw/*.parquet")])
            .unwrap();
        assert_eq!(sql, "SELECT * FROM read_parquet('data/raw/*.parquet');");
    }

    #[test]
    fn render_escapes_single_quotes() {
        let sql = script("{p}").render(&[("p", "o'brien/*.parquet")]).unwrap();
        assert_eq!(sql, "'o''brien/*.parquet'");
    }

    #[test]
    fn unbound_placeholder_is_an_error() {
        let err = script("SELECT {a}, {b}").render(&[("a", "x")]).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Sql);
        assert!(err.message.contains("b"));
    }

    #[test]
    fn load_dir_is_sorted_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("02_fact.sql"), "SELECT 2;").unwrap();
        fs::write(dir.path().join("01_dims.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("README.md"), "notes").unwrap();

        let scripts = SqlScript::load_dir(dir.path()).unwrap();
        let names: Vec<String> = scripts.iter().map(SqlScript::name).collect();
        assert_eq!(names, vec!["01_dims.sql", "02_fact.sql"]);
    }

    #[test]
    fn missing_file_is_a_sql_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqlScript::load(&dir.path().join("nope.sql")).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Sql);
    }
}
