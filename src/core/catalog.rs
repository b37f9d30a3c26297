//! System-test catalog: libos name to an ordered list of test definitions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yml::Value;

use crate::error::{Error, Result};
use crate::stages::PipeMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// A `test-system-rust` target.
    #[default]
    System,
    /// The built-in TCP integration test.
    TcpIntegration,
    /// The built-in pipe integration test in one run mode.
    PipeIntegration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDetails {
    #[serde(default)]
    pub kind: TestKind,
    /// make TEST= value; the entry name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default)]
    pub server_args: String,
    #[serde(default)]
    pub client_args: String,
    #[serde(default = "default_all_pass")]
    pub all_pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_mode: Option<PipeMode>,
}

fn default_all_pass() -> bool {
    true
}

impl Default for TestDetails {
    fn default() -> Self {
        Self {
            kind: TestKind::default(),
            test: None,
            server_args: String::new(),
            client_args: String::new(),
            all_pass: default_all_pass(),
            run_mode: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub details: TestDetails,
}

/// Entries keep the order they have in the file.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    libos: Vec<(String, Vec<CatalogEntry>)>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let source = path.to_string_lossy().to_string();
        if !path.exists() {
            return Err(Error::catalog_not_found(source, None));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::catalog_not_found(source.clone(), Some(e.to_string())))?;

        log_status!("catalog", "Loaded {}", path.display());
        Self::from_yaml(&content, &source)
    }

    pub fn from_yaml(content: &str, source: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let root: Value = serde_yml::from_str(content)
            .map_err(|e| Error::catalog_invalid_yaml(source, e.to_string()))?;

        let mapping = match root {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::catalog_invalid_yaml(
                    source,
                    "top level must map libos names to tests",
                ))
            }
        };

        let mut libos = Vec::with_capacity(mapping.len());
        for (key, tests) in mapping {
            let name = key_string(&key, source)?;
            let entries = parse_tests(&name, tests, source)?;
            libos.push((name, entries));
        }

        Ok(Self { libos })
    }

    /// Tests defined for `libos`; empty when the libos is not in the catalog.
    pub fn tests_for(&self, libos: &str) -> &[CatalogEntry] {
        self.libos
            .iter()
            .find(|(name, _)| name == libos)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn details(&self, libos: &str, test: &str) -> Result<&TestDetails> {
        let entries = self.tests_for(libos);
        entries
            .iter()
            .find(|entry| entry.name == test)
            .map(|entry| &entry.details)
            .ok_or_else(|| {
                Error::catalog_test_not_found(
                    libos,
                    test,
                    entries.iter().map(|e| e.name.clone()).collect(),
                )
            })
    }

    pub fn libos_names(&self) -> Vec<&str> {
        self.libos.iter().map(|(name, _)| name.as_str()).collect()
    }
}

fn key_string(key: &Value, source: &str) -> Result<String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::catalog_invalid_yaml(source, format!("non-string key {:?}", key)))
}

fn parse_tests(libos: &str, tests: Value, source: &str) -> Result<Vec<CatalogEntry>> {
    let mapping = match tests {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(Error::catalog_invalid_yaml(
                source,
                format!("tests of '{}' must be a mapping", libos),
            ))
        }
    };

    let mut entries = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let name = key_string(&key, source)?;
        let details = match value {
            Value::Null => TestDetails::default(),
            value => serde_yml::from_value::<TestDetails>(value).map_err(|e| {
                Error::catalog_invalid_yaml(source, format!("{}.{}: {}", libos, name, e))
            })?,
        };
        if details.kind == TestKind::PipeIntegration && details.run_mode.is_none() {
            return Err(Error::catalog_invalid_yaml(
                source,
                format!("{}.{}: pipe-integration requires run_mode", libos, name),
            ));
        }
        entries.push(CatalogEntry { name, details });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
catnap:
  tcp_echo:
    test: tcp-echo
    server_args: "--peer server --address {{server_ip}}:12345"
    client_args: "--peer client --address {{server_ip}}:12345"
  udp_push_pop:
    all_pass: false
  tcp_ping_pong:
    kind: tcp-integration
catmem:
  pipe_pop_wait:
    kind: pipe-integration
    run_mode: pop-wait
catnip:
"#;

    #[test]
    fn keeps_file_order() {
        let catalog = Catalog::from_yaml(CATALOG, "inline").unwrap();
        let names: Vec<&str> = catalog
            .tests_for("catnap")
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["tcp_echo", "udp_push_pop", "tcp_ping_pong"]);
        assert_eq!(catalog.libos_names(), vec!["catnap", "catmem", "catnip"]);
    }

    #[test]
    fn fills_defaults() {
        let catalog = Catalog::from_yaml(CATALOG, "inline").unwrap();
        let details = catalog.details("catnap", "udp_push_pop").unwrap();
        assert_eq!(details.kind, TestKind::System);
        assert_eq!(details.test, None);
        assert!(!details.all_pass);

        let echo = catalog.details("catnap", "tcp_echo").unwrap();
        assert!(echo.all_pass);
        assert_eq!(echo.test.as_deref(), Some("tcp-echo"));
    }

    #[test]
    fn parses_pipe_mode() {
        let catalog = Catalog::from_yaml(CATALOG, "inline").unwrap();
        let details = catalog.details("catmem", "pipe_pop_wait").unwrap();
        assert_eq!(details.kind, TestKind::PipeIntegration);
        assert_eq!(details.run_mode, Some(PipeMode::PopWait));
    }

    #[test]
    fn unknown_libos_has_no_tests() {
        let catalog = Catalog::from_yaml(CATALOG, "inline").unwrap();
        assert!(catalog.tests_for("catpowder").is_empty());
        assert!(catalog.tests_for("catnip").is_empty());
    }

    #[test]
    fn unknown_test_lists_available() {
        let catalog = Catalog::from_yaml(CATALOG, "inline").unwrap();
        let err = catalog.details("catnap", "nope").unwrap_err();
        assert_eq!(err.code.as_str(), "catalog.test_not_found");
        assert!(err.details.to_string().contains("tcp_echo"));
    }

    #[test]
    fn pipe_integration_needs_run_mode() {
        let yaml = "catmem:\n  broken:\n    kind: pipe-integration\n";
        let err = Catalog::from_yaml(yaml, "inline").unwrap_err();
        assert_eq!(err.code.as_str(), "catalog.invalid_yaml");
    }

    #[test]
    fn rejects_unknown_fields_and_bad_shapes() {
        assert!(Catalog::from_yaml("catnap:\n  t:\n    sever_args: x\n", "inline").is_err());
        assert!(Catalog::from_yaml("- catnap\n", "inline").is_err());
        assert!(Catalog::from_yaml("catnap: [a, b]\n", "inline").is_err());
        assert!(Catalog::from_yaml("catnap: {\n", "inline").is_err());
    }

    #[test]
    fn empty_document_is_empty_catalog() {
        let catalog = Catalog::from_yaml("", "inline").unwrap();
        assert!(catalog.libos_names().is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load(&dir.path().join("ci_map.yaml")).unwrap_err();
        assert_eq!(err.code.as_str(), "catalog.not_found");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci_map.yaml");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.tests_for("catmem").len(), 1);
    }
}
