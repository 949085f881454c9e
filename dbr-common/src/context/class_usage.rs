use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ContextError, WireCodec, WireMap, read_str};

const TYPE: &str = "type";
const RELATIVE_PATH: &str = "relative_path";

const TYPE_DEFAULT: &str = "default";
const TYPE_NOOP: &str = "noop";

/// Where an action reports which classes it loaded from each jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassUsageWriter {
    /// Write a JSON usage file at `relative_path` under the project root.
    Default { relative_path: String },
    /// Discard usage information.
    NoOp,
}

impl ClassUsageWriter {
    pub fn output_path(&self, project_root: &Path) -> Option<PathBuf> {
        match self {
            Self::Default { relative_path } => Some(project_root.join(relative_path)),
            Self::NoOp => None,
        }
    }

    /// Write `usage` (jar path to class names) as pretty JSON.
    pub fn write_usage(
        &self,
        project_root: &Path,
        usage: &BTreeMap<String, BTreeSet<String>>,
    ) -> io::Result<()> {
        let Some(path) = self.output_path(project_root) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(usage)?;
        fs::write(path, body)
    }
}

impl WireCodec for ClassUsageWriter {
    type Resources = ();

    fn to_wire(&self) -> WireMap {
        let mut map = WireMap::new();
        match self {
            Self::Default { relative_path } => {
                map.insert(TYPE.into(), TYPE_DEFAULT.into());
                map.insert(RELATIVE_PATH.into(), relative_path.clone().into());
            }
            Self::NoOp => {
                map.insert(TYPE.into(), TYPE_NOOP.into());
            }
        }
        map
    }

    fn from_wire(map: &WireMap, _: ()) -> Result<Self, ContextError> {
        match read_str(map, TYPE)? {
            TYPE_DEFAULT => Ok(Self::Default {
                relative_path: read_str(map, RELATIVE_PATH)?.to_string(),
            }),
            TYPE_NOOP => Ok(Self::NoOp),
            other => Err(ContextError::UnknownVariant {
                field: TYPE.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        ClassUsageWriter::NoOp
            .write_usage(dir.path(), &BTreeMap::new())
            .unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn default_writes_json_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ClassUsageWriter::Default {
            relative_path: "out/used-classes.json".to_string(),
        };
        let mut usage = BTreeMap::new();
        usage.insert(
            "libs/a.jar".to_string(),
            BTreeSet::from(["com/A.class".to_string()]),
        );
        writer.write_usage(dir.path(), &usage).unwrap();

        let written = fs::read_to_string(dir.path().join("out/used-classes.json")).unwrap();
        let parsed: BTreeMap<String, BTreeSet<String>> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, usage);
    }

    #[test]
    fn wire_forms() {
        for writer in [
            ClassUsageWriter::NoOp,
            ClassUsageWriter::Default {
                relative_path: "x.json".to_string(),
            },
        ] {
            assert_eq!(
                ClassUsageWriter::from_wire(&writer.to_wire(), ()).unwrap(),
                writer
            );
        }
        let mut missing = WireMap::new();
        missing.insert("type".into(), "default".into());
        assert_eq!(
            ClassUsageWriter::from_wire(&missing, ()).unwrap_err().field(),
            "relative_path"
        );
    }
}
