use super::{ContextError, WireCodec, WireMap, read_optional_str, read_str, read_str_list, str_list};

const OUTPUT_PATH: &str = "output_path";
const CLASS_PATH_ENTRIES_TO_EXCLUDE: &str = "class_path_entries_to_exclude";
const ENTRIES_TO_JOIN: &str = "entries_to_join";
const MAIN_CLASS: &str = "main_class";
const MANIFEST_FILE: &str = "manifest_file";

/// Settings for compiling straight into a jar instead of a class directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectToJarSettings {
    pub output_path: String,
    /// Regex patterns of class-path entries left out of the jar.
    pub class_path_entries_to_exclude: Vec<String>,
    pub entries_to_join: Vec<String>,
    pub main_class: Option<String>,
    pub manifest_file: Option<String>,
}

impl WireCodec for DirectToJarSettings {
    type Resources = ();

    fn to_wire(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(OUTPUT_PATH.into(), self.output_path.clone().into());
        map.insert(
            CLASS_PATH_ENTRIES_TO_EXCLUDE.into(),
            str_list(self.class_path_entries_to_exclude.iter().cloned()),
        );
        map.insert(
            ENTRIES_TO_JOIN.into(),
            str_list(self.entries_to_join.iter().cloned()),
        );
        if let Some(main_class) = &self.main_class {
            map.insert(MAIN_CLASS.into(), main_class.clone().into());
        }
        if let Some(manifest_file) = &self.manifest_file {
            map.insert(MANIFEST_FILE.into(), manifest_file.clone().into());
        }
        map
    }

    fn from_wire(map: &WireMap, _: ()) -> Result<Self, ContextError> {
        Ok(Self {
            output_path: read_str(map, OUTPUT_PATH)?.to_string(),
            class_path_entries_to_exclude: read_str_list(map, CLASS_PATH_ENTRIES_TO_EXCLUDE)?,
            entries_to_join: read_str_list(map, ENTRIES_TO_JOIN)?,
            main_class: read_optional_str(map, MAIN_CLASS)?,
            manifest_file: read_optional_str(map, MANIFEST_FILE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted_not_null() {
        let settings = DirectToJarSettings {
            output_path: "out/app.jar".to_string(),
            entries_to_join: vec!["libs/a.jar".to_string()],
            ..DirectToJarSettings::default()
        };
        let wire = settings.to_wire();
        assert!(!wire.contains_key(MAIN_CLASS));
        assert!(!wire.contains_key(MANIFEST_FILE));
        assert_eq!(DirectToJarSettings::from_wire(&wire, ()).unwrap(), settings);
    }

    #[test]
    fn optional_fields_round_trip_when_present() {
        let settings = DirectToJarSettings {
            output_path: "out/app.jar".to_string(),
            class_path_entries_to_exclude: vec![".*test.*".to_string()],
            entries_to_join: Vec::new(),
            main_class: Some("com.example.Main".to_string()),
            manifest_file: Some("MANIFEST.MF".to_string()),
        };
        assert_eq!(
            DirectToJarSettings::from_wire(&settings.to_wire(), ()).unwrap(),
            settings
        );
    }
}
