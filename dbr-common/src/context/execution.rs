use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use super::resources::{EventLevel, ExecutionResources, ProcessOutput, ProcessRequest};
use super::{
    ClassUsageWriter, ContextError, DirectToJarSettings, PackageFinder, Verbosity, WireCodec,
    WireMap, read_map, read_optional_map, read_str, read_str_list, read_str_map, str_list,
};

/// Top-level wire keys of an execution context.
pub mod keys {
    pub const VERBOSITY: &str = "verbosity";
    pub const JAVA_PACKAGE_FINDER: &str = "java_package_finder";
    pub const PROJECT_FILE_SYSTEM_ROOT: &str = "project_file_system_root";
    pub const CLASS_USAGE_FILE_WRITER: &str = "class_usage_file_writer";
    pub const ENVIRONMENT: &str = "env";
    pub const ABSOLUTE_PATHS_FOR_INPUTS: &str = "absolute_paths_for_inputs";
    pub const DIRECT_TO_JAR_SETTINGS: &str = "direct_to_jar_settings";

    /// Keys every wire mapping must carry.
    pub const REQUIRED: [&str; 6] = [
        VERBOSITY,
        JAVA_PACKAGE_FINDER,
        PROJECT_FILE_SYSTEM_ROOT,
        CLASS_USAGE_FILE_WRITER,
        ENVIRONMENT,
        ABSOLUTE_PATHS_FOR_INPUTS,
    ];
}

/// The transmissible half of an execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionData {
    pub verbosity: Verbosity,
    pub package_finder: PackageFinder,
    pub project_root: PathBuf,
    pub class_usage_writer: ClassUsageWriter,
    pub env: BTreeMap<String, String>,
    pub absolute_input_paths: Vec<PathBuf>,
    pub direct_to_jar: Option<DirectToJarSettings>,
}

impl WireCodec for ExecutionData {
    type Resources = ();

    fn to_wire(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(keys::VERBOSITY.into(), self.verbosity.as_str().into());
        map.insert(
            keys::JAVA_PACKAGE_FINDER.into(),
            Value::Object(self.package_finder.to_wire()),
        );
        map.insert(
            keys::PROJECT_FILE_SYSTEM_ROOT.into(),
            self.project_root.to_string_lossy().into_owned().into(),
        );
        map.insert(
            keys::CLASS_USAGE_FILE_WRITER.into(),
            Value::Object(self.class_usage_writer.to_wire()),
        );
        map.insert(
            keys::ENVIRONMENT.into(),
            Value::Object(
                self.env
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect(),
            ),
        );
        map.insert(
            keys::ABSOLUTE_PATHS_FOR_INPUTS.into(),
            str_list(
                self.absolute_input_paths
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned()),
            ),
        );
        if let Some(settings) = &self.direct_to_jar {
            map.insert(
                keys::DIRECT_TO_JAR_SETTINGS.into(),
                Value::Object(settings.to_wire()),
            );
        }
        map
    }

    fn from_wire(map: &WireMap, _: ()) -> Result<Self, ContextError> {
        let verbosity_name = read_str(map, keys::VERBOSITY)?;
        let verbosity =
            Verbosity::from_name(verbosity_name).ok_or_else(|| ContextError::UnknownVariant {
                field: keys::VERBOSITY.to_string(),
                value: verbosity_name.to_string(),
            })?;

        let package_finder = PackageFinder::from_wire(read_map(map, keys::JAVA_PACKAGE_FINDER)?, ())
            .map_err(|e| e.nested(keys::JAVA_PACKAGE_FINDER))?;

        let project_root = PathBuf::from(read_str(map, keys::PROJECT_FILE_SYSTEM_ROOT)?);

        let class_usage_writer =
            ClassUsageWriter::from_wire(read_map(map, keys::CLASS_USAGE_FILE_WRITER)?, ())
                .map_err(|e| e.nested(keys::CLASS_USAGE_FILE_WRITER))?;

        let env = read_str_map(map, keys::ENVIRONMENT)?;

        let absolute_input_paths = read_str_list(map, keys::ABSOLUTE_PATHS_FOR_INPUTS)?
            .into_iter()
            .map(PathBuf::from)
            .collect();

        let direct_to_jar = read_optional_map(map, keys::DIRECT_TO_JAR_SETTINGS)?
            .map(|settings| {
                DirectToJarSettings::from_wire(settings, ())
                    .map_err(|e| e.nested(keys::DIRECT_TO_JAR_SETTINGS))
            })
            .transpose()?;

        Ok(Self {
            verbosity,
            package_finder,
            project_root,
            class_usage_writer,
            env,
            absolute_input_paths,
            direct_to_jar,
        })
    }
}

/// A compile action's configuration bound to local resources.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub data: ExecutionData,
    pub resources: ExecutionResources,
}

impl ExecutionContext {
    pub fn new(data: ExecutionData, resources: ExecutionResources) -> Self {
        Self { data, resources }
    }

    /// Run a tool inside the project root with exactly the context's
    /// environment, reporting the command and its output as verbosity allows.
    pub fn run(&self, program: &str, args: &[String]) -> io::Result<ProcessOutput> {
        let request = ProcessRequest {
            program: program.to_string(),
            args: args.to_vec(),
            env: self.data.env.clone(),
            cwd: Some(self.data.project_root.clone()),
        };
        if self.data.verbosity.should_print_command() {
            self.resources
                .event_sink
                .report(EventLevel::Info, &format!("{} {}", program, args.join(" ")));
        }

        let output = self.resources.process_executor.execute(&request)?;
        debug!(program, exit_code = ?output.exit_code, "process finished");

        if !output.success() || self.data.verbosity.should_print_output() {
            let mut stderr = self.resources.stderr.clone();
            stderr.write_all(&output.stderr)?;
            stderr.flush()?;
        }
        if !output.success() && !self.data.verbosity.is_silent() {
            self.resources.event_sink.report(
                EventLevel::Error,
                &format!("{program} exited with {:?}", output.exit_code),
            );
        }
        Ok(output)
    }
}

impl WireCodec for ExecutionContext {
    type Resources = ExecutionResources;

    fn to_wire(&self) -> WireMap {
        self.data.to_wire()
    }

    fn from_wire(map: &WireMap, resources: ExecutionResources) -> Result<Self, ContextError> {
        let data = ExecutionData::from_wire(map, ())?;
        Ok(Self { data, resources })
    }
}

/// Flatten a context into its wire mapping. Resources are dropped.
pub fn serialize_context(context: &ExecutionContext) -> WireMap {
    context.to_wire()
}

/// Rebuild a context from its wire mapping, binding it to `resources`.
///
/// Fails on the first missing or malformed key; nothing is built on failure.
pub fn deserialize_context(
    map: &WireMap,
    resources: ExecutionResources,
) -> Result<ExecutionContext, ContextError> {
    ExecutionContext::from_wire(map, resources)
}
