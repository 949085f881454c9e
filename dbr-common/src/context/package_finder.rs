use serde_json::Value;

use super::{ContextError, WireCodec, WireMap, read_map, read_str, read_str_list, str_list};

const TYPE: &str = "type";
const PATHS_FROM_ROOT: &str = "paths_from_root";
const PATH_ELEMENTS: &str = "path_elements";
const RESOURCES_ROOT: &str = "resources_root";
const FALLBACK: &str = "fallback";

const TYPE_DEFAULT: &str = "default";
const TYPE_RESOURCES_ROOT: &str = "resources_root";

/// Maps a source path to the Java package it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageFinder {
    /// Package is the directory under the first matching root prefix, or under
    /// the first matching path element (e.g. `java`, `src`).
    Default {
        paths_from_root: Vec<String>,
        path_elements: Vec<String>,
    },
    /// Files under `resources_root` take their package from the path below
    /// it; everything else goes to `fallback`.
    ResourcesRoot {
        resources_root: String,
        fallback: Box<PackageFinder>,
    },
}

impl PackageFinder {
    /// Dotted package name for a project-relative, `/`-separated file path.
    pub fn package_for(&self, path: &str) -> Option<String> {
        match self {
            Self::Default {
                paths_from_root,
                path_elements,
            } => {
                for prefix in paths_from_root {
                    let prefix = prefix.trim_end_matches('/');
                    if let Some(rest) = path.strip_prefix(prefix).and_then(|r| r.strip_prefix('/'))
                    {
                        return Some(package_of(rest));
                    }
                }
                for element in path_elements {
                    let element = element.trim_matches('/');
                    let mut offset = 0;
                    for part in path.split('/') {
                        offset += part.len() + 1;
                        if part == element && offset <= path.len() {
                            return Some(package_of(&path[offset..]));
                        }
                    }
                }
                None
            }
            Self::ResourcesRoot {
                resources_root,
                fallback,
            } => {
                let root = resources_root.trim_end_matches('/');
                match path.strip_prefix(root).and_then(|r| r.strip_prefix('/')) {
                    Some(rest) => Some(package_of(rest)),
                    None => fallback.package_for(path),
                }
            }
        }
    }
}

/// Directory part of `relative`, dotted.
fn package_of(relative: &str) -> String {
    match relative.rsplit_once('/') {
        Some((dir, _file)) => dir.replace('/', "."),
        None => String::new(),
    }
}

impl WireCodec for PackageFinder {
    type Resources = ();

    fn to_wire(&self) -> WireMap {
        let mut map = WireMap::new();
        match self {
            Self::Default {
                paths_from_root,
                path_elements,
            } => {
                map.insert(TYPE.into(), TYPE_DEFAULT.into());
                map.insert(PATHS_FROM_ROOT.into(), str_list(paths_from_root.iter().cloned()));
                map.insert(PATH_ELEMENTS.into(), str_list(path_elements.iter().cloned()));
            }
            Self::ResourcesRoot {
                resources_root,
                fallback,
            } => {
                map.insert(TYPE.into(), TYPE_RESOURCES_ROOT.into());
                map.insert(RESOURCES_ROOT.into(), resources_root.clone().into());
                map.insert(FALLBACK.into(), Value::Object(fallback.to_wire()));
            }
        }
        map
    }

    fn from_wire(map: &WireMap, _: ()) -> Result<Self, ContextError> {
        match read_str(map, TYPE)? {
            TYPE_DEFAULT => Ok(Self::Default {
                paths_from_root: read_str_list(map, PATHS_FROM_ROOT)?,
                path_elements: read_str_list(map, PATH_ELEMENTS)?,
            }),
            TYPE_RESOURCES_ROOT => {
                let fallback = Self::from_wire(read_map(map, FALLBACK)?, ())
                    .map_err(|e| e.nested(FALLBACK))?;
                Ok(Self::ResourcesRoot {
                    resources_root: read_str(map, RESOURCES_ROOT)?.to_string(),
                    fallback: Box::new(fallback),
                })
            }
            other => Err(ContextError::UnknownVariant {
                field: TYPE.to_string(),
                value: other.to_string(),
            }),
        }
    }
}
