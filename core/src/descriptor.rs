//! file: core/src/descriptor.rs
//! description: typed descriptor model (`Descriptor`, `PluginDescriptor`,
//! `LanguageModuleDescriptor`, `Method`, `Parameter`, `PluginReference`) plus
//! semantic validation, modeled on the original's `Descriptor::Load` and
//! `Validate*` family in `src/core/package_manager.cpp`.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::platform::Platform;
use crate::value_type::ValueType;

/// Sentinel `var_index` meaning "this method takes no varargs".
pub const NO_VARARGS: i32 = -1;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },
    #[error("'{field}' must be >= {min}, got {got}")]
    BelowMinimum {
        field: &'static str,
        min: i64,
        got: i64,
    },
    #[error("parameter '{name}' has type Void, which is not a legal parameter type")]
    VoidParameter { name: String },
    #[error("parameter '{name}' is by-reference but has type Function")]
    ByReferenceFunction { name: String },
    #[error("the return type of method '{name}' cannot be by-reference")]
    ByReferenceReturn { name: String },
    #[error(
        "method '{method}' declares calling convention '{convention}', not allowed on {platform}"
    )]
    DisallowedCallingConvention {
        method: String,
        convention: String,
        platform: Platform,
    },
    #[error("method '{method}' has var_index {index}, out of range for {len} parameters")]
    VarIndexOutOfRange {
        method: String,
        index: i32,
        len: usize,
    },
    #[error("language module descriptor uses reserved language name \"plugin\"")]
    ReservedLanguageName,
}

/// Accumulates validation errors without stopping at the first one, mirroring
/// the original's "accumulate human-readable errors" load path.
#[derive(Debug, Default)]
pub struct ValidationErrors(pub Vec<DescriptorError>);

impl ValidationErrors {
    fn push(&mut self, e: DescriptorError) {
        self.0.push(e);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub ty: ValueType,
    #[serde(rename = "byReference", default)]
    pub by_reference: bool,
    #[serde(default)]
    pub prototype: Option<Box<Method>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(rename = "funcName")]
    pub func_name: String,
    #[serde(rename = "retType")]
    pub return_type: Parameter,
    #[serde(rename = "paramTypes", default)]
    pub param_types: Vec<Parameter>,
    #[serde(rename = "callingConvention", default)]
    pub calling_convention: Option<String>,
    #[serde(rename = "varIndex", default = "default_var_index")]
    pub var_index: i32,
}

fn default_var_index() -> i32 {
    NO_VARARGS
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginReference {
    pub name: String,
    #[serde(rename = "requestedVersion", default)]
    pub requested_version: Option<i64>,
    #[serde(default)]
    pub optional: bool,
    #[serde(rename = "supportedPlatforms", default)]
    pub supported_platforms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageModuleRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginDescriptor {
    #[serde(rename = "fileVersion")]
    pub file_version: i64,
    pub version: i64,
    #[serde(rename = "friendlyName")]
    pub friendly_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "createdBy", default)]
    pub created_by: String,
    #[serde(rename = "createdByURL", default)]
    pub created_by_url: String,
    #[serde(rename = "docsURL", default)]
    pub docs_url: String,
    #[serde(rename = "downloadURL", default)]
    pub download_url: String,
    #[serde(rename = "supportURL", default)]
    pub support_url: String,
    #[serde(rename = "updateURL", default)]
    pub update_url: Option<String>,
    #[serde(rename = "entryPoint")]
    pub entry_point: String,
    #[serde(rename = "supportedPlatforms", default)]
    pub supported_platforms: Vec<String>,
    #[serde(rename = "resourceDirectories", default)]
    pub resource_directories: Vec<String>,
    #[serde(rename = "languageModule")]
    pub language_module: LanguageModuleRef,
    #[serde(default)]
    pub dependencies: Vec<PluginReference>,
    #[serde(rename = "exportedMethods", default)]
    pub exported_methods: Vec<Method>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageModuleDescriptor {
    #[serde(rename = "fileVersion")]
    pub file_version: i64,
    pub version: i64,
    #[serde(rename = "friendlyName")]
    pub friendly_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "createdBy", default)]
    pub created_by: String,
    #[serde(rename = "createdByURL", default)]
    pub created_by_url: String,
    #[serde(rename = "docsURL", default)]
    pub docs_url: String,
    #[serde(rename = "downloadURL", default)]
    pub download_url: String,
    #[serde(rename = "supportURL", default)]
    pub support_url: String,
    #[serde(rename = "updateURL", default)]
    pub update_url: Option<String>,
    pub language: String,
    #[serde(rename = "supportedPlatforms", default)]
    pub supported_platforms: Vec<String>,
    #[serde(rename = "libraryDirectories", default)]
    pub library_directories: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Descriptor {
    Plugin(PluginDescriptor),
    Module(LanguageModuleDescriptor),
}

impl Descriptor {
    pub fn supported_platforms(&self) -> &[String] {
        match self {
            Descriptor::Plugin(p) => &p.supported_platforms,
            Descriptor::Module(m) => &m.supported_platforms,
        }
    }

    pub fn version(&self) -> i64 {
        match self {
            Descriptor::Plugin(p) => p.version,
            Descriptor::Module(m) => m.version,
        }
    }

    pub fn friendly_name(&self) -> &str {
        match self {
            Descriptor::Plugin(p) => &p.friendly_name,
            Descriptor::Module(m) => &m.friendly_name,
        }
    }

    /// Silent platform filter: a non-empty
    /// `supported-platforms` set that omits the current tag means "skip".
    pub fn matches_platform(&self, platform: &Platform) -> bool {
        let list = self.supported_platforms();
        list.is_empty() || list.iter().any(|t| t == platform.tag())
    }
}

fn dedup_by_name<T, F: Fn(&T) -> &str>(items: Vec<T>, name_of: F) -> (Vec<T>, bool) {
    let mut seen = std::collections::HashSet::new();
    let mut had_duplicates = false;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(name_of(&item).to_string()) {
            out.push(item);
        } else {
            had_duplicates = true;
        }
    }
    (out, had_duplicates)
}

fn validate_parameter(param: &Parameter, owner: &str, errors: &mut ValidationErrors) {
    if param.ty == ValueType::Void {
        errors.push(DescriptorError::VoidParameter {
            name: owner.to_string(),
        });
    }
    if param.ty == ValueType::Function && param.by_reference {
        errors.push(DescriptorError::ByReferenceFunction {
            name: owner.to_string(),
        });
    }
    if let Some(proto) = &param.prototype {
        validate_method(proto, errors, None);
    }
}

fn validate_method(method: &Method, errors: &mut ValidationErrors, platform: Option<&Platform>) {
    if method.name.is_empty() {
        errors.push(DescriptorError::EmptyField { field: "method.name" });
    }
    if method.func_name.is_empty() {
        errors.push(DescriptorError::EmptyField {
            field: "method.funcName",
        });
    }
    if method.return_type.by_reference {
        errors.push(DescriptorError::ByReferenceReturn {
            name: method.name.clone(),
        });
    }
    for p in &method.param_types {
        validate_parameter(p, &method.name, errors);
    }
    if let Some(platform) = platform {
        if let Some(convention) = &method.calling_convention {
            if let Some(allowed) = platform.allowed_calling_conventions() {
                if !allowed.contains(&convention.as_str()) {
                    errors.push(DescriptorError::DisallowedCallingConvention {
                        method: method.name.clone(),
                        convention: convention.clone(),
                        platform: *platform,
                    });
                }
            }
        }
    }
    if method.var_index != NO_VARARGS
        && (method.var_index < 0 || method.var_index as usize >= method.param_types.len())
    {
        errors.push(DescriptorError::VarIndexOutOfRange {
            method: method.name.clone(),
            index: method.var_index,
            len: method.param_types.len(),
        });
    }
}

fn validate_common(
    file_version: i64,
    version: i64,
    friendly_name: &str,
    resource_dirs: &[String],
    errors: &mut ValidationErrors,
) {
    if file_version < 1 {
        errors.push(DescriptorError::BelowMinimum {
            field: "fileVersion",
            min: 1,
            got: file_version,
        });
    }
    if version < 0 {
        errors.push(DescriptorError::BelowMinimum {
            field: "version",
            min: 0,
            got: version,
        });
    }
    if friendly_name.is_empty() {
        errors.push(DescriptorError::EmptyField {
            field: "friendlyName",
        });
    }
    for dir in resource_dirs {
        if dir.is_empty() {
            errors.push(DescriptorError::EmptyField {
                field: "resourceDirectories[]",
            });
        }
    }
}

impl PluginDescriptor {
    /// Deduplicates `dependencies` and `exportedMethods` by name (first
    /// occurrence wins; returns whether any duplicates were dropped, so the
    /// caller can log a warning) and validates the result.
    pub fn normalize_and_validate(
        mut self,
        platform: &Platform,
    ) -> (Self, bool, bool, ValidationErrors) {
        let mut errors = ValidationErrors::default();
        validate_common(
            self.file_version,
            self.version,
            &self.friendly_name,
            &self.resource_directories,
            &mut errors,
        );
        if self.entry_point.is_empty() {
            errors.push(DescriptorError::EmptyField {
                field: "entryPoint",
            });
        }
        if self.language_module.name.is_empty() {
            errors.push(DescriptorError::EmptyField {
                field: "languageModule.name",
            });
        }

        let (deps, deps_had_dupes) =
            dedup_by_name(std::mem::take(&mut self.dependencies), |d| &d.name);
        for dep in &deps {
            if dep.name.is_empty() {
                errors.push(DescriptorError::EmptyField {
                    field: "dependencies[].name",
                });
            }
            if let Some(v) = dep.requested_version {
                if v < 0 {
                    errors.push(DescriptorError::BelowMinimum {
                        field: "dependencies[].requestedVersion",
                        min: 0,
                        got: v,
                    });
                }
            }
        }
        self.dependencies = deps;

        let (methods, methods_had_dupes) =
            dedup_by_name(std::mem::take(&mut self.exported_methods), |m| &m.name);
        for method in &methods {
            validate_method(method, &mut errors, Some(platform));
        }
        self.exported_methods = methods;

        (self, deps_had_dupes, methods_had_dupes, errors)
    }
}

impl LanguageModuleDescriptor {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        validate_common(
            self.file_version,
            self.version,
            &self.friendly_name,
            &self.library_directories,
            &mut errors,
        );
        if self.language.is_empty() || self.language == "plugin" {
            errors.push(if self.language.is_empty() {
                DescriptorError::EmptyField { field: "language" }
            } else {
                DescriptorError::ReservedLanguageName
            });
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};

    fn bare_method(name: &str) -> Method {
        Method {
            name: name.to_string(),
            func_name: format!("{name}_impl"),
            return_type: Parameter {
                ty: ValueType::Void,
                by_reference: false,
                prototype: None,
            },
            param_types: vec![],
            calling_convention: None,
            var_index: NO_VARARGS,
        }
    }

    fn bare_plugin() -> PluginDescriptor {
        PluginDescriptor {
            file_version: 1,
            version: 0,
            friendly_name: "Sample".into(),
            description: String::new(),
            created_by: String::new(),
            created_by_url: String::new(),
            docs_url: String::new(),
            download_url: String::new(),
            support_url: String::new(),
            update_url: None,
            entry_point: "sample".into(),
            supported_platforms: vec![],
            resource_directories: vec![],
            language_module: LanguageModuleRef { name: "lua".into() },
            dependencies: vec![],
            exported_methods: vec![],
        }
    }

    #[test]
    fn well_formed_plugin_validates_cleanly() {
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        let (_, deps_dupes, methods_dupes, errors) =
            bare_plugin().normalize_and_validate(&platform);
        assert!(!deps_dupes);
        assert!(!methods_dupes);
        assert!(errors.is_empty(), "{errors}");
    }

    #[test]
    fn negative_file_version_is_rejected() {
        let mut d = bare_plugin();
        d.file_version = 0;
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        let (_, _, _, errors) = d.normalize_and_validate(&platform);
        assert!(!errors.is_empty());
    }

    #[test]
    fn duplicate_dependency_names_are_collapsed_to_first() {
        let mut d = bare_plugin();
        d.dependencies = vec![
            PluginReference {
                name: "modA".into(),
                requested_version: Some(1),
                optional: false,
                supported_platforms: vec![],
            },
            PluginReference {
                name: "modA".into(),
                requested_version: Some(2),
                optional: false,
                supported_platforms: vec![],
            },
        ];
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        let (d, deps_dupes, _, errors) = d.normalize_and_validate(&platform);
        assert!(deps_dupes);
        assert!(errors.is_empty());
        assert_eq!(d.dependencies.len(), 1);
        assert_eq!(d.dependencies[0].requested_version, Some(1));
    }

    #[test]
    fn disallowed_calling_convention_on_windows_x64_is_rejected() {
        let mut d = bare_plugin();
        let mut m = bare_method("init");
        m.calling_convention = Some("cdecl".into());
        d.exported_methods = vec![m];
        let platform = Platform::new(Os::Windows, Arch::X86_64);
        let (_, _, _, errors) = d.normalize_and_validate(&platform);
        assert!(!errors.is_empty());
    }

    #[test]
    fn void_parameter_is_illegal() {
        let mut d = bare_plugin();
        let mut m = bare_method("init");
        m.param_types.push(Parameter {
            ty: ValueType::Void,
            by_reference: false,
            prototype: None,
        });
        d.exported_methods = vec![m];
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        let (_, _, _, errors) = d.normalize_and_validate(&platform);
        assert!(!errors.is_empty());
    }

    #[test]
    fn by_reference_function_parameter_is_illegal() {
        let mut d = bare_plugin();
        let mut m = bare_method("init");
        m.param_types.push(Parameter {
            ty: ValueType::Function,
            by_reference: true,
            prototype: None,
        });
        d.exported_methods = vec![m];
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        let (_, _, _, errors) = d.normalize_and_validate(&platform);
        assert!(!errors.is_empty());
    }

    #[test]
    fn var_index_out_of_range_is_rejected() {
        let mut d = bare_plugin();
        let mut m = bare_method("init");
        m.var_index = 3;
        d.exported_methods = vec![m];
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        let (_, _, _, errors) = d.normalize_and_validate(&platform);
        assert!(!errors.is_empty());
    }

    #[test]
    fn language_module_rejects_reserved_name() {
        let d = LanguageModuleDescriptor {
            file_version: 1,
            version: 0,
            friendly_name: "Lua".into(),
            description: String::new(),
            created_by: String::new(),
            created_by_url: String::new(),
            docs_url: String::new(),
            download_url: String::new(),
            support_url: String::new(),
            update_url: None,
            language: "plugin".into(),
            supported_platforms: vec![],
            library_directories: vec![],
        };
        assert!(!d.validate().is_empty());
    }

    #[test]
    fn matches_platform_is_true_when_list_is_empty() {
        let d = Descriptor::Plugin(bare_plugin());
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        assert!(d.matches_platform(&platform));
    }

    #[test]
    fn matches_platform_is_false_when_tag_absent() {
        let mut p = bare_plugin();
        p.supported_platforms = vec!["windows-x86_64".into()];
        let d = Descriptor::Plugin(p);
        let platform = Platform::new(Os::Linux, Arch::X86_64);
        assert!(!d.matches_platform(&platform));
    }
}
